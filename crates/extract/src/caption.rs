use {
    anyhow::{Context, Result, anyhow},
    base64::Engine,
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    serde_json::json,
};

/// Token budget for one caption.
const MAX_TOKENS: u32 = 300;

/// Image captioning over an OpenAI-compatible chat-completions endpoint.
#[derive(Clone)]
pub struct CaptionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<Secret<String>>,
    model: String,
    prompt: String,
}

impl std::fmt::Debug for CaptionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptionClient")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish()
    }
}

impl CaptionClient {
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<Secret<String>>,
        model: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
            model: model.into(),
            prompt: prompt.into(),
        }
    }

    /// Describe the image. The payload goes inline as a base64 data URL.
    pub async fn caption(&self, image: &[u8]) -> Result<String> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| anyhow!("API key not configured for image captions"))?;

        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        let payload = json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": self.prompt},
                    {"type": "image_url", "image_url": {
                        "url": format!("data:image/jpeg;base64,{encoded}"),
                    }},
                ],
            }],
            "max_tokens": MAX_TOKENS,
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header(
                "Authorization",
                format!("Bearer {}", api_key.expose_secret()),
            )
            .json(&payload)
            .send()
            .await
            .context("caption request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("caption request failed: {status} - {body}"));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .context("failed to parse caption response")?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow!("caption response had no choices"))
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}
