use std::time::Duration;

use {
    anyhow::{Context, Result, anyhow},
    bytes::Bytes,
    reqwest::multipart::{Form, Part},
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    tracing::warn,
};

/// Attempts per audio clip before giving up with an empty transcription.
const MAX_ATTEMPTS: u32 = 3;

/// Fixed wait between transcription attempts.
const RETRY_DELAY: Duration = Duration::from_millis(1_000);

/// Speech-to-text over an OpenAI-compatible transcriptions endpoint.
#[derive(Clone)]
pub struct TranscriptionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<Secret<String>>,
    model: String,
    retry_delay: Duration,
}

impl std::fmt::Debug for TranscriptionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscriptionClient")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish()
    }
}

impl TranscriptionClient {
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<Secret<String>>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
            model: model.into(),
            retry_delay: RETRY_DELAY,
        }
    }

    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Transcribe, retrying a couple of times; exhausted attempts yield an
    /// empty string so the conversation can continue on context alone.
    pub async fn transcribe_or_empty(&self, audio: Bytes, format: &str) -> String {
        for attempt in 1..=MAX_ATTEMPTS {
            match self.transcribe(audio.clone(), format).await {
                Ok(text) => return text,
                Err(error) => {
                    warn!(attempt, %error, "transcription attempt failed");
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                },
            }
        }
        String::new()
    }

    async fn transcribe(&self, audio: Bytes, format: &str) -> Result<String> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| anyhow!("API key not configured for transcription"))?;

        let file_part = Part::bytes(audio.to_vec())
            .file_name(format!("audio.{format}"))
            .mime_str(mime_for(format))
            .context("failed to build audio part")?;

        let form = Form::new()
            .part("file", file_part)
            .text("model", self.model.clone());

        let response = self
            .http
            .post(format!("{}/audio/transcriptions", self.base_url))
            .header(
                "Authorization",
                format!("Bearer {}", api_key.expose_secret()),
            )
            .multipart(form)
            .send()
            .await
            .context("transcription request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("transcription failed: {status} - {body}"));
        }

        let parsed: TranscriptionResponse = response
            .json()
            .await
            .context("failed to parse transcription response")?;
        Ok(parsed.text)
    }
}

/// MIME type for an audio container extension.
fn mime_for(format: &str) -> &'static str {
    match format {
        "ogg" | "opus" => "audio/ogg",
        "mp3" => "audio/mpeg",
        "m4a" | "mp4" => "audio/mp4",
        "wav" => "audio/wav",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}
