use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuickreplyConfig {
    pub pipeline: PipelineConfig,
    pub answer: AnswerConfig,
    pub openai: OpenAiConfig,
    pub store: StoreConfig,
    pub media: MediaConfig,
    pub sidecar: SidecarConfig,
}

/// Message-handling policy: debouncing and access control.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Inactivity window before a conversation's buffered fragments are
    /// flushed as one query, in milliseconds.
    pub debounce_window_ms: u64,
    /// Skip the dispatch entirely when the coalesced text is blank.
    pub suppress_empty_dispatch: bool,
    /// Conversations/senders allowed to interact. Empty = everyone.
    /// Entries match case-insensitively, `*` is a wildcard.
    pub allowlist: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            debounce_window_ms: 5_000,
            suppress_empty_dispatch: true,
            allowlist: Vec::new(),
        }
    }
}

/// Answer-generation service endpoint and retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerConfig {
    /// Full URL of the prediction endpoint.
    pub endpoint: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Attempts before giving up on one dispatch.
    pub max_attempts: u32,
    /// Linear backoff base: attempt N waits N * base before retrying, in
    /// milliseconds.
    pub backoff_base_ms: u64,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:3000/api/v1/prediction/default".into(),
            timeout_secs: 60,
            max_attempts: 3,
            backoff_base_ms: 2_000,
        }
    }
}

/// OpenAI-compatible API used for transcription and image captions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    #[serde(serialize_with = "serialize_secret_opt")]
    pub api_key: Option<Secret<String>>,
    pub base_url: String,
    pub transcribe_model: String,
    pub caption_model: String,
    /// Instruction sent with an image.
    pub caption_prompt: String,
    /// Prefixed to the returned caption before it enters the conversation
    /// buffer.
    pub caption_preamble: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".into(),
            transcribe_model: "whisper-1".into(),
            caption_model: "gpt-4o-mini".into(),
            caption_prompt: "Descreva o que está na imagem.".into(),
            caption_preamble: "Tente encontrar os produtos mais similares à descrição a seguir: "
                .into(),
        }
    }
}

fn serialize_secret_opt<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}

/// Session store location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database URL.
    pub database_url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:quickreply.db".into(),
        }
    }
}

/// Scratch space for downloaded media.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub dir: std::path::PathBuf,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            dir: std::path::PathBuf::from("media"),
        }
    }
}

/// WhatsApp sidecar connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SidecarConfig {
    /// WebSocket URL of the Baileys sidecar.
    pub url: String,
    /// Connection attempts before startup fails.
    pub connect_attempts: u32,
}

impl Default for SidecarConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:3001".into(),
            connect_attempts: 10,
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = QuickreplyConfig::default();
        assert_eq!(cfg.pipeline.debounce_window_ms, 5_000);
        assert_eq!(cfg.answer.max_attempts, 3);
        assert_eq!(cfg.answer.backoff_base_ms, 2_000);
        assert!(cfg.pipeline.allowlist.is_empty());
        assert!(cfg.pipeline.suppress_empty_dispatch);
    }

    #[test]
    fn partial_toml_takes_defaults_for_the_rest() {
        let cfg: QuickreplyConfig = toml::from_str(
            r#"
            [answer]
            endpoint = "http://flowise.internal/api/v1/prediction/abc"

            [pipeline]
            debounce_window_ms = 1500
            "#,
        )
        .unwrap();
        assert_eq!(
            cfg.answer.endpoint,
            "http://flowise.internal/api/v1/prediction/abc"
        );
        assert_eq!(cfg.pipeline.debounce_window_ms, 1_500);
        // Untouched sections keep their defaults.
        assert_eq!(cfg.answer.max_attempts, 3);
        assert_eq!(cfg.store.database_url, "sqlite:quickreply.db");
    }

    #[test]
    fn allowlist_parses_as_list() {
        let cfg: QuickreplyConfig = toml::from_str(
            r#"
            [pipeline]
            allowlist = ["5547*", "1122334455@s.whatsapp.net"]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.pipeline.allowlist.len(), 2);
    }
}
