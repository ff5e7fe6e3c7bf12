use {
    base64::Engine,
    quickreply_common::{InboundMessage, MessageKind, QuotedMessage},
    serde::{Deserialize, Serialize},
    tracing::warn,
};

/// Frames the sidecar sends to the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SidecarFrame {
    /// Pairing QR code to show the user.
    Qr { code: String },
    /// Session is up.
    Connected {
        #[serde(default)]
        jid: Option<String>,
    },
    /// Session went down. `logged_out` means the pairing was revoked and
    /// reconnecting is pointless.
    Disconnected {
        #[serde(default)]
        reason: Option<String>,
        #[serde(default)]
        logged_out: bool,
    },
    /// One inbound chat message.
    Message(WireMessage),
    /// Full authentication state to persist, sent whenever Baileys mutates
    /// its credentials.
    CredsUpdate { state: serde_json::Value },
    /// Outcome of a previously requested send.
    SendResult {
        ok: bool,
        #[serde(default)]
        error: Option<String>,
    },
}

/// Frames the gateway sends to the sidecar.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayFrame {
    /// Start (or resume) the session with the persisted auth state.
    Login { state: serde_json::Value },
    Logout,
    Send { to: String, text: String },
}

/// Inbound message as the sidecar reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub id: String,
    pub chat_jid: String,
    pub sender_jid: String,
    #[serde(default)]
    pub sender_name: Option<String>,
    #[serde(default)]
    pub from_me: bool,
    pub kind: MessageKind,
    #[serde(default)]
    pub body: Option<String>,
    /// Media payload, base64-encoded; the sidecar already downloaded it.
    #[serde(default)]
    pub media_b64: Option<String>,
    #[serde(default)]
    pub mimetype: Option<String>,
    #[serde(default)]
    pub quoted_participant: Option<String>,
    #[serde(default)]
    pub quoted_text: Option<String>,
    #[serde(default)]
    pub timestamp: i64,
}

impl WireMessage {
    /// Normalize into the pipeline's message shape, decoding media bytes.
    #[must_use]
    pub fn into_inbound(self) -> InboundMessage {
        let media = self.media_b64.as_deref().and_then(|encoded| {
            match base64::engine::general_purpose::STANDARD.decode(encoded) {
                Ok(bytes) => Some(bytes.into()),
                Err(error) => {
                    warn!(id = %self.id, %error, "invalid base64 media payload, dropping it");
                    None
                },
            }
        });

        let quoted = if self.quoted_participant.is_some() || self.quoted_text.is_some() {
            Some(QuotedMessage {
                participant: self.quoted_participant,
                text: self.quoted_text,
            })
        } else {
            None
        };

        InboundMessage {
            id: self.id,
            chat_jid: self.chat_jid,
            sender_jid: self.sender_jid,
            sender_name: self.sender_name,
            from_me: self.from_me,
            kind: self.kind,
            body: self.body,
            media,
            mimetype: self.mimetype,
            quoted,
            timestamp: self.timestamp,
        }
    }
}
