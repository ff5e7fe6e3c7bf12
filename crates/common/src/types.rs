use {
    bytes::Bytes,
    serde::{Deserialize, Serialize},
};

/// What kind of content an inbound message carries.
///
/// Classification is exhaustive on purpose: the pipeline matches on every
/// variant and anything the channel cannot name lands in [`MessageKind::Unsupported`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Plain conversation text.
    Text,
    /// Text with link previews / formatting metadata.
    ExtendedText,
    /// Voice note or audio file.
    Audio,
    /// Photo or sticker-like image.
    Image,
    /// Video (its audio track is what gets processed).
    Video,
    /// Anything else (contacts, polls, locations, ...).
    Unsupported,
}

/// A message quoted by (replied to from) the inbound message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuotedMessage {
    /// JID of the author of the quoted message, when the channel reports it.
    pub participant: Option<String>,
    /// Plain text of the quoted message, when it had any.
    pub text: Option<String>,
}

/// One inbound message, normalized from the channel's wire shape.
///
/// `chat_jid` is the conversation routing address and is stable across
/// messages from the same thread. Media bytes are already downloaded by the
/// channel; the pipeline never touches the wire protocol.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub id: String,
    pub chat_jid: String,
    pub sender_jid: String,
    pub sender_name: Option<String>,
    /// True when the account itself authored the message.
    pub from_me: bool,
    pub kind: MessageKind,
    /// Text body or media caption, when present.
    pub body: Option<String>,
    /// Raw media payload for audio/image/video kinds.
    pub media: Option<Bytes>,
    /// Media MIME type as reported by the channel.
    pub mimetype: Option<String>,
    pub quoted: Option<QuotedMessage>,
    /// Unix timestamp (seconds) of the message.
    pub timestamp: i64,
}

impl InboundMessage {
    /// Minimal text message; fills every non-text field with its default.
    #[must_use]
    pub fn text(chat_jid: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            chat_jid: chat_jid.into(),
            sender_jid: String::new(),
            sender_name: None,
            from_me: false,
            kind: MessageKind::Text,
            body: Some(body.into()),
            media: None,
            mimetype: None,
            quoted: None,
            timestamp: 0,
        }
    }
}

/// Send messages back to a conversation.
///
/// The concrete implementation lives with the channel; the pipeline only
/// ever sees this trait. Send failures are the channel's to report and the
/// caller's to log — there is no retry at this seam.
#[async_trait::async_trait]
pub trait ChannelOutbound: Send + Sync {
    async fn send_text(&self, chat_jid: &str, text: &str) -> crate::error::Result<()>;
}
