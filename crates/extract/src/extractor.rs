use std::path::PathBuf;

use {
    quickreply_common::{InboundMessage, MessageKind},
    tracing::warn,
};

use crate::{caption::CaptionClient, media, transcribe::TranscriptionClient, video};

/// Substitute when a video carries no audio track we can process.
const VIDEO_NO_AUDIO: &str = "audio não processado";

/// Substitute when the extracted audio transcribed to nothing.
const VIDEO_UNTRANSCRIBED: &str =
    "O áudio extraído não pôde ser transcrevido. Responda de acordo com o contexto da conversa.";

/// Result of extracting one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    Text(String),
    /// The message kind is not one we can turn into text.
    Unsupported,
}

/// Turns an inbound message of any supported kind into plain text.
///
/// Failures never propagate: a broken download, a missing API key, or a
/// silent video all degrade into fallback text so the conversation keeps
/// moving.
pub struct ContentExtractor {
    transcription: TranscriptionClient,
    caption: CaptionClient,
    media_dir: PathBuf,
    caption_preamble: String,
}

impl ContentExtractor {
    #[must_use]
    pub fn new(
        transcription: TranscriptionClient,
        caption: CaptionClient,
        media_dir: PathBuf,
        caption_preamble: impl Into<String>,
    ) -> Self {
        Self {
            transcription,
            caption,
            media_dir,
            caption_preamble: caption_preamble.into(),
        }
    }

    pub async fn extract(&self, msg: &InboundMessage) -> Extracted {
        match msg.kind {
            MessageKind::Text | MessageKind::ExtendedText => {
                Extracted::Text(msg.body.clone().unwrap_or_default())
            },
            MessageKind::Audio => Extracted::Text(self.extract_audio(msg).await),
            MessageKind::Image => Extracted::Text(self.extract_image(msg).await),
            MessageKind::Video => Extracted::Text(self.extract_video(msg).await),
            MessageKind::Unsupported => Extracted::Unsupported,
        }
    }

    async fn extract_audio(&self, msg: &InboundMessage) -> String {
        let Some(audio) = &msg.media else {
            return String::new();
        };

        let format = audio_format(msg.mimetype.as_deref());
        let path = self
            .media_dir
            .join("audio")
            .join(format!("{}.{format}", msg.id));
        media::save_media(&path, audio).await;

        self.transcription
            .transcribe_or_empty(audio.clone(), format)
            .await
    }

    async fn extract_image(&self, msg: &InboundMessage) -> String {
        let Some(image) = &msg.media else {
            return String::new();
        };

        let path = self
            .media_dir
            .join("images")
            .join(format!("{}.jpg", msg.id));
        media::save_media(&path, image).await;

        let caption = match self.caption.caption(image).await {
            Ok(caption) => caption,
            Err(error) => {
                warn!(%error, "image caption failed");
                String::new()
            },
        };
        format!("{}{caption}", self.caption_preamble)
    }

    async fn extract_video(&self, msg: &InboundMessage) -> String {
        let Some(video_bytes) = &msg.media else {
            return VIDEO_NO_AUDIO.to_string();
        };

        let video_path = self
            .media_dir
            .join("video")
            .join(format!("{}.{}", msg.id, video_format(msg.mimetype.as_deref())));
        let audio_path = self.media_dir.join("audio").join(format!("{}.ogg", msg.id));

        if media::save_media(&video_path, video_bytes).await.is_none() {
            return VIDEO_NO_AUDIO.to_string();
        }
        if !video::extract_audio_track(&video_path, &audio_path).await {
            return VIDEO_NO_AUDIO.to_string();
        }

        let audio = match tokio::fs::read(&audio_path).await {
            Ok(bytes) => bytes,
            Err(error) => {
                warn!(%error, "failed to read extracted audio");
                return VIDEO_NO_AUDIO.to_string();
            },
        };

        let transcription = self
            .transcription
            .transcribe_or_empty(audio.into(), "ogg")
            .await;
        if transcription.trim().is_empty() {
            VIDEO_UNTRANSCRIBED.to_string()
        } else {
            transcription
        }
    }
}

/// Audio container extension from a MIME type.
fn audio_format(mimetype: Option<&str>) -> &'static str {
    match mimetype.map(|m| m.split(';').next().unwrap_or(m).trim()) {
        Some("audio/mpeg" | "audio/mp3") => "mp3",
        Some("audio/mp4" | "audio/m4a" | "audio/x-m4a") => "m4a",
        Some("audio/wav" | "audio/x-wav") => "wav",
        // WhatsApp voice notes are Opus in Ogg.
        _ => "ogg",
    }
}

/// Video container extension from a MIME type.
fn video_format(mimetype: Option<&str>) -> &'static str {
    match mimetype.map(|m| m.split(';').next().unwrap_or(m).trim()) {
        Some("video/webm") => "webm",
        Some("video/3gpp") => "3gp",
        _ => "mp4",
    }
}
