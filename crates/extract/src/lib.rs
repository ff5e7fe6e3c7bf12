//! Content extraction: turn any supported inbound message into plain text.
//!
//! Text passes through, audio is transcribed, images are captioned, videos
//! have their audio track pulled out with ffmpeg and transcribed. Every
//! failure along the way degrades to a fallback string — extraction never
//! stops the pipeline.

pub mod caption;
pub mod extractor;
pub mod media;
pub mod transcribe;
pub mod video;

pub use {
    caption::CaptionClient,
    extractor::{ContentExtractor, Extracted},
    media::ensure_media_dirs,
    transcribe::TranscriptionClient,
};
