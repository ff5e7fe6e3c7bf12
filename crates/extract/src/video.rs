use std::{path::Path, process::Stdio};

use tracing::{debug, warn};

/// Pull the audio track out of a video file as Opus-in-Ogg.
///
/// Returns false when the video has no usable audio or ffmpeg itself is
/// missing/failing; the caller substitutes a fallback string either way.
pub async fn extract_audio_track(video_path: &Path, audio_path: &Path) -> bool {
    let status = tokio::process::Command::new("ffmpeg")
        .arg("-y")
        .arg("-i")
        .arg(video_path)
        .arg("-vn")
        .arg("-acodec")
        .arg("libopus")
        .arg(audio_path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    match status {
        Ok(status) if status.success() => {
            debug!(audio = %audio_path.display(), "audio track extracted");
            true
        },
        Ok(status) => {
            warn!(video = %video_path.display(), code = ?status.code(), "ffmpeg failed");
            false
        },
        Err(error) => {
            warn!(%error, "could not run ffmpeg");
            false
        },
    }
}
