use std::path::{Path, PathBuf};

use tracing::warn;

/// Scratch subdirectories created under the media dir on startup.
pub const MEDIA_SUBDIRS: &[&str] = &["audio", "video", "images"];

/// Create the media scratch directories if they do not exist.
pub async fn ensure_media_dirs(base: &Path) -> std::io::Result<()> {
    for sub in MEDIA_SUBDIRS {
        tokio::fs::create_dir_all(base.join(sub)).await?;
    }
    Ok(())
}

/// Write a media payload to disk; failures are logged, not fatal — the
/// file copy is scratch material, not the source of truth.
pub async fn save_media(path: &Path, bytes: &[u8]) -> Option<PathBuf> {
    match tokio::fs::write(path, bytes).await {
        Ok(()) => Some(path.to_path_buf()),
        Err(error) => {
            warn!(path = %path.display(), %error, "failed to save media file");
            None
        },
    }
}
