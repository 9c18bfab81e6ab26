//! Disk staging for images in flight to the recognition service.

use std::path::{Path, PathBuf};

use tokio::fs;
use uuid::Uuid;

/// A decoded image staged under the configured directory for the duration of
/// one extraction call.
///
/// The file is removed when the guard drops, so every exit path — upload
/// failure, recognition failure, success — releases it.
#[derive(Debug)]
pub struct StagedImage {
  path: PathBuf,
}

impl StagedImage {
  pub async fn write(dir: &Path, bytes: &[u8], mime_type: &str) -> std::io::Result<Self> {
    fs::create_dir_all(dir).await?;
    let path = dir.join(format!("{}.{}", Uuid::new_v4(), extension_for(mime_type)));
    fs::write(&path, bytes).await?;
    Ok(Self { path })
  }

  pub fn path(&self) -> &Path { &self.path }
}

impl Drop for StagedImage {
  fn drop(&mut self) {
    if let Err(e) = std::fs::remove_file(&self.path) {
      tracing::warn!(path = %self.path.display(), error = %e, "failed to remove staged image");
    }
  }
}

fn extension_for(mime_type: &str) -> &'static str {
  match mime_type {
    "image/png" => "png",
    "image/webp" => "webp",
    _ => "jpg",
  }
}
