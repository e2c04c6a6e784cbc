//! # dj-storage-local
//! digital-journal/crates/dj-plugins/dj-storage-local/src/lib.rs
//! Local filesystem implementation of `MediaStore`.
//! Features: content-hash directory sharding, PNG normalisation for images.

use std::io::Cursor;
use std::path::{Component, Path, PathBuf};

use anyhow::bail;
use async_trait::async_trait;
use dj_core::traits::MediaStore;
use image::ImageFormat;
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, warn};

pub struct LocalMediaStore {
    /// Root directory for all attachments (e.g., "./data/media")
    root_path: PathBuf,
    /// Public URL prefix (e.g., "/media")
    url_prefix: String,
}

impl LocalMediaStore {
    pub fn new(root: PathBuf, url_prefix: String) -> Self {
        Self {
            root_path: root,
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Stored names look like `3f/beach-day_1a2b3c4d.png`: the shard is the
    /// first byte of the content hash.
    fn sharded_name(data: &[u8], file_name: &str) -> String {
        let hash = hex::encode(Sha256::digest(data));
        format!("{}/{}", &hash[..2], file_name)
    }

    /// Rejects anything that could escape the root.
    fn checked_path(&self, stored_name: &str) -> anyhow::Result<PathBuf> {
        let relative = Path::new(stored_name);
        if relative.components().any(|c| !matches!(c, Component::Normal(_))) {
            bail!("refusing media path {stored_name:?}");
        }
        Ok(self.root_path.join(relative))
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    /// Writes the attachment under a hash shard. Names ending in `.png` are
    /// re-encoded as PNG when the bytes decode as an image in another format.
    async fn save_attachment(&self, file_name: &str, data: Vec<u8>) -> anyhow::Result<String> {
        let data = if file_name.to_ascii_lowercase().ends_with(".png") {
            normalize_png(data).await?
        } else {
            data
        };

        let stored_name = Self::sharded_name(&data, file_name);
        let target_path = self.checked_path(&stored_name)?;
        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&target_path, &data).await?;

        debug!(path = %target_path.display(), bytes = data.len(), "attachment stored");
        Ok(stored_name)
    }

    /// Missing files are not an error.
    async fn remove_attachment(&self, file_name: &str) -> anyhow::Result<()> {
        let path = self.checked_path(file_name)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn url(&self, file_name: &str) -> String {
        format!("{}/{}", self.url_prefix, file_name)
    }

    fn local_path(&self, file_name: &str) -> PathBuf {
        self.root_path.join(file_name)
    }
}

/// Re-encodes decodable images as PNG. Bytes that are already PNG, or that
/// are not an image at all, pass through unchanged.
async fn normalize_png(data: Vec<u8>) -> anyhow::Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || {
        let format = match image::guess_format(&data) {
            Ok(ImageFormat::Png) | Err(_) => return data,
            Ok(format) => format,
        };
        let decoded = match image::load_from_memory_with_format(&data, format) {
            Ok(img) => img,
            Err(err) => {
                warn!(error = %err, "upload looks like an image but does not decode, storing as-is");
                return data;
            }
        };
        let mut png = Vec::new();
        match decoded.write_to(&mut Cursor::new(&mut png), ImageFormat::Png) {
            Ok(()) => png,
            Err(err) => {
                warn!(error = %err, "png re-encode failed, storing original bytes");
                data
            }
        }
    })
    .await
    .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn jpeg_bytes() -> Vec<u8> {
        let img = ImageBuffer::from_pixel(4, 4, Rgb([200u8, 30, 30]));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), ImageFormat::Jpeg).unwrap();
        out
    }

    #[tokio::test]
    async fn images_named_png_are_stored_as_png() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalMediaStore::new(dir.path().to_path_buf(), "/media/".into());

        let name = store.save_attachment("beach_1a2b3c4d.png", jpeg_bytes()).await.unwrap();
        assert!(name.ends_with("/beach_1a2b3c4d.png"));
        assert_eq!(name.split('/').next().unwrap().len(), 2);

        let written = std::fs::read(store.local_path(&name)).unwrap();
        assert_eq!(image::guess_format(&written).unwrap(), ImageFormat::Png);
        assert_eq!(store.url(&name), format!("/media/{name}"));
    }

    #[tokio::test]
    async fn other_files_are_stored_verbatim_and_removable() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalMediaStore::new(dir.path().to_path_buf(), "/media".into());

        let name = store.save_attachment("notes_00112233.pdf", b"%PDF-1.4".to_vec()).await.unwrap();
        assert_eq!(std::fs::read(store.local_path(&name)).unwrap(), b"%PDF-1.4");

        store.remove_attachment(&name).await.unwrap();
        assert!(!store.local_path(&name).exists());
        // Second removal is a no-op.
        store.remove_attachment(&name).await.unwrap();
    }

    #[tokio::test]
    async fn traversal_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalMediaStore::new(dir.path().to_path_buf(), "/media".into());
        assert!(store.remove_attachment("../etc/passwd").await.is_err());
    }
}
