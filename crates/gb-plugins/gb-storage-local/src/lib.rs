//! # gb-storage-local
//! galatea-blog/crates/gb-plugins/gb-storage-local/src/lib.rs
//! Local filesystem implementation of `ThumbnailStore`.
//! Features: Content-addressable storage, directory sharding, and thumbnailing.

use async_trait::async_trait;
use gb_core::error::{BlogError, Result};
use gb_core::media::ImageKind;
use gb_core::models::{sharded_path, SiteConfiguration};
use gb_core::traits::ThumbnailStore;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use sha2::{Digest, Sha256};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

pub struct LocalThumbnailStore {
    /// Root directory for all thumbnails (e.g., "./data/blogdb/galatea/blog")
    root_path: PathBuf,
}

impl LocalThumbnailStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root_path: root }
    }

    /// Thumbnails of one database live under `<storage root>/<db>/galatea/blog`.
    pub fn for_database(storage_root: &Path, database_name: &str) -> Self {
        Self::new(
            storage_root
                .join(database_name)
                .join("galatea")
                .join("blog"),
        )
    }

    pub fn root(&self) -> &Path {
        &self.root_path
    }

    /// Generates a sharded path: "ab/cd/abcd...hash.ext"
    fn get_sharded_path(&self, stored_name: &str) -> Option<PathBuf> {
        sharded_path(stored_name).map(|rel| self.root_path.join(rel))
    }
}

#[async_trait]
impl ThumbnailStore for LocalThumbnailStore {
    /// Stores the resized upload under the SHA-256 of the original bytes.
    /// Identical uploads resolve to the same file, which is only rendered once.
    async fn save_thumbnail(
        &self,
        file_name: String,
        data: Vec<u8>,
        config: SiteConfiguration,
    ) -> Result<String> {
        // 1. Accepted image type, from the file name
        let kind = ImageKind::from_file_name(&file_name)?;

        // 2. Calculate Hash
        let mut hasher = Sha256::new();
        hasher.update(&data);
        let stored_name = format!("{}.{}", hex::encode(hasher.finalize()), kind.extension());

        let target_path = self
            .get_sharded_path(&stored_name)
            .ok_or_else(|| BlogError::Internal(format!("bad thumbnail name {}", stored_name)))?;

        // 3. Reuse (if exists)
        if fs::try_exists(&target_path).await.unwrap_or(false) {
            debug!(thumb = %stored_name, "thumbnail already stored, reusing");
            return Ok(stored_name);
        }

        // 4. Resize off the async runtime
        let size = config.effective_thumb_size();
        let crop = config.thumb_crop;
        let rendered = tokio::task::spawn_blocking(move || render_thumbnail(&data, kind, size, crop))
            .await
            .map_err(|e| BlogError::Internal(e.to_string()))?
            .map_err(|e| BlogError::ThumbnailGenerationFailed {
                file_name: file_name.clone(),
                reason: e.to_string(),
            })?;

        // 5. Write next to the target and rename into place, so a concurrent
        // upload of the same bytes never sees a half-written file.
        let parent = target_path
            .parent()
            .ok_or_else(|| BlogError::Internal("thumbnail path has no parent".into()))?;
        fs::create_dir_all(parent)
            .await
            .map_err(|e| BlogError::Internal(e.to_string()))?;
        let tmp_path = parent.join(format!(".{}.{}.tmp", stored_name, Uuid::now_v7()));
        fs::write(&tmp_path, &rendered)
            .await
            .map_err(|e| BlogError::Internal(e.to_string()))?;
        fs::rename(&tmp_path, &target_path)
            .await
            .map_err(|e| BlogError::Internal(e.to_string()))?;

        info!(thumb = %stored_name, size, crop, "thumbnail stored");
        Ok(stored_name)
    }

    async fn load_thumbnail(&self, stored_name: String) -> Option<Vec<u8>> {
        let path = self.get_sharded_path(&stored_name)?;
        match fs::read(&path).await {
            Ok(data) => Some(data),
            Err(e) => {
                debug!(thumb = %stored_name, error = %e, "thumbnail unreadable");
                None
            }
        }
    }
}

/// Decode, resize to `size` (filling and cropping when `crop`), and encode
/// back to the upload's own format.
fn render_thumbnail(
    data: &[u8],
    kind: ImageKind,
    size: u32,
    crop: bool,
) -> std::result::Result<Vec<u8>, image::ImageError> {
    let img = ImageReader::new(Cursor::new(data))
        .with_guessed_format()?
        .decode()?;

    let thumb = if crop {
        img.resize_to_fill(size, size, FilterType::Lanczos3)
    } else {
        img.thumbnail(size, size)
    };

    // JPEG has no alpha channel
    let (thumb, format) = match kind {
        ImageKind::Jpeg => (DynamicImage::ImageRgb8(thumb.to_rgb8()), ImageFormat::Jpeg),
        ImageKind::Png => (thumb, ImageFormat::Png),
        ImageKind::Gif => (DynamicImage::ImageRgba8(thumb.to_rgba8()), ImageFormat::Gif),
    };

    let mut out = Cursor::new(Vec::new());
    thumb.write_to(&mut out, format)?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};
    use tempfile::TempDir;

    fn png_bytes(width: u32, height: u32, shade: u8) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([shade, 100, 200]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn config(size: u32, crop: bool) -> SiteConfiguration {
        SiteConfiguration {
            thumb_size: size,
            thumb_crop: crop,
        }
    }

    fn create_test_store() -> (LocalThumbnailStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalThumbnailStore::for_database(temp_dir.path(), "blogdb");
        (store, temp_dir)
    }

    #[tokio::test]
    async fn identical_bytes_share_one_file() {
        let (store, dir) = create_test_store();
        let data = png_bytes(64, 32, 10);

        let first = store
            .save_thumbnail("a.png".into(), data.clone(), config(16, false))
            .await
            .unwrap();
        let second = store
            .save_thumbnail("renamed.png".into(), data, config(16, false))
            .await
            .unwrap();
        assert_eq!(first, second);
        assert!(first.ends_with(".png"));
        assert_eq!(first.len(), 64 + ".png".len());

        let path = store
            .root()
            .join(&first[0..2])
            .join(&first[2..4])
            .join(&first);
        assert!(path.exists());
        assert!(path.starts_with(dir.path().join("blogdb").join("galatea").join("blog")));
    }

    #[tokio::test]
    async fn fits_or_crops_to_configured_size() {
        let (store, _dir) = create_test_store();

        let fitted = store
            .save_thumbnail("wide.png".into(), png_bytes(64, 32, 1), config(16, false))
            .await
            .unwrap();
        let img = image::load_from_memory(&store.load_thumbnail(fitted).await.unwrap()).unwrap();
        assert_eq!(img.dimensions(), (16, 8));

        let cropped = store
            .save_thumbnail("wide.png".into(), png_bytes(64, 32, 2), config(16, true))
            .await
            .unwrap();
        let img = image::load_from_memory(&store.load_thumbnail(cropped).await.unwrap()).unwrap();
        assert_eq!(img.dimensions(), (16, 16));
    }

    #[tokio::test]
    async fn jpeg_uploads_stay_jpeg() {
        let (store, _dir) = create_test_store();
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 40, Rgb([1, 2, 3])))
            .write_to(&mut out, ImageFormat::Jpeg)
            .unwrap();

        let stored = store
            .save_thumbnail("photo.jpg".into(), out.into_inner(), config(20, false))
            .await
            .unwrap();
        assert!(stored.ends_with(".jpeg"));
        let data = store.load_thumbnail(stored).await.unwrap();
        assert_eq!(image::guess_format(&data).unwrap(), ImageFormat::Jpeg);
    }

    #[tokio::test]
    async fn rejects_non_images() {
        let (store, _dir) = create_test_store();
        let err = store
            .save_thumbnail("notes.txt".into(), b"hello".to_vec(), config(16, false))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BlogError::UnsupportedImageType { .. } | BlogError::UnknownMimeType { .. }
        ));
    }

    #[tokio::test]
    async fn corrupt_png_fails_generation() {
        let (store, dir) = create_test_store();
        let err = store
            .save_thumbnail("broken.png".into(), b"definitely not a png".to_vec(), config(16, false))
            .await
            .unwrap_err();
        assert!(matches!(err, BlogError::ThumbnailGenerationFailed { .. }));
        assert!(!dir.path().join("blogdb").exists());
    }

    #[tokio::test]
    async fn missing_file_reads_as_none() {
        let (store, _dir) = create_test_store();
        let stored = store
            .save_thumbnail("a.png".into(), png_bytes(8, 8, 3), config(4, false))
            .await
            .unwrap();
        let path = store.get_sharded_path(&stored).unwrap();
        std::fs::remove_file(path).unwrap();

        assert_eq!(store.load_thumbnail(stored).await, None);
        assert_eq!(store.load_thumbnail("x".into()).await, None);
    }

    #[tokio::test]
    async fn names_outside_the_store_are_not_read() {
        let (store, dir) = create_test_store();
        std::fs::write(dir.path().join("secret.png"), b"private").unwrap();

        for name in ["../../../secret.png", "aébc.png", "secret.png"] {
            assert_eq!(store.load_thumbnail(name.into()).await, None, "{}", name);
        }
    }
}
