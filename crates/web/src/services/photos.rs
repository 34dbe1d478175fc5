//! Store photo pipeline.
//!
//! Uploaded photos are decoded, shrunk to at most [`PHOTO_WIDTH`] pixels wide,
//! re-encoded in the format they were declared as, and written to the uploads
//! directory under a random filename. The filename is what the store row keeps.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, imageops::FilterType};
use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;

/// Maximum stored photo width in pixels.
pub const PHOTO_WIDTH: u32 = 800;

/// A file part taken from a multipart form.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    /// Declared `Content-Type` of the part.
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Errors that can occur while ingesting a photo.
#[derive(Debug, Error)]
pub enum PhotoError {
    /// Declared type isn't an image, or no codec handles it.
    #[error("That filetype isn't allowed: {0}")]
    UnsupportedMediaType(String),

    /// Bytes don't decode as the declared format.
    #[error("could not decode image: {0}")]
    Decode(#[source] image::ImageError),

    /// Re-encoding failed.
    #[error("could not encode image: {0}")]
    Encode(#[source] image::ImageError),

    /// Writing the file failed.
    #[error("could not write photo: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking resize task panicked or was cancelled.
    #[error("photo task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Writes processed photos into a directory.
#[derive(Debug, Clone)]
pub struct PhotoStore {
    dir: PathBuf,
}

impl PhotoStore {
    /// Create a photo store rooted at `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory photos are written to.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Process an optional upload and return the stored filename.
    ///
    /// A missing or empty upload yields `Ok(None)` so edits without a new
    /// photo keep the old one.
    ///
    /// # Errors
    ///
    /// Returns `PhotoError::UnsupportedMediaType` if the declared type isn't
    /// an image format this build can read and write.
    /// Returns `PhotoError::Decode` if the bytes aren't a valid image.
    /// Returns `PhotoError::Io` if the file can't be written.
    #[instrument(skip_all)]
    pub async fn ingest(&self, upload: Option<PhotoUpload>) -> Result<Option<String>, PhotoError> {
        let Some(upload) = upload.filter(|u| !u.bytes.is_empty()) else {
            return Ok(None);
        };

        let format = image_format(&upload.content_type)?;
        let extension = format
            .extensions_str()
            .first()
            .copied()
            .ok_or_else(|| PhotoError::UnsupportedMediaType(upload.content_type.clone()))?;
        let filename = format!("{}.{extension}", Uuid::new_v4());

        let encoded =
            tokio::task::spawn_blocking(move || resize_photo(&upload.bytes, format)).await??;

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(&filename), &encoded).await?;

        info!(filename = %filename, bytes = encoded.len(), "Stored photo");
        Ok(Some(filename))
    }
}

/// Map a declared mime type onto a format this build can both read and write.
fn image_format(content_type: &str) -> Result<ImageFormat, PhotoError> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if !mime.starts_with("image/") {
        return Err(PhotoError::UnsupportedMediaType(content_type.to_owned()));
    }

    ImageFormat::from_mime_type(&mime)
        .filter(|f| f.reading_enabled() && f.writing_enabled())
        .ok_or_else(|| PhotoError::UnsupportedMediaType(content_type.to_owned()))
}

/// Decode, shrink to [`PHOTO_WIDTH`] if wider, and re-encode.
fn resize_photo(bytes: &[u8], format: ImageFormat) -> Result<Vec<u8>, PhotoError> {
    let mut img = image::load_from_memory_with_format(bytes, format).map_err(PhotoError::Decode)?;

    if img.width() > PHOTO_WIDTH {
        img = img.resize(PHOTO_WIDTH, u32::MAX, FilterType::Triangle);
    }

    if format == ImageFormat::Jpeg {
        img = DynamicImage::ImageRgb8(img.to_rgb8());
    }

    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), format)
        .map_err(PhotoError::Encode)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = ImageBuffer::from_pixel(width, height, Rgb([200u8, 120, 40]));
        let mut buffer = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buffer), format)
            .expect("encode fixture");
        buffer
    }

    fn upload(content_type: &str, bytes: Vec<u8>) -> Option<PhotoUpload> {
        Some(PhotoUpload {
            content_type: content_type.to_owned(),
            bytes,
        })
    }

    #[tokio::test]
    async fn test_wide_jpeg_is_resized_to_800() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = PhotoStore::new(dir.path());

        let filename = store
            .ingest(upload("image/jpeg", encoded(1600, 1200, ImageFormat::Jpeg)))
            .await
            .expect("ingest")
            .expect("filename");

        assert!(filename.ends_with(".jpg"));
        let dims = image::image_dimensions(dir.path().join(&filename)).expect("dimensions");
        assert_eq!(dims, (800, 600));
    }

    #[tokio::test]
    async fn test_narrow_png_is_not_upscaled() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = PhotoStore::new(dir.path());

        let filename = store
            .ingest(upload("image/png", encoded(400, 300, ImageFormat::Png)))
            .await
            .expect("ingest")
            .expect("filename");

        assert!(filename.ends_with(".png"));
        let dims = image::image_dimensions(dir.path().join(&filename)).expect("dimensions");
        assert_eq!(dims, (400, 300));
    }

    #[tokio::test]
    async fn test_text_plain_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = PhotoStore::new(dir.path());

        let err = store
            .ingest(upload("text/plain", b"hello".to_vec()))
            .await
            .expect_err("should reject");
        assert!(matches!(err, PhotoError::UnsupportedMediaType(_)));
        assert_eq!(std::fs::read_dir(dir.path()).expect("read dir").count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_image_type_is_rejected() {
        let store = PhotoStore::new(tempfile::tempdir().expect("tempdir").path());
        let err = store
            .ingest(upload("image/x-made-up", vec![1, 2, 3]))
            .await
            .expect_err("should reject");
        assert!(matches!(err, PhotoError::UnsupportedMediaType(_)));
    }

    #[tokio::test]
    async fn test_missing_or_empty_upload_passes_through() {
        let store = PhotoStore::new(tempfile::tempdir().expect("tempdir").path());
        assert_eq!(store.ingest(None).await.expect("none"), None);
        assert_eq!(
            store
                .ingest(upload("application/octet-stream", Vec::new()))
                .await
                .expect("empty"),
            None
        );
    }

    #[tokio::test]
    async fn test_corrupt_bytes_fail_to_decode() {
        let store = PhotoStore::new(tempfile::tempdir().expect("tempdir").path());
        let err = store
            .ingest(upload("image/jpeg", b"definitely not a jpeg".to_vec()))
            .await
            .expect_err("should fail");
        assert!(matches!(err, PhotoError::Decode(_)));
    }

    #[test]
    fn test_image_format_ignores_parameters_and_case() {
        assert_eq!(
            image_format("IMAGE/PNG; charset=binary").expect("png"),
            ImageFormat::Png
        );
    }
}
