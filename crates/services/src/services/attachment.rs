//! Turns user-selected files into the inline data URIs stored on a project.
//!
//! Raster images are decoded, scaled down to a maximum width and re-encoded
//! as JPEG. Everything else (PDFs, documents, unknown formats) is embedded
//! byte-for-byte with its MIME type.

use std::{fmt, path::Path};

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use image::{
    DynamicImage, ImageError, RgbImage, codecs::jpeg::JpegEncoder, imageops::FilterType,
};
use thiserror::Error;
use tokio::task::JoinError;

use super::config::AttachmentConfig;

pub const DEFAULT_MAX_WIDTH: u32 = 1200;
pub const DEFAULT_QUALITY: f32 = 0.85;

const FALLBACK_MIME: &str = "application/octet-stream";
const JPEG_MIME: &str = "image/jpeg";

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Failed to decode image: {0}")]
    Decode(#[source] ImageError),
    #[error("Failed to encode image: {0}")]
    Encode(#[source] ImageError),
    #[error("Image worker failed: {0}")]
    Join(#[from] JoinError),
    #[error("Invalid data URI: {0}")]
    InvalidDataUri(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressionOptions {
    pub max_width: u32,
    /// JPEG quality in `(0, 1]`.
    pub quality: f32,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
            quality: DEFAULT_QUALITY,
        }
    }
}

impl From<&AttachmentConfig> for CompressionOptions {
    fn from(config: &AttachmentConfig) -> Self {
        Self {
            max_width: config.max_width,
            quality: config.quality,
        }
    }
}

impl CompressionOptions {
    /// Encoder quality on the 1..=100 scale.
    pub fn quality_percent(&self) -> u8 {
        if !self.quality.is_finite() {
            return (DEFAULT_QUALITY * 100.0).round() as u8;
        }
        (self.quality * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

/// A selected file held in memory.
#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub bytes: Vec<u8>,
    pub file_name: Option<String>,
    /// MIME type declared by whoever picked the file, if any.
    pub mime_type: Option<String>,
}

impl Upload {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            ..Default::default()
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, AttachmentError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        Ok(Self {
            bytes,
            file_name: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
            mime_type: None,
        })
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    fn classify(&self) -> Classification {
        if let Some(declared) = self.mime_type.as_deref().filter(|m| !m.trim().is_empty()) {
            return Classification::from_mime(declared.trim().to_ascii_lowercase());
        }

        if let Some(guessed) = self
            .file_name
            .as_deref()
            .and_then(|name| mime_guess::from_path(name).first())
        {
            return Classification::from_mime(guessed.essence_str().to_string());
        }

        if image::guess_format(&self.bytes).is_ok() {
            Classification::Raster
        } else {
            Classification::Document(FALLBACK_MIME.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Classification {
    Raster,
    Document(String),
}

impl Classification {
    fn from_mime(mime: String) -> Self {
        // Vector images cannot be decoded into pixels here.
        if mime.starts_with("image/") && mime != "image/svg+xml" {
            Self::Raster
        } else {
            Self::Document(mime)
        }
    }
}

/// Target size for an image of `width`×`height`: never wider than `max_width`,
/// aspect ratio kept, never upscaled.
pub fn target_dimensions(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    let max_width = max_width.max(1);
    if width <= max_width {
        return (width, height);
    }
    let scaled = (f64::from(height) * f64::from(max_width) / f64::from(width)).round();
    (max_width, (scaled as u32).max(1))
}

/// Normalizes an uploaded file into a data URI.
pub async fn normalize(
    upload: Upload,
    options: CompressionOptions,
) -> Result<String, AttachmentError> {
    match upload.classify() {
        Classification::Document(mime) => {
            tracing::debug!(
                "Embedding {} ({} bytes) as {mime}",
                upload.file_name.as_deref().unwrap_or("upload"),
                upload.bytes.len()
            );
            Ok(DataUri::encode(&mime, &upload.bytes))
        }
        Classification::Raster => {
            let bytes = upload.bytes;
            tokio::task::spawn_blocking(move || compress_raster(&bytes, options)).await?
        }
    }
}

/// Reads `path` and normalizes it.
pub async fn normalize_file(
    path: impl AsRef<Path>,
    options: CompressionOptions,
) -> Result<String, AttachmentError> {
    normalize(Upload::from_path(path).await?, options).await
}

fn compress_raster(bytes: &[u8], options: CompressionOptions) -> Result<String, AttachmentError> {
    let decoded = image::load_from_memory(bytes).map_err(AttachmentError::Decode)?;
    let (width, height) = target_dimensions(decoded.width(), decoded.height(), options.max_width);
    let resized = if (width, height) == (decoded.width(), decoded.height()) {
        decoded
    } else {
        decoded.resize_exact(width, height, FilterType::Triangle)
    };

    let surface = flatten_opaque(&resized);
    let mut encoded = Vec::new();
    JpegEncoder::new_with_quality(&mut encoded, options.quality_percent())
        .encode_image(&surface)
        .map_err(AttachmentError::Encode)?;

    tracing::debug!(
        "Compressed image to {width}x{height} ({} -> {} bytes)",
        bytes.len(),
        encoded.len()
    );
    Ok(DataUri::encode(JPEG_MIME, &encoded))
}

/// Composites onto an opaque black surface, which is what an RGB canvas
/// does with transparent pixels.
fn flatten_opaque(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let blend = |channel: u8| ((u16::from(channel) * u16::from(a) + 127) / 255) as u8;
        image::Rgb([blend(r), blend(g), blend(b)])
    })
}

/// A parsed `data:<mime>;base64,<payload>` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime: String,
    pub data: Vec<u8>,
}

impl DataUri {
    pub fn encode(mime: &str, data: &[u8]) -> String {
        format!("data:{mime};base64,{}", BASE64.encode(data))
    }

    pub fn parse(input: &str) -> Result<Self, AttachmentError> {
        let invalid = || AttachmentError::InvalidDataUri(truncate(input));
        let rest = input.strip_prefix("data:").ok_or_else(invalid)?;
        let (header, payload) = rest.split_once(',').ok_or_else(invalid)?;
        let mime = header.strip_suffix(";base64").ok_or_else(invalid)?;
        let data = BASE64.decode(payload.trim()).map_err(|_| invalid())?;
        Ok(Self {
            mime: if mime.is_empty() {
                FALLBACK_MIME.to_string()
            } else {
                mime.to_string()
            },
            data,
        })
    }
}

impl fmt::Display for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Self::encode(&self.mime, &self.data))
    }
}

fn truncate(input: &str) -> String {
    input.chars().take(32).collect()
}
