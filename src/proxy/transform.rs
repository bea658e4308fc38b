//! Resize and re-encode.
//!
//! The proxy talks to an [`ImageBackend`]. Which backend runs is decided once
//! from configuration: [`ResizingBackend`] when transforms are enabled,
//! [`PassthroughBackend`] otherwise. Any backend error is recoverable: the
//! handler serves the original upstream bytes instead.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageError, ImageReader, Limits};
use thiserror::Error;

/// Largest source width or height the decoder accepts.
const MAX_SOURCE_SIDE: u32 = 12_000;

/// Re-encoded output.
#[derive(Debug, Clone)]
pub struct TransformedImage {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("transforms are disabled")]
    Unsupported,

    #[error("decode failed: {0}")]
    Decode(#[source] ImageError),

    #[error("encode failed: {0}")]
    Encode(#[source] ImageError),
}

/// Image processing capability used by the proxy.
pub trait ImageBackend: Send + Sync {
    /// Fit `bytes` into a `max_dim` square (never upscaling) and re-encode.
    fn transform(&self, bytes: &[u8], max_dim: u32) -> Result<TransformedImage, TransformError>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Select the backend for the current configuration.
pub fn backend_for(enabled: bool, quality: u8) -> Box<dyn ImageBackend> {
    if enabled {
        Box::new(ResizingBackend::new(quality))
    } else {
        Box::new(PassthroughBackend)
    }
}

/// Output size for a `width`×`height` source bounded by `max_dim`.
///
/// Uniform scale `min(1, max_dim / longest side)`, each side rounded and at
/// least 1px.
pub fn scaled_dimensions(width: u32, height: u32, max_dim: u32) -> (u32, u32) {
    let longest = width.max(height).max(1) as f64;
    let scale = (max_dim as f64 / longest).min(1.0);
    let scaled = |side: u32| ((side as f64 * scale).round() as u32).max(1);
    (scaled(width), scaled(height))
}

/// Declines every transform.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughBackend;

impl ImageBackend for PassthroughBackend {
    fn transform(&self, _bytes: &[u8], _max_dim: u32) -> Result<TransformedImage, TransformError> {
        Err(TransformError::Unsupported)
    }

    fn name(&self) -> &'static str {
        "passthrough"
    }
}

/// Pure-Rust backend on the `image` crate.
///
/// Opaque images become JPEG at the configured quality. Images with an alpha
/// channel become lossless WebP so transparency survives.
#[derive(Debug, Clone, Copy)]
pub struct ResizingBackend {
    quality: u8,
}

impl ResizingBackend {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, TransformError> {
        let mut reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| TransformError::Decode(ImageError::IoError(e)))?;

        let mut limits = Limits::default();
        limits.max_image_width = Some(MAX_SOURCE_SIDE);
        limits.max_image_height = Some(MAX_SOURCE_SIDE);
        reader.limits(limits);

        reader.decode().map_err(TransformError::Decode)
    }

    fn encode(&self, image: &DynamicImage) -> Result<(Vec<u8>, &'static str), TransformError> {
        let (width, height) = (image.width(), image.height());
        let mut out = Vec::new();

        if image.color().has_alpha() {
            let rgba = image.to_rgba8();
            WebPEncoder::new_lossless(&mut out)
                .write_image(rgba.as_raw(), width, height, ExtendedColorType::Rgba8)
                .map_err(TransformError::Encode)?;
            Ok((out, "image/webp"))
        } else {
            let rgb = image.to_rgb8();
            JpegEncoder::new_with_quality(&mut out, self.quality)
                .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
                .map_err(TransformError::Encode)?;
            Ok((out, "image/jpeg"))
        }
    }
}

impl ImageBackend for ResizingBackend {
    fn transform(&self, bytes: &[u8], max_dim: u32) -> Result<TransformedImage, TransformError> {
        let source = self.decode(bytes)?;
        let (width, height) = scaled_dimensions(source.width(), source.height(), max_dim);

        let resized = if (width, height) == (source.width(), source.height()) {
            source
        } else {
            source.resize_exact(width, height, FilterType::Lanczos3)
        };

        let (bytes, content_type) = self.encode(&resized)?;
        if bytes.is_empty() {
            return Err(TransformError::Encode(ImageError::IoError(std::io::Error::other(
                "encoder produced no output",
            ))));
        }

        Ok(TransformedImage {
            bytes,
            content_type,
            width,
            height,
        })
    }

    fn name(&self) -> &'static str {
        "image"
    }
}
