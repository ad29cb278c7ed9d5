//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Metadata | `image::ImageReader` + `ImageDecoder::{dimensions, icc_profile}` |
//! | Decode (JPEG, PNG, WebP, GIF, TIFF) | `ImageReader::with_guessed_format` + `decode` |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Encode → JPEG | `JpegEncoder::new_with_quality` (RGB only) |
//! | Encode → PNG / GIF / TIFF | `DynamicImage::write_to` |
//! | Encode → WebP | `webp::Encoder::from_rgba` (lossy, libwebp) |
//! | Encode → AVIF | `AvifEncoder` (rav1e, speed 6) |

use super::backend::{BackendError, Dimensions, ImageBackend, ImageMetadata};
use super::params::{OutputFormat, Quality, ResizeParams};
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageDecoder, ImageReader};
use std::io::Cursor;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

/// Decode an in-memory image, guessing the format from its magic bytes.
fn load_image(data: &[u8]) -> Result<DynamicImage, BackendError> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| BackendError::Decode(format!("failed to guess format: {e}")))?
        .decode()
        .map_err(|e| BackendError::Decode(e.to_string()))
}

/// Encode `img` in `format`. `quality` is only consulted by lossy encoders.
fn encode_image(
    img: &DynamicImage,
    format: OutputFormat,
    quality: Option<Quality>,
) -> Result<Vec<u8>, BackendError> {
    let mut buf = Cursor::new(Vec::new());
    let encode_err = |e: image::ImageError| BackendError::Encode(format!("{format}: {e}"));

    match format {
        OutputFormat::Jpeg => {
            let q = quality.map_or(80, Quality::value) as u8;
            let encoder = JpegEncoder::new_with_quality(&mut buf, q);
            img.to_rgb8().write_with_encoder(encoder).map_err(encode_err)?;
        }
        OutputFormat::WebP => {
            let q = quality.map_or(80, Quality::value) as f32;
            let rgba = img.to_rgba8();
            let encoded = webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height())
                .encode(q);
            return Ok(encoded.to_vec());
        }
        OutputFormat::Avif => {
            let q = quality.map_or(50, Quality::value) as u8;
            let encoder = AvifEncoder::new_with_speed_quality(&mut buf, 6, q);
            img.to_rgba8().write_with_encoder(encoder).map_err(encode_err)?;
        }
        OutputFormat::Gif => {
            DynamicImage::ImageRgba8(img.to_rgba8())
                .write_to(&mut buf, format.image_format())
                .map_err(encode_err)?;
        }
        OutputFormat::Png | OutputFormat::Tiff => {
            img.write_to(&mut buf, format.image_format())
                .map_err(encode_err)?;
        }
    }

    Ok(buf.into_inner())
}

impl ImageBackend for RustBackend {
    fn read_metadata(&self, data: &[u8]) -> Result<ImageMetadata, BackendError> {
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| BackendError::Decode(format!("failed to guess format: {e}")))?;
        let format = reader.format();
        let mut decoder = reader
            .into_decoder()
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        let (width, height) = decoder.dimensions();
        let has_icc_profile = decoder.icc_profile().ok().flatten().is_some();

        Ok(ImageMetadata {
            dimensions: Dimensions { width, height },
            format,
            has_icc_profile,
        })
    }

    fn resize(&self, params: &ResizeParams) -> Result<Vec<u8>, BackendError> {
        if params.width == 0 || params.height == 0 {
            return Err(BackendError::ProcessingFailed(format!(
                "invalid output size {}x{}",
                params.width, params.height
            )));
        }

        let img = load_image(&params.source)?;
        let resized = if img.width() == params.width && img.height() == params.height {
            img
        } else {
            img.resize_exact(params.width, params.height, FilterType::Lanczos3)
        };

        encode_image(&resized, params.format, params.effective_quality())
    }
}
