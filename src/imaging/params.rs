//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between [`operations`](super::operations) (which decides the
//! output size and format for a request) and the [`backend`](super::backend)
//! (which does the pixel work). Keeping them plain data lets the pipeline be
//! tested against a recording mock backend.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100). Clamped on construction.
//! - [`OutputFormat`]: Encodings the backend can produce, with their MIME types.
//! - [`ResizeParams`]: Full specification for one resize + encode: source bytes,
//!   output dimensions, output format, optional quality.

use bytes::Bytes;
use image::ImageFormat;
use std::fmt;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

/// Output encodings.
///
/// Names follow the `image/{name}` MIME subtype, so `Content-Type` is derived
/// directly from [`OutputFormat::name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
    Gif,
    Tiff,
    Avif,
}

impl OutputFormat {
    /// Parse a canonical format name, case-insensitively.
    ///
    /// `jpg` and `tif` are accepted as aliases. HEIC is *not* an output format;
    /// callers normalise it to JPEG before reaching this point.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::WebP),
            "gif" => Some(Self::Gif),
            "tiff" | "tif" => Some(Self::Tiff),
            "avif" => Some(Self::Avif),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Gif => "gif",
            Self::Tiff => "tiff",
            Self::Avif => "avif",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
            Self::Tiff => "image/tiff",
            Self::Avif => "image/avif",
        }
    }

    /// Quality used when the request does not set one.
    ///
    /// Only meaningful for lossy encoders; `None` means the encoder takes no
    /// quality setting at all.
    pub fn default_quality(self) -> Option<Quality> {
        match self {
            Self::Jpeg | Self::WebP => Some(Quality(80)),
            Self::Avif => Some(Quality(50)),
            Self::Png | Self::Gif | Self::Tiff => None,
        }
    }

    pub fn image_format(self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
            Self::WebP => ImageFormat::WebP,
            Self::Gif => ImageFormat::Gif,
            Self::Tiff => ImageFormat::Tiff,
            Self::Avif => ImageFormat::Avif,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parameters for a resize + encode operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeParams {
    /// Decodable source bytes (already HEIC-normalised).
    pub source: Bytes,
    /// Final output dimensions.
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    /// `None` falls back to [`OutputFormat::default_quality`].
    pub quality: Option<Quality>,
}

impl ResizeParams {
    /// Quality the encoder will actually use.
    pub fn effective_quality(&self) -> Option<Quality> {
        self.quality.or_else(|| self.format.default_quality())
    }
}
