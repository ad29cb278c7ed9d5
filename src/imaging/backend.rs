//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations the transcoder needs
//! from a codec: read metadata from encoded bytes, and resize + re-encode.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Everything works on in-memory buffers; nothing touches the disk.

use super::params::ResizeParams;
use image::ImageFormat;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("HEIC conversion failed: {0}")]
    Heic(String),
    #[error("processing failed: {0}")]
    ProcessingFailed(String),
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn as_tuple(self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Metadata read from an encoded image before resizing.
///
/// Reading it is also the decodability check: a buffer that yields metadata
/// is one the backend can resize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMetadata {
    pub dimensions: Dimensions,
    /// Container format detected from the magic bytes.
    pub format: Option<ImageFormat>,
    /// Whether the source carries an embedded ICC colour profile.
    pub has_icc_profile: bool,
}

/// Trait for image codec backends.
///
/// `Send + Sync` so one backend can be shared by every invocation and moved
/// into blocking worker tasks.
pub trait ImageBackend: Send + Sync {
    /// Read dimensions and colour metadata from encoded bytes.
    fn read_metadata(&self, data: &[u8]) -> Result<ImageMetadata, BackendError>;

    /// Decode, resize to exactly `params.width` x `params.height`, and encode.
    fn resize(&self, params: &ResizeParams) -> Result<Vec<u8>, BackendError>;
}
