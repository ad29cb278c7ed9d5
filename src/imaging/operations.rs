//! High-level image operations.
//!
//! These functions combine calculations with backend execution: normalise the
//! source encoding, read metadata, plan the output size, then resize + encode.

use super::backend::{BackendError, ImageBackend, ImageMetadata};
use super::calculations::calculate_fit_inside;
use super::heic::HeicConverter;
use super::params::{OutputFormat, Quality, ResizeParams};
use crate::request::TransformSpec;
use bytes::Bytes;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Output of a successful transcode.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
}

/// Convert HEIC sources to JPEG; pass every other source through untouched.
pub fn normalize_source(
    heic: &dyn HeicConverter,
    source: Bytes,
    spec: &TransformSpec,
    heic_quality: Quality,
) -> Result<Bytes> {
    if !spec.source_extension.is_heic() {
        return Ok(source);
    }
    let jpeg = heic.convert(&source, heic_quality)?;
    Ok(Bytes::from(jpeg))
}

/// Plan a resize without executing it.
pub fn plan_resize(source: Bytes, metadata: &ImageMetadata, spec: &TransformSpec) -> ResizeParams {
    let (width, height) = calculate_fit_inside(
        metadata.dimensions.as_tuple(),
        (spec.target_width, spec.target_height),
    );

    ResizeParams {
        source,
        width,
        height,
        format: spec.target_format,
        quality: spec.quality,
    }
}

/// Run the full transcode: normalise → metadata → fit-inside resize → encode.
pub fn transcode(
    backend: &dyn ImageBackend,
    heic: &dyn HeicConverter,
    source: Bytes,
    spec: &TransformSpec,
    heic_quality: Quality,
) -> Result<EncodedImage> {
    let source = normalize_source(heic, source, spec, heic_quality)?;
    let metadata = backend.read_metadata(&source)?;

    let params = plan_resize(source, &metadata, spec);
    tracing::debug!(
        key = %spec.object_key,
        source_width = metadata.dimensions.width,
        source_height = metadata.dimensions.height,
        source_format = ?metadata.format,
        icc_profile = metadata.has_icc_profile,
        width = params.width,
        height = params.height,
        format = %params.format,
        "resizing image"
    );

    let bytes = backend.resize(&params)?;
    Ok(EncodedImage {
        bytes,
        format: params.format,
        width: params.width,
        height: params.height,
    })
}
