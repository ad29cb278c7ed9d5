//! HEIC → JPEG normalisation.
//!
//! The generic backend cannot decode HEIC, so HEIC sources are converted to
//! JPEG first and the JPEG is what gets resized. The conversion quality comes
//! from `[heic] conversion_quality` and defaults to 100.
//!
//! With the `heic` feature, [`LibheifConverter`] does the work through
//! `libheif-rs`. Without it, [`UnavailableHeicConverter`] rejects every input
//! and HEIC requests end in the transcode-failure response.

use super::backend::BackendError;
use super::params::Quality;

/// Converts HEIC bytes to JPEG bytes.
pub trait HeicConverter: Send + Sync {
    fn convert(&self, data: &[u8], quality: Quality) -> Result<Vec<u8>, BackendError>;
}

/// Converter used when the crate is built without HEIC support.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableHeicConverter;

impl HeicConverter for UnavailableHeicConverter {
    fn convert(&self, _data: &[u8], _quality: Quality) -> Result<Vec<u8>, BackendError> {
        Err(BackendError::Heic(
            "this build does not include HEIC support (enable the `heic` feature)".to_string(),
        ))
    }
}

/// libheif-backed converter.
#[cfg(feature = "heic")]
#[derive(Debug, Clone, Copy, Default)]
pub struct LibheifConverter;

#[cfg(feature = "heic")]
impl HeicConverter for LibheifConverter {
    fn convert(&self, data: &[u8], quality: Quality) -> Result<Vec<u8>, BackendError> {
        use image::codecs::jpeg::JpegEncoder;
        use image::ImageReader;
        use std::io::Cursor;
        use std::sync::Once;

        static HOOKS: Once = Once::new();
        HOOKS.call_once(|| {
            libheif_rs::integration::image::register_all_decoding_hooks();
        });

        let img = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| BackendError::Heic(format!("failed to read HEIC container: {e}")))?
            .decode()
            .map_err(|e| BackendError::Heic(e.to_string()))?;

        let mut jpeg = Cursor::new(Vec::new());
        let encoder = JpegEncoder::new_with_quality(&mut jpeg, quality.value() as u8);
        img.to_rgb8()
            .write_with_encoder(encoder)
            .map_err(|e| BackendError::Heic(format!("JPEG encode failed: {e}")))?;
        let jpeg = jpeg.into_inner();

        tracing::debug!(
            input_size = data.len(),
            output_size = jpeg.len(),
            "HEIC to JPEG conversion succeeded"
        );
        Ok(jpeg)
    }
}

/// The converter compiled into this build.
pub fn default_heic_converter() -> Box<dyn HeicConverter> {
    #[cfg(feature = "heic")]
    {
        Box::new(LibheifConverter)
    }
    #[cfg(not(feature = "heic"))]
    {
        Box::new(UnavailableHeicConverter)
    }
}
