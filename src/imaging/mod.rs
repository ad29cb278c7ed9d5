//! Image transcoding: decode, fit-inside resize, re-encode.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **HEIC → JPEG** | `libheif-rs` (behind the `heic` feature) |
//! | **Metadata** | `image::ImageReader` + `ImageDecoder` |
//! | **Resize** | Lanczos3 via `DynamicImage::resize_exact` |
//! | **Encode** | `image` codecs: JPEG, PNG, WebP, GIF, TIFF, AVIF |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **HEIC**: [`HeicConverter`] trait + the converter compiled into this build
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod heic;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend, ImageMetadata};
pub use calculations::calculate_fit_inside;
pub use heic::{HeicConverter, UnavailableHeicConverter, default_heic_converter};
pub use operations::{EncodedImage, plan_resize, transcode};
pub use params::{OutputFormat, Quality, ResizeParams};
pub use rust_backend::RustBackend;

#[cfg(feature = "heic")]
pub use heic::LibheifConverter;
