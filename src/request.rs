//! Request interpretation.
//!
//! Turns the request URI and raw query string into a validated
//! [`TransformSpec`], a pass-through decision, or a [`ValidationError`].
//!
//! ## Query parameters
//!
//! | Key | Meaning | Missing / invalid |
//! |-----|---------|-------------------|
//! | `w` | Target width bound | `limits.max_width` |
//! | `h` | Target height bound | `limits.max_height` |
//! | `f` | Output format override | Source extension |
//! | `q` | Encoder quality (1-100) | Codec default |
//!
//! At least one of `w` / `h` must carry a non-empty value, otherwise the
//! request is a pass-through and the origin response is served untouched.
//! A value that is present but not a positive integer (`w=abc`, `w=0`) still
//! triggers a transform; the configured maximum is used in its place.
//!
//! ## Object key
//!
//! The key is the URI path without its leading `/`, percent-decoded. The
//! extension is everything after the last `.` and must be on a fixed,
//! case-sensitive allow-list.

use crate::config::LimitsConfig;
use crate::imaging::{OutputFormat, Quality};
use std::fmt;
use std::num::IntErrorKind;
use thiserror::Error;

/// Source extensions accepted for transformation. Case-sensitive.
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "webp", "heic", "HEIC", "JPG", "JPEG", "PNG",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{extension} is not allowed")]
    UnsupportedExtension { extension: String },
    #[error("{uri} has no file extension")]
    MissingExtension { uri: String },
    #[error("{format} is not a supported output format")]
    UnsupportedFormat { format: String },
}

/// A source file extension that passed the allow-list. Case is preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceExtension(String);

impl SourceExtension {
    pub fn parse(extension: &str) -> Option<Self> {
        ALLOWED_EXTENSIONS
            .contains(&extension)
            .then(|| Self(extension.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_heic(&self) -> bool {
        self.0.eq_ignore_ascii_case("heic")
    }
}

impl fmt::Display for SourceExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The validated, resolved parameters for one transcode.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformSpec {
    /// Percent-decoded storage key, e.g. `photos/cat.png`.
    pub object_key: String,
    pub source_extension: SourceExtension,
    pub target_width: u32,
    pub target_height: u32,
    pub target_format: OutputFormat,
    /// `None` means the codec default for `target_format`.
    pub quality: Option<Quality>,
}

/// What the pipeline should do with a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Interpretation {
    /// Neither `w` nor `h` was supplied; serve the origin response as-is.
    PassThrough,
    Transform(TransformSpec),
}

/// Raw query values. Empty values count as absent; repeated keys keep the
/// first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pub w: Option<String>,
    pub h: Option<String>,
    pub f: Option<String>,
    pub q: Option<String>,
}

impl QueryParams {
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut params = Self::default();

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let slot = match key.as_ref() {
                "w" => &mut params.w,
                "h" => &mut params.h,
                "f" => &mut params.f,
                "q" => &mut params.q,
                _ => continue,
            };
            if slot.is_none() && !value.is_empty() {
                *slot = Some(value.into_owned());
            }
        }
        params
    }

    /// Whether the request asks for a transform at all.
    pub fn requests_resize(&self) -> bool {
        self.w.is_some() || self.h.is_some()
    }
}

/// Parse a value as a positive integer. Numbers too large for `u32`
/// saturate rather than counting as non-numeric.
fn parse_positive(value: Option<&str>) -> Option<u32> {
    let parsed = match value?.trim().parse::<u32>() {
        Ok(n) => n,
        Err(e) if *e.kind() == IntErrorKind::PosOverflow => u32::MAX,
        Err(_) => return None,
    };
    (parsed > 0).then_some(parsed)
}

/// Split a request URI into `(name, extension)` on the last `.` of its final
/// path segment.
///
/// The leading `/` is dropped from the name. Returns `None` when the final
/// segment has no `.`.
pub fn split_object_path(uri: &str) -> Option<(&str, &str)> {
    let path = uri.strip_prefix('/').unwrap_or(uri);
    let segment_start = path.rfind('/').map_or(0, |i| i + 1);
    let dot = segment_start + path[segment_start..].rfind('.')?;
    Some((&path[..dot], &path[dot + 1..]))
}

/// Percent-decode a storage key. Invalid UTF-8 is replaced, never rejected.
pub fn decode_object_key(raw: &str) -> String {
    String::from_utf8_lossy(&urlencoding::decode_binary(raw.as_bytes())).into_owned()
}

/// Resolve the output format from the `f` override or the source extension.
///
/// `jpg` and `HEIC` (in any case) are normalised to `jpeg` before lookup.
pub fn resolve_target_format(
    requested: Option<&str>,
    source_extension: &str,
) -> Result<OutputFormat, ValidationError> {
    let raw = requested.unwrap_or(source_extension);
    let normalized = if raw == "jpg" || raw.eq_ignore_ascii_case("heic") {
        "jpeg"
    } else {
        raw
    };

    OutputFormat::from_name(normalized).ok_or_else(|| ValidationError::UnsupportedFormat {
        format: raw.to_string(),
    })
}

/// Interpret a request.
///
/// The pass-through check runs first, so an unsupported object (for example
/// `/favicon.ico`) requested without `w` / `h` is still served verbatim.
pub fn interpret(
    uri: &str,
    query: &str,
    limits: &LimitsConfig,
) -> Result<Interpretation, ValidationError> {
    let params = QueryParams::parse(query);
    if !params.requests_resize() {
        return Ok(Interpretation::PassThrough);
    }

    let (name, extension) =
        split_object_path(uri).ok_or_else(|| ValidationError::MissingExtension {
            uri: uri.to_string(),
        })?;
    let source_extension =
        SourceExtension::parse(extension).ok_or_else(|| ValidationError::UnsupportedExtension {
            extension: extension.to_string(),
        })?;

    let target_format = resolve_target_format(params.f.as_deref(), extension)?;
    let spec = TransformSpec {
        object_key: decode_object_key(&format!("{name}.{extension}")),
        source_extension,
        target_width: parse_positive(params.w.as_deref()).unwrap_or(limits.max_width),
        target_height: parse_positive(params.h.as_deref()).unwrap_or(limits.max_height),
        target_format,
        quality: parse_positive(params.q.as_deref()).map(Quality::new),
    };

    tracing::info!(
        params = ?params,
        name = %spec.object_key,
        width = spec.target_width,
        height = spec.target_height,
        format = %spec.target_format,
        quality = spec.quality.map(Quality::value),
        "interpreted transform request"
    );
    Ok(Interpretation::Transform(spec))
}
