//! Response building.
//!
//! Maps the pipeline outcome onto the origin's [`EdgeResponse`]:
//!
//! | Outcome | Status | Content-Type | Body |
//! |---|---|---|---|
//! | Pass-through | unchanged | unchanged | unchanged |
//! | Transformed | 200 | `image/{format}` | base64 image bytes |
//! | Error | `config.responses.*` | `text/plain` | diagnostic message |

use crate::config::ResponsesConfig;
use crate::event::{BodyEncoding, EdgeResponse};
use crate::imaging::EncodedImage;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http::StatusCode;

/// Error classes distinguished in the HTTP response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    UnsupportedExtension,
    NotFound,
    TranscodeFailure,
    Cancelled,
}

impl ErrorClass {
    pub fn status(self, responses: &ResponsesConfig) -> u16 {
        match self {
            ErrorClass::UnsupportedExtension => responses.unsupported_extension,
            ErrorClass::NotFound => responses.not_found,
            ErrorClass::TranscodeFailure => responses.transcode_failure,
            ErrorClass::Cancelled => responses.cancelled,
        }
    }
}

/// What the pipeline produced for one request.
#[derive(Debug)]
pub enum Outcome {
    PassThrough,
    Transformed(EncodedImage),
    Failed { class: ErrorClass, message: String },
}

/// Apply `outcome` to the origin response.
pub fn build(outcome: Outcome, response: EdgeResponse, responses: &ResponsesConfig) -> EdgeResponse {
    match outcome {
        Outcome::PassThrough => response,
        Outcome::Transformed(image) => success(response, &image),
        Outcome::Failed { class, message } => failure(response, class.status(responses), message),
    }
}

fn success(mut response: EdgeResponse, image: &EncodedImage) -> EdgeResponse {
    response.status = StatusCode::OK.as_str().to_string();
    response.status_description = Some("OK".to_string());
    response.set_header("Content-Type", image.format.content_type());
    response.body = Some(STANDARD.encode(&image.bytes));
    response.body_encoding = Some(BodyEncoding::Base64);

    tracing::info!(
        status = 200,
        format = %image.format,
        width = image.width,
        height = image.height,
        size = image.bytes.len(),
        "responding with transformed image"
    );
    response
}

fn failure(mut response: EdgeResponse, status: u16, message: String) -> EdgeResponse {
    response.status = status.to_string();
    response.status_description = StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .map(str::to_string);
    response.set_header("Content-Type", "text/plain");
    tracing::warn!(status, message = %message, "responding with error");
    response.body = Some(message);
    response.body_encoding = Some(BodyEncoding::Text);
    response
}
