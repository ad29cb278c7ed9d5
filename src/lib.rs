//! # Image Edge
//!
//! On-demand image resizing for a CDN edge. The function sits on the origin
//! response of an image distribution: when a viewer asks for
//! `/photo.png?w=200&h=100`, it fetches `photo.png` from the bucket, resizes it
//! to fit inside 200×100, re-encodes it and replaces the origin's body.
//! Requests without `w` or `h` are left alone.
//!
//! # Architecture: Four-Stage Pipeline
//!
//! Every request flows forward through four stages, once:
//!
//! ```text
//! 1. Interpret  uri + query  →  TransformSpec     (or pass-through / validation error)
//! 2. Fetch      object key   →  RawAsset          (single store lookup)
//! 3. Transcode  RawAsset     →  EncodedImage      (HEIC → JPEG, fit-inside resize, encode)
//! 4. Respond    outcome      →  EdgeResponse      (status, headers, base64 body)
//! ```
//!
//! Any stage can short-circuit to the response builder with a typed error;
//! there is no retry and no state shared between requests.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`request`] | Stage 1: query parsing, key and extension extraction, format resolution |
//! | [`storage`] | Stage 2: `ObjectStore` trait, S3 / filesystem / in-memory stores |
//! | [`imaging`] | Stage 3: HEIC conversion seam, fit-inside math, pure-Rust codec backend |
//! | [`response`] | Stage 4: maps outcomes onto the origin response |
//! | [`pipeline`] | Composes the stages, threads cancellation, classifies errors |
//! | [`event`] | Serde model of the edge invocation event |
//! | [`config`] | `config.toml` loading, merging over stock defaults, validation |
//! | [`logging`] | `tracing-subscriber` setup (JSON at the edge, compact locally) |
//!
//! # Design Decisions
//!
//! ## Configurable Error Statuses
//!
//! The first deployment answered a rejected extension with 500 and every
//! fetch or transcode failure with 404. Defaults are now 415 / 404 / 502, with
//! 503 when the invocation deadline cuts a request short. Each status lives in
//! `[responses]`; [`config::ResponsesConfig::legacy`] restores the old mapping.
//!
//! ## Pass-Through Before Validation
//!
//! The pass-through decision is made before the extension is checked, so
//! `/favicon.ico` and other non-image objects behind the same distribution are
//! served untouched unless someone explicitly asks to resize them.
//!
//! ## HEIC Behind a Feature
//!
//! HEIC decoding needs libheif, a C library. It sits behind the `heic` feature
//! and the [`imaging::HeicConverter`] trait, so the rest of the crate and its
//! tests build with pure Rust. Without the feature, HEIC requests fail as
//! transcode errors.
//!
//! ## Cancellation
//!
//! The runtime's deadline becomes a `CancellationToken` that races the store
//! call and the blocking transcode. A request that runs out of time answers
//! with the `cancelled` status instead of being killed mid-response.

pub mod config;
pub mod event;
pub mod imaging;
pub mod logging;
pub mod pipeline;
pub mod request;
pub mod response;
pub mod storage;
