//! End-to-end pipeline tests with the real codec backend.
//!
//! Source images are generated in memory; the store is either in-memory or a
//! temp directory. HEIC sources go through a stand-in converter so the tests
//! do not need libheif.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{DynamicImage, GenericImageView, ImageFormat, RgbImage};
use image_edge::config::Config;
use image_edge::event::{BodyEncoding, EdgeEvent, EdgeRequest, EdgeResponse};
use image_edge::imaging::{BackendError, HeicConverter, Quality, RustBackend};
use image_edge::pipeline::Pipeline;
use image_edge::storage::{FsStore, MemoryStore, ObjectStore};
use std::io::Cursor;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const BUCKET: &str = "u-market";

// =============================================================================
// Helpers
// =============================================================================

fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img).write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

/// Stand-in for libheif: returns a JPEG of a fixed size for any input.
struct StubHeicConverter {
    width: u32,
    height: u32,
}

impl HeicConverter for StubHeicConverter {
    fn convert(&self, _data: &[u8], _quality: Quality) -> Result<Vec<u8>, BackendError> {
        Ok(encode(self.width, self.height, ImageFormat::Jpeg))
    }
}

fn pipeline_with(store: impl ObjectStore + 'static) -> Pipeline {
    Pipeline::new(
        Config::default(),
        Arc::new(store),
        Arc::new(RustBackend::new()),
        Arc::new(StubHeicConverter {
            width: 800,
            height: 600,
        }),
    )
}

fn origin() -> EdgeResponse {
    let mut response = EdgeResponse {
        status: "200".to_string(),
        status_description: Some("OK".to_string()),
        ..EdgeResponse::default()
    };
    response.set_header("Content-Type", "application/octet-stream");
    response
}

async fn request(pipeline: &Pipeline, uri: &str, query: &str) -> EdgeResponse {
    pipeline
        .handle(
            &EdgeRequest::new(uri, query),
            origin(),
            CancellationToken::new(),
        )
        .await
}

/// Decode a successful response body back into an image.
fn decode_body(response: &EdgeResponse) -> (DynamicImage, ImageFormat) {
    assert_eq!(response.status, "200", "body: {:?}", response.body);
    assert_eq!(response.body_encoding, Some(BodyEncoding::Base64));
    let bytes = STANDARD.decode(response.body.as_deref().unwrap()).unwrap();
    let format = image::guess_format(&bytes).unwrap();
    (image::load_from_memory(&bytes).unwrap(), format)
}

// =============================================================================
// Request scenarios
// =============================================================================

#[tokio::test]
async fn png_is_resized_to_exact_bounds() {
    let store = MemoryStore::new().with_object(BUCKET, "photo.png", encode(800, 400, ImageFormat::Png));
    let p = pipeline_with(store);

    let response = request(&p, "/photo.png", "w=200&h=100").await;
    assert_eq!(response.header("content-type"), Some("image/png"));

    let (img, format) = decode_body(&response);
    assert_eq!(format, ImageFormat::Png);
    assert_eq!(img.dimensions(), (200, 100));
}

#[tokio::test]
async fn heic_is_served_as_jpeg_within_width() {
    let store = MemoryStore::new().with_object(BUCKET, "photo.heic", &b"\0\0\0\x18ftypheic"[..]);
    let p = pipeline_with(store);

    let response = request(&p, "/photo.heic", "w=300").await;
    assert_eq!(response.header("content-type"), Some("image/jpeg"));

    let (img, format) = decode_body(&response);
    assert_eq!(format, ImageFormat::Jpeg);
    assert!(img.width() <= 300);
    assert_eq!(img.dimensions(), (300, 225));
}

#[tokio::test]
async fn disallowed_extension_names_extension() {
    let p = pipeline_with(MemoryStore::new());

    let response = request(&p, "/doc.bmp", "w=100").await;
    let status = response.status_code().unwrap();
    assert!((400..600).contains(&status));
    assert_eq!(response.header("content-type"), Some("text/plain"));
    assert!(response.body.unwrap().contains("bmp"));
}

#[tokio::test]
async fn missing_object_is_404_with_path() {
    let p = pipeline_with(MemoryStore::new());

    let response = request(&p, "/missing.jpg", "w=100").await;
    assert_eq!(response.status, "404");
    assert_eq!(
        response.body.as_deref(),
        Some("/missing.jpg is not found: no such key: missing.jpg")
    );
}

#[tokio::test]
async fn corrupt_source_is_transcode_failure() {
    let store = MemoryStore::new().with_object(BUCKET, "broken.jpg", &b"not a jpeg"[..]);
    let p = pipeline_with(store);

    let response = request(&p, "/broken.jpg", "w=100").await;
    assert_eq!(response.status, "502");
    assert!(response.body.unwrap().contains("/broken.jpg"));
}

#[tokio::test]
async fn no_dimensions_passes_origin_through() {
    let store = MemoryStore::new().with_object(BUCKET, "photo.png", encode(8, 8, ImageFormat::Png));
    let p = pipeline_with(store);

    for query in ["", "f=webp", "q=50", "w=&h="] {
        assert_eq!(request(&p, "/photo.png", query).await, origin(), "{query:?}");
    }
    // Non-image objects behind the same distribution.
    assert_eq!(request(&p, "/favicon.ico", "").await, origin());
}

// =============================================================================
// Format and quality
// =============================================================================

#[tokio::test]
async fn format_override_jpg_yields_jpeg() {
    let store = MemoryStore::new().with_object(BUCKET, "photo.png", encode(100, 50, ImageFormat::Png));
    let p = pipeline_with(store);

    let response = request(&p, "/photo.png", "w=40&f=jpg").await;
    assert_eq!(response.header("content-type"), Some("image/jpeg"));
    let (img, format) = decode_body(&response);
    assert_eq!(format, ImageFormat::Jpeg);
    assert_eq!(img.dimensions(), (40, 20));
}

#[tokio::test]
async fn webp_override_round_trips_dimensions() {
    let store = MemoryStore::new().with_object(BUCKET, "a.JPG", encode(640, 480, ImageFormat::Jpeg));
    let p = pipeline_with(store);

    let response = request(&p, "/a.JPG", "h=120&f=webp").await;
    assert_eq!(response.header("content-type"), Some("image/webp"));
    let (img, format) = decode_body(&response);
    assert_eq!(format, ImageFormat::WebP);
    assert_eq!(img.dimensions(), (160, 120));
}

#[tokio::test]
async fn lower_quality_gives_smaller_jpeg() {
    let store = MemoryStore::new().with_object(BUCKET, "a.jpg", encode(400, 300, ImageFormat::Jpeg));
    let p = pipeline_with(store);

    let low = request(&p, "/a.jpg", "w=400&q=10").await;
    let high = request(&p, "/a.jpg", "w=400&q=95").await;
    assert!(low.body.unwrap().len() < high.body.unwrap().len());
}

#[tokio::test]
async fn webp_quality_is_honoured() {
    let store = MemoryStore::new().with_object(BUCKET, "a.png", encode(400, 300, ImageFormat::Png));
    let p = pipeline_with(store);

    let low = request(&p, "/a.png", "w=400&f=webp&q=10").await;
    let high = request(&p, "/a.png", "w=400&f=webp&q=95").await;
    assert_eq!(low.header("content-type"), Some("image/webp"));
    assert_ne!(low.body, high.body);

    let (low_img, format) = decode_body(&low);
    assert_eq!(format, ImageFormat::WebP);
    assert_eq!(low_img.dimensions(), (400, 300));
    assert!(low.body.unwrap().len() < high.body.unwrap().len());
}

// =============================================================================
// Fit-inside properties
// =============================================================================

#[tokio::test]
async fn small_source_is_not_upscaled() {
    let store = MemoryStore::new().with_object(BUCKET, "tiny.png", encode(64, 48, ImageFormat::Png));
    let p = pipeline_with(store);

    let (img, _) = decode_body(&request(&p, "/tiny.png", "w=1280&h=720").await);
    assert_eq!(img.dimensions(), (64, 48));
}

#[tokio::test]
async fn output_fits_bounds_and_touches_one() {
    let store = MemoryStore::new().with_object(BUCKET, "wide.png", encode(900, 600, ImageFormat::Png));
    let p = pipeline_with(store);

    for (w, h) in [(300, 300), (100, 500), (450, 100), (899, 599)] {
        let query = format!("w={w}&h={h}");
        let (img, _) = decode_body(&request(&p, "/wide.png", &query).await);
        let (ow, oh) = img.dimensions();
        assert!(ow <= w && oh <= h, "{ow}x{oh} exceeds {w}x{h}");
        assert!(ow == w || oh == h, "{ow}x{oh} touches neither bound of {w}x{h}");
    }
}

#[tokio::test]
async fn oversized_width_keeps_source_size() {
    let store = MemoryStore::new().with_object(BUCKET, "big.png", encode(1600, 500, ImageFormat::Png));
    let p = pipeline_with(store);

    let (img, _) = decode_body(&request(&p, "/big.png", "w=5000000000&h=720").await);
    assert_eq!(img.dimensions(), (1600, 500));
}

#[tokio::test]
async fn missing_height_uses_configured_maximum() {
    let store = MemoryStore::new().with_object(BUCKET, "tall.png", encode(400, 2000, ImageFormat::Png));
    let p = pipeline_with(store);

    let (img, _) = decode_body(&request(&p, "/tall.png", "w=abc").await);
    assert_eq!(img.dimensions(), (144, 720));
}

// =============================================================================
// Stores and events
// =============================================================================

#[tokio::test]
async fn filesystem_store_serves_nested_keys() {
    let tmp = tempfile::TempDir::new().unwrap();
    std::fs::create_dir_all(tmp.path().join("albums/2024")).unwrap();
    std::fs::write(
        tmp.path().join("albums/2024/sea view.png"),
        encode(300, 200, ImageFormat::Png),
    )
    .unwrap();
    let p = pipeline_with(FsStore::new(tmp.path()));

    let (img, _) = decode_body(&request(&p, "/albums/2024/sea%20view.png", "w=150").await);
    assert_eq!(img.dimensions(), (150, 100));
}

#[tokio::test]
async fn edge_event_round_trip() {
    let store = MemoryStore::new().with_object(BUCKET, "photo.png", encode(800, 400, ImageFormat::Png));
    let p = pipeline_with(store);

    let event: EdgeEvent = serde_json::from_str(
        r#"{"Records": [{"cf": {
            "request": {"uri": "/photo.png", "querystring": "w=200&h=100&f=webp"},
            "response": {"status": "200", "statusDescription": "OK",
                         "headers": {"content-type": [{"key": "Content-Type", "value": "image/png"}]}}
        }}]}"#,
    )
    .unwrap();

    let response = p.handle_event(event, CancellationToken::new()).await.unwrap();
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["status"], "200");
    assert_eq!(json["bodyEncoding"], "base64");
    assert_eq!(json["headers"]["content-type"][0]["value"], "image/webp");

    let (img, _) = decode_body(&response);
    assert_eq!(img.dimensions(), (200, 100));
}

#[tokio::test]
async fn cancelled_request_reports_configured_status() {
    let store = MemoryStore::new().with_object(BUCKET, "photo.png", encode(8, 8, ImageFormat::Png));
    let p = pipeline_with(store);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let response = p
        .handle(&EdgeRequest::new("/photo.png", "w=4"), origin(), cancel)
        .await;
    assert_eq!(response.status, "503");
}
