use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clap::{Parser, Subcommand};
use image_edge::config::{self, Config};
use image_edge::event::{BodyEncoding, EdgeEvent, EdgeRequest, EdgeResponse};
use image_edge::logging::{self, LogFormat};
use image_edge::pipeline::Pipeline;
use image_edge::storage::{FsStore, S3Store};
use lambda_runtime::{LambdaEvent, service_fn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;

/// Top-level error. `Send + Sync` so runtime errors from `lambda_runtime`
/// propagate with `?`.
type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Time reserved for serialising the response after cancellation fires.
const DEADLINE_MARGIN: Duration = Duration::from_millis(250);

#[derive(Parser)]
#[command(name = "image-edge")]
#[command(about = "On-demand image resizing for CDN edge functions")]
#[command(long_about = "\
On-demand image resizing for CDN edge functions

Attached to the origin response of an image distribution. Requests carrying
w and/or h are fetched from the bucket, resized to fit inside the bounds and
re-encoded; everything else is served as the origin sent it.

Query parameters:
  w   target width bound            (default: limits.max_width)
  h   target height bound           (default: limits.max_height)
  f   output format: jpeg, png, webp, gif, tiff, avif (default: source format)
  q   encoder quality 1-100         (default: codec default)

Examples:
  /photo.png?w=200&h=100      800x400 PNG  ->  200x100 PNG
  /photo.heic?w=300           HEIC         ->  JPEG, at most 300 wide
  /photo.jpg?w=640&f=webp     JPEG         ->  WebP

Run 'image-edge gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Path to config.toml (stock defaults when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve edge invocations through the Lambda runtime
    Lambda,
    /// Run one request against a local directory of originals
    Transform(TransformArgs),
    /// Load and validate the config file
    CheckConfig,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

#[derive(clap::Args)]
struct TransformArgs {
    /// Request path, e.g. /photo.png
    uri: String,

    /// Raw query string, e.g. "w=200&h=100"
    #[arg(long, short, default_value = "")]
    query: String,

    /// Directory the object keys are resolved against
    #[arg(long, default_value = ".")]
    store_dir: PathBuf,

    /// Where to write the transformed image
    #[arg(long, short)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Lambda => {
            let config = config::load_config(cli.config.as_deref())?;
            logging::init(&config.log_level, LogFormat::Json)?;
            run_lambda(config).await?;
        }
        Command::Transform(args) => {
            let config = config::load_config(cli.config.as_deref())?;
            logging::init(&config.log_level, LogFormat::Compact)?;
            run_transform(config, args).await?;
        }
        Command::CheckConfig => {
            let config = config::load_config(cli.config.as_deref())?;
            match &cli.config {
                Some(path) => println!("==> {} is valid", path.display()),
                None => println!("==> Stock defaults are valid"),
            }
            print!("{}", toml::to_string_pretty(&config)?);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

async fn run_lambda(config: Config) -> Result<(), lambda_runtime::Error> {
    let store = S3Store::from_config(&config.storage).await;
    let pipeline = Arc::new(Pipeline::with_store(config, Arc::new(store)));

    lambda_runtime::run(service_fn(move |event: LambdaEvent<EdgeEvent>| {
        let pipeline = Arc::clone(&pipeline);
        async move { handle_invocation(&pipeline, event).await }
    }))
    .await
}

async fn handle_invocation(
    pipeline: &Pipeline,
    event: LambdaEvent<EdgeEvent>,
) -> Result<EdgeResponse, lambda_runtime::Error> {
    let cancel = CancellationToken::new();
    let budget = remaining_budget(event.context.deadline);
    let timer = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            tokio::time::sleep(budget).await;
            cancel.cancel();
        }
    });

    let result = pipeline.handle_event(event.payload, cancel).await;
    timer.abort();
    Ok(result?)
}

/// Time left before the invocation deadline (milliseconds since the epoch),
/// minus the response margin.
fn remaining_budget(deadline_ms: u64) -> Duration {
    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    budget_from(deadline_ms, now_ms)
}

fn budget_from(deadline_ms: u64, now_ms: u64) -> Duration {
    Duration::from_millis(deadline_ms.saturating_sub(now_ms)).saturating_sub(DEADLINE_MARGIN)
}

async fn run_transform(config: Config, args: TransformArgs) -> Result<(), BoxError> {
    let pipeline = Pipeline::with_store(config, Arc::new(FsStore::new(&args.store_dir)));
    let origin = EdgeResponse {
        status: "200".to_string(),
        status_description: Some("OK".to_string()),
        ..EdgeResponse::default()
    };

    let request = EdgeRequest::new(args.uri, args.query);
    let response = pipeline
        .handle(&request, origin.clone(), CancellationToken::new())
        .await;

    if response == origin {
        println!("==> {} passed through (no w or h)", request.uri);
        return Ok(());
    }

    let content_type = response.header("content-type").unwrap_or("-");
    println!("==> {} {}", response.status, content_type);

    let body = response.body.as_deref().unwrap_or_default();
    match response.body_encoding {
        Some(BodyEncoding::Base64) => {
            let bytes = STANDARD.decode(body)?;
            match &args.output {
                Some(path) => {
                    std::fs::write(path, &bytes)?;
                    println!("==> Wrote {} bytes to {}", bytes.len(), path.display());
                }
                None => println!("==> {} bytes (pass --output to save)", bytes.len()),
            }
        }
        _ => println!("{body}"),
    }

    Ok(())
}
