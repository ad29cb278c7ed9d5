//! The request pipeline: interpret → fetch → transcode → respond.
//!
//! Stages run strictly in order and each returns a typed result; the first
//! error short-circuits to the response builder. Nothing escapes
//! [`Pipeline::handle`]: every failure becomes an HTTP error response.
//!
//! Cancellation is cooperative. The token is raced against the store call and
//! against the blocking transcode task; whichever loses is dropped and its
//! result discarded.

use crate::config::Config;
use crate::event::{EdgeEvent, EdgeRequest, EdgeResponse, EventError};
use crate::imaging::{
    self, BackendError, EncodedImage, HeicConverter, ImageBackend, Quality, RustBackend,
    default_heic_converter,
};
use crate::request::{self, Interpretation, TransformSpec, ValidationError};
use crate::response::{self, ErrorClass, Outcome};
use crate::storage::{self, FetchError, ObjectStore, RawAsset};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{uri} is not found: {source}")]
    AssetNotFound { uri: String, source: FetchError },
    #[error("{uri} could not be transformed: {source}")]
    Transcode { uri: String, source: BackendError },
    #[error("{uri} was cancelled before completion")]
    Cancelled { uri: String },
}

impl PipelineError {
    pub fn class(&self) -> ErrorClass {
        match self {
            PipelineError::Validation(_) => ErrorClass::UnsupportedExtension,
            PipelineError::AssetNotFound { .. } => ErrorClass::NotFound,
            PipelineError::Transcode { .. } => ErrorClass::TranscodeFailure,
            PipelineError::Cancelled { .. } => ErrorClass::Cancelled,
        }
    }
}

/// Everything one invocation needs. Holds no per-request state, so a single
/// instance serves concurrent invocations.
#[derive(Clone)]
pub struct Pipeline {
    config: Config,
    store: Arc<dyn ObjectStore>,
    backend: Arc<dyn ImageBackend>,
    heic: Arc<dyn HeicConverter>,
}

impl Pipeline {
    pub fn new(
        config: Config,
        store: Arc<dyn ObjectStore>,
        backend: Arc<dyn ImageBackend>,
        heic: Arc<dyn HeicConverter>,
    ) -> Self {
        Self {
            config,
            store,
            backend,
            heic,
        }
    }

    /// Pipeline with the pure-Rust backend and the HEIC converter compiled
    /// into this build.
    pub fn with_store(config: Config, store: Arc<dyn ObjectStore>) -> Self {
        Self::new(
            config,
            store,
            Arc::new(RustBackend::new()),
            Arc::from(default_heic_converter()),
        )
    }

    /// Handle one request against the origin `response`.
    pub async fn handle(
        &self,
        request: &EdgeRequest,
        response: EdgeResponse,
        cancel: CancellationToken,
    ) -> EdgeResponse {
        let span = tracing::info_span!("request", uri = %request.uri);
        async {
            let outcome = match self.run(request, &cancel).await {
                Ok(outcome) => outcome,
                Err(err) => Outcome::Failed {
                    class: err.class(),
                    message: err.to_string(),
                },
            };
            response::build(outcome, response, &self.config.responses)
        }
        .instrument(span)
        .await
    }

    /// Handle the first record of an edge event.
    pub async fn handle_event(
        &self,
        event: EdgeEvent,
        cancel: CancellationToken,
    ) -> Result<EdgeResponse, EventError> {
        let (request, response) = event.into_parts()?;
        Ok(self.handle(&request, response, cancel).await)
    }

    async fn run(
        &self,
        request: &EdgeRequest,
        cancel: &CancellationToken,
    ) -> Result<Outcome, PipelineError> {
        let uri = request.uri.as_str();
        let spec = match request::interpret(uri, &request.querystring, &self.config.limits)? {
            Interpretation::PassThrough => {
                tracing::debug!("no resize requested, passing through");
                return Ok(Outcome::PassThrough);
            }
            Interpretation::Transform(spec) => spec,
        };

        let asset = storage::fetch(
            self.store.as_ref(),
            &self.config.storage.bucket,
            &spec.object_key,
            cancel,
        )
        .await
        .map_err(|err| match err {
            FetchError::Cancelled => PipelineError::Cancelled {
                uri: uri.to_string(),
            },
            other => PipelineError::AssetNotFound {
                uri: uri.to_string(),
                source: other,
            },
        })?;

        let image = self.transcode(uri, asset, spec, cancel).await?;
        Ok(Outcome::Transformed(image))
    }

    /// Run the CPU-bound transcode on the blocking pool.
    async fn transcode(
        &self,
        uri: &str,
        asset: RawAsset,
        spec: TransformSpec,
        cancel: &CancellationToken,
    ) -> Result<EncodedImage, PipelineError> {
        let backend = Arc::clone(&self.backend);
        let heic = Arc::clone(&self.heic);
        let heic_quality = Quality::new(self.config.heic.conversion_quality);
        tracing::debug!(key = %asset.key, size = asset.bytes.len(), "transcoding object");

        let task = tokio::task::spawn_blocking(move || {
            imaging::transcode(
                backend.as_ref(),
                heic.as_ref(),
                asset.bytes,
                &spec,
                heic_quality,
            )
        });

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(PipelineError::Cancelled { uri: uri.to_string() });
            }
            joined = task => joined.unwrap_or_else(|e| {
                Err(BackendError::ProcessingFailed(format!("transcode task failed: {e}")))
            }),
        };

        result.map_err(|source| PipelineError::Transcode {
            uri: uri.to_string(),
            source,
        })
    }
}
