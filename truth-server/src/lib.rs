//! HTTP surface of the Truth claim-analysis service.
//!
//! [`build_router`] wires the three endpoints onto an [`AppState`] holding
//! the process-lifetime OCR backend and fact checker. Handlers live in
//! [`routes`]; the request flows they drive live in [`orchestrator`].
pub mod error;
pub mod orchestrator;
pub mod routes;

use axum::extract::DefaultBodyLimit;
use axum::http::Request;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use truth_config::TruthConfig;
use truth_llm::build_llm_client;
use truth_llm::factcheck::FactChecker;
use truth_ocr::{FrameProcessor, OcrProvider};

/// Frames arrive as base64 images, so bodies are large.
pub const BODY_LIMIT_BYTES: usize = 50 * 1024 * 1024;

const DEFAULT_ENVIRONMENT: &str = "development";

/// Shared, read-only state behind every request.
pub struct AppState {
    pub processor: FrameProcessor,
    pub fact_checker: FactChecker,
    pub environment: String,
}

impl AppState {
    pub fn new(processor: FrameProcessor, fact_checker: FactChecker, environment: String) -> Self {
        Self {
            processor,
            fact_checker,
            environment,
        }
    }

    /// Resolve the OCR backend and model client once for the process.
    pub fn from_config(config: &TruthConfig) -> truth_common::Result<Self> {
        let ocr = OcrProvider::from_config(&config.vision, &config.ocr_space)?;
        let llm = build_llm_client(&config.perplexity)?;
        let environment = config
            .server
            .environment
            .clone()
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());
        Ok(Self::new(
            FrameProcessor::new(Arc::new(ocr)),
            FactChecker::new(llm),
            environment,
        ))
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(routes::service_info))
        .route("/claim", post(routes::analyze_claim))
        .route("/analyze-media", post(routes::analyze_media))
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        // method + path only; bodies carry images and claims
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
}
