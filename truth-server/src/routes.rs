use crate::AppState;
use crate::error::ApiError;
use crate::orchestrator::{self, API_VERSION, AnalysisResponse, ClaimRequest, MediaRequest};
use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde_json::{Value, json};
use std::sync::Arc;

const FEATURES: [&str; 6] = [
    "Advanced OCR Processing",
    "AI-Powered Fact Checking",
    "Multi-source Verification",
    "Bias Detection",
    "Topic Classification",
    "Citation Management",
];

pub async fn service_info(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "message": "Truth Backend - Advanced Misinformation Detection API",
        "version": API_VERSION,
        "timestamp": orchestrator::timestamp(),
        "environment": state.environment,
        "features": FEATURES,
        "ocr_provider": state.processor.provider_name(),
        "ai_configured": state.fact_checker.is_configured(),
    }))
}

pub async fn analyze_claim(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ClaimRequest>, JsonRejection>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let Json(request) = payload?;
    orchestrator::analyze_claim(&state, &request).await.map(Json)
}

pub async fn analyze_media(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MediaRequest>, JsonRejection>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let Json(request) = payload?;
    orchestrator::analyze_media(&state, &request).await.map(Json)
}
