//! The two analysis flows: a typed claim, and text read out of media frames.
//!
//! Both end in the same [`AnalysisResponse`]: the model's fact-check result
//! flattened at the top level, plus local topic and bias analysis and
//! request metadata.

use crate::AppState;
use crate::error::{ApiError, FallbackAnalysis};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use truth_llm::schema::FactCheckResult;
use truth_ocr::{FrameExtraction, MediaType};
use truth_text::{BiasAnalysis, TopicClassification, classify_topic, detect_bias};
use uuid::Uuid;

pub const API_VERSION: &str = "2.0.0";
pub const MAX_CLAIM_CHARS: usize = 2000;
/// Extracted text shorter than this is not worth a fact-check.
pub const MIN_EXTRACTED_CHARS: usize = 10;
const OCR_ONLY_MODEL: &str = "ocr-only";
const NO_CONTENT_MESSAGE: &str = "No meaningful text content found in the media";

/// ISO-8601 UTC with millisecond precision.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `POST /claim` body. Fields stay untyped so shape errors get our messages.
#[derive(Debug, Default, Deserialize)]
pub struct ClaimRequest {
    #[serde(default)]
    pub claim: Value,
}

/// `POST /analyze-media` body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRequest {
    #[serde(default)]
    pub frames: Value,
    #[serde(default)]
    pub media_type: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LocalAnalysis {
    pub topic_classification: TopicClassification,
    pub bias_analysis: BiasAnalysis,
}

impl LocalAnalysis {
    pub fn of(text: &str) -> Self {
        Self {
            topic_classification: classify_topic(text),
            bias_analysis: detect_bias(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metadata {
    pub analysis_id: Uuid,
    pub model_used: String,
    pub api_version: &'static str,
    pub total_sources: usize,
    pub total_citations: usize,
    pub total_images: usize,
}

impl Metadata {
    fn for_result(result: &FactCheckResult, model_used: &str) -> Self {
        Self {
            analysis_id: Uuid::new_v4(),
            model_used: model_used.to_string(),
            api_version: API_VERSION,
            total_sources: result.sources.len(),
            total_citations: result.citations.len(),
            total_images: result.images.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrMetadata {
    pub frame_count: usize,
    pub processed_segments: usize,
    pub average_confidence: f64,
    pub ocr_provider: String,
}

impl From<&FrameExtraction> for OcrMetadata {
    fn from(extraction: &FrameExtraction) -> Self {
        Self {
            frame_count: extraction.frame_count,
            processed_segments: extraction.processed_segments,
            average_confidence: extraction.average_confidence,
            ocr_provider: extraction.ocr_provider.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResponse {
    pub success: bool,
    pub timestamp: String,
    pub processing_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    #[serde(rename = "mediaType", skip_serializing_if = "Option::is_none")]
    pub media_type: Option<MediaType>,
    #[serde(rename = "extractedText", skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
    #[serde(rename = "ocrMetadata", skip_serializing_if = "Option::is_none")]
    pub ocr_metadata: Option<OcrMetadata>,
    #[serde(flatten)]
    pub result: FactCheckResult,
    pub local_analysis: LocalAnalysis,
    pub metadata: Metadata,
}

impl AnalysisResponse {
    fn new(
        started: Instant,
        result: FactCheckResult,
        local_analysis: LocalAnalysis,
        model_used: &str,
    ) -> Self {
        let metadata = Metadata::for_result(&result, model_used);
        Self {
            success: true,
            timestamp: timestamp(),
            processing_time_ms: elapsed_ms(started),
            message: None,
            media_type: None,
            extracted_text: None,
            ocr_metadata: None,
            result,
            local_analysis,
            metadata,
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Fact-check a typed claim.
///
/// The model sees the trimmed claim; local analysis runs on the claim as sent.
pub async fn analyze_claim(
    state: &AppState,
    request: &ClaimRequest,
) -> Result<AnalysisResponse, ApiError> {
    let claim = validate_claim(&request.claim)?;
    let started = Instant::now();
    tracing::info!(claim_chars = claim.chars().count(), "server.claim.start");

    let result = state
        .fact_checker
        .analyze(claim.trim())
        .await
        .map_err(|source| ApiError::Failed {
            title: "Analysis failed",
            source,
            fallback: FallbackAnalysis::of(Some(claim)),
        })?;

    let response = AnalysisResponse::new(
        started,
        result,
        LocalAnalysis::of(claim),
        state.fact_checker.model_name(),
    );
    tracing::info!(
        verdict = ?response.result.verdict,
        elapsed_ms = response.processing_time_ms,
        "server.claim.done"
    );
    Ok(response)
}

/// Read text out of uploaded frames and fact-check it.
///
/// When too little text comes back the model is not called and the
/// response says so.
pub async fn analyze_media(
    state: &AppState,
    request: &MediaRequest,
) -> Result<AnalysisResponse, ApiError> {
    let frames = validate_frames(&request.frames)?;
    let media_type = validate_media_type(&request.media_type)?;
    let started = Instant::now();
    tracing::info!(
        media_type = media_type.as_str(),
        frames = frames.len(),
        "server.media.start"
    );

    let extraction = state.processor.process_frames(&frames, media_type).await;
    let ocr_metadata = OcrMetadata::from(&extraction);

    if extraction.combined_text.chars().count() < MIN_EXTRACTED_CHARS {
        tracing::info!(
            extracted_chars = extraction.combined_text.chars().count(),
            "server.media.no_content"
        );
        let mut response = AnalysisResponse::new(
            started,
            FactCheckResult::no_content(),
            LocalAnalysis::default(),
            OCR_ONLY_MODEL,
        );
        response.message = Some(NO_CONTENT_MESSAGE);
        response.media_type = Some(media_type);
        response.extracted_text = Some(String::new());
        response.ocr_metadata = Some(ocr_metadata);
        return Ok(response);
    }

    let text = extraction.combined_text;
    let mut result = state
        .fact_checker
        .analyze(&text)
        .await
        .map_err(|source| ApiError::Failed {
            title: "Media analysis failed",
            source,
            fallback: FallbackAnalysis::of(Some(text.as_str())),
        })?;
    result.original_claim = text.clone();

    let mut response = AnalysisResponse::new(
        started,
        result,
        LocalAnalysis::of(&text),
        state.fact_checker.model_name(),
    );
    response.media_type = Some(media_type);
    response.extracted_text = Some(text);
    response.ocr_metadata = Some(ocr_metadata);
    tracing::info!(
        verdict = ?response.result.verdict,
        elapsed_ms = response.processing_time_ms,
        "server.media.done"
    );
    Ok(response)
}

pub fn validate_claim(raw: &Value) -> Result<&str, ApiError> {
    let claim = raw
        .as_str()
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| {
            ApiError::invalid(
                "Invalid request",
                "Claim text is required and must be a non-empty string",
            )
        })?;
    if claim.chars().count() > MAX_CLAIM_CHARS {
        return Err(ApiError::invalid(
            "Claim too long",
            "Claim must be less than 2000 characters",
        ));
    }
    Ok(claim)
}

pub fn validate_frames(raw: &Value) -> Result<Vec<String>, ApiError> {
    let invalid = || {
        ApiError::invalid(
            "Invalid request",
            "Frames array is required and must contain at least one base64 image",
        )
    };
    let items = raw.as_array().filter(|a| !a.is_empty()).ok_or_else(invalid)?;
    items
        .iter()
        .map(|frame| frame.as_str().map(str::to_string).ok_or_else(invalid))
        .collect()
}

pub fn validate_media_type(raw: &Value) -> Result<MediaType, ApiError> {
    let invalid = |message: String| ApiError::Invalid {
        title: "Invalid media type",
        message,
    };
    match raw.as_str() {
        Some(s) => s.parse().map_err(|e: truth_common::TruthError| invalid(e.to_string())),
        None => Err(invalid(
            "Media type must be either \"image\" or \"video\"".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(err: ApiError) -> (&'static str, String) {
        match err {
            ApiError::Invalid { title, message } => (title, message),
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn claim_must_be_a_non_blank_string() {
        for raw in [json!(null), json!(42), json!("   "), json!(["a"])] {
            let (title, _) = message(validate_claim(&raw).unwrap_err());
            assert_eq!(title, "Invalid request");
        }
        assert_eq!(validate_claim(&json!(" hi ")).unwrap(), " hi ");
    }

    #[test]
    fn claim_length_counts_characters() {
        let at_limit = "é".repeat(MAX_CLAIM_CHARS);
        assert!(validate_claim(&json!(at_limit)).is_ok());

        let over = "a".repeat(MAX_CLAIM_CHARS + 1);
        let (title, msg) = message(validate_claim(&json!(over)).unwrap_err());
        assert_eq!(title, "Claim too long");
        assert_eq!(msg, "Claim must be less than 2000 characters");
    }

    #[test]
    fn frames_must_be_a_non_empty_list_of_strings() {
        for raw in [json!(null), json!([]), json!("abc"), json!(["ok", 3])] {
            assert!(validate_frames(&raw).is_err(), "{raw}");
        }
        assert_eq!(validate_frames(&json!(["a", "b"])).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn media_type_is_image_or_video() {
        assert_eq!(validate_media_type(&json!("video")).unwrap(), MediaType::Video);
        for raw in [json!("gif"), json!(null), json!("IMAGE")] {
            let (title, msg) = message(validate_media_type(&raw).unwrap_err());
            assert_eq!(title, "Invalid media type");
            assert_eq!(msg, "Media type must be either \"image\" or \"video\"");
        }
    }

    #[test]
    fn response_flattens_the_result() {
        let response = AnalysisResponse::new(
            Instant::now(),
            FactCheckResult::no_content(),
            LocalAnalysis::default(),
            OCR_ONLY_MODEL,
        );
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["verdict"], "UNVERIFIED");
        assert_eq!(value["metadata"]["model_used"], "ocr-only");
        assert_eq!(value["metadata"]["api_version"], "2.0.0");
        assert_eq!(value["local_analysis"]["topic_classification"]["matchCount"], 0);
        assert_eq!(
            value["local_analysis"]["bias_analysis"]["politicalLean"],
            "neutral"
        );
        assert!(value.get("mediaType").is_none());
        assert!(value.get("message").is_none());
        assert!(value.get("result").is_none());
    }
}
