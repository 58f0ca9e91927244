use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use truth_common::TruthError;
use truth_text::{classify_topic, detect_bias, BiasAnalysis, TopicClassification};

/// Local analysis returned alongside a failure so clients still get something.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FallbackAnalysis {
    pub local_classification: Option<TopicClassification>,
    pub local_bias_analysis: Option<BiasAnalysis>,
}

impl FallbackAnalysis {
    pub fn of(text: Option<&str>) -> Self {
        match text {
            Some(text) => Self {
                local_classification: Some(classify_topic(text)),
                local_bias_analysis: Some(detect_bias(text)),
            },
            None => Self::default(),
        }
    }
}

/// Everything a handler can fail with.
#[derive(Debug)]
pub enum ApiError {
    /// Bad input; answered with 400 before any upstream call.
    Invalid {
        title: &'static str,
        message: String,
    },
    /// The body was not acceptable JSON.
    Body(JsonRejection),
    /// An upstream step failed after validation.
    Failed {
        title: &'static str,
        source: TruthError,
        fallback: FallbackAnalysis,
    },
}

impl ApiError {
    pub fn invalid(title: &'static str, message: impl Into<String>) -> Self {
        ApiError::Invalid {
            title,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Invalid { .. } => StatusCode::BAD_REQUEST,
            ApiError::Body(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            ApiError::Body(_) => StatusCode::BAD_REQUEST,
            ApiError::Failed { source, .. } => status_for(source),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Body(rejection)
    }
}

/// HTTP status for a pipeline error.
pub fn status_for(err: &TruthError) -> StatusCode {
    match err {
        TruthError::Validation(_) => StatusCode::BAD_REQUEST,
        TruthError::Config(_) | TruthError::InvalidCredential(_) => StatusCode::SERVICE_UNAVAILABLE,
        TruthError::RateLimit(_) => StatusCode::TOO_MANY_REQUESTS,
        TruthError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Invalid { title, message } => json!({
                "success": false,
                "error": title,
                "message": message,
            }),
            ApiError::Body(rejection) => json!({
                "success": false,
                "error": "Invalid request",
                "message": rejection.body_text(),
            }),
            ApiError::Failed {
                title,
                source,
                fallback,
            } => {
                tracing::warn!(
                    error = %source,
                    kind = source.label(),
                    status = status.as_u16(),
                    "server.request.failed"
                );
                json!({
                    "success": false,
                    "error": title,
                    "message": source.to_string(),
                    "timestamp": crate::orchestrator::timestamp(),
                    "fallback_analysis": fallback,
                })
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_errors_map_to_statuses() {
        let cases = [
            (TruthError::Validation("v".into()), 400),
            (TruthError::Config("c".into()), 503),
            (TruthError::InvalidCredential("k".into()), 503),
            (TruthError::RateLimit("r".into()), 429),
            (TruthError::Timeout("t".into()), 504),
            (TruthError::AnalysisFailed("a".into()), 500),
            (TruthError::VisionApi("x".into()), 500),
        ];
        for (err, code) in cases {
            assert_eq!(status_for(&err).as_u16(), code, "{err:?}");
        }
    }

    #[test]
    fn fallback_without_text_is_null() {
        let value = serde_json::to_value(FallbackAnalysis::of(None)).unwrap();
        assert_eq!(
            value,
            json!({ "local_classification": null, "local_bias_analysis": null })
        );
    }

    #[test]
    fn fallback_with_text_runs_local_analysis() {
        let fallback = FallbackAnalysis::of(Some("The vaccine causes autism"));
        let topic = fallback.local_classification.unwrap();
        assert_eq!(topic.category, "health");
        assert!(fallback.local_bias_analysis.is_some());
    }
}
