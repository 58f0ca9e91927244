//! OCR.space fallback backend.
//!
//! Used when Google Vision is not configured. The free tier is slow and
//! throttled, so batches are small and spaced out, and every failure is
//! absorbed into an empty result.

use crate::{BatchPolicy, OcrBackend, OcrResult, strip_data_url};
use async_trait::async_trait;
use serde::Deserialize;
use std::borrow::Cow;
use std::time::Duration;
use truth_common::{Result, TruthError};
use truth_config::OcrSpaceConfig;
use truth_http::{Auth, HttpClient, RequestOpts};

const PROVIDER_NAME: &str = "OCR.space (fallback)";
const TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParseResponse {
    #[serde(default)]
    parsed_results: Vec<ParsedResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ParsedResult {
    #[serde(default)]
    parsed_text: Option<String>,
    #[serde(default)]
    text_overlay: Option<serde_json::Value>,
}

pub struct OcrSpaceOcr {
    client: HttpClient,
    api_key: String,
}

impl OcrSpaceOcr {
    pub fn new(endpoint: &str, api_key: impl Into<String>) -> Result<Self> {
        let client = HttpClient::new(endpoint)
            .map_err(|e| TruthError::Config(format!("OCR.space endpoint: {e}")))?
            .with_timeout(TIMEOUT);
        Ok(Self {
            client,
            api_key: api_key.into(),
        })
    }

    pub fn from_config(config: &OcrSpaceConfig) -> Result<Self> {
        Self::new(&config.endpoint, config.api_key_or_demo())
    }

    async fn parse_image(&self, image_base64: &str) -> Result<OcrResult> {
        let payload = format!("data:image/png;base64,{}", strip_data_url(image_base64));
        let fields = [
            ("base64Image", Cow::Owned(payload)),
            ("language", Cow::Borrowed("eng")),
            ("isOverlayRequired", Cow::Borrowed("false")),
            ("detectOrientation", Cow::Borrowed("true")),
            ("scale", Cow::Borrowed("true")),
            ("OCREngine", Cow::Borrowed("2")),
        ];
        let auth = Auth::Header {
            name: truth_http::HeaderName::from_static("apikey"),
            value: truth_http::HeaderValue::from_str(&self.api_key)
                .map_err(|e| TruthError::Config(format!("OCR.space api key: {e}")))?,
        };

        let resp: ParseResponse = self
            .client
            .post_form_opts(
                "parse/image",
                &fields,
                RequestOpts {
                    auth: Some(auth),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| TruthError::AnalysisFailed(e.to_string()))?;

        let Some(first) = resp.parsed_results.into_iter().next() else {
            return Ok(OcrResult::empty());
        };
        let full_text = first.parsed_text.unwrap_or_default();
        let individual_texts = full_text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect();
        let confidence = match first.text_overlay {
            Some(overlay) if !overlay.is_null() => 0.8,
            _ => 0.6,
        };
        Ok(OcrResult {
            full_text,
            individual_texts,
            confidence,
            bounding_boxes: Vec::new(),
        })
    }
}

#[async_trait]
impl OcrBackend for OcrSpaceOcr {
    /// Never fails: any error is logged and reported as an empty result.
    async fn extract_text(&self, image_base64: &str) -> Result<OcrResult> {
        match self.parse_image(image_base64).await {
            Ok(result) => {
                tracing::debug!(chars = result.full_text.chars().count(), "ocr.space.done");
                Ok(result)
            }
            Err(err) => {
                tracing::warn!(error = %err, "ocr.space.failed");
                Ok(OcrResult::empty())
            }
        }
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn batch_policy(&self) -> BatchPolicy {
        BatchPolicy {
            size: 2,
            delay: Duration::from_millis(2000),
        }
    }
}
