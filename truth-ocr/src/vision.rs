//! Google Cloud Vision `images:annotate` backend.
//!
//! Authenticates with either a plain API key (`?key=`) or a service
//! account. Service accounts go through the OAuth2 JWT-bearer grant: an
//! RS256 assertion is exchanged for an access token, which is cached until
//! shortly before it expires.

use crate::{BatchPolicy, BoundingPoly, OcrBackend, OcrResult, strip_data_url};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::borrow::Cow;
use std::time::Duration;
use tokio::sync::Mutex;
use truth_common::{Result, TruthError};
use truth_config::VisionConfig;
use truth_http::{Auth, HttpClient, HttpError, RequestOpts, StatusCode};

const PROVIDER_NAME: &str = "Google Vision API";
const SCOPE: &str = "https://www.googleapis.com/auth/cloud-vision";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const LANGUAGE_HINTS: [&str; 5] = ["en", "hi", "es", "fr", "de"];
/// Refresh this long before the token's stated expiry.
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

// gRPC status codes carried in per-image errors.
const PERMISSION_DENIED: i64 = 7;
const UNAUTHENTICATED: i64 = 16;

/// Fields of a service-account key file that the token exchange needs.
#[derive(Debug, Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    #[serde(default)]
    token_uri: Option<String>,
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

struct AccessToken {
    value: String,
    refresh_at: DateTime<Utc>,
}

struct ServiceAccount {
    client_email: String,
    token_uri: String,
    key: EncodingKey,
    token: Mutex<Option<AccessToken>>,
}

enum Credential {
    ApiKey(String),
    ServiceAccount(ServiceAccount),
}

pub struct GoogleVisionOcr {
    client: HttpClient,
    credential: Credential,
}

// ---- wire types ----

#[derive(Debug, Default, Deserialize)]
struct BatchAnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    #[serde(default)]
    text_annotations: Vec<EntityAnnotation>,
    #[serde(default)]
    full_text_annotation: Option<FullTextAnnotation>,
    #[serde(default)]
    error: Option<Status>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntityAnnotation {
    #[serde(default)]
    description: String,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    bounding_poly: Option<BoundingPoly>,
}

#[derive(Debug, Deserialize)]
struct FullTextAnnotation {
    #[serde(default)]
    text: String,
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

impl GoogleVisionOcr {
    /// Authenticate every request with `?key=<api_key>`.
    pub fn with_api_key(endpoint: &str, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http_client(endpoint)?,
            credential: Credential::ApiKey(api_key.into()),
        })
    }

    /// Authenticate with a service-account key given as a JSON document.
    pub fn with_service_account_json(endpoint: &str, key_json: &str) -> Result<Self> {
        let parsed: ServiceAccountKey = serde_json::from_str(key_json)
            .map_err(|e| TruthError::Config(format!("invalid service account JSON: {e}")))?;
        let key = EncodingKey::from_rsa_pem(parsed.private_key.as_bytes())
            .map_err(|e| TruthError::Config(format!("invalid service account private key: {e}")))?;
        Ok(Self {
            client: http_client(endpoint)?,
            credential: Credential::ServiceAccount(ServiceAccount {
                client_email: parsed.client_email,
                token_uri: parsed
                    .token_uri
                    .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
                key,
                token: Mutex::new(None),
            }),
        })
    }

    /// Build from configuration. Inline JSON wins over a key file, which
    /// wins over an API key. `Ok(None)` when nothing is configured.
    pub fn from_config(config: &VisionConfig) -> Result<Option<Self>> {
        if !config.has_credentials() {
            return Ok(None);
        }
        if let Some(json) = &config.credentials_json {
            tracing::info!("ocr.vision.credentials: inline service account");
            return Self::with_service_account_json(&config.endpoint, json).map(Some);
        }
        if let Some(path) = &config.credentials_file {
            tracing::info!(path = %path.display(), "ocr.vision.credentials: service account file");
            let json = std::fs::read_to_string(path).map_err(|e| {
                TruthError::Config(format!("cannot read {}: {e}", path.display()))
            })?;
            return Self::with_service_account_json(&config.endpoint, &json).map(Some);
        }
        if let Some(key) = &config.api_key {
            tracing::info!("ocr.vision.credentials: api key");
            return Self::with_api_key(&config.endpoint, key.clone()).map(Some);
        }
        Ok(None)
    }

    async fn access_token(&self, account: &ServiceAccount) -> Result<String> {
        let mut cached = account.token.lock().await;
        let now = Utc::now();
        if let Some(token) = cached.as_ref() {
            if now < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let iat = now.timestamp();
        let claims = AssertionClaims {
            iss: &account.client_email,
            scope: SCOPE,
            aud: &account.token_uri,
            iat,
            exp: iat + 3600,
        };
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &account.key)
            .map_err(|e| TruthError::VisionAuth(format!("could not sign token request: {e}")))?;

        let fields = [
            ("grant_type", Cow::Borrowed(JWT_BEARER_GRANT)),
            ("assertion", Cow::Owned(assertion)),
        ];
        let resp: TokenResponse = self
            .client
            .post_form_opts(
                &account.token_uri,
                &fields,
                RequestOpts {
                    allow_absolute: true,
                    ..Default::default()
                },
            )
            .await
            .map_err(map_http_error)?;

        tracing::debug!(expires_in = resp.expires_in, "ocr.vision.token.refreshed");
        let value = resp.access_token;
        *cached = Some(AccessToken {
            value: value.clone(),
            refresh_at: now + TimeDelta::seconds(resp.expires_in - TOKEN_EXPIRY_MARGIN_SECS),
        });
        Ok(value)
    }
}

fn http_client(endpoint: &str) -> Result<HttpClient> {
    HttpClient::new(endpoint)
        .map(|c| c.with_timeout(Duration::from_secs(30)))
        .map_err(|e| TruthError::Config(format!("Vision endpoint: {e}")))
}

fn permission_denied() -> TruthError {
    TruthError::VisionAuth("Permission denied. Check your credentials and API access.".into())
}

fn unauthenticated() -> TruthError {
    TruthError::VisionAuth("Authentication failed. Check your credentials.".into())
}

fn quota_exceeded() -> TruthError {
    TruthError::VisionQuota("Quota exceeded. Check your billing and limits.".into())
}

fn map_http_error(err: HttpError) -> TruthError {
    match err.status() {
        Some(StatusCode::FORBIDDEN) => permission_denied(),
        Some(StatusCode::UNAUTHORIZED) => unauthenticated(),
        Some(StatusCode::TOO_MANY_REQUESTS) => quota_exceeded(),
        Some(_) => match &err {
            HttpError::Api { message, .. } if message.to_lowercase().contains("quota") => {
                quota_exceeded()
            }
            _ => TruthError::VisionApi(err.to_string()),
        },
        None => TruthError::VisionApi(err.to_string()),
    }
}

fn map_status(status: &Status) -> TruthError {
    match status.code {
        PERMISSION_DENIED => permission_denied(),
        UNAUTHENTICATED => unauthenticated(),
        _ if status.message.to_lowercase().contains("quota") => quota_exceeded(),
        _ => TruthError::VisionApi(status.message.clone()),
    }
}

fn into_ocr_result(resp: AnnotateImageResponse) -> OcrResult {
    let document_text = resp
        .full_text_annotation
        .as_ref()
        .map(|a| a.text.as_str())
        .filter(|t| !t.is_empty());
    let simple_text = resp.text_annotations.first().map(|a| a.description.as_str());
    let full_text = document_text.or(simple_text).unwrap_or_default().to_string();

    let individual_texts = resp
        .text_annotations
        .iter()
        .skip(1)
        .map(|a| a.description.clone())
        .collect();

    // TEXT_DETECTION rarely reports a confidence; the document pages usually do.
    let page_confidence = resp.full_text_annotation.as_ref().and_then(|a| {
        let scores: Vec<f64> = a.pages.iter().filter_map(|p| p.confidence).collect();
        (!scores.is_empty()).then(|| scores.iter().sum::<f64>() / scores.len() as f64)
    });
    let confidence = resp
        .text_annotations
        .first()
        .and_then(|a| a.confidence)
        .filter(|c| *c > 0.0)
        .or(page_confidence)
        .unwrap_or(0.0)
        .clamp(0.0, 1.0);

    let bounding_boxes = resp
        .text_annotations
        .into_iter()
        .filter_map(|a| a.bounding_poly)
        .collect();

    OcrResult {
        full_text,
        individual_texts,
        confidence,
        bounding_boxes,
    }
}

#[async_trait]
impl OcrBackend for GoogleVisionOcr {
    async fn extract_text(&self, image_base64: &str) -> Result<OcrResult> {
        let body = json!({
            "requests": [{
                "image": { "content": strip_data_url(image_base64) },
                "features": [
                    { "type": "TEXT_DETECTION", "maxResults": 1 },
                    { "type": "DOCUMENT_TEXT_DETECTION", "maxResults": 1 },
                ],
                "imageContext": { "languageHints": LANGUAGE_HINTS },
            }]
        });

        let token;
        let auth = match &self.credential {
            Credential::ApiKey(key) => Auth::Query {
                name: "key",
                value: Cow::Borrowed(key.as_str()),
            },
            Credential::ServiceAccount(account) => {
                token = self.access_token(account).await?;
                Auth::Bearer(&token)
            }
        };

        // "./" keeps the colon from being read as a URL scheme.
        let resp: BatchAnnotateResponse = self
            .client
            .post_json_opts(
                "./images:annotate",
                &body,
                RequestOpts {
                    auth: Some(auth),
                    ..Default::default()
                },
            )
            .await
            .map_err(map_http_error)?;

        let image = resp.responses.into_iter().next().unwrap_or_default();
        if let Some(status) = &image.error {
            tracing::warn!(code = status.code, message = %status.message, "ocr.vision.image_error");
            return Err(map_status(status));
        }

        let result = into_ocr_result(image);
        tracing::debug!(
            chars = result.full_text.chars().count(),
            segments = result.individual_texts.len(),
            confidence = result.confidence,
            "ocr.vision.done"
        );
        Ok(result)
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn batch_policy(&self) -> BatchPolicy {
        BatchPolicy {
            size: 5,
            delay: Duration::from_millis(500),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> AnnotateImageResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn prefers_document_text_and_skips_first_annotation() {
        let resp = parse(json!({
            "textAnnotations": [
                { "description": "Vote early\nVote often", "confidence": 0.92,
                  "boundingPoly": { "vertices": [{ "x": 1, "y": 2 }, { "x": 3 }] } },
                { "description": "Vote" },
                { "description": "early" }
            ],
            "fullTextAnnotation": { "text": "Vote early Vote often" }
        }));
        let got = into_ocr_result(resp);
        assert_eq!(got.full_text, "Vote early Vote often");
        assert_eq!(got.individual_texts, vec!["Vote", "early"]);
        assert_eq!(got.confidence, 0.92);
        assert_eq!(got.bounding_boxes.len(), 1);
        assert_eq!(got.bounding_boxes[0].vertices[1].y, None);
    }

    #[test]
    fn confidence_falls_back_to_page_mean() {
        let resp = parse(json!({
            "textAnnotations": [{ "description": "hello there" }],
            "fullTextAnnotation": {
                "text": "",
                "pages": [{ "confidence": 0.5 }, { "confidence": 0.7 }]
            }
        }));
        let got = into_ocr_result(resp);
        assert_eq!(got.full_text, "hello there");
        assert!((got.confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn empty_response_yields_empty_result() {
        assert_eq!(into_ocr_result(parse(json!({}))), OcrResult::empty());
    }

    #[test]
    fn status_codes_map_to_error_kinds() {
        let denied = Status { code: 7, message: "nope".into() };
        assert!(matches!(map_status(&denied), TruthError::VisionAuth(_)));
        let unauth = Status { code: 16, message: "who".into() };
        assert!(matches!(map_status(&unauth), TruthError::VisionAuth(_)));
        let quota = Status { code: 8, message: "Quota exceeded for project".into() };
        assert!(matches!(map_status(&quota), TruthError::VisionQuota(_)));
        let other = Status { code: 3, message: "Bad image data".into() };
        assert!(matches!(map_status(&other), TruthError::VisionApi(m) if m == "Bad image data"));
    }

    #[test]
    fn http_errors_map_to_error_kinds() {
        let api = |status: StatusCode, message: &str| HttpError::Api {
            status,
            message: message.into(),
            request_id: "-".into(),
        };
        assert!(matches!(
            map_http_error(api(StatusCode::FORBIDDEN, "denied")),
            TruthError::VisionAuth(_)
        ));
        assert!(matches!(
            map_http_error(api(StatusCode::UNAUTHORIZED, "bad key")),
            TruthError::VisionAuth(_)
        ));
        assert!(matches!(
            map_http_error(api(StatusCode::TOO_MANY_REQUESTS, "slow")),
            TruthError::VisionQuota(_)
        ));
        assert!(matches!(
            map_http_error(api(StatusCode::BAD_REQUEST, "daily quota reached")),
            TruthError::VisionQuota(_)
        ));
        assert!(matches!(
            map_http_error(HttpError::Timeout(Duration::from_secs(30))),
            TruthError::VisionApi(_)
        ));
    }

    #[test]
    fn no_credentials_means_no_vision_provider() {
        let mut config = VisionConfig {
            credentials_json: None,
            credentials_file: None,
            api_key: None,
            endpoint: "https://vision.googleapis.com/v1/".into(),
        };
        assert!(GoogleVisionOcr::from_config(&config).unwrap().is_none());

        config.api_key = Some("vision-key".into());
        assert!(GoogleVisionOcr::from_config(&config).unwrap().is_some());
    }

    #[test]
    fn rejects_malformed_service_account() {
        let err = GoogleVisionOcr::with_service_account_json(
            "https://vision.googleapis.com/v1/",
            r#"{"client_email":"a@b","private_key":"not a pem"}"#,
        )
        .err()
        .unwrap();
        assert!(matches!(err, TruthError::Config(_)));
    }
}
