//! Small HTTP client shared by the OCR and fact-check backends.
//!
//! - JSON or form-encoded request bodies, JSON responses
//! - Bearer, custom-header or query-parameter auth
//! - One attempt per call, bounded by a per-client or per-request timeout
//! - Upstream error envelopes (Google, Perplexity, OCR.space) turned into a message
//! - Secrets never reach the logs; `TRUTH_HTTP_RAW=1` adds redacted raw dumps
//!
//! ```no_run
//! # async fn demo() -> Result<(), truth_http::HttpError> {
//! let client = truth_http::HttpClient::new("https://api.perplexity.ai/")?;
//! let reply: serde_json::Value = client
//!     .post_json("chat/completions", Some("pplx-..."), &serde_json::json!({"model": "sonar"}))
//!     .await?;
//! # Ok(()) }
//! ```

pub use reqwest::StatusCode;
pub use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;

const RAW_ENV: &str = "TRUTH_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024;
const SNIPPET_CHARS: usize = 500;
const REDACTED: &str = "<redacted>";

static NEXT_REQUEST: AtomicU64 = AtomicU64::new(1);

fn raw_enabled() -> bool {
    matches!(
        std::env::var(RAW_ENV).as_deref(),
        Ok("1" | "true" | "yes")
    )
}

fn is_secret_header(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "authorization" | "apikey" | "x-api-key" | "x-goog-api-key"
    )
}

fn is_secret_param(name: &str) -> bool {
    matches!(
        name.to_ascii_lowercase().as_str(),
        "key" | "apikey" | "api_key" | "access_token" | "token" | "assertion" | "client_secret"
    )
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {message}, request_id={request_id}")]
    Api {
        status: StatusCode,
        message: String,
        request_id: String,
    },
}

impl HttpError {
    /// HTTP status for `Api` errors.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// How a request proves who it is.
///
/// ```
/// use truth_http::Auth;
///
/// let bearer = Auth::Bearer("token");
/// assert_eq!(bearer.kind(), "bearer");
/// ```
#[derive(Clone, Debug)]
pub enum Auth<'a> {
    /// `Authorization: Bearer <token>`
    Bearer(&'a str),
    /// Custom header, e.g. OCR.space's `apikey`.
    Header { name: HeaderName, value: HeaderValue },
    /// Query parameter, e.g. Google's `key`.
    Query { name: &'a str, value: Cow<'a, str> },
}

impl Auth<'_> {
    /// Logged in place of the credential.
    pub fn kind(&self) -> &'static str {
        match self {
            Auth::Bearer(_) => "bearer",
            Auth::Header { .. } => "header",
            Auth::Query { .. } => "query",
        }
    }
}

/// Per-request options.
///
/// ```
/// use truth_http::{Auth, RequestOpts};
/// use std::borrow::Cow;
///
/// let opts = RequestOpts {
///     auth: Some(Auth::Query { name: "key", value: Cow::Borrowed("demo") }),
///     ..Default::default()
/// };
/// assert!(!opts.allow_absolute);
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub auth: Option<Auth<'a>>,
    /// Use `path` as-is when it is an absolute URL (e.g. an OAuth token URI).
    pub allow_absolute: bool,
}

enum Body<'b, B: ?Sized> {
    Json(&'b B),
    Form(&'b [(&'b str, Cow<'b, str>)]),
}

/// What the logs may say about an outgoing request.
struct Trace {
    id: String,
    method: Method,
    url: Url,
    timeout: Duration,
    raw_body: Option<Vec<u8>>,
}

#[derive(Clone)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    pub default_timeout: Duration,
}

impl HttpClient {
    /// Client whose relative paths resolve against `base`.
    ///
    /// A base without a trailing slash drops its last segment on join, so
    /// API roots are configured as `https://host/v1/`.
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let base = Url::parse(base).map_err(|e| HttpError::Url(e.to_string()))?;
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            default_timeout: Duration::from_secs(15),
        })
    }

    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    /// POST JSON with optional bearer auth.
    pub async fn post_json<B, T>(
        &self,
        path: &str,
        bearer: Option<&str>,
        body: &B,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let opts = RequestOpts {
            auth: bearer.map(Auth::Bearer),
            ..Default::default()
        };
        self.execute(Method::POST, path, Some(Body::Json(body)), opts)
            .await
    }

    pub async fn post_json_opts<B, T>(
        &self,
        path: &str,
        body: &B,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(Method::POST, path, Some(Body::Json(body)), opts)
            .await
    }

    /// POST `application/x-www-form-urlencoded` fields, decode a JSON reply.
    pub async fn post_form_opts<T>(
        &self,
        path: &str,
        fields: &[(&str, Cow<'_, str>)],
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        self.execute::<(), T>(Method::POST, path, Some(Body::Form(fields)), opts)
            .await
    }

    fn resolve(&self, path: &str, allow_absolute: bool) -> Result<Url, HttpError> {
        if allow_absolute {
            if let Ok(abs) = Url::parse(path) {
                return Ok(abs);
            }
        }
        self.base
            .join(path)
            .map_err(|e| HttpError::Url(e.to_string()))
    }

    async fn execute<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Body<'_, B>>,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let (request, trace) = self.build(method, path, body, &opts)?;
        let (status, headers, bytes) = send(request, &trace).await?;
        decode(status, &headers, &bytes, &trace)
    }

    fn build<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<Body<'_, B>>,
        opts: &RequestOpts<'_>,
    ) -> Result<(RequestBuilder, Trace), HttpError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.resolve(path, opts.allow_absolute)?;
        let timeout = self.default_timeout;
        let mut rb = self
            .inner
            .request(method.clone(), url.clone())
            .timeout(timeout);

        let mut query: Vec<(&str, &str)> = Vec::new();

        let mut raw_body = None;
        match body {
            Some(Body::Json(value)) => {
                let bytes =
                    serde_json::to_vec(value).map_err(|e| HttpError::Build(e.to_string()))?;
                if raw_enabled() {
                    raw_body = Some(bytes.clone());
                }
                rb = rb
                    .header(reqwest::header::CONTENT_TYPE, "application/json")
                    .body(bytes);
            }
            Some(Body::Form(fields)) => {
                let pairs: Vec<(&str, &str)> =
                    fields.iter().map(|(k, v)| (*k, v.as_ref())).collect();
                rb = rb.form(&pairs);
            }
            None => {}
        }

        match &opts.auth {
            Some(Auth::Bearer(token)) => rb = rb.bearer_auth(sanitize_api_key(token)?),
            Some(Auth::Header { name, value }) => rb = rb.header(name, value),
            Some(Auth::Query { name, value }) => query.push((*name, value.as_ref())),
            None => {}
        }
        if !query.is_empty() {
            rb = rb.query(&query);
        }

        let trace = Trace {
            id: format!("r{}", NEXT_REQUEST.fetch_add(1, Ordering::Relaxed)),
            method,
            url: redact_url(&url, &query),
            timeout,
            raw_body,
        };
        tracing::debug!(
            req_id = %trace.id,
            method = %trace.method,
            url = %trace.url,
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            auth_kind = opts.auth.as_ref().map_or("none", |a| a.kind()),
            "http.request.start"
        );
        if let Some(bytes) = &trace.raw_body {
            tracing::debug!(
                target: "http.raw",
                req_id = %trace.id,
                body = %snip(bytes, RAW_MAX_BODY),
                "request"
            );
        }
        Ok((rb, trace))
    }
}

async fn send(
    request: RequestBuilder,
    trace: &Trace,
) -> Result<(StatusCode, HeaderMap, Vec<u8>), HttpError> {
    let started = Instant::now();
    let network = |err: reqwest::Error, stage: &'static str| {
        tracing::warn!(req_id = %trace.id, stage, timed_out = err.is_timeout(), message = %err, "http.network_error");
        if err.is_timeout() {
            HttpError::Timeout(trace.timeout)
        } else {
            HttpError::Network(err.to_string())
        }
    };

    let resp = request.send().await.map_err(|e| network(e, "send"))?;
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = resp.bytes().await.map_err(|e| network(e, "body"))?;

    tracing::debug!(
        req_id = %trace.id,
        %status,
        duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        body_len = bytes.len(),
        "http.response"
    );
    if raw_enabled() {
        tracing::info!(
            target: "http.raw",
            req_id = %trace.id,
            %status,
            headers = ?redact_headers(&headers),
            body = %snip(&bytes, RAW_MAX_BODY),
            "response"
        );
    }
    Ok((status, headers, bytes.to_vec()))
}

fn decode<T: DeserializeOwned>(
    status: StatusCode,
    headers: &HeaderMap,
    bytes: &[u8],
    trace: &Trace,
) -> Result<T, HttpError> {
    let snippet = snip(bytes, SNIPPET_CHARS);
    if status.is_success() {
        return serde_json::from_slice(bytes).map_err(|e| {
            tracing::warn!(req_id = %trace.id, error = %e, body_snippet = %snippet, "http.response.decode_error");
            HttpError::Decode(e.to_string(), snippet)
        });
    }

    let request_id = headers
        .get("x-request-id")
        .or_else(|| headers.get("x-correlation-id"))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let message = upstream_message(bytes).unwrap_or(snippet);
    tracing::warn!(
        req_id = %trace.id,
        %status,
        %message,
        x_request_id = %request_id,
        "http.error"
    );
    Err(HttpError::Api {
        status,
        message,
        request_id,
    })
}

/// Best human-readable message in an error body.
///
/// Understands `{"error": {"message"}}` (Google, OpenAI-compatible),
/// OCR.space's `ErrorMessage` (string or list), and flat
/// `message`/`detail`/`error` strings.
fn upstream_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    let non_empty = |v: &serde_json::Value| v.as_str().filter(|s| !s.is_empty()).map(String::from);

    if let Some(msg) = value.pointer("/error/message").and_then(non_empty) {
        return Some(msg);
    }
    match value.get("ErrorMessage") {
        Some(serde_json::Value::Array(items)) => {
            let joined = items
                .iter()
                .filter_map(|v| v.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            if !joined.is_empty() {
                return Some(joined);
            }
        }
        Some(other) => {
            if let Some(msg) = non_empty(other) {
                return Some(msg);
            }
        }
        None => {}
    }
    ["message", "detail", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(non_empty))
}

fn redact_url(url: &Url, query: &[(&str, &str)]) -> Url {
    let mut shown = url.clone();
    shown.set_query(None);
    if !query.is_empty() {
        let mut pairs = shown.query_pairs_mut();
        for (k, v) in query {
            pairs.append_pair(k, if is_secret_param(k) { REDACTED } else { *v });
        }
    }
    shown
}

fn redact_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(k, v)| {
            let shown = if is_secret_header(k.as_str()) {
                REDACTED.to_string()
            } else {
                v.to_str().unwrap_or("").to_string()
            };
            (k.as_str().to_string(), shown)
        })
        .collect()
}

fn floor_char_boundary(s: &str, max: usize) -> usize {
    let mut end = max.min(s.len());
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    end
}

fn snip(body: &[u8], max: usize) -> String {
    let mut text = String::from_utf8_lossy(body).into_owned();
    if text.len() > max {
        text.truncate(floor_char_boundary(&text, max));
        text.push_str("...");
    }
    text
}

/// Tokens pasted from dashboards often carry quotes or line breaks.
fn sanitize_api_key(raw: &str) -> Result<String, HttpError> {
    let mut key = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();
    key.retain(|ch| !ch.is_ascii_whitespace());

    if !key.is_ascii() {
        return Err(HttpError::Build("API key contains non-ASCII bytes".into()));
    }
    if key.bytes().any(|b| b < 0x20 || b == 0x7F) {
        return Err(HttpError::Build("API key contains control characters".into()));
    }
    HeaderValue::from_str(&format!("Bearer {key}"))
        .map_err(|e| HttpError::Build(format!("invalid Authorization header: {e}")))?;
    Ok(key)
}
