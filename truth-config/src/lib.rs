//! Loader for service configuration with YAML + environment overlays.
//!
//! Sources are merged in this order, later ones winning:
//!
//! 1. the built-in defaults ([`DEFAULT_CONFIG_YAML`]),
//! 2. any YAML files or inline snippets attached to the loader,
//! 3. `TRUTH__SECTION__KEY` environment variables.
//!
//! After merging, every string is run through `${VAR}` expansion. The
//! defaults reference the conventional credential variables
//! (`PERPLEXITY_API_KEY`, `GOOGLE_VISION_CREDENTIALS`, ...), so a bare
//! environment is enough to run the service. Placeholders that stay
//! unresolved are treated as unset.
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use truth_common::observability::LogFormat;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

/// Defaults merged underneath every other source.
pub const DEFAULT_CONFIG_YAML: &str = r#"
server:
  host: "0.0.0.0"
  port: 8080
  environment: "${TRUTH_ENV}"
logging:
  format: text
  stderr: true
  filter: info
  dir: "${TRUTH_LOG_DIR}"
vision:
  credentials_json: "${GOOGLE_VISION_CREDENTIALS}"
  credentials_file: "${GOOGLE_APPLICATION_CREDENTIALS}"
  api_key: "${GOOGLE_VISION_API_KEY}"
  endpoint: "https://vision.googleapis.com/v1/"
ocr_space:
  api_key: "${OCR_SPACE_KEY}"
  endpoint: "https://api.ocr.space/"
perplexity:
  api_key: "${PERPLEXITY_API_KEY}"
  model: "sonar"
  endpoint: "https://api.perplexity.ai/"
"#;

#[derive(Debug, Clone, Deserialize)]
pub struct TruthConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub vision: VisionConfig,
    pub ocr_space: OcrSpaceConfig,
    pub perplexity: PerplexityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Free-form deployment label reported by the info endpoint.
    #[serde(default)]
    pub environment: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default)]
    pub stderr: bool,
    #[serde(default = "default_filter")]
    pub filter: String,
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

/// Google Vision credentials. Any one of the three enables the primary OCR backend.
#[derive(Debug, Clone, Deserialize)]
pub struct VisionConfig {
    /// Service-account key as an inline JSON document.
    #[serde(default)]
    pub credentials_json: Option<String>,
    /// Path to a service-account key file.
    #[serde(default)]
    pub credentials_file: Option<PathBuf>,
    /// Plain API key (sent as `?key=`).
    #[serde(default)]
    pub api_key: Option<String>,
    pub endpoint: String,
}

impl VisionConfig {
    pub fn has_credentials(&self) -> bool {
        self.credentials_json.is_some() || self.credentials_file.is_some() || self.api_key.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrSpaceConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    pub endpoint: String,
}

impl OcrSpaceConfig {
    /// OCR.space accepts the public demo key when none is configured.
    pub fn api_key_or_demo(&self) -> &str {
        self.api_key.as_deref().unwrap_or("helloworld")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PerplexityConfig {
    /// Absence is reported at call time, not at startup.
    #[serde(default)]
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
}

fn default_filter() -> String {
    "info".into()
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::Array(items) => items.iter_mut().for_each(expand_env_in_value),
        Value::Object(fields) => fields.values_mut().for_each(expand_env_in_value),
        Value::String(raw) if raw.trim().is_empty() => *v = Value::Null,
        Value::String(raw) if raw.contains('$') => {
            *v = substitute(raw).map_or(Value::Null, Value::String);
        }
        _ => {}
    }
}

/// Resolves `$VAR`/`${VAR}` references, following values that themselves
/// reference other variables. `None` when a braced reference stays unresolved.
fn substitute(raw: &str) -> Option<String> {
    let mut text = raw.to_owned();
    for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
        match shellexpand::env(&text) {
            Ok(next) if next != text => text = next.into_owned(),
            _ => break,
        }
    }
    (!text.contains("${")).then_some(text)
}

/// Layers defaults, files, inline YAML and `TRUTH__*` env overrides.
pub struct TruthConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for TruthConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TruthConfigLoader {
    /// Start from the built-in defaults.
    ///
    /// ```
    /// use truth_config::TruthConfigLoader;
    ///
    /// let config = TruthConfigLoader::new()
    ///     .with_yaml_str("server:\n  port: 9000")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.server.port, 9000);
    /// assert_eq!(config.perplexity.model, "sonar");
    /// ```
    pub fn new() -> Self {
        let builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG_YAML, FileFormat::Yaml));
        Self { builder }
    }

    /// Adds a config file that must exist. Format follows the extension.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that may be absent (e.g. `truth.yaml` in the working directory).
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merges an inline YAML document on top of earlier sources.
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self.builder.add_source(File::from_str(yaml, FileFormat::Yaml));
        self
    }

    /// Merges all sources, resolves `${VAR}` references and deserializes.
    ///
    /// ```
    /// use truth_config::TruthConfigLoader;
    ///
    /// unsafe { std::env::set_var("DOC_PPLX_TOKEN", "injected-from-env"); }
    ///
    /// let config = TruthConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// perplexity:
    ///   api_key: "${DOC_PPLX_TOKEN}"
    ///   model: "sonar-pro"
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.perplexity.api_key.as_deref(), Some("injected-from-env"));
    /// assert_eq!(config.perplexity.model, "sonar-pro");
    /// assert_eq!(config.perplexity.endpoint, "https://api.perplexity.ai/");
    ///
    /// unsafe { std::env::remove_var("DOC_PPLX_TOKEN"); }
    /// ```
    pub fn load(self) -> Result<TruthConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("TRUTH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn api_key_placeholder_is_filled_from_env() {
        temp_env::with_var("TRUTH_TEST_PPLX", Some("pplx-123"), || {
            let mut v = json!({ "perplexity": { "api_key": "${TRUTH_TEST_PPLX}" } });
            expand_env_in_value(&mut v);
            assert_eq!(v, json!({ "perplexity": { "api_key": "pplx-123" } }));
        });
    }

    #[test]
    fn nested_values_are_walked() {
        temp_env::with_vars(
            [("TRUTH_TEST_HOST", Some("0.0.0.0")), ("TRUTH_TEST_ENV", Some("staging"))],
            || {
                let mut v = json!({
                    "server": { "host": "$TRUTH_TEST_HOST", "port": 8080 },
                    "tags": ["${TRUTH_TEST_ENV}-a", false]
                });
                expand_env_in_value(&mut v);
                assert_eq!(
                    v,
                    json!({
                        "server": { "host": "0.0.0.0", "port": 8080 },
                        "tags": ["staging-a", false]
                    })
                );
            },
        );
    }

    #[test]
    fn chained_references_resolve() {
        temp_env::with_vars(
            [
                ("TRUTH_TEST_REGION", Some("eu")),
                ("TRUTH_TEST_HOSTNAME", Some("ocr-${TRUTH_TEST_REGION}.example")),
            ],
            || {
                let mut v = json!("https://${TRUTH_TEST_HOSTNAME}/parse");
                expand_env_in_value(&mut v);
                assert_eq!(v, json!("https://ocr-eu.example/parse"));
            },
        );
    }

    #[test]
    fn self_referencing_vars_end_unset() {
        temp_env::with_vars(
            [("TRUTH_TEST_P", Some("${TRUTH_TEST_Q}")), ("TRUTH_TEST_Q", Some("${TRUTH_TEST_P}"))],
            || {
                let mut v = json!("${TRUTH_TEST_P}");
                expand_env_in_value(&mut v);
                assert_eq!(v, Value::Null);
            },
        );
    }

    #[test]
    fn missing_or_blank_keys_are_dropped() {
        temp_env::with_var_unset("TRUTH_TEST_MISSING", || {
            let mut v = json!({ "google_vision": { "api_key": "${TRUTH_TEST_MISSING}" }, "ocr_space": { "api_key": " " } });
            expand_env_in_value(&mut v);
            assert_eq!(v, json!({ "google_vision": { "api_key": null }, "ocr_space": { "api_key": null } }));
        });
    }

    #[test]
    fn ocr_space_falls_back_to_demo_key() {
        let cfg = OcrSpaceConfig {
            api_key: None,
            endpoint: "https://api.ocr.space/".into(),
        };
        assert_eq!(cfg.api_key_or_demo(), "helloworld");
    }
}
