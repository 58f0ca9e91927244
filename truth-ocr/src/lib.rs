//! Text extraction from image frames.
//!
//! Two backends implement [`OcrBackend`]: Google Vision ([`vision`]) when
//! credentials are configured, and OCR.space ([`ocr_space`]) otherwise. The
//! choice is made once at startup by [`OcrProvider::from_config`].
//! [`processor::FrameProcessor`] drives a backend over many frames in
//! rate-limited batches and [`merge::merge_texts`] folds the per-frame
//! results into one de-duplicated text.

pub mod merge;
pub mod ocr_space;
pub mod processor;
pub mod vision;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;
use truth_common::{Result, TruthError};
use truth_config::{OcrSpaceConfig, VisionConfig};

pub use merge::{MergedText, merge_texts};
pub use ocr_space::OcrSpaceOcr;
pub use processor::{FrameExtraction, FrameProcessor};
pub use vision::GoogleVisionOcr;

static DATA_URL_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^data:image/[a-z]+;base64,").expect("valid regex"));

/// Remove a leading `data:image/<type>;base64,` marker, if present.
///
/// ```
/// assert_eq!(truth_ocr::strip_data_url("data:image/png;base64,AAAA"), "AAAA");
/// assert_eq!(truth_ocr::strip_data_url("AAAA"), "AAAA");
/// ```
pub fn strip_data_url(image: &str) -> &str {
    match DATA_URL_PREFIX.find(image) {
        Some(m) => &image[m.end()..],
        None => image,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vertex {
    #[serde(default)]
    pub x: Option<i32>,
    #[serde(default)]
    pub y: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingPoly {
    #[serde(default)]
    pub vertices: Vec<Vertex>,
}

/// Text recognized in a single frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OcrResult {
    pub full_text: String,
    pub individual_texts: Vec<String>,
    /// In `[0, 1]`.
    pub confidence: f64,
    pub bounding_boxes: Vec<BoundingPoly>,
}

impl OcrResult {
    /// The degraded result used when a frame could not be read.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// The kind of upload; bounds how many frames are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    pub fn max_frames(self) -> usize {
        match self {
            MediaType::Image => 15,
            MediaType::Video => 25,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
        }
    }
}

impl FromStr for MediaType {
    type Err = TruthError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "image" => Ok(MediaType::Image),
            "video" => Ok(MediaType::Video),
            _ => Err(TruthError::Validation(
                "Media type must be either \"image\" or \"video\"".into(),
            )),
        }
    }
}

/// How many frames a backend reads at once and how long to pause between batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPolicy {
    pub size: usize,
    pub delay: Duration,
}

#[async_trait]
pub trait OcrBackend: Send + Sync {
    /// Recognize text in one base64 image (with or without a data-URL prefix).
    async fn extract_text(&self, image_base64: &str) -> Result<OcrResult>;

    /// Display name reported in responses.
    fn name(&self) -> &str;

    fn batch_policy(&self) -> BatchPolicy;
}

/// The backend chosen for this process.
pub enum OcrProvider {
    GoogleVision(GoogleVisionOcr),
    OcrSpace(OcrSpaceOcr),
}

impl OcrProvider {
    /// Google Vision when any credential is configured and loads cleanly,
    /// OCR.space otherwise.
    pub fn from_config(vision: &VisionConfig, ocr_space: &OcrSpaceConfig) -> Result<Self> {
        match GoogleVisionOcr::from_config(vision) {
            Ok(Some(client)) => {
                tracing::info!(provider = client.name(), "ocr.provider.selected");
                return Ok(OcrProvider::GoogleVision(client));
            }
            Ok(None) => {
                tracing::warn!("ocr.vision.unconfigured: falling back to OCR.space");
            }
            Err(err) => {
                tracing::error!(error = %err, "ocr.vision.init_failed: falling back to OCR.space");
            }
        }
        let fallback = OcrSpaceOcr::from_config(ocr_space)?;
        tracing::info!(provider = fallback.name(), "ocr.provider.selected");
        Ok(OcrProvider::OcrSpace(fallback))
    }

    fn backend(&self) -> &dyn OcrBackend {
        match self {
            OcrProvider::GoogleVision(client) => client,
            OcrProvider::OcrSpace(client) => client,
        }
    }
}

#[async_trait]
impl OcrBackend for OcrProvider {
    async fn extract_text(&self, image_base64: &str) -> Result<OcrResult> {
        self.backend().extract_text(image_base64).await
    }

    fn name(&self) -> &str {
        self.backend().name()
    }

    fn batch_policy(&self) -> BatchPolicy {
        self.backend().batch_policy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_any_image_subtype() {
        assert_eq!(strip_data_url("data:image/jpeg;base64,/9j/"), "/9j/");
        assert_eq!(strip_data_url("data:text/plain;base64,AA"), "data:text/plain;base64,AA");
    }

    #[test]
    fn media_type_caps() {
        assert_eq!(MediaType::Image.max_frames(), 15);
        assert_eq!(MediaType::Video.max_frames(), 25);
        assert_eq!("video".parse::<MediaType>().unwrap(), MediaType::Video);
        assert!(matches!(
            "gif".parse::<MediaType>(),
            Err(TruthError::Validation(_))
        ));
    }

    fn unconfigured_vision() -> VisionConfig {
        VisionConfig {
            credentials_json: None,
            credentials_file: None,
            api_key: None,
            endpoint: "https://vision.googleapis.com/v1/".into(),
        }
    }

    fn ocr_space() -> OcrSpaceConfig {
        OcrSpaceConfig {
            api_key: None,
            endpoint: "https://api.ocr.space/".into(),
        }
    }

    #[test]
    fn no_vision_credentials_selects_ocr_space() {
        let provider = OcrProvider::from_config(&unconfigured_vision(), &ocr_space()).unwrap();
        assert!(matches!(provider, OcrProvider::OcrSpace(_)));
        assert_eq!(provider.name(), "OCR.space (fallback)");
        assert_eq!(provider.batch_policy().size, 2);
    }

    #[test]
    fn broken_service_account_falls_back() {
        let vision = VisionConfig {
            credentials_json: Some("{not json".into()),
            ..unconfigured_vision()
        };
        let provider = OcrProvider::from_config(&vision, &ocr_space()).unwrap();
        assert!(matches!(provider, OcrProvider::OcrSpace(_)));
    }

    #[test]
    fn api_key_selects_vision() {
        let vision = VisionConfig {
            api_key: Some("gv-key".into()),
            ..unconfigured_vision()
        };
        let provider = OcrProvider::from_config(&vision, &ocr_space()).unwrap();
        assert_eq!(provider.name(), "Google Vision API");
        assert_eq!(
            provider.batch_policy(),
            BatchPolicy {
                size: 5,
                delay: Duration::from_millis(500)
            }
        );
    }
}
