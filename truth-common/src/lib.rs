//! Common types and utilities shared across Truth crates.
//!
//! This crate defines the error taxonomy and observability helpers used
//! throughout the Truth workspace. It is intentionally lightweight so that
//! every crate can depend on it without introducing heavy transitive costs.
//!
//! # Overview
//!
//! - [`TruthError`] and [`Result`]: shared error handling
//! - [`observability`]: centralised tracing/logging initialisation
//!
//! # Examples
//!
//! ```rust
//! use truth_common::TruthError;
//!
//! let err = TruthError::RateLimit("slow down".into());
//! assert_eq!(err.label(), "rate_limit");
//! ```

pub mod observability;

/// Error types used across the Truth system.
///
/// The variants follow the failure modes of the analysis pipeline: input
/// validation, missing credentials, OCR provider failures (which are absorbed
/// per frame) and the AI fact-check service failures that surface to callers.
#[derive(thiserror::Error, Debug)]
pub enum TruthError {
    /// The request body had the wrong shape or size.
    #[error("{0}")]
    Validation(String),

    /// A required credential or setting is missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Google Vision rejected our credentials (permission denied or unauthenticated).
    #[error("Google Vision API: {0}")]
    VisionAuth(String),

    /// Google Vision quota exhausted.
    #[error("Google Vision API: {0}")]
    VisionQuota(String),

    /// Any other Google Vision failure.
    #[error("Vision API error: {0}")]
    VisionApi(String),

    /// The AI service rejected the API key.
    #[error("Invalid API key: {0}")]
    InvalidCredential(String),

    /// The AI service throttled us.
    #[error("AI service rate limit exceeded: {0}")]
    RateLimit(String),

    /// Operation exceeded its timeout.
    #[error("AI service request timeout: {0}")]
    Timeout(String),

    /// Catch-all for upstream analysis failures.
    #[error("Failed to analyze claim: {0}")]
    AnalysisFailed(String),
}

impl TruthError {
    /// Short machine-readable label, used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            TruthError::Validation(_) => "validation",
            TruthError::Config(_) => "config",
            TruthError::VisionAuth(_) => "vision_auth",
            TruthError::VisionQuota(_) => "vision_quota",
            TruthError::VisionApi(_) => "vision_api",
            TruthError::InvalidCredential(_) => "invalid_credential",
            TruthError::RateLimit(_) => "rate_limit",
            TruthError::Timeout(_) => "timeout",
            TruthError::AnalysisFailed(_) => "analysis_failed",
        }
    }
}

/// Convenient alias for results that use [`TruthError`].
pub type Result<T> = std::result::Result<T, TruthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_keeps_upstream_message() {
        let err = TruthError::AnalysisFailed("upstream exploded".into());
        assert_eq!(err.to_string(), "Failed to analyze claim: upstream exploded");
    }
}
