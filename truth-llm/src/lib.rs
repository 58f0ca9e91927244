//! AI fact-checking for Truth.
//!
//! [`traits::LlmClient`] is the seam between the fact-check logic and the
//! model provider; [`perplexity::PerplexityClient`] implements it against
//! Perplexity's OpenAI-compatible chat completions API.
//! [`factcheck::FactChecker`] builds the prompt, calls the model and turns
//! whatever comes back into a fully populated [`schema::FactCheckResult`].
//!
//! # Examples
//! ```no_run
//! use truth_config::TruthConfigLoader;
//! use truth_llm::{build_llm_client, factcheck::FactChecker};
//!
//! # #[tokio::main]
//! # async fn main() -> truth_common::Result<()> {
//! let config = TruthConfigLoader::new().load().expect("config");
//! let checker = FactChecker::new(build_llm_client(&config.perplexity)?);
//! let result = checker.analyze("The Great Wall is visible from space").await?;
//! println!("{:?}", result.verdict);
//! # Ok(())
//! # }
//! ```
pub mod factcheck;
pub mod perplexity;
pub mod schema;
pub mod traits;

use perplexity::PerplexityClient;
use std::sync::Arc;
use traits::LlmClient;
use truth_config::PerplexityConfig;

/// Build the model client from configuration.
///
/// A missing API key is not an error here; the client reports it on first use.
pub fn build_llm_client(
    config: &PerplexityConfig,
) -> truth_common::Result<Arc<dyn LlmClient + Send + Sync + 'static>> {
    let client = PerplexityClient::new(
        &config.endpoint,
        config.api_key.clone(),
        config.model.clone(),
    )?;
    if !client.is_configured() {
        tracing::warn!("llm.perplexity.unconfigured: PERPLEXITY_API_KEY is not set");
    }
    Ok(Arc::new(client))
}
