use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use truth_common::Result;

/// One completion from a chat model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    pub model: Option<String>,
    pub tokens_used: Option<u32>,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Sends one user turn, optionally preceded by a system turn.
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse>;

    /// Model requested when the reply does not name one.
    fn model_name(&self) -> &str;

    /// Whether credentials are present. Does not touch the network.
    fn is_configured(&self) -> bool;
}
