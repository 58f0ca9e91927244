use crate::traits::{LlmClient, LlmResponse};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use truth_common::{Result, TruthError};
use truth_http::{HttpClient, HttpError, StatusCode};

/// Web-search completions can take a while.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Perplexity Sonar over the OpenAI-compatible `chat/completions` endpoint.
pub struct PerplexityClient {
    client: HttpClient,
    api_key: Option<String>,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    total_tokens: Option<u32>,
}

impl PerplexityClient {
    pub fn new(endpoint: &str, api_key: Option<String>, model: String) -> Result<Self> {
        let client = HttpClient::new(endpoint)
            .map_err(|e| TruthError::Config(format!("Perplexity endpoint: {e}")))?
            .with_timeout(REQUEST_TIMEOUT);
        Ok(Self {
            client,
            api_key,
            model,
        })
    }
}

#[async_trait]
impl LlmClient for PerplexityClient {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(TruthError::Config("PERPLEXITY_API_KEY not configured".into()));
        };

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system_prompt {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });
        let req = ChatRequest {
            model: &self.model,
            messages,
            temperature,
            max_tokens,
        };

        tracing::info!(model = %self.model, prompt_chars = prompt.chars().count(), "llm.perplexity.request");
        let resp: ChatResponse = self
            .client
            .post_json("chat/completions", Some(api_key), &req)
            .await
            .map_err(http_to_truth)?;

        let text = resp
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| TruthError::AnalysisFailed("completion had no choices".into()))?;

        tracing::debug!(reply_chars = text.chars().count(), "llm.perplexity.reply");
        Ok(LlmResponse {
            text,
            model: resp.model,
            tokens_used: resp.usage.and_then(|u| u.total_tokens),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

fn http_to_truth(e: HttpError) -> TruthError {
    match e {
        HttpError::Api { status, .. } if status == StatusCode::UNAUTHORIZED => {
            TruthError::InvalidCredential("Perplexity rejected the API key".into())
        }
        HttpError::Api {
            status, message, ..
        } if status == StatusCode::TOO_MANY_REQUESTS => TruthError::RateLimit(message),
        HttpError::Timeout(after) => TruthError::Timeout(format!("no reply after {after:?}")),
        other => TruthError::AnalysisFailed(other.to_string()),
    }
}
