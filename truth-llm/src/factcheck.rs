//! Claim fact-checking on top of an [`LlmClient`].

use crate::schema::{sanitize, FactCheckResult, Verdict};
use crate::traits::LlmClient;
use regex::Regex;
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use truth_common::{Result, TruthError};

const TEMPERATURE: f32 = 0.2;
const MAX_TOKENS: u32 = 4000;
const OVERVIEW_PREVIEW_CHARS: usize = 500;

pub const SYSTEM_PROMPT: &str = r#"You are an expert fact-checker with real-time web access. Analyze the given claim and provide a comprehensive fact-check response in JSON format.

IMPORTANT: You MUST return a valid JSON object with exactly these fields and structure:

{
    "original_claim": "the exact claim text provided",
    "verdict": "TRUE" | "FALSE" | "MIXED" | "UNVERIFIED",
    "sources": [
        {
            "title": "source title",
            "url": "actual URL",
            "publication": "publication name",
            "date": "publication date",
            "credibility_rating": "high|medium|low",
            "source_type": "academic|news|government|medical|fact-check|blog"
        }
    ],
    "citations": [
        {
            "quote": "direct quote from source",
            "source_title": "title of source",
            "url": "URL to source",
            "page_number": "if applicable"
        }
    ],
    "biasness": {
        "overall_bias": "none|slight|moderate|high",
        "political_lean": "left|right|center|neutral",
        "bias_indicators": ["indicator1", "indicator2"],
        "bias_explanation": "explanation of detected bias"
    },
    "category": {
        "primary": "health|politics|science|technology|finance|social|general",
        "secondary": "specific subcategory",
        "tags": ["tag1", "tag2", "tag3"]
    },
    "related_articles": [
        {
            "title": "related article title",
            "url": "article URL",
            "publication": "publication name",
            "relevance": "why this is relevant",
            "summary": "brief summary"
        }
    ],
    "images": [
        {
            "description": "image description",
            "url": "image URL",
            "source": "image source website",
            "caption": "image caption if available"
        }
    ],
    "chain_of_thought": {
        "step_1": "Initial assessment of the claim",
        "step_2": "Search for relevant sources",
        "step_3": "Evaluate source credibility",
        "step_4": "Analyze evidence for and against",
        "step_5": "Consider context and nuance",
        "step_6": "Arrive at final verdict"
    },
    "reasoning": [
        "Key reason 1 supporting the verdict",
        "Key reason 2 supporting the verdict",
        "Key reason 3 supporting the verdict"
    ],
    "detailed_overview": "Comprehensive analysis of the claim including background context, key evidence, expert opinions, and why this verdict was reached",
    "media_coverage": {
        "left_leaning": ["publication1", "publication2"],
        "right_leaning": ["publication3", "publication4"],
        "center": ["publication5", "publication6"],
        "coverage_analysis": "How different media outlets with different biases covered this topic"
    }
}

CRITICAL REQUIREMENTS:
- Always include the original claim exactly as provided
- Include at least 3-5 credible sources with actual URLs
- Provide specific citations with quotes from sources
- Include detailed step-by-step reasoning
- Find at least 2-3 relevant images with actual URLs
- Analyze media coverage from different bias perspectives
- Provide a comprehensive detailed overview (minimum 200 words)
- Always provide image URLs for every related article and for the claim itself"#;

static FALSE_INDICATORS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(false|incorrect|misleading|debunked|myth|hoax)\b").expect("valid regex")
});

static TRUE_INDICATORS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(true|correct|accurate|verified|confirmed)\b").expect("valid regex")
});

/// The user turn: the claim, verbatim.
pub fn build_user_prompt(claim: &str) -> String {
    format!("Please fact-check this claim comprehensively: \"{claim}\"")
}

/// Pull a JSON value out of a model reply.
///
/// Tries the span from the first `{` to the last `}` (which skips prose and
/// code fences around the object), then the whole reply.
pub fn parse_reply(reply: &str) -> Option<Value> {
    if let (Some(start), Some(end)) = (reply.find('{'), reply.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str(&reply[start..=end]) {
                return Some(value);
            }
        }
    }
    serde_json::from_str(reply).ok()
}

/// Result for a reply that could not be parsed.
///
/// The verdict is guessed from keywords; refuting words win over
/// confirming ones when both appear.
pub fn fallback_response(reply: &str, claim: &str) -> FactCheckResult {
    let verdict = if FALSE_INDICATORS.is_match(reply) {
        Verdict::False
    } else if TRUE_INDICATORS.is_match(reply) {
        Verdict::True
    } else {
        Verdict::Unverified
    };
    let mut overview: String = reply.chars().take(OVERVIEW_PREVIEW_CHARS).collect();
    overview.push_str("...");
    FactCheckResult::unparsed(claim, verdict, overview)
}

#[derive(Clone)]
pub struct FactChecker {
    llm: Arc<dyn LlmClient + Send + Sync + 'static>,
}

impl FactChecker {
    pub fn new(llm: Arc<dyn LlmClient + Send + Sync + 'static>) -> Self {
        Self { llm }
    }

    pub fn model_name(&self) -> &str {
        self.llm.model_name()
    }

    pub fn is_configured(&self) -> bool {
        self.llm.is_configured()
    }

    /// Ask the model about `claim` and return a complete result.
    ///
    /// Fails only when the model call itself fails; an unusable reply is
    /// absorbed by [`fallback_response`].
    pub async fn analyze(&self, claim: &str) -> Result<FactCheckResult> {
        if !self.llm.is_configured() {
            return Err(TruthError::Config("PERPLEXITY_API_KEY not configured".into()));
        }

        let reply = self
            .llm
            .generate(
                &build_user_prompt(claim),
                Some(SYSTEM_PROMPT),
                Some(MAX_TOKENS),
                Some(TEMPERATURE),
            )
            .await?;

        let result = match parse_reply(&reply.text) {
            Some(value) => sanitize(&value, claim),
            None => {
                tracing::warn!(
                    reply_chars = reply.text.chars().count(),
                    "llm.factcheck.unparseable: using keyword fallback"
                );
                fallback_response(&reply.text, claim)
            }
        };
        tracing::info!(
            verdict = ?result.verdict,
            sources = result.sources.len(),
            model = reply.model.as_deref().unwrap_or_else(|| self.llm.model_name()),
            tokens_used = reply.tokens_used,
            "llm.factcheck.done"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_skips_prose_and_fences() {
        let reply = "Here is my analysis:\n```json\n{\"verdict\": \"FALSE\", \"reasoning\": [\"x\"]}\n```\nHope this helps.";
        assert_eq!(
            parse_reply(reply),
            Some(json!({"verdict": "FALSE", "reasoning": ["x"]}))
        );
    }

    #[test]
    fn parse_spans_nested_objects() {
        let reply = r#"{"category": {"primary": "health"}, "verdict": "TRUE"}"#;
        assert_eq!(parse_reply(reply).unwrap()["category"]["primary"], "health");
    }

    #[test]
    fn parse_falls_back_to_whole_reply() {
        assert_eq!(parse_reply("[1, 2]"), Some(json!([1, 2])));
        assert_eq!(parse_reply("} not json {"), None);
        assert_eq!(parse_reply("The claim is false."), None);
    }

    #[test]
    fn fallback_prefers_refuting_keywords() {
        let got = fallback_response("This is true in part but mostly a hoax.", "claim");
        assert_eq!(got.verdict, Verdict::False);
        assert_eq!(got.original_claim, "claim");
        assert_eq!(got.detailed_overview, "This is true in part but mostly a hoax....");
    }

    #[test]
    fn fallback_confirming_and_neutral() {
        assert_eq!(
            fallback_response("Officials confirmed the report.", "c").verdict,
            Verdict::True
        );
        assert_eq!(
            fallback_response("Nobody knows yet.", "c").verdict,
            Verdict::Unverified
        );
    }

    #[test]
    fn fallback_overview_is_truncated_by_chars() {
        let long = "é".repeat(600);
        let got = fallback_response(&long, "c");
        assert_eq!(got.detailed_overview.chars().count(), 503);
        assert!(got.detailed_overview.ends_with("..."));
    }

    #[test]
    fn user_prompt_embeds_claim() {
        assert_eq!(
            build_user_prompt("5G spreads viruses"),
            "Please fact-check this claim comprehensively: \"5G spreads viruses\""
        );
    }
}
