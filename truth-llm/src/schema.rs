//! The fact-check result schema and the coercion that guarantees it.
//!
//! Model replies are loosely structured: fields go missing, lists overflow,
//! enums come back in the wrong case. [`sanitize`] reads a reply as untyped
//! JSON and produces a [`FactCheckResult`] with every field populated.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const MAX_SOURCES: usize = 15;
const MAX_CITATIONS: usize = 10;
const MAX_RELATED_ARTICLES: usize = 10;
const MAX_IMAGES: usize = 8;
const MAX_REASONS: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    True,
    False,
    Mixed,
    #[default]
    Unverified,
}

impl Verdict {
    /// Exact upper-case tokens only; anything else is `Unverified`.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "TRUE" => Verdict::True,
            "FALSE" => Verdict::False,
            "MIXED" => Verdict::Mixed,
            _ => Verdict::Unverified,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Credibility {
    High,
    #[default]
    Medium,
    Low,
}

impl Credibility {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" => Credibility::High,
            "low" => Credibility::Low,
            _ => Credibility::Medium,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub url: String,
    pub publication: String,
    pub date: String,
    pub credibility_rating: Credibility,
    pub source_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub quote: String,
    pub source_title: String,
    pub url: String,
    pub page_number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub url: String,
    pub publication: String,
    pub relevance: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    pub description: String,
    pub url: String,
    pub source: String,
    pub caption: String,
}

/// The model's own bias assessment of the claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasOutwardReport {
    pub overall_bias: String,
    pub political_lean: String,
    pub bias_indicators: Vec<String>,
    pub bias_explanation: String,
}

impl BiasOutwardReport {
    fn neutral(explanation: &str) -> Self {
        Self {
            overall_bias: "none".into(),
            political_lean: "neutral".into(),
            bias_indicators: Vec::new(),
            bias_explanation: explanation.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub primary: String,
    pub secondary: String,
    /// Unique, in first-seen order.
    pub tags: Vec<String>,
}

impl Default for Category {
    fn default() -> Self {
        Self {
            primary: "general".into(),
            secondary: "unclassified".into(),
            tags: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainOfThought {
    pub step_1: String,
    pub step_2: String,
    pub step_3: String,
    pub step_4: String,
    pub step_5: String,
    pub step_6: String,
}

impl ChainOfThought {
    fn from_steps(steps: [&str; 6]) -> Self {
        let [s1, s2, s3, s4, s5, s6] = steps.map(String::from);
        Self {
            step_1: s1,
            step_2: s2,
            step_3: s3,
            step_4: s4,
            step_5: s5,
            step_6: s6,
        }
    }
}

impl Default for ChainOfThought {
    fn default() -> Self {
        Self::from_steps([
            "Claim received",
            "Sources searched",
            "Evidence evaluated",
            "Context considered",
            "Verdict reached",
            "Response formatted",
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaCoverage {
    pub left_leaning: Vec<String>,
    pub right_leaning: Vec<String>,
    pub center: Vec<String>,
    pub coverage_analysis: String,
}

impl MediaCoverage {
    fn empty(analysis: &str) -> Self {
        Self {
            left_leaning: Vec::new(),
            right_leaning: Vec::new(),
            center: Vec::new(),
            coverage_analysis: analysis.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactCheckResult {
    pub original_claim: String,
    pub verdict: Verdict,
    pub sources: Vec<Source>,
    pub citations: Vec<Citation>,
    pub biasness: BiasOutwardReport,
    pub category: Category,
    pub related_articles: Vec<Article>,
    pub images: Vec<ImageRef>,
    pub chain_of_thought: ChainOfThought,
    pub reasoning: Vec<String>,
    pub detailed_overview: String,
    pub media_coverage: MediaCoverage,
}

impl FactCheckResult {
    /// The result reported when an upload held no readable text.
    pub fn no_content() -> Self {
        Self {
            original_claim: String::new(),
            verdict: Verdict::Unverified,
            sources: Vec::new(),
            citations: Vec::new(),
            biasness: BiasOutwardReport::neutral("No text content to analyze"),
            category: Category::default(),
            related_articles: Vec::new(),
            images: Vec::new(),
            chain_of_thought: ChainOfThought::from_steps([
                "Media received for analysis",
                "OCR processing performed",
                "No meaningful text extracted",
                "Cannot perform fact-checking",
                "Returning unverified status",
                "Analysis complete",
            ]),
            reasoning: vec!["No text content found in media to fact-check".into()],
            detailed_overview: "The media file was processed but no meaningful text content \
                                could be extracted for fact-checking."
                .into(),
            media_coverage: MediaCoverage::empty(
                "No text content available for media coverage analysis",
            ),
        }
    }

    /// The result built from an unparseable reply: keyword verdict, raw text as overview.
    pub fn unparsed(claim: &str, verdict: Verdict, overview: String) -> Self {
        Self {
            original_claim: claim.to_string(),
            verdict,
            sources: Vec::new(),
            citations: Vec::new(),
            biasness: BiasOutwardReport::neutral("Unable to assess bias due to parsing issues"),
            category: Category::default(),
            related_articles: Vec::new(),
            images: Vec::new(),
            chain_of_thought: ChainOfThought::from_steps([
                "Received claim for analysis",
                "Attempted to parse AI response",
                "Parsing failed, using fallback",
                "Limited analysis performed",
                "Basic verdict assessment",
                "Fallback response generated",
            ]),
            reasoning: vec![
                "Analysis based on limited parsing of AI response".into(),
                "Unable to access full structured data".into(),
                "Fallback verdict based on keyword detection".into(),
            ],
            detailed_overview: overview,
            media_coverage: MediaCoverage::empty(
                "Unable to analyze media coverage due to parsing issues",
            ),
        }
    }
}

// ---- coercion helpers ----

/// Non-blank strings and numbers; everything else counts as missing.
fn text(v: Option<&Value>) -> Option<String> {
    match v? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn text_or(obj: &Map<String, Value>, key: &str, default: &str) -> String {
    text(obj.get(key)).unwrap_or_else(|| default.to_string())
}

fn string_list(v: Option<&Value>) -> Vec<String> {
    match v {
        Some(Value::Array(items)) => items.iter().filter_map(|i| text(Some(i))).collect(),
        _ => Vec::new(),
    }
}

fn objects(v: Option<&Value>, cap: usize) -> impl Iterator<Item = &Map<String, Value>> {
    v.and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
        .take(cap)
}

fn source(obj: &Map<String, Value>) -> Source {
    Source {
        title: text_or(obj, "title", "Unknown Source"),
        url: text_or(obj, "url", ""),
        publication: text_or(obj, "publication", ""),
        date: text_or(obj, "date", ""),
        credibility_rating: text(obj.get("credibility_rating"))
            .map(|r| Credibility::parse(&r))
            .unwrap_or_default(),
        source_type: text_or(obj, "source_type", "unknown"),
    }
}

fn citation(obj: &Map<String, Value>) -> Citation {
    Citation {
        quote: text_or(obj, "quote", ""),
        source_title: text_or(obj, "source_title", ""),
        url: text_or(obj, "url", ""),
        page_number: text_or(obj, "page_number", ""),
    }
}

fn article(obj: &Map<String, Value>) -> Article {
    Article {
        title: text_or(obj, "title", ""),
        url: text_or(obj, "url", ""),
        publication: text_or(obj, "publication", ""),
        relevance: text_or(obj, "relevance", ""),
        summary: text_or(obj, "summary", ""),
    }
}

fn image(obj: &Map<String, Value>) -> ImageRef {
    ImageRef {
        description: text_or(obj, "description", ""),
        url: text_or(obj, "url", ""),
        source: text_or(obj, "source", ""),
        caption: text_or(obj, "caption", ""),
    }
}

fn biasness(v: Option<&Value>) -> BiasOutwardReport {
    let fallback = BiasOutwardReport::neutral("No bias assessment available");
    let Some(obj) = v.and_then(Value::as_object) else {
        return fallback;
    };
    BiasOutwardReport {
        overall_bias: text_or(obj, "overall_bias", &fallback.overall_bias),
        political_lean: text_or(obj, "political_lean", &fallback.political_lean),
        bias_indicators: string_list(obj.get("bias_indicators")),
        bias_explanation: text_or(obj, "bias_explanation", &fallback.bias_explanation),
    }
}

fn category(v: Option<&Value>) -> Category {
    let fallback = Category::default();
    let Some(obj) = v.and_then(Value::as_object) else {
        return fallback;
    };
    let mut tags: Vec<String> = Vec::new();
    for tag in string_list(obj.get("tags")) {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    Category {
        primary: text_or(obj, "primary", &fallback.primary),
        secondary: text_or(obj, "secondary", &fallback.secondary),
        tags,
    }
}

fn chain_of_thought(v: Option<&Value>) -> ChainOfThought {
    let fallback = ChainOfThought::default();
    let Some(obj) = v.and_then(Value::as_object) else {
        return fallback;
    };
    ChainOfThought {
        step_1: text_or(obj, "step_1", &fallback.step_1),
        step_2: text_or(obj, "step_2", &fallback.step_2),
        step_3: text_or(obj, "step_3", &fallback.step_3),
        step_4: text_or(obj, "step_4", &fallback.step_4),
        step_5: text_or(obj, "step_5", &fallback.step_5),
        step_6: text_or(obj, "step_6", &fallback.step_6),
    }
}

fn media_coverage(v: Option<&Value>) -> MediaCoverage {
    let fallback = MediaCoverage::empty("No media coverage analysis available");
    let Some(obj) = v.and_then(Value::as_object) else {
        return fallback;
    };
    MediaCoverage {
        left_leaning: string_list(obj.get("left_leaning")),
        right_leaning: string_list(obj.get("right_leaning")),
        center: string_list(obj.get("center")),
        coverage_analysis: text_or(obj, "coverage_analysis", &fallback.coverage_analysis),
    }
}

/// Coerce a parsed model reply into a complete [`FactCheckResult`].
///
/// Non-object replies are treated as empty objects. `claim` stands in for a
/// missing `original_claim`.
pub fn sanitize(reply: &Value, claim: &str) -> FactCheckResult {
    let empty = Map::new();
    let obj = reply.as_object().unwrap_or(&empty);

    FactCheckResult {
        original_claim: text_or(obj, "original_claim", claim),
        verdict: text(obj.get("verdict"))
            .map(|v| Verdict::parse(&v))
            .unwrap_or_default(),
        sources: objects(obj.get("sources"), MAX_SOURCES).map(source).collect(),
        citations: objects(obj.get("citations"), MAX_CITATIONS)
            .map(citation)
            .collect(),
        biasness: biasness(obj.get("biasness")),
        category: category(obj.get("category")),
        related_articles: objects(obj.get("related_articles"), MAX_RELATED_ARTICLES)
            .map(article)
            .collect(),
        images: objects(obj.get("images"), MAX_IMAGES).map(image).collect(),
        chain_of_thought: chain_of_thought(obj.get("chain_of_thought")),
        reasoning: string_list(obj.get("reasoning"))
            .into_iter()
            .take(MAX_REASONS)
            .collect(),
        detailed_overview: text_or(obj, "detailed_overview", "No detailed overview available"),
        media_coverage: media_coverage(obj.get("media_coverage")),
    }
}
