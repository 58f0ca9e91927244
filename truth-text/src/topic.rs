//! Keyword topic classification over a fixed taxonomy.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// category -> [(subcategory, keyword alternatives)], in scan order.
const TAXONOMY: &[(&str, &[(&str, &str)])] = &[
    (
        "health",
        &[
            (
                "vaccine",
                "vaccine|vaccination|vaxx|pfizer|moderna|johnson|astrazeneca|covid|coronavirus|mrna|spike protein",
            ),
            (
                "medical",
                "medicine|drug|treatment|cure|doctor|hospital|surgery|pill|medication|therapy|diagnosis",
            ),
            (
                "nutrition",
                "diet|food|nutrition|supplement|vitamin|organic|gmo|processed|natural|superfood",
            ),
            (
                "mental",
                "depression|anxiety|mental health|therapy|psychiatrist|antidepressant|suicide|stress",
            ),
        ],
    ),
    (
        "politics",
        &[
            (
                "election",
                "election|vote|voting|ballot|candidate|poll|democracy|fraud|rigged|stolen",
            ),
            (
                "government",
                "government|congress|senate|president|politician|policy|law|regulation|tax|biden|trump",
            ),
            (
                "conspiracy",
                "deep state|illuminati|new world order|agenda|elite|control|manipulation|cover-up|secret",
            ),
            (
                "international",
                "war|ukraine|russia|china|nato|un|sanctions|diplomacy|treaty|alliance",
            ),
        ],
    ),
    (
        "technology",
        &[
            (
                "ai",
                "ai|artificial intelligence|chatgpt|machine learning|robot|automation|algorithm|neural",
            ),
            (
                "social",
                "facebook|twitter|instagram|tiktok|youtube|social media|platform|censorship|ban",
            ),
            (
                "privacy",
                "privacy|surveillance|tracking|data|personal information|hack|breach|security",
            ),
            (
                "crypto",
                "bitcoin|crypto|cryptocurrency|blockchain|nft|ethereum|dogecoin|mining|wallet",
            ),
        ],
    ),
    (
        "science",
        &[
            (
                "climate",
                "climate|global warming|carbon|emissions|temperature|glacier|ice caps|fossil fuels",
            ),
            (
                "space",
                "space|nasa|mars|moon|asteroid|satellite|rocket|astronaut|alien|ufo",
            ),
            (
                "physics",
                "quantum|physics|energy|gravity|universe|theory|relativity|particle|atom",
            ),
        ],
    ),
    (
        "finance",
        &[
            (
                "economy",
                "economy|recession|inflation|gdp|unemployment|market|stock|crash|bull|bear",
            ),
            (
                "banking",
                "bank|federal reserve|interest rate|loan|mortgage|debt|credit|investment|wall street",
            ),
            (
                "personal",
                "money|salary|wage|income|savings|retirement|pension|401k|financial advice",
            ),
        ],
    ),
];

struct Subcategory {
    category: &'static str,
    name: &'static str,
    pattern: Regex,
}

static SUBCATEGORIES: LazyLock<Vec<Subcategory>> = LazyLock::new(|| {
    TAXONOMY
        .iter()
        .flat_map(|(category, subs)| {
            subs.iter().map(move |(name, keywords)| Subcategory {
                category,
                name,
                pattern: Regex::new(&format!(r"(?i)\b(?:{keywords})\b")).expect("valid regex"),
            })
        })
        .collect()
});

/// Best-matching topic for a piece of text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicClassification {
    pub category: String,
    pub subcategory: String,
    pub confidence: f64,
    pub match_count: usize,
}

impl Default for TopicClassification {
    fn default() -> Self {
        Self {
            category: "general".into(),
            subcategory: "unclassified".into(),
            confidence: 0.0,
            match_count: 0,
        }
    }
}

/// Score `text` against every (category, subcategory) and keep the best one.
///
/// The score is the number of keyword hits. Ties keep the pair found first
/// in taxonomy order. Confidence saturates at three hits.
pub fn classify_topic(text: &str) -> TopicClassification {
    let text = text.to_lowercase();

    let mut best: Option<&Subcategory> = None;
    let mut max_score = 0usize;
    for sub in SUBCATEGORIES.iter() {
        let score = sub.pattern.find_iter(&text).count();
        if score > max_score {
            max_score = score;
            best = Some(sub);
        }
    }

    match best {
        Some(sub) => TopicClassification {
            category: sub.category.to_string(),
            subcategory: sub.name.to_string(),
            confidence: (max_score as f64 / 3.0).min(1.0),
            match_count: max_score,
        },
        None => TopicClassification::default(),
    }
}
