//! Lexical bias scoring.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

fn lexicon(words: &str) -> Regex {
    Regex::new(&format!(r"(?i)\b(?:{words})\b")).expect("valid regex")
}

static LEFT: LazyLock<Regex> = LazyLock::new(|| {
    lexicon("progressive|liberal|democrat|socialist|left-wing|antifa|blm|woke|inclusive")
});

static RIGHT: LazyLock<Regex> = LazyLock::new(|| {
    lexicon("conservative|republican|right-wing|maga|patriot|traditional|freedom|liberty")
});

static EMOTIONAL: LazyLock<Regex> = LazyLock::new(|| {
    lexicon(
        "outrageous|shocking|unbelievable|disgusting|amazing|incredible|devastating|heartbreaking",
    )
});

static AUTHORITY: LazyLock<Regex> = LazyLock::new(|| {
    lexicon(
        "experts say|scientists claim|government admits|leaked documents|insider reveals|whistleblower",
    )
});

static URGENCY: LazyLock<Regex> = LazyLock::new(|| {
    lexicon("breaking|urgent|act now|time is running out|before it's too late|immediately")
});

static ABSOLUTES: LazyLock<Regex> = LazyLock::new(|| {
    lexicon("never|always|all|none|every|completely|totally|absolutely|definitely|certainly")
});

/// Above this mean signal the text is flagged as biased.
const SIGNIFICANT_BIAS: f64 = 0.4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PoliticalLean {
    Left,
    Right,
    #[default]
    Neutral,
}

/// Per-dimension signals.
///
/// `political` is an imbalance ratio in `[0, 1]`. The other four are raw
/// match counts and are not normalized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BiasScores {
    pub political: f64,
    pub emotional: f64,
    pub authority: f64,
    pub urgency: f64,
    pub absolutes: f64,
}

impl BiasScores {
    fn sum(&self) -> f64 {
        self.political + self.emotional + self.authority + self.urgency + self.absolutes
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BiasAnalysis {
    pub scores: BiasScores,
    pub overall_bias: f64,
    pub political_lean: PoliticalLean,
    pub has_significant_bias: bool,
}

fn count(pattern: &Regex, text: &str) -> usize {
    pattern.find_iter(text).count()
}

/// Score `text` on political lean, emotional language, appeals to authority,
/// urgency and absolutist wording.
///
/// `overall_bias` is the mean of the five signals clamped to 1. Because four
/// of them are raw counts, a handful of matches saturates it; the
/// significance flag uses the unclamped mean.
pub fn detect_bias(text: &str) -> BiasAnalysis {
    let text = text.to_lowercase();

    let left = count(&LEFT, &text);
    let right = count(&RIGHT, &text);

    let scores = BiasScores {
        political: left.abs_diff(right) as f64 / (left + right).max(1) as f64,
        emotional: count(&EMOTIONAL, &text) as f64,
        authority: count(&AUTHORITY, &text) as f64,
        urgency: count(&URGENCY, &text) as f64,
        absolutes: count(&ABSOLUTES, &text) as f64,
    };

    let mean = scores.sum() / 5.0;
    let political_lean = match left.cmp(&right) {
        std::cmp::Ordering::Greater => PoliticalLean::Left,
        std::cmp::Ordering::Less => PoliticalLean::Right,
        std::cmp::Ordering::Equal => PoliticalLean::Neutral,
    };

    BiasAnalysis {
        scores,
        overall_bias: mean.min(1.0),
        political_lean,
        has_significant_bias: mean > SIGNIFICANT_BIAS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_left_hits_lean_left() {
        let got = detect_bias("The progressive and liberal coalition met today");
        assert_eq!(got.political_lean, PoliticalLean::Left);
        assert_eq!(got.scores.political, 1.0);
        assert!((got.overall_bias - 0.2).abs() < 1e-9);
        assert!(!got.has_significant_bias);
    }

    #[test]
    fn no_political_terms_is_neutral() {
        let got = detect_bias("The weather was mild this afternoon");
        assert_eq!(got.political_lean, PoliticalLean::Neutral);
        assert_eq!(got, BiasAnalysis::default());
    }

    #[test]
    fn balanced_terms_are_neutral() {
        let got = detect_bias("A liberal and a conservative walk into a bar");
        assert_eq!(got.political_lean, PoliticalLean::Neutral);
        assert_eq!(got.scores.political, 0.0);
    }

    #[test]
    fn right_lean_detected() {
        let got = detect_bias("MAGA patriots rally for freedom, one liberal watches");
        assert_eq!(got.political_lean, PoliticalLean::Right);
        // "patriots" is not a whole-word match for "patriot"
        assert!((got.scores.political - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn raw_counts_saturate_overall_bias() {
        let got = detect_bias(
            "BREAKING: shocking, outrageous news! Experts say it will never stop, always all of it",
        );
        assert_eq!(got.scores.emotional, 2.0);
        assert_eq!(got.scores.authority, 1.0);
        assert_eq!(got.scores.urgency, 1.0);
        assert_eq!(got.scores.absolutes, 3.0);
        assert_eq!(got.overall_bias, 1.0);
        assert!(got.has_significant_bias);
    }

    #[test]
    fn significance_uses_strict_threshold() {
        // two absolutes: mean is exactly 0.4
        let got = detect_bias("never say always");
        assert!((got.overall_bias - 0.4).abs() < 1e-9);
        assert!(!got.has_significant_bias);
    }

    #[test]
    fn serializes_camel_case_with_lowercase_lean() {
        let json = serde_json::to_value(detect_bias("woke")).unwrap();
        assert_eq!(json["politicalLean"], "left");
        assert_eq!(json["hasSignificantBias"], false);
        assert!(json["scores"]["political"].is_number());
        assert!(json["overallBias"].is_number());
    }
}
