//! Fold per-frame OCR results into one text.
//!
//! Consecutive video frames mostly show the same caption, so the merger
//! drops exact repeats (case-insensitive) and near-duplicates (token
//! Jaccard similarity above 0.8), keeping the higher-confidence copy.

use crate::OcrResult;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use truth_text::{normalize, similarity};

const MIN_FULL_TEXT_CHARS: usize = 10;
const MIN_FULL_TEXT_CONFIDENCE: f64 = 0.3;
const MIN_SEGMENT_CHARS: usize = 2;
const DUPLICATE_SIMILARITY: f64 = 0.8;

static DOUBLE_PERIOD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.\s*\.").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedText {
    pub combined_text: String,
    /// Confidence of the highest-ranked kept segment, 0 when none survive.
    pub confidence: f64,
    pub text_segments: usize,
}

struct Segment {
    text: String,
    confidence: f64,
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

pub fn merge_texts(results: &[OcrResult]) -> MergedText {
    let mut candidates = Vec::new();
    let mut seen = HashSet::new();

    for result in results {
        if char_len(&result.full_text) > MIN_FULL_TEXT_CHARS
            && result.confidence > MIN_FULL_TEXT_CONFIDENCE
        {
            let cleaned = normalize(&result.full_text);
            if char_len(&cleaned) > MIN_FULL_TEXT_CHARS {
                candidates.push(Segment {
                    text: cleaned,
                    confidence: result.confidence,
                });
            }
        }

        for text in &result.individual_texts {
            if char_len(text) <= MIN_SEGMENT_CHARS {
                continue;
            }
            let cleaned = normalize(text);
            if char_len(&cleaned) > MIN_SEGMENT_CHARS && seen.insert(cleaned.to_lowercase()) {
                candidates.push(Segment {
                    text: cleaned,
                    confidence: result.confidence,
                });
            }
        }
    }

    // stable: equal confidences keep frame order
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<(Segment, String)> = Vec::new();
    for segment in candidates {
        let lowered = segment.text.to_lowercase();
        let duplicate = kept
            .iter()
            .any(|(_, existing)| similarity(&lowered, existing) > DUPLICATE_SIMILARITY);
        if !duplicate {
            kept.push((segment, lowered));
        }
    }

    let joined = kept
        .iter()
        .map(|(segment, _)| segment.text.as_str())
        .collect::<Vec<_>>()
        .join(". ");
    let joined = DOUBLE_PERIOD.replace_all(&joined, ".");
    let combined_text = WHITESPACE.replace_all(&joined, " ").trim().to_string();

    tracing::debug!(
        frames = results.len(),
        kept = kept.len(),
        chars = char_len(&combined_text),
        "ocr.merge.done"
    );

    MergedText {
        combined_text,
        confidence: kept.first().map_or(0.0, |(segment, _)| segment.confidence),
        text_segments: kept.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(full: &str, parts: &[&str], confidence: f64) -> OcrResult {
        OcrResult {
            full_text: full.into(),
            individual_texts: parts.iter().map(|s| s.to_string()).collect(),
            confidence,
            bounding_boxes: Vec::new(),
        }
    }

    #[test]
    fn nothing_to_merge() {
        assert_eq!(merge_texts(&[]), MergedText::default());
        assert_eq!(merge_texts(&[OcrResult::empty()]), MergedText::default());
    }

    #[test]
    fn repeated_caption_across_frames_kept_once() {
        let caption = "The senate passed the budget bill today";
        let results = vec![
            frame(caption, &[], 0.9),
            frame(caption, &[], 0.8),
            frame(caption, &[], 0.95),
        ];
        let merged = merge_texts(&results);
        assert_eq!(merged.combined_text, caption);
        assert_eq!(merged.text_segments, 1);
        assert_eq!(merged.confidence, 0.95);
    }

    #[test]
    fn full_text_differing_in_case_and_padding_merges() {
        let results = vec![
            frame("Drinking bleach cures the flu  ", &[], 0.9),
            frame("DRINKING BLEACH CURES THE FLU", &[], 0.9),
        ];
        let merged = merge_texts(&results);
        assert_eq!(merged.text_segments, 1);
        assert_eq!(merged.combined_text, "Drinking bleach cures the flu");
    }

    #[test]
    fn low_confidence_full_text_is_skipped() {
        let merged = merge_texts(&[frame("Aliens landed in the park", &[], 0.2)]);
        assert_eq!(merged.combined_text, "");
    }

    #[test]
    fn segments_are_deduplicated_case_insensitively() {
        let results = vec![
            frame("", &["Vaccines", "WORK"], 0.9),
            frame("", &["vaccines", "Doctors agree"], 0.7),
        ];
        let merged = merge_texts(&results);
        // "WORK" normalizes to a four-char sentence and survives
        assert_eq!(merged.combined_text, "Vaccines. WORK. Doctors agree");
        assert_eq!(merged.text_segments, 3);
    }

    #[test]
    fn higher_confidence_text_comes_first() {
        let results = vec![
            frame("Second headline about taxes", &[], 0.5),
            frame("First headline about rockets", &[], 0.9),
        ];
        let merged = merge_texts(&results);
        assert_eq!(
            merged.combined_text,
            "First headline about rockets. Second headline about taxes"
        );
        assert_eq!(merged.confidence, 0.9);
    }

    #[test]
    fn near_duplicates_are_dropped() {
        let results = vec![
            frame("the moon landing was staged in a studio", &[], 0.9),
            frame("the moon landing was staged in a studio lot", &[], 0.6),
        ];
        // 8 shared tokens out of 9 -> 0.89 > 0.8
        assert_eq!(merge_texts(&results).text_segments, 1);
    }
}
