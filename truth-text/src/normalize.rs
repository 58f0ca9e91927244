//! OCR text cleanup.
//!
//! Screenshots of social posts carry a lot of interface chrome: action
//! labels, platform names, timestamps, counters, emoji. [`normalize`] strips
//! that noise and re-assembles what is left into `". "`-joined sentences.

use regex::Regex;
use std::sync::LazyLock;

/// Sentences at or below this many characters are dropped.
const MIN_SENTENCE_CHARS: usize = 3;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("valid regex"));

static UI_ACTIONS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(play|pause|stop|share|like|subscribe|follow|comment|reply|retweet|heart|thumbs?\s?up)\b",
    )
    .expect("valid regex")
});

static PLATFORMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(instagram|facebook|twitter|tiktok|youtube|snapchat)\b")
        .expect("valid regex")
});

static CLOCK_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[0-9]{1,2}:[0-9]{2}(:[0-9]{2})?\s?(AM|PM)?\b").expect("valid regex")
});

static DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[0-9]{1,2}/[0-9]{1,2}/[0-9]{2,4}\b").expect("valid regex"));

static DIGIT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").expect("valid regex"));

static DISALLOWED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[^A-Za-z0-9_\s\x{00C0}-\x{017F}.,!?;:'"()\-]"#).expect("valid regex")
});

static SPACE_BEFORE_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+([.,!?;:])").expect("valid regex"));

static TERMINATOR_THEN_CAPITAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([.!?])\s*([A-Z])").expect("valid regex"));

static TERMINATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]+").expect("valid regex"));

/// Clean raw OCR text.
///
/// Returns an empty string for empty input. The result never has leading or
/// trailing whitespace and `normalize(&normalize(s)) == normalize(s)`.
///
/// ```
/// use truth_text::normalize;
///
/// let raw = "BREAKING 10:30 AM  Like  Share\nThe bridge collapsed yesterday!! 4521";
/// assert_eq!(normalize(raw), "BREAKING The bridge collapsed yesterday");
/// ```
pub fn normalize(raw: &str) -> String {
    // A pass can expose new noise ("thumbs like up" becomes "thumbs up"), so
    // repeat until stable. Each layer costs at least one word of input.
    let mut current = clean_once(raw);
    for _ in 0..raw.chars().count() {
        let next = clean_once(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn clean_once(raw: &str) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }

    let text = WHITESPACE.replace_all(raw, " ");
    let text = BLANK_LINES.replace_all(&text, "\n");
    let text = UI_ACTIONS.replace_all(&text, "");
    let text = PLATFORMS.replace_all(&text, "");
    let text = CLOCK_TIME.replace_all(&text, "");
    let text = DATE.replace_all(&text, "");
    let text = strip_standalone_numbers(&text);
    let text = DISALLOWED.replace_all(&text, " ");
    let text = SPACE_BEFORE_PUNCT.replace_all(&text, "$1");
    let text = TERMINATOR_THEN_CAPITAL.replace_all(&text, "$1 $2");

    TERMINATORS
        .split(&text)
        .map(|sentence| WHITESPACE.replace_all(sentence.trim(), " ").into_owned())
        .filter(|sentence| sentence.chars().count() > MIN_SENTENCE_CHARS)
        .collect::<Vec<_>>()
        .join(". ")
        .trim()
        .to_string()
}

fn is_ascii_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Drop digit runs that are not glued to a word character on either side
/// ("3 times" loses the 3, "user42" and "3rd" keep theirs).
fn strip_standalone_numbers(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for m in DIGIT_RUN.find_iter(text) {
        let before = text[..m.start()].chars().next_back();
        let after = text[m.end()..].chars().next();
        let glued = before.is_some_and(is_ascii_word) || after.is_some_and(is_ascii_word);
        if glued {
            continue;
        }
        out.push_str(&text[last..m.start()]);
        last = m.end();
    }
    out.push_str(&text[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_blank_inputs_yield_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \n\t "), "");
    }

    #[test]
    fn strips_ui_chrome_times_and_dates() {
        let raw = "Breaking news 10:30 AM   Like and Subscribe! Vaccines cause autism 12/25/2023";
        assert_eq!(normalize(raw), "Breaking news and. Vaccines cause autism");
    }

    #[test]
    fn drops_short_sentences() {
        assert_eq!(
            normalize("Hi. This is a real sentence. Ok"),
            "This is a real sentence"
        );
    }

    #[test]
    fn keeps_numbers_attached_to_words() {
        assert_eq!(
            normalize("Posted 3 times by user42 on the 3rd"),
            "Posted times by user42 on the 3rd"
        );
    }

    #[test]
    fn replaces_symbols_and_keeps_accents() {
        assert_eq!(normalize("Price 💰 rises #fast"), "Price rises fast");
        assert_eq!(normalize("Café résumé naïve text"), "Café résumé naïve text");
    }

    #[test]
    fn separates_run_on_sentences() {
        assert_eq!(
            normalize("The vote was rigged.Officials deny it"),
            "The vote was rigged. Officials deny it"
        );
    }

    #[test]
    fn deeply_nested_actions_are_fully_peeled() {
        let raw = format!(
            "keep this sentence {}like {}end",
            "thumbs ".repeat(10),
            "up ".repeat(10)
        );
        assert_eq!(normalize(&raw), "keep this sentence end");
    }

    #[test]
    fn normalization_is_idempotent() {
        let samples = [
            "Hello like world, this is fine",
            "thumbs like up the story continues here",
            "WATCH: 12:01:59 pm the senator   said 1000 things!!! Really?",
            "  Instagram  TikTok\n\n\nfollow  for more   ",
            "a. b. c. longer sentence here. 99 . ..",
            "Ünïcödé ✓ text — with dashes – and “quotes”",
        ];
        let nested = format!(
            "keep this sentence {}like {}end",
            "thumbs ".repeat(10),
            "up ".repeat(10)
        );
        let samples = samples.iter().copied().chain([nested.as_str()]);
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {s:?}");
            assert_eq!(once.trim(), once);
        }
    }
}
