use std::collections::HashSet;

/// Jaccard similarity of the whitespace-separated token sets of `a` and `b`.
///
/// Case-sensitive; callers lowercase first when they want case-folding.
/// Two inputs without any tokens score 0.
///
/// ```
/// use truth_text::similarity;
///
/// assert_eq!(similarity("the cat sat", "the cat sat"), 1.0);
/// assert_eq!(similarity("the cat", "the dog"), 1.0 / 3.0);
/// assert_eq!(similarity("", ""), 0.0);
/// ```
pub fn similarity(a: &str, b: &str) -> f64 {
    let left: HashSet<&str> = a.split_whitespace().collect();
    let right: HashSet<&str> = b.split_whitespace().collect();

    let union = left.union(&right).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = left.intersection(&right).count();
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_text_scores_one() {
        assert_eq!(similarity("vaccines cause autism", "vaccines cause autism"), 1.0);
    }

    #[test]
    fn duplicates_collapse() {
        assert_eq!(similarity("a a a b", "a b"), 1.0);
    }

    #[test]
    fn disjoint_text_scores_zero() {
        assert_eq!(similarity("alpha beta", "gamma delta"), 0.0);
        assert_eq!(similarity("alpha", ""), 0.0);
    }

    #[test]
    fn symmetric_and_bounded() {
        let pairs = [
            ("the moon landing was faked", "the moon landing happened"),
            ("one", "one two three four"),
            ("  padded   words ", "words"),
        ];
        for (a, b) in pairs {
            let ab = similarity(a, b);
            assert_eq!(ab, similarity(b, a));
            assert!((0.0..=1.0).contains(&ab));
        }
    }
}
