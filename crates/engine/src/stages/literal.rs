//! Literal word-overlap matching.

use std::collections::BTreeSet;

use wayfinder_core::ActionCandidate;

use super::{StageHit, candidate_token_set};
use crate::normalize::NormalizedIntent;

/// Overlap ratio between intent tokens and a candidate's token set:
/// `|intersection| / max(|intent|, |candidate|)`.
pub fn score(intent: &NormalizedIntent, candidate: &ActionCandidate) -> f64 {
    let intent_tokens: BTreeSet<&str> = intent.tokens.iter().map(String::as_str).collect();
    let candidate_tokens = candidate_token_set(candidate, &intent.language);

    if intent_tokens.is_empty() || candidate_tokens.is_empty() {
        return 0.0;
    }

    let intersection = intent_tokens
        .iter()
        .filter(|t| candidate_tokens.contains(**t))
        .count();
    intersection as f64 / intent_tokens.len().max(candidate_tokens.len()) as f64
}

/// Highest-scoring candidate, ties broken by first occurrence.
pub fn best(intent: &NormalizedIntent, candidates: &[ActionCandidate]) -> Option<StageHit> {
    candidates
        .iter()
        .enumerate()
        .map(|(i, c)| StageHit { candidate_index: i, score: score(intent, c) })
        .max_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use wayfinder_core::Language;

    use crate::normalize::normalize;

    use super::*;

    fn candidate(text: &str, href: Option<&str>) -> ActionCandidate {
        ActionCandidate {
            selector: "#c".into(),
            kind: "a".into(),
            text: text.into(),
            href: href.map(str::to_string),
            context_attributes: BTreeMap::new(),
        }
    }

    #[test]
    fn test_exact_text_scores_one() {
        let intent = normalize("about us", &Language::En);
        assert_eq!(score(&intent, &candidate("About Us", None)), 1.0);
    }

    #[test]
    fn test_case_and_filler_insensitive() {
        let intent = normalize("take me to the About Us page", &Language::En);
        assert_eq!(score(&intent, &candidate("ABOUT US", Some("/about-us"))), 1.0);
    }

    #[test]
    fn test_partial_overlap() {
        let intent = normalize("contact sales team", &Language::En);
        let s = score(&intent, &candidate("Contact", None));
        assert!((s - 1.0 / 3.0).abs() < 1e-9, "{s}");
    }

    #[test]
    fn test_disjoint_scores_zero() {
        let intent = normalize("pricing", &Language::En);
        assert_eq!(score(&intent, &candidate("Careers", None)), 0.0);
    }

    #[test]
    fn test_best_picks_highest() {
        let intent = normalize("about us", &Language::En);
        let candidates = vec![
            candidate("Careers", None),
            candidate("About Us", None),
            candidate("About", None),
        ];
        let hit = best(&intent, &candidates).unwrap();
        assert_eq!(hit.candidate_index, 1);
        assert_eq!(hit.score, 1.0);
    }
}
