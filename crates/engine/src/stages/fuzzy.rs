//! Fuzzy matching: synonym expansion plus bounded edit distance.
//!
//! Distances use the optimal-string-alignment variant so a transposition
//! ("abuot" → "about") costs 1, matching how typos actually happen. Scores
//! decay linearly with distance and never reach the auto-execute band;
//! a fuzzy hit always needs confirmation.

use wayfinder_core::{ActionCandidate, Language};

use super::{StageHit, candidate_token_set};
use crate::dictionary::expand_token;
use crate::normalize::NormalizedIntent;

/// Edits beyond this are a different word, not a typo.
pub const MAX_EDIT_DISTANCE: usize = 2;

const SCORE_CEILING: f64 = 0.99;
const SCORE_DECAY: f64 = 0.09;

/// Optimal-string-alignment distance, bounded by `max`.
///
/// Returns `None` when the distance exceeds the bound; the length check up
/// front skips the table entirely for hopeless pairs.
pub fn osa_distance(a: &str, b: &str, max: usize) -> Option<usize> {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.len().abs_diff(b.len()) > max {
        return None;
    }
    if a.is_empty() {
        return (b.len() <= max).then_some(b.len());
    }
    if b.is_empty() {
        return (a.len() <= max).then_some(a.len());
    }

    let n = b.len();
    let mut prev2: Vec<usize> = vec![0; n + 1];
    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr: Vec<usize> = vec![0; n + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=n {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            let mut d = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                d = d.min(prev2[j - 2] + 1);
            }
            curr[j] = d;
        }
        std::mem::swap(&mut prev2, &mut prev);
        std::mem::swap(&mut prev, &mut curr);
    }

    let d = prev[n];
    (d <= max).then_some(d)
}

/// Monotonically decaying score for a total edit distance.
fn distance_score(distance: usize) -> f64 {
    SCORE_CEILING - SCORE_DECAY * distance as f64
}

/// Smallest total edit distance between the (synonym-expanded) intent and
/// one candidate, or `None` when nothing lands within the bound.
///
/// Two routes are tried and the cheaper one wins: per-token matching (every
/// intent token must reach some candidate token) and whole-phrase distance,
/// which covers spacing differences like "signin" vs "sign in".
fn candidate_distance(intent: &NormalizedIntent, candidate: &ActionCandidate, fallback: &Language) -> Option<usize> {
    let candidate_tokens = candidate_token_set(candidate, &intent.language);
    if candidate_tokens.is_empty() {
        return None;
    }

    let token_route = intent
        .tokens
        .iter()
        .map(|token| {
            expand_token(token, &intent.language, fallback)
                .iter()
                .flat_map(|variant| {
                    candidate_tokens
                        .iter()
                        .filter_map(|ct| osa_distance(variant, ct, MAX_EDIT_DISTANCE))
                })
                .min()
        })
        .sum::<Option<usize>>()
        .filter(|total| *total <= MAX_EDIT_DISTANCE);

    let phrase_route = osa_distance(
        &intent.text(),
        &candidate_tokens.iter().cloned().collect::<Vec<_>>().join(" "),
        MAX_EDIT_DISTANCE,
    );

    match (token_route, phrase_route) {
        (Some(t), Some(p)) => Some(t.min(p)),
        (route, None) | (None, route) => route,
    }
}

/// Closest candidate within the edit-distance bound.
pub fn best(intent: &NormalizedIntent, candidates: &[ActionCandidate], fallback: &Language) -> Option<StageHit> {
    candidates
        .iter()
        .enumerate()
        .filter_map(|(i, c)| {
            candidate_distance(intent, c, fallback).map(|d| (i, d))
        })
        .min_by_key(|(_, d)| *d)
        .map(|(i, d)| StageHit { candidate_index: i, score: distance_score(d) })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crate::normalize::normalize;

    use super::*;

    fn candidate(text: &str) -> ActionCandidate {
        ActionCandidate {
            selector: "#c".into(),
            kind: "a".into(),
            text: text.into(),
            href: None,
            context_attributes: BTreeMap::new(),
        }
    }

    #[test]
    fn test_osa_transposition_costs_one() {
        assert_eq!(osa_distance("abuot", "about", 2), Some(1));
    }

    #[test]
    fn test_osa_exact_and_substitution() {
        assert_eq!(osa_distance("cart", "cart", 2), Some(0));
        assert_eq!(osa_distance("cart", "carl", 2), Some(1));
    }

    #[test]
    fn test_osa_over_bound() {
        assert_eq!(osa_distance("kitten", "sitting", 2), None);
        assert_eq!(osa_distance("a", "abcd", 2), None);
    }

    #[test]
    fn test_typo_lands_in_confirm_band() {
        let intent = normalize("abuot us", &Language::En);
        let hit = best(&intent, &[candidate("About Us")], &Language::En).unwrap();
        assert!((hit.score - 0.90).abs() < 1e-9, "{}", hit.score);
        assert!((0.8..1.0).contains(&hit.score));
    }

    #[test]
    fn test_exact_match_stays_below_auto() {
        let intent = normalize("cart", &Language::En);
        let hit = best(&intent, &[candidate("Cart")], &Language::En).unwrap();
        assert_eq!(hit.score, SCORE_CEILING);
        assert!(hit.score < 1.0);
    }

    #[test]
    fn test_synonym_expansion_reaches_candidate() {
        let intent = normalize("signin", &Language::En);
        let hit = best(&intent, &[candidate("Login")], &Language::En).unwrap();
        assert_eq!(hit.score, SCORE_CEILING);
    }

    #[test]
    fn test_unrelated_candidate_no_hit() {
        let intent = normalize("pricing", &Language::En);
        assert!(best(&intent, &[candidate("Careers")], &Language::En).is_none());
    }

    #[test]
    fn test_closest_candidate_wins() {
        let intent = normalize("abuot", &Language::En);
        let candidates = vec![candidate("Abort"), candidate("About")];
        let hit = best(&intent, &candidates, &Language::En).unwrap();
        assert_eq!(hit.candidate_index, 1);
    }
}
