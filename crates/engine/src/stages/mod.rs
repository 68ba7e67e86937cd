//! Pure matcher stages of the waterfall.
//!
//! Each stage scores candidates in `[0, 1]` without touching the cache or
//! the network; the resolver owns ordering and thresholds.

pub mod common_action;
pub mod fuzzy;
pub mod literal;

use std::collections::BTreeSet;

use wayfinder_core::{ActionCandidate, Language};

use crate::normalize::{normalize, tokenize};

/// Best candidate one stage produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageHit {
    pub candidate_index: usize,
    pub score: f64,
}

/// Deduplicated token set a candidate can be matched against: normalized
/// visible text, href path segments, and context attribute values.
pub(crate) fn candidate_token_set(candidate: &ActionCandidate, language: &Language) -> BTreeSet<String> {
    let mut tokens: BTreeSet<String> = normalize(&candidate.text, language).tokens.into_iter().collect();

    if let Some(href) = &candidate.href {
        tokens.extend(tokenize(href_path(href)));
    }

    for value in candidate.context_attributes.values() {
        tokens.extend(normalize(value, language).tokens);
    }

    tokens
}

/// Path portion of an href: scheme/host and query/fragment carry no intent
/// signal and would only dilute overlap ratios.
fn href_path(href: &str) -> &str {
    let rest = match href.find("://") {
        Some(i) => {
            let after = &href[i + 3..];
            match after.find('/') {
                Some(j) => &after[j..],
                None => "",
            }
        }
        None => href,
    };
    rest.split(['?', '#']).next().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn test_href_path() {
        assert_eq!(href_path("https://example.com/about-us?ref=nav"), "/about-us");
        assert_eq!(href_path("/cart#items"), "/cart");
        assert_eq!(href_path("https://example.com"), "");
    }

    #[test]
    fn test_candidate_token_set_merges_sources() {
        let candidate = ActionCandidate {
            selector: "#c".into(),
            kind: "a".into(),
            text: "About Us".into(),
            href: Some("https://example.com/about-us?utm=x".into()),
            context_attributes: BTreeMap::from([("aria-label".to_string(), "company info".to_string())]),
        };
        let tokens = candidate_token_set(&candidate, &Language::En);
        for expected in ["about", "us", "company", "info"] {
            assert!(tokens.contains(expected), "{expected}");
        }
        assert!(!tokens.contains("example"));
        assert!(!tokens.contains("utm"));
    }
}
