//! Weighted structural similarity between two fingerprints.
//!
//! Each cache domain weighs the fingerprint fields differently: action
//! mapping cares about page structure, description caching about visible
//! identity, summary caching about content identity. Weights in each table
//! sum to 1.0, so the score is always in `[0, 1]`.
//!
//! Missing-field rule: a field absent on exactly one side contributes 0
//! while its weight still counts toward the denominator, so absent data
//! lowers the score instead of being ignored. A field absent on both sides
//! compares equal; two identical fingerprints always score 1.0.

use std::collections::BTreeSet;

use crate::snapshot::Domain;

use super::Fingerprint;

/// Per-field weights for one domain's validity check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityWeights {
    pub title: f64,
    pub headings: f64,
    pub landmarks: f64,
    pub element_counts: f64,
    pub excerpt: f64,
    pub content_hash: f64,
    pub length: f64,
    pub published_at: f64,
}

impl SimilarityWeights {
    /// Default table for the given domain.
    pub fn for_domain(domain: Domain) -> Self {
        match domain {
            Domain::Action => Self::action(),
            Domain::Describe => Self::describe(),
            Domain::Summarize => Self::summarize(),
        }
    }

    /// Action-mapping validity: structure over content. A selector keeps
    /// working as long as the element inventory and page regions hold.
    pub fn action() -> Self {
        SimilarityWeights {
            title: 0.0,
            headings: 0.30,
            landmarks: 0.30,
            element_counts: 0.40,
            excerpt: 0.0,
            content_hash: 0.0,
            length: 0.0,
            published_at: 0.0,
        }
    }

    /// Description validity: visible identity of the page.
    pub fn describe() -> Self {
        SimilarityWeights {
            title: 0.20,
            headings: 0.25,
            landmarks: 0.20,
            element_counts: 0.20,
            excerpt: 0.15,
            content_hash: 0.0,
            length: 0.0,
            published_at: 0.0,
        }
    }

    /// Summary validity: content identity, dominated by the content hash.
    pub fn summarize() -> Self {
        SimilarityWeights {
            title: 0.15,
            headings: 0.0,
            landmarks: 0.0,
            element_counts: 0.0,
            excerpt: 0.0,
            content_hash: 0.55,
            length: 0.15,
            published_at: 0.15,
        }
    }

    fn total(&self) -> f64 {
        self.title
            + self.headings
            + self.landmarks
            + self.element_counts
            + self.excerpt
            + self.content_hash
            + self.length
            + self.published_at
    }
}

/// Weighted similarity of two fingerprints in `[0, 1]`.
pub fn score(a: &Fingerprint, b: &Fingerprint, weights: &SimilarityWeights) -> f64 {
    let total = weights.total();
    if total <= 0.0 {
        return 0.0;
    }

    let weighted = weights.title * eq_sim(&a.title, &b.title)
        + weights.headings * heading_sim(a, b)
        + weights.landmarks * jaccard(&a.landmarks, &b.landmarks)
        + weights.element_counts * count_sim(a, b)
        + weights.excerpt * excerpt_sim(&a.excerpt, &b.excerpt)
        + weights.content_hash * opt_sim(&a.content_hash, &b.content_hash, |x, y| eq_sim(x, y))
        + weights.length * opt_sim(&a.word_count, &b.word_count, |&x, &y| relative_diff(x, y))
        + weights.published_at * opt_sim(&a.published_at, &b.published_at, |x, y| if x == y { 1.0 } else { 0.0 });

    (weighted / total).clamp(0.0, 1.0)
}

fn eq_sim(a: &str, b: &str) -> f64 {
    if a == b { 1.0 } else { 0.0 }
}

/// Both-absent compares equal; one-sided absence scores 0.
fn opt_sim<T>(a: &Option<T>, b: &Option<T>, sim: impl Fn(&T, &T) -> f64) -> f64 {
    match (a, b) {
        (Some(x), Some(y)) => sim(x, y),
        (None, None) => 1.0,
        _ => 0.0,
    }
}

fn heading_sim(a: &Fingerprint, b: &Fingerprint) -> f64 {
    let set = |fp: &Fingerprint| -> BTreeSet<(u8, String)> {
        fp.headings.iter().map(|h| (h.level, h.text.clone())).collect()
    };
    jaccard(&set(a), &set(b))
}

fn excerpt_sim(a: &str, b: &str) -> f64 {
    let tokens = |s: &str| -> BTreeSet<String> {
        s.split_whitespace().map(|t| t.to_lowercase()).collect()
    };
    jaccard(&tokens(a), &tokens(b))
}

/// Jaccard overlap; two empty sets count as identical.
fn jaccard<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

/// Mean relative agreement across the union of element types; a type absent
/// on one side counts as 0 occurrences there.
fn count_sim(a: &Fingerprint, b: &Fingerprint) -> f64 {
    if a.element_counts.is_empty() && b.element_counts.is_empty() {
        return 1.0;
    }
    if a.element_counts.is_empty() || b.element_counts.is_empty() {
        return 0.0;
    }
    let keys: BTreeSet<&String> = a.element_counts.keys().chain(b.element_counts.keys()).collect();
    let sum: f64 = keys
        .iter()
        .map(|k| {
            let x = a.element_counts.get(*k).copied().unwrap_or(0);
            let y = b.element_counts.get(*k).copied().unwrap_or(0);
            relative_diff(x, y)
        })
        .sum();
    sum / keys.len() as f64
}

/// `1 − |a−b| / max(a, b, 1)`.
fn relative_diff(a: u32, b: u32) -> f64 {
    let max = a.max(b).max(1) as f64;
    1.0 - f64::from(a.abs_diff(b)) / max
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::TimeZone;

    use crate::snapshot::Heading;

    use super::*;

    fn fingerprint() -> Fingerprint {
        Fingerprint {
            title: "Acme Corp".into(),
            headings: vec![
                Heading { text: "Welcome".into(), level: 1 },
                Heading { text: "Products".into(), level: 2 },
            ],
            landmarks: BTreeSet::from(["navigation".to_string(), "main".to_string()]),
            element_counts: BTreeMap::from([("a".to_string(), 10), ("button".to_string(), 3)]),
            excerpt: "welcome to acme corp".into(),
            content_hash: Some("deadbeef".into()),
            word_count: Some(420),
            published_at: Some(chrono::Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()),
        }
    }

    fn sparse_fingerprint() -> Fingerprint {
        Fingerprint {
            title: String::new(),
            headings: vec![],
            landmarks: BTreeSet::new(),
            element_counts: BTreeMap::new(),
            excerpt: String::new(),
            content_hash: None,
            word_count: None,
            published_at: None,
        }
    }

    #[test]
    fn test_weight_tables_sum_to_one() {
        for d in [Domain::Action, Domain::Describe, Domain::Summarize] {
            let total = SimilarityWeights::for_domain(d).total();
            assert!((total - 1.0).abs() < 1e-9, "{d}: {total}");
        }
    }

    #[test]
    fn test_reflexivity_all_domains() {
        for fp in [fingerprint(), sparse_fingerprint()] {
            for d in [Domain::Action, Domain::Describe, Domain::Summarize] {
                let s = score(&fp, &fp, &SimilarityWeights::for_domain(d));
                assert!((s - 1.0).abs() < 1e-9, "{d}: {s}");
            }
        }
    }

    #[test]
    fn test_one_sided_missing_field_lowers_score() {
        let a = fingerprint();
        let mut b = fingerprint();
        b.content_hash = None;
        let s = score(&a, &b, &SimilarityWeights::summarize());
        // Hash term (0.55) lost entirely, no renormalization.
        assert!((s - 0.45).abs() < 1e-9, "{s}");
    }

    #[test]
    fn test_hash_match_outweighs_title_change() {
        // Content hash, length, and date agree; the title changed. The
        // summary table scores 0.55 + 0.15 + 0.15 = 0.85, below the 0.90
        // default threshold, so the summary counts as changed.
        let a = fingerprint();
        let mut b = fingerprint();
        b.title = "Acme Corp — relaunch".into();
        let s = score(&a, &b, &SimilarityWeights::summarize());
        assert!((s - 0.85).abs() < 1e-9, "{s}");
    }

    #[test]
    fn test_structural_drift_action_domain() {
        let a = fingerprint();
        let mut b = fingerprint();
        b.element_counts.insert("a".into(), 20); // was 10
        let s = score(&a, &b, &SimilarityWeights::action());
        // Count term: mean(0.5, 1.0) = 0.75 at weight 0.40.
        assert!((s - (0.30 + 0.30 + 0.40 * 0.75)).abs() < 1e-9, "{s}");
        assert!(s < 1.0);
    }

    #[test]
    fn test_heading_overlap_is_jaccard() {
        let a = fingerprint();
        let mut b = fingerprint();
        b.headings.push(Heading { text: "Careers".into(), level: 2 });
        let s = score(&a, &b, &SimilarityWeights::action());
        // 2 shared of 3 distinct headings.
        let expected = 0.30 * (2.0 / 3.0) + 0.30 + 0.40;
        assert!((s - expected).abs() < 1e-9, "{s}");
    }

    #[test]
    fn test_score_bounds() {
        let a = fingerprint();
        let b = sparse_fingerprint();
        for d in [Domain::Action, Domain::Describe, Domain::Summarize] {
            let s = score(&a, &b, &SimilarityWeights::for_domain(d));
            assert!((0.0..=1.0).contains(&s), "{d}: {s}");
        }
    }

    #[test]
    fn test_relative_diff() {
        assert_eq!(relative_diff(10, 10), 1.0);
        assert_eq!(relative_diff(0, 0), 1.0);
        assert_eq!(relative_diff(10, 5), 0.5);
        assert_eq!(relative_diff(0, 1), 0.0);
    }
}
