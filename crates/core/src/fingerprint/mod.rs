//! Structural fingerprints for cache-validity checks.
//!
//! A [`Fingerprint`] is an immutable signature of one observation of a page
//! or article. It is built fresh on every resolution attempt and compared
//! against the fingerprint stored with a cache entry to decide whether the
//! cached payload still applies.

pub mod similarity;

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::snapshot::{Heading, PageSnapshot};

pub use similarity::{SimilarityWeights, score};

/// Headings beyond this count carry little identity signal and are dropped.
pub const MAX_HEADINGS: usize = 10;

/// Immutable structural/content signature of a page observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub title: String,
    /// First [`MAX_HEADINGS`] headings, in document order.
    pub headings: Vec<Heading>,
    pub landmarks: BTreeSet<String>,
    pub element_counts: BTreeMap<String, u32>,
    pub excerpt: String,
    #[serde(default)]
    pub content_hash: Option<String>,
    #[serde(default)]
    pub word_count: Option<u32>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

impl Fingerprint {
    /// Build a fingerprint from an extractor snapshot.
    ///
    /// When the extractor supplied no content hash, one is derived from the
    /// excerpt so the summary domain's hash term stays usable.
    pub fn from_snapshot(snapshot: &PageSnapshot) -> Self {
        let content_hash = snapshot.content_hash.clone().or_else(|| {
            if snapshot.text_excerpt.is_empty() {
                None
            } else {
                Some(excerpt_hash(&snapshot.text_excerpt))
            }
        });

        Fingerprint {
            title: snapshot.title.clone(),
            headings: snapshot.headings.iter().take(MAX_HEADINGS).cloned().collect(),
            landmarks: snapshot.landmarks.iter().cloned().collect(),
            element_counts: snapshot.element_counts.clone(),
            excerpt: snapshot.text_excerpt.clone(),
            content_hash,
            word_count: snapshot.word_count,
            published_at: snapshot.published_at,
        }
    }
}

/// SHA-256 of the excerpt, hex-encoded.
fn excerpt_hash(excerpt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(excerpt.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> PageSnapshot {
        PageSnapshot {
            title: "Acme".into(),
            headings: (0..15).map(|i| Heading { text: format!("h{i}"), level: 2 }).collect(),
            landmarks: vec!["main".into(), "navigation".into(), "main".into()],
            element_counts: BTreeMap::from([("a".into(), 4), ("button".into(), 2)]),
            text_excerpt: "hello world".into(),
            lang: None,
            content_hash: None,
            word_count: Some(2),
            published_at: None,
        }
    }

    #[test]
    fn test_headings_capped() {
        let fp = Fingerprint::from_snapshot(&snapshot());
        assert_eq!(fp.headings.len(), MAX_HEADINGS);
        assert_eq!(fp.headings[0].text, "h0");
    }

    #[test]
    fn test_landmarks_deduplicated() {
        let fp = Fingerprint::from_snapshot(&snapshot());
        assert_eq!(fp.landmarks.len(), 2);
    }

    #[test]
    fn test_hash_derived_from_excerpt() {
        let fp = Fingerprint::from_snapshot(&snapshot());
        let hash = fp.content_hash.unwrap();
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, excerpt_hash("hello world"));
    }

    #[test]
    fn test_supplied_hash_preserved() {
        let mut s = snapshot();
        s.content_hash = Some("abc123".into());
        let fp = Fingerprint::from_snapshot(&s);
        assert_eq!(fp.content_hash.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_no_hash_for_empty_excerpt() {
        let mut s = snapshot();
        s.text_excerpt = String::new();
        let fp = Fingerprint::from_snapshot(&s);
        assert!(fp.content_hash.is_none());
    }
}
