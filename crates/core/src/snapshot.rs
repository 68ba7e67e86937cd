//! External input types produced by the DOM-extraction collaborator.
//!
//! A [`PageSnapshot`] is the structural observation of a page or article at
//! one point in time; [`ActionCandidate`]s are the clickable elements found
//! on it. Both arrive over the wire as JSON and are validated once, before
//! any resolution stage runs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Error;

/// The three cache/resolution domains, each with its own weight table,
/// validity threshold, TTL, and capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Action,
    Describe,
    Summarize,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Action => "action",
            Domain::Describe => "describe",
            Domain::Summarize => "summarize",
        }
    }

    /// Parse a stored domain column. Unknown values are a corruption signal,
    /// not a programming error.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "action" => Some(Domain::Action),
            "describe" => Some(Domain::Describe),
            "summarize" => Some(Domain::Summarize),
            _ => None,
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Language tag for intent normalization and dictionary lookup.
///
/// Parsed from the primary subtag of a BCP 47 tag ("en-US" → `En`).
/// Languages without shipped filler/phrase tables fall back to the
/// configured default at normalization time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Language {
    En,
    Es,
    De,
    Other(String),
}

impl Language {
    /// Lowercase primary-subtag code ("en", "es", ...).
    pub fn code(&self) -> &str {
        match self {
            Language::En => "en",
            Language::Es => "es",
            Language::De => "de",
            Language::Other(code) => code,
        }
    }

    pub fn parse(tag: &str) -> Self {
        let primary = tag.split(['-', '_']).next().unwrap_or("").trim().to_lowercase();
        match primary.as_str() {
            "en" => Language::En,
            "es" => Language::Es,
            "de" => Language::De,
            "" => Language::En,
            other => Language::Other(other.to_string()),
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::En
    }
}

impl From<String> for Language {
    fn from(s: String) -> Self {
        Language::parse(&s)
    }
}

impl From<Language> for String {
    fn from(lang: Language) -> Self {
        lang.code().to_string()
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// One heading observed on the page, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub text: String,
    /// Heading level, 1..=6.
    pub level: u8,
}

/// Structural observation of a page or article, as delivered by the
/// external DOM-extraction collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub title: String,
    pub headings: Vec<Heading>,
    /// ARIA landmark / region names present on the page.
    pub landmarks: Vec<String>,
    /// Element tag name → occurrence count.
    pub element_counts: BTreeMap<String, u32>,
    pub text_excerpt: String,
    /// Detected page language tag, if any.
    #[serde(default)]
    pub lang: Option<String>,
    /// Content hash supplied by the extractor; derived from the excerpt
    /// when absent.
    #[serde(default)]
    pub content_hash: Option<String>,
    #[serde(default)]
    pub word_count: Option<u32>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

impl PageSnapshot {
    /// Reject malformed snapshots before any stage runs.
    pub fn validate(&self) -> Result<(), Error> {
        if self.title.trim().is_empty() && self.text_excerpt.trim().is_empty() && self.headings.is_empty() {
            return Err(Error::InvalidInput(
                "snapshot has no title, headings, or excerpt".into(),
            ));
        }
        if let Some(h) = self.headings.iter().find(|h| h.level == 0 || h.level > 6) {
            return Err(Error::InvalidInput(format!(
                "heading level {} out of range for {:?}",
                h.level, h.text
            )));
        }
        Ok(())
    }
}

/// A clickable element the extractor offers as a possible action target.
///
/// Never persisted beyond a cache payload reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionCandidate {
    /// CSS selector uniquely identifying the element on the page.
    pub selector: String,
    /// Element kind ("a", "button", "input", ...).
    pub kind: String,
    /// Visible text of the element.
    pub text: String,
    #[serde(default)]
    pub href: Option<String>,
    /// Extra attributes the extractor considered relevant (aria-label,
    /// title, name, ...).
    #[serde(default)]
    pub context_attributes: BTreeMap<String, String>,
}

/// Reject a malformed candidate list before any stage runs.
pub fn validate_candidates(candidates: &[ActionCandidate]) -> Result<(), Error> {
    if candidates.is_empty() {
        return Err(Error::InvalidInput("candidate list is empty".into()));
    }
    for (i, c) in candidates.iter().enumerate() {
        if c.selector.trim().is_empty() {
            return Err(Error::InvalidInput(format!("candidate {i} has an empty selector")));
        }
        if c.text.trim().is_empty() && c.href.is_none() && c.context_attributes.is_empty() {
            return Err(Error::InvalidInput(format!(
                "candidate {i} ({}) has no matchable text, href, or attributes",
                c.selector
            )));
        }
    }
    Ok(())
}
