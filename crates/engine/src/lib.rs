//! Action-resolution engine for wayfinder.
//!
//! Maps natural-language intents to page elements through a fixed waterfall
//! of matchers (cache, literal, common-action dictionary, fuzzy/synonym,
//! AI fallback), and serves cached-or-generated page descriptions and
//! article summaries on top of the [`wayfinder_core`] cache store.

pub mod ai;
pub mod dictionary;
pub mod normalize;
pub mod resolver;
pub mod stages;

pub use ai::{AiAdapter, AiError, RankedCandidate};
pub use dictionary::ActionDictionary;
pub use normalize::{NormalizedIntent, normalize};
pub use resolver::{
    CancelFlag, Confidence, GeneratedText, MatchOutcome, MatchResult, ResolveOptions, Resolution, Resolver, Stage,
    TextSource,
};
