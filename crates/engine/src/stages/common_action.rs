//! Canonical-action matching against the common-action dictionary.
//!
//! A dictionary hit is near-certain by construction, so scores sit at the
//! top of the scale, graded down slightly for partial phrase matches and
//! for candidates tied to the action only through their href.

use wayfinder_core::{ActionCandidate, Language};

use super::StageHit;
use crate::dictionary::{ActionDictionary, CandidateVia, MatchGrade};
use crate::normalize::NormalizedIntent;

const EXACT_PHRASE_SCORE: f64 = 1.0;
const PARTIAL_PHRASE_SCORE: f64 = 0.95;
const HREF_ONLY_SCORE: f64 = 0.92;

/// Map the intent to a canonical action and find a candidate realizing it.
///
/// A candidate matched through its visible text wins over one matched only
/// through an href pattern.
pub fn best(
    dictionary: &ActionDictionary, intent: &NormalizedIntent, candidates: &[ActionCandidate], fallback: &Language,
) -> Option<StageHit> {
    let phrase = dictionary.lookup_intent(&intent.text(), &intent.language, fallback)?;
    let phrase_score = match phrase.grade {
        MatchGrade::Exact => EXACT_PHRASE_SCORE,
        MatchGrade::Partial => PARTIAL_PHRASE_SCORE,
    };

    let mut href_hit = None;
    for (i, candidate) in candidates.iter().enumerate() {
        match dictionary.candidate_realizes(phrase.action, candidate, &intent.language, fallback) {
            Some(CandidateVia::Text) => {
                return Some(StageHit { candidate_index: i, score: phrase_score });
            }
            Some(CandidateVia::Href) => {
                if href_hit.is_none() {
                    href_hit = Some(i);
                }
            }
            None => {}
        }
    }

    href_hit.map(|i| StageHit { candidate_index: i, score: phrase_score.min(HREF_ONLY_SCORE) })
}
