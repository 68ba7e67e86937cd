//! Waterfall resolution.
//!
//! Orchestrates the fixed stage order `CACHE_LOOKUP → LITERAL_MATCH →
//! COMMON_ACTION → FUZZY_SYNONYM → AI_FALLBACK` for action mapping, and the
//! two-stage cache-or-generate path for descriptions and summaries. Stages
//! are a closed enum; every transition is an exhaustive match.
//!
//! The resolver holds no global state: the cache handle, configuration,
//! and AI adapter are injected at construction.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use wayfinder_core::{
    ActionCandidate, AppConfig, CacheDb, CacheEntry, CachePayload, Domain, DomainConfig, Error, Fingerprint, Language,
    PageSnapshot, SimilarityWeights, fingerprint::similarity, normalize_subject_key, validate_candidates,
};

use crate::ai::{AiAdapter, AiError, bounded};
use crate::dictionary::ActionDictionary;
use crate::normalize;
use crate::stages::{self, StageHit};

/// Scores at or above this execute without asking.
pub const AUTO_EXECUTE_THRESHOLD: f64 = 1.0;

/// Scores in `[CONFIRM_THRESHOLD, AUTO_EXECUTE_THRESHOLD)` stop the
/// waterfall but wait for the caller's go-ahead. The boundary value itself
/// still prompts.
pub const CONFIRM_THRESHOLD: f64 = 0.8;

/// Resolution stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    CacheLookup,
    LiteralMatch,
    CommonAction,
    FuzzySynonym,
    AiFallback,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::CacheLookup => "cache_lookup",
            Stage::LiteralMatch => "literal_match",
            Stage::CommonAction => "common_action",
            Stage::FuzzySynonym => "fuzzy_synonym",
            Stage::AiFallback => "ai_fallback",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three confidence bands of the decision rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    AutoExecute,
    Confirm,
    Insufficient,
}

/// What the waterfall resolved to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MatchOutcome {
    Candidate(ActionCandidate),
    Text(String),
}

/// Final verdict of one resolution call.
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub outcome: MatchOutcome,
    /// Always in `[0, 1]`.
    pub score: f64,
    /// Stage that produced the outcome; for an insufficient result, the
    /// stage whose candidate scored best.
    pub stage: Stage,
    pub confidence: Confidence,
}

/// A [`MatchResult`] plus the bookkeeping the caller may act on: a pending
/// cache write for confirm-band results, and the adapter failure (if any)
/// behind a degraded outcome.
#[derive(Debug)]
pub struct Resolution {
    pub result: MatchResult,
    /// Set when AI_FALLBACK failed and the resolver degraded to an earlier
    /// candidate or to an insufficient verdict. A timeout here is the
    /// retryable case.
    pub ai_failure: Option<AiError>,
    pending: Option<PendingWrite>,
}

#[derive(Debug)]
struct PendingWrite {
    entry: CacheEntry,
    max_entries: usize,
}

impl Resolution {
    /// Whether this result waits on [`Resolver::confirm_and_persist`].
    pub fn needs_confirmation(&self) -> bool {
        self.pending.is_some()
    }
}

/// Cooperative cancellation signal, checked between stages. Once the AI
/// round trip is in flight the call may still complete; the caller
/// discards the result instead of interrupting it.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Per-call knobs.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Overrides the snapshot's detected language.
    pub language: Option<Language>,
    /// Skip CACHE_LOOKUP entirely; the new result still overwrites the
    /// stored entry for the key.
    pub force_refresh: bool,
    pub cancel: Option<CancelFlag>,
}

/// Where a generated text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSource {
    Cached,
    Fresh,
}

/// Result of a describe/summarize call.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedText {
    pub text: String,
    pub source: TextSource,
    /// Similarity against the previously stored fingerprint, when one
    /// existed to compare against.
    pub similarity: Option<f64>,
}

/// The action-resolution and text-generation engine.
pub struct Resolver {
    db: CacheDb,
    config: AppConfig,
    ai: Arc<dyn AiAdapter>,
    dictionary: ActionDictionary,
}

impl Resolver {
    pub fn new(db: CacheDb, config: AppConfig, ai: Arc<dyn AiAdapter>) -> Self {
        Resolver { db, config, ai, dictionary: ActionDictionary::new() }
    }

    /// Resolve a natural-language intent to a page element.
    ///
    /// Insufficient confidence is a normal outcome carrying the best
    /// candidate found across all stages, not an `Err`.
    pub async fn resolve_action(
        &self, subject_key: &str, intent_text: &str, snapshot: &PageSnapshot, candidates: &[ActionCandidate],
        opts: &ResolveOptions,
    ) -> Result<Resolution, Error> {
        snapshot.validate()?;
        validate_candidates(candidates)?;

        let language = self.language_for(snapshot, opts);
        let fallback = self.fallback_language();
        let intent = normalize::normalize(intent_text, &language);
        if intent.is_empty() {
            return Err(Error::InvalidInput(format!(
                "intent {intent_text:?} is empty after normalization"
            )));
        }

        let key = normalize_subject_key(subject_key);
        let fingerprint = Fingerprint::from_snapshot(snapshot);
        let cfg = *self.config.domain(Domain::Action);

        let mut best: Option<(Stage, StageHit)> = None;

        check_cancel(opts)?;
        if cfg.enabled && !opts.force_refresh {
            if let Some(resolution) = self
                .try_cache_stage(&key, &language, &fingerprint, &cfg)
                .await?
            {
                return Ok(resolution);
            }
        }

        check_cancel(opts)?;
        if let Some(hit) = stages::literal::best(&intent, candidates) {
            tracing::debug!(stage = %Stage::LiteralMatch, score = hit.score, "stage scored");
            if let Some(resolution) = self
                .settle(&key, &language, &fingerprint, candidates, Stage::LiteralMatch, hit, &cfg)
                .await?
            {
                return Ok(resolution);
            }
            track_best(&mut best, Stage::LiteralMatch, hit);
        }

        check_cancel(opts)?;
        if let Some(hit) = stages::common_action::best(&self.dictionary, &intent, candidates, &fallback) {
            tracing::debug!(stage = %Stage::CommonAction, score = hit.score, "stage scored");
            if let Some(resolution) = self
                .settle(&key, &language, &fingerprint, candidates, Stage::CommonAction, hit, &cfg)
                .await?
            {
                return Ok(resolution);
            }
            track_best(&mut best, Stage::CommonAction, hit);
        }

        check_cancel(opts)?;
        if let Some(hit) = stages::fuzzy::best(&intent, candidates, &fallback) {
            tracing::debug!(stage = %Stage::FuzzySynonym, score = hit.score, "stage scored");
            if let Some(resolution) = self
                .settle(&key, &language, &fingerprint, candidates, Stage::FuzzySynonym, hit, &cfg)
                .await?
            {
                return Ok(resolution);
            }
            track_best(&mut best, Stage::FuzzySynonym, hit);
        }

        check_cancel(opts)?;
        match bounded(self.config.ai_timeout(), self.ai.resolve_action(&intent, candidates)).await {
            Ok(ranked) => {
                let top = ranked
                    .iter()
                    .filter(|r| r.candidate_index < candidates.len())
                    .max_by(|a, b| a.probability.total_cmp(&b.probability));
                if let Some(top) = top {
                    let hit = StageHit {
                        candidate_index: top.candidate_index,
                        score: top.probability.clamp(0.0, 1.0),
                    };
                    tracing::debug!(stage = %Stage::AiFallback, score = hit.score, "stage scored");
                    if let Some(resolution) = self
                        .settle(&key, &language, &fingerprint, candidates, Stage::AiFallback, hit, &cfg)
                        .await?
                    {
                        return Ok(resolution);
                    }
                    track_best(&mut best, Stage::AiFallback, hit);
                }
                Ok(self.exhausted(candidates, best, None))
            }
            Err(err) => {
                tracing::warn!(%err, "AI fallback failed; degrading to best earlier candidate");
                // Recoverable: offer the best non-AI candidate for
                // confirmation when it cleared the partial threshold.
                if let Some((stage, hit)) = best
                    && hit.score >= self.config.partial_threshold
                {
                    let candidate = candidates[hit.candidate_index].clone();
                    let entry = self.action_entry(&key, &language, &fingerprint, &candidate, &cfg);
                    return Ok(Resolution {
                        result: MatchResult {
                            outcome: MatchOutcome::Candidate(candidate),
                            score: hit.score,
                            stage,
                            confidence: Confidence::Confirm,
                        },
                        ai_failure: Some(err),
                        pending: cfg.enabled.then_some(PendingWrite { entry, max_entries: cfg.max_entries }),
                    });
                }
                Ok(self.exhausted(candidates, best, Some(err)))
            }
        }
    }

    /// Persist the cache write attached to a confirm-band resolution after
    /// the caller approved it.
    pub async fn confirm_and_persist(&self, resolution: &Resolution) -> Result<(), Error> {
        match &resolution.pending {
            Some(write) => self.db.put_entry(&write.entry, write.max_entries).await,
            None => Err(Error::InvalidInput("resolution has no pending cache write".into())),
        }
    }

    /// Return the cached description for the page, or generate and cache a
    /// fresh one.
    pub async fn get_or_generate_description(
        &self, subject_key: &str, snapshot: &PageSnapshot, opts: &ResolveOptions,
    ) -> Result<GeneratedText, Error> {
        self.cached_text(Domain::Describe, subject_key, snapshot, opts).await
    }

    /// Return the cached summary for the article, or generate and cache a
    /// fresh one.
    pub async fn get_or_generate_summary(
        &self, subject_key: &str, snapshot: &PageSnapshot, opts: &ResolveOptions,
    ) -> Result<GeneratedText, Error> {
        self.cached_text(Domain::Summarize, subject_key, snapshot, opts).await
    }

    async fn cached_text(
        &self, domain: Domain, subject_key: &str, snapshot: &PageSnapshot, opts: &ResolveOptions,
    ) -> Result<GeneratedText, Error> {
        snapshot.validate()?;

        let language = self.language_for(snapshot, opts);
        let key = normalize_subject_key(subject_key);
        let fingerprint = Fingerprint::from_snapshot(snapshot);
        let cfg = *self.config.domain(domain);
        let weights = SimilarityWeights::for_domain(domain);

        let mut prior_similarity = None;

        check_cancel(opts)?;
        if cfg.enabled && !opts.force_refresh {
            if let Some(entry) = self.db.get_entry(&key, domain, &language).await? {
                let sim = similarity::score(&fingerprint, &entry.fingerprint, &weights);
                prior_similarity = Some(sim);
                if sim >= cfg.similarity_threshold {
                    if let CachePayload::Text { text } = entry.payload {
                        tracing::debug!(%key, %domain, similarity = sim, "cache hit");
                        self.db.record_hit(&key, domain, &language).await?;
                        return Ok(GeneratedText { text, source: TextSource::Cached, similarity: Some(sim) });
                    }
                    tracing::warn!(%key, %domain, "cached payload has wrong kind; regenerating");
                } else {
                    tracing::debug!(%key, %domain, similarity = sim, threshold = cfg.similarity_threshold, "content changed; regenerating");
                }
            }
        }

        check_cancel(opts)?;
        let deadline = self.config.ai_timeout();
        let text = match domain {
            Domain::Describe => bounded(deadline, self.ai.describe(&fingerprint, &language)).await?,
            Domain::Summarize => bounded(deadline, self.ai.summarize(&fingerprint, &language)).await?,
            Domain::Action => {
                return Err(Error::InvalidInput("action domain does not generate text".into()));
            }
        };

        if cfg.enabled {
            let entry = CacheEntry::new(
                key,
                domain,
                language,
                fingerprint,
                CachePayload::Text { text: text.clone() },
                cfg.ttl_secs,
            );
            self.db.put_entry(&entry, cfg.max_entries).await?;
        }

        Ok(GeneratedText { text, source: TextSource::Fresh, similarity: prior_similarity })
    }

    /// CACHE_LOOKUP for the action domain. A hit must be unexpired *and*
    /// structurally similar enough; either failing is a miss.
    async fn try_cache_stage(
        &self, key: &str, language: &Language, fingerprint: &Fingerprint, cfg: &DomainConfig,
    ) -> Result<Option<Resolution>, Error> {
        let Some(entry) = self.db.get_entry(key, Domain::Action, language).await? else {
            return Ok(None);
        };

        let sim = similarity::score(fingerprint, &entry.fingerprint, &SimilarityWeights::action());
        if sim < cfg.similarity_threshold {
            tracing::debug!(%key, similarity = sim, threshold = cfg.similarity_threshold, "page drifted; cache miss");
            return Ok(None);
        }

        let CachePayload::Action { candidate } = entry.payload else {
            tracing::warn!(%key, "cached payload has wrong kind; treating as miss");
            return Ok(None);
        };

        self.db.record_hit(key, Domain::Action, language).await?;

        if sim >= AUTO_EXECUTE_THRESHOLD {
            tracing::debug!(%key, similarity = sim, "cache hit, auto-execute");
            return Ok(Some(Resolution {
                result: MatchResult {
                    outcome: MatchOutcome::Candidate(candidate),
                    score: sim,
                    stage: Stage::CacheLookup,
                    confidence: Confidence::AutoExecute,
                },
                ai_failure: None,
                pending: None,
            }));
        }
        if sim >= CONFIRM_THRESHOLD {
            // The page changed a little; re-persisting on confirmation
            // refreshes the stored fingerprint to the new observation.
            let entry = self.action_entry(key, language, fingerprint, &candidate, cfg);
            tracing::debug!(%key, similarity = sim, "cache hit, needs confirmation");
            return Ok(Some(Resolution {
                result: MatchResult {
                    outcome: MatchOutcome::Candidate(candidate),
                    score: sim,
                    stage: Stage::CacheLookup,
                    confidence: Confidence::Confirm,
                },
                ai_failure: None,
                pending: Some(PendingWrite { entry, max_entries: cfg.max_entries }),
            }));
        }
        Ok(None)
    }

    /// Apply the three-way decision rule to one stage's best hit.
    ///
    /// Auto-execute persists immediately; confirm defers the write to
    /// [`Resolver::confirm_and_persist`]; anything lower advances the
    /// waterfall.
    async fn settle(
        &self, key: &str, language: &Language, fingerprint: &Fingerprint, candidates: &[ActionCandidate], stage: Stage,
        hit: StageHit, cfg: &DomainConfig,
    ) -> Result<Option<Resolution>, Error> {
        if hit.score < CONFIRM_THRESHOLD {
            return Ok(None);
        }

        let candidate = candidates[hit.candidate_index].clone();
        let entry = self.action_entry(key, language, fingerprint, &candidate, cfg);

        if hit.score >= AUTO_EXECUTE_THRESHOLD {
            if cfg.enabled {
                self.db.put_entry(&entry, cfg.max_entries).await?;
            }
            tracing::info!(%key, %stage, score = hit.score, "resolved, auto-execute");
            return Ok(Some(Resolution {
                result: MatchResult {
                    outcome: MatchOutcome::Candidate(candidate),
                    score: hit.score,
                    stage,
                    confidence: Confidence::AutoExecute,
                },
                ai_failure: None,
                pending: None,
            }));
        }

        tracing::info!(%key, %stage, score = hit.score, "resolved, needs confirmation");
        Ok(Some(Resolution {
            result: MatchResult {
                outcome: MatchOutcome::Candidate(candidate),
                score: hit.score,
                stage,
                confidence: Confidence::Confirm,
            },
            ai_failure: None,
            pending: cfg.enabled.then_some(PendingWrite { entry, max_entries: cfg.max_entries }),
        }))
    }

    /// Terminal failure: every stage stayed below the confirm band. The
    /// best candidate found is carried for caller diagnostics.
    fn exhausted(
        &self, candidates: &[ActionCandidate], best: Option<(Stage, StageHit)>, ai_failure: Option<AiError>,
    ) -> Resolution {
        let (stage, hit) = best.unwrap_or((Stage::LiteralMatch, StageHit { candidate_index: 0, score: 0.0 }));
        tracing::info!(%stage, score = hit.score, "waterfall exhausted, insufficient confidence");
        Resolution {
            result: MatchResult {
                outcome: MatchOutcome::Candidate(candidates[hit.candidate_index].clone()),
                score: hit.score,
                stage,
                confidence: Confidence::Insufficient,
            },
            ai_failure,
            pending: None,
        }
    }

    fn action_entry(
        &self, key: &str, language: &Language, fingerprint: &Fingerprint, candidate: &ActionCandidate,
        cfg: &DomainConfig,
    ) -> CacheEntry {
        CacheEntry::new(
            key,
            Domain::Action,
            language.clone(),
            fingerprint.clone(),
            CachePayload::Action { candidate: candidate.clone() },
            cfg.ttl_secs,
        )
    }

    fn language_for(&self, snapshot: &PageSnapshot, opts: &ResolveOptions) -> Language {
        if let Some(language) = &opts.language {
            return language.clone();
        }
        if let Some(tag) = &snapshot.lang {
            return Language::parse(tag);
        }
        self.fallback_language()
    }

    fn fallback_language(&self) -> Language {
        Language::parse(&self.config.default_language)
    }
}

fn check_cancel(opts: &ResolveOptions) -> Result<(), Error> {
    if let Some(cancel) = &opts.cancel
        && cancel.is_cancelled()
    {
        return Err(Error::Cancelled);
    }
    Ok(())
}

fn track_best(best: &mut Option<(Stage, StageHit)>, stage: Stage, hit: StageHit) {
    let replace = best.as_ref().is_none_or(|(_, b)| hit.score > b.score);
    if replace {
        *best = Some((stage, hit));
    }
}
