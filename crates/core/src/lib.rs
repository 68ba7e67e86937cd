//! Core types and shared functionality for wayfinder.
//!
//! This crate provides:
//! - Page snapshot and action candidate input types
//! - Structural fingerprints and the weighted similarity scorer
//! - The SQLite-backed, TTL/LRU-bounded cache store
//! - Layered configuration and unified error types

pub mod cache;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod snapshot;

pub use cache::{CacheDb, CacheEntry, CachePayload, normalize_subject_key};
pub use config::{AppConfig, ConfigError, DomainConfig};
pub use error::Error;
pub use fingerprint::{Fingerprint, SimilarityWeights};
pub use snapshot::{ActionCandidate, Domain, Heading, Language, PageSnapshot, validate_candidates};
