//! SQLite-backed cache for resolved actions and generated text.
//!
//! Persistent, TTL- and capacity-bounded storage keyed by
//! `(subject_key, domain, language)`, with async access via tokio-rusqlite:
//!
//! - WAL mode for concurrent readers
//! - Automatic schema migrations
//! - Lazy TTL expiry, swept on insert
//! - Per-domain LRU eviction at the capacity bound

pub mod connection;
pub mod entries;
pub mod key;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{CacheEntry, CachePayload};
pub use key::normalize_subject_key;
