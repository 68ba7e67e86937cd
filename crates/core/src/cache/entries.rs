//! Cache entry CRUD with TTL expiry and per-domain LRU capacity.
//!
//! One live row per `(subject_key, domain, language)` triple, enforced by
//! the primary key; writes are UPSERTs. Expiry is lazy: `get_entry` treats
//! a stale row as a miss and the next insert for that domain sweeps it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use crate::Error;
use crate::fingerprint::Fingerprint;
use crate::snapshot::{ActionCandidate, Domain, Language};

/// What a cache entry resolves to: a page element for the action domain,
/// generated text for describe/summarize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CachePayload {
    Action { candidate: ActionCandidate },
    Text { text: String },
}

/// One cached resolution, keyed by `(subject_key, domain, language)`.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub subject_key: String,
    pub domain: Domain,
    pub language: Language,
    /// Fingerprint of the page observation the payload was produced from.
    pub fingerprint: Fingerprint,
    pub payload: CachePayload,
    pub created_at: DateTime<Utc>,
    pub ttl_secs: i64,
    pub hit_count: i64,
    pub last_used_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Fresh entry stamped with the current time.
    pub fn new(
        subject_key: impl Into<String>, domain: Domain, language: Language, fingerprint: Fingerprint,
        payload: CachePayload, ttl_secs: i64,
    ) -> Self {
        let now = Utc::now();
        CacheEntry {
            subject_key: subject_key.into(),
            domain,
            language,
            fingerprint,
            payload,
            created_at: now,
            ttl_secs,
            hit_count: 0,
            last_used_at: now,
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::seconds(self.ttl_secs)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at()
    }
}

impl CacheDb {
    /// Insert or replace the entry for its key, keeping the domain within
    /// `max_entries`.
    ///
    /// Order of operations: sweep expired rows for the domain, upsert, then
    /// evict least-recently-used rows down to capacity. The fresh entry has
    /// the newest `last_used_at`, so it is never its own eviction victim.
    pub async fn put_entry(&self, entry: &CacheEntry, max_entries: usize) -> Result<(), Error> {
        let entry = entry.clone();
        let fingerprint_json =
            serde_json::to_string(&entry.fingerprint).map_err(|e| Error::InvalidInput(e.to_string()))?;
        let payload_json = serde_json::to_string(&entry.payload).map_err(|e| Error::InvalidInput(e.to_string()))?;

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let now = Utc::now().to_rfc3339();
                let swept = conn.execute(
                    "DELETE FROM cache_entries WHERE domain = ?1 AND expires_at < ?2",
                    params![entry.domain.as_str(), now],
                )?;
                if swept > 0 {
                    tracing::debug!(domain = %entry.domain, swept, "swept expired cache entries");
                }

                conn.execute(
                    "INSERT INTO cache_entries (
                        subject_key, domain, language, fingerprint_json, payload_json,
                        created_at, ttl_secs, expires_at, hit_count, last_used_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                    ON CONFLICT(subject_key, domain, language) DO UPDATE SET
                        fingerprint_json = excluded.fingerprint_json,
                        payload_json = excluded.payload_json,
                        created_at = excluded.created_at,
                        ttl_secs = excluded.ttl_secs,
                        expires_at = excluded.expires_at,
                        hit_count = excluded.hit_count,
                        last_used_at = excluded.last_used_at",
                    params![
                        entry.subject_key,
                        entry.domain.as_str(),
                        entry.language.code(),
                        fingerprint_json,
                        payload_json,
                        entry.created_at.to_rfc3339(),
                        entry.ttl_secs,
                        entry.expires_at().to_rfc3339(),
                        entry.hit_count,
                        entry.last_used_at.to_rfc3339(),
                    ],
                )?;

                let evicted = evict_overflow(conn, entry.domain, max_entries)?;
                if evicted > 0 {
                    tracing::debug!(domain = %entry.domain, evicted, "evicted least-recently-used cache entries");
                }

                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the live entry for a key.
    ///
    /// Expiry is checked on the raw row before the stored JSON is touched.
    /// An expired row is a miss (removal is left to the next insert); a row
    /// that fails to deserialize is dropped and reported as a miss.
    pub async fn get_entry(
        &self, subject_key: &str, domain: Domain, language: &Language,
    ) -> Result<Option<CacheEntry>, Error> {
        let subject_key = subject_key.to_string();
        let language = language.clone();

        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let row = conn.query_row(
                    "SELECT fingerprint_json, payload_json, created_at, ttl_secs, expires_at,
                            hit_count, last_used_at
                     FROM cache_entries
                     WHERE subject_key = ?1 AND domain = ?2 AND language = ?3",
                    params![subject_key, domain.as_str(), language.code()],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, i64>(3)?,
                            row.get::<_, String>(4)?,
                            row.get::<_, i64>(5)?,
                            row.get::<_, String>(6)?,
                        ))
                    },
                );

                let (fingerprint_json, payload_json, created_at, ttl_secs, expires_at, hit_count, last_used_at) =
                    match row {
                        Ok(fields) => fields,
                        Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                        Err(e) => return Err(e.into()),
                    };

                // Strictly past the deadline: the exact-TTL instant is
                // still a hit, matching CacheEntry::is_expired_at.
                if expires_at < Utc::now().to_rfc3339() {
                    tracing::debug!(%subject_key, %domain, "cache entry expired");
                    return Ok(None);
                }

                match decode_entry(
                    &subject_key,
                    domain,
                    &language,
                    &fingerprint_json,
                    &payload_json,
                    &created_at,
                    ttl_secs,
                    hit_count,
                    &last_used_at,
                ) {
                    Ok(entry) => Ok(Some(entry)),
                    Err(err) => {
                        tracing::warn!(%subject_key, %domain, %err, "dropping corrupt cache entry");
                        conn.execute(
                            "DELETE FROM cache_entries WHERE subject_key = ?1 AND domain = ?2 AND language = ?3",
                            params![subject_key, domain.as_str(), language.code()],
                        )?;
                        Ok(None)
                    }
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Record a validated read: bump the hit counter and recency stamp.
    pub async fn record_hit(&self, subject_key: &str, domain: Domain, language: &Language) -> Result<(), Error> {
        let subject_key = subject_key.to_string();
        let language = language.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "UPDATE cache_entries
                     SET hit_count = hit_count + 1, last_used_at = ?4
                     WHERE subject_key = ?1 AND domain = ?2 AND language = ?3",
                    params![
                        subject_key,
                        domain.as_str(),
                        language.code(),
                        Utc::now().to_rfc3339()
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete expired entries across all domains.
    ///
    /// Returns the number of deleted rows.
    pub async fn purge_expired(&self) -> Result<u64, Error> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM cache_entries WHERE expires_at < ?1", params![now])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every entry for a domain.
    ///
    /// Returns the number of deleted rows.
    pub async fn purge_domain(&self, domain: Domain) -> Result<u64, Error> {
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM cache_entries WHERE domain = ?1", params![domain.as_str()])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Evict least-recently-used entries until the domain holds at most
    /// `max_entries` rows.
    ///
    /// Returns the number of deleted rows.
    pub async fn purge_lru(&self, domain: Domain, max_entries: usize) -> Result<u64, Error> {
        self.conn
            .call(move |conn| -> Result<u64, Error> { Ok(evict_overflow(conn, domain, max_entries)? as u64) })
            .await
            .map_err(Error::from)
    }

    /// Number of live-or-stale rows currently stored for a domain.
    pub async fn count_entries(&self, domain: Domain) -> Result<i64, Error> {
        self.conn
            .call(move |conn| -> Result<i64, Error> {
                let count = conn.query_row(
                    "SELECT COUNT(*) FROM cache_entries WHERE domain = ?1",
                    params![domain.as_str()],
                    |row| row.get(0),
                )?;
                Ok(count)
            })
            .await
            .map_err(Error::from)
    }
}

/// Delete exactly the overflow count for a domain, oldest `last_used_at`
/// first.
fn evict_overflow(conn: &rusqlite::Connection, domain: Domain, max_entries: usize) -> Result<usize, Error> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM cache_entries WHERE domain = ?1",
        params![domain.as_str()],
        |row| row.get(0),
    )?;
    let max = max_entries as i64;
    if count <= max {
        return Ok(0);
    }

    let deleted = conn.execute(
        "DELETE FROM cache_entries WHERE rowid IN (
            SELECT rowid FROM cache_entries
            WHERE domain = ?1
            ORDER BY last_used_at ASC, rowid ASC
            LIMIT ?2
        )",
        params![domain.as_str(), count - max],
    )?;
    Ok(deleted)
}

#[allow(clippy::too_many_arguments)]
fn decode_entry(
    subject_key: &str, domain: Domain, language: &Language, fingerprint_json: &str, payload_json: &str,
    created_at: &str, ttl_secs: i64, hit_count: i64, last_used_at: &str,
) -> Result<CacheEntry, Error> {
    let corrupt = |what: &str| Error::EntryCorrupt(format!("{subject_key}|{domain}|{language}: {what}"));

    let fingerprint: Fingerprint =
        serde_json::from_str(fingerprint_json).map_err(|_| corrupt("unreadable fingerprint"))?;
    let payload: CachePayload = serde_json::from_str(payload_json).map_err(|_| corrupt("unreadable payload"))?;
    let created_at = DateTime::parse_from_rfc3339(created_at)
        .map_err(|_| corrupt("bad created_at"))?
        .with_timezone(&Utc);
    let last_used_at = DateTime::parse_from_rfc3339(last_used_at)
        .map_err(|_| corrupt("bad last_used_at"))?
        .with_timezone(&Utc);

    Ok(CacheEntry {
        subject_key: subject_key.to_string(),
        domain,
        language: language.clone(),
        fingerprint,
        payload,
        created_at,
        ttl_secs,
        hit_count,
        last_used_at,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crate::snapshot::{Heading, PageSnapshot};

    use super::*;

    fn fingerprint() -> Fingerprint {
        let snapshot = PageSnapshot {
            title: "Acme".into(),
            headings: vec![Heading { text: "Welcome".into(), level: 1 }],
            landmarks: vec!["main".into()],
            element_counts: BTreeMap::from([("a".into(), 5)]),
            text_excerpt: "welcome".into(),
            lang: Some("en".into()),
            content_hash: None,
            word_count: None,
            published_at: None,
        };
        Fingerprint::from_snapshot(&snapshot)
    }

    fn action_entry(key: &str, ttl_secs: i64) -> CacheEntry {
        let candidate = ActionCandidate {
            selector: "a.login".into(),
            kind: "a".into(),
            text: "Log in".into(),
            href: Some("/login".into()),
            context_attributes: BTreeMap::new(),
        };
        CacheEntry::new(
            key,
            Domain::Action,
            Language::En,
            fingerprint(),
            CachePayload::Action { candidate },
            ttl_secs,
        )
    }

    fn text_entry(key: &str, domain: Domain, text: &str) -> CacheEntry {
        CacheEntry::new(
            key,
            domain,
            Language::En,
            fingerprint(),
            CachePayload::Text { text: text.into() },
            3600,
        )
    }

    #[tokio::test]
    async fn test_put_and_get_roundtrip() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let entry = action_entry("https://example.com/a", 3600);
        db.put_entry(&entry, 16).await.unwrap();

        let got = db
            .get_entry("https://example.com/a", Domain::Action, &Language::En)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.payload, entry.payload);
        assert_eq!(got.fingerprint, entry.fingerprint);
        assert_eq!(got.ttl_secs, 3600);
    }

    #[tokio::test]
    async fn test_one_live_entry_per_key() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_entry(&text_entry("k", Domain::Describe, "first"), 16).await.unwrap();
        db.put_entry(&text_entry("k", Domain::Describe, "second"), 16).await.unwrap();

        assert_eq!(db.count_entries(Domain::Describe).await.unwrap(), 1);
        let got = db.get_entry("k", Domain::Describe, &Language::En).await.unwrap().unwrap();
        assert_eq!(got.payload, CachePayload::Text { text: "second".into() });
    }

    #[tokio::test]
    async fn test_same_key_distinct_domains_and_languages() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_entry(&text_entry("k", Domain::Describe, "desc"), 16).await.unwrap();
        db.put_entry(&text_entry("k", Domain::Summarize, "sum"), 16).await.unwrap();
        let mut spanish = text_entry("k", Domain::Describe, "descripcion");
        spanish.language = Language::Es;
        db.put_entry(&spanish, 16).await.unwrap();

        assert_eq!(db.count_entries(Domain::Describe).await.unwrap(), 2);
        assert_eq!(db.count_entries(Domain::Summarize).await.unwrap(), 1);
        let got = db.get_entry("k", Domain::Describe, &Language::Es).await.unwrap().unwrap();
        assert_eq!(got.payload, CachePayload::Text { text: "descripcion".into() });
    }

    #[test]
    fn test_entry_live_at_exact_ttl_boundary() {
        let entry = action_entry("k", 60);
        assert!(!entry.is_expired_at(entry.expires_at()));
        assert!(entry.is_expired_at(entry.expires_at() + Duration::seconds(1)));
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let mut entry = action_entry("old", 60);
        entry.created_at = Utc::now() - Duration::seconds(120);
        db.put_entry(&entry, 16).await.unwrap();

        assert!(db.get_entry("old", Domain::Action, &Language::En).await.unwrap().is_none());
        // Removal is lazy: the row survives until the next insert sweeps it.
        assert_eq!(db.count_entries(Domain::Action).await.unwrap(), 1);

        db.put_entry(&action_entry("fresh", 3600), 16).await.unwrap();
        assert_eq!(db.count_entries(Domain::Action).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_lru_eviction_on_overflow() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_entry(&action_entry("a", 3600), 2).await.unwrap();
        db.put_entry(&action_entry("b", 3600), 2).await.unwrap();
        db.put_entry(&action_entry("c", 3600), 2).await.unwrap();

        assert_eq!(db.count_entries(Domain::Action).await.unwrap(), 2);
        assert!(db.get_entry("a", Domain::Action, &Language::En).await.unwrap().is_none());
        assert!(db.get_entry("c", Domain::Action, &Language::En).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_record_hit_protects_from_eviction() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_entry(&action_entry("a", 3600), 2).await.unwrap();
        db.put_entry(&action_entry("b", 3600), 2).await.unwrap();

        // "a" becomes the most recently used, so "b" is the LRU victim.
        db.record_hit("a", Domain::Action, &Language::En).await.unwrap();
        db.put_entry(&action_entry("c", 3600), 2).await.unwrap();

        let a = db.get_entry("a", Domain::Action, &Language::En).await.unwrap();
        assert_eq!(a.unwrap().hit_count, 1);
        assert!(db.get_entry("b", Domain::Action, &Language::En).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_eviction_scoped_to_domain() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put_entry(&text_entry("x", Domain::Describe, "d"), 16).await.unwrap();
        db.put_entry(&action_entry("a", 3600), 1).await.unwrap();
        db.put_entry(&action_entry("b", 3600), 1).await.unwrap();

        assert_eq!(db.count_entries(Domain::Action).await.unwrap(), 1);
        assert_eq!(db.count_entries(Domain::Describe).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_row_dropped_and_reported_as_miss() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let now = Utc::now();
        db.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO cache_entries (
                        subject_key, domain, language, fingerprint_json, payload_json,
                        created_at, ttl_secs, expires_at, hit_count, last_used_at
                    ) VALUES ('bad', 'action', 'en', 'not json', '{', ?1, 3600, ?2, 0, ?1)",
                    params![
                        now.to_rfc3339(),
                        (now + Duration::seconds(3600)).to_rfc3339()
                    ],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        assert!(db.get_entry("bad", Domain::Action, &Language::En).await.unwrap().is_none());
        assert_eq!(db.count_entries(Domain::Action).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_purge_expired_and_domain() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let mut stale = text_entry("stale", Domain::Summarize, "old");
        stale.created_at = Utc::now() - Duration::seconds(7200);
        db.put_entry(&stale, 16).await.unwrap();
        db.put_entry(&text_entry("live", Domain::Summarize, "new"), 16).await.unwrap();
        db.put_entry(&text_entry("live", Domain::Describe, "d"), 16).await.unwrap();

        assert_eq!(db.purge_expired().await.unwrap(), 1);
        assert_eq!(db.purge_domain(Domain::Describe).await.unwrap(), 1);
        assert_eq!(db.count_entries(Domain::Summarize).await.unwrap(), 1);
        assert_eq!(db.count_entries(Domain::Describe).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_purge_lru_direct() {
        let db = CacheDb::open_in_memory().await.unwrap();
        for key in ["a", "b", "c", "d"] {
            db.put_entry(&action_entry(key, 3600), 16).await.unwrap();
        }
        assert_eq!(db.purge_lru(Domain::Action, 3).await.unwrap(), 1);
        assert_eq!(db.count_entries(Domain::Action).await.unwrap(), 3);
        assert!(db.get_entry("a", Domain::Action, &Language::En).await.unwrap().is_none());
    }
}
