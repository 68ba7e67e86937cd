//! Database connection management.
//!
//! One tokio-rusqlite connection per store; all statements run on its
//! background thread, which also serializes writes so per-key upserts are
//! atomic without extra locking.

use std::path::Path;

use tokio_rusqlite::Connection;

use super::migrations;
use crate::Error;

/// Pragmas applied to every connection. WAL keeps concurrent readers off
/// the writer's back.
const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
    PRAGMA synchronous=NORMAL;
    PRAGMA temp_store=MEMORY;
    PRAGMA foreign_keys=ON;";

/// Handle to the cache database.
#[derive(Clone, Debug)]
pub struct CacheDb {
    pub(crate) conn: Connection,
}

impl CacheDb {
    /// Open (creating if needed) the database at `path`, apply pragmas,
    /// and run pending migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::prepare(conn).await
    }

    /// In-memory database for tests, configured identically.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Self::prepare(conn).await
    }

    async fn prepare(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| {
            conn.execute_batch(PRAGMAS)?;
            Ok(())
        })
        .await
        .map_err(Error::Database)?;

        migrations::run(&conn).await?;

        Ok(Self { conn })
    }
}
