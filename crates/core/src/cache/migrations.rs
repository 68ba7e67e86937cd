//! Schema migrations tracked through a `_migrations` version table.
//!
//! Each migration is an idempotent SQL batch (`CREATE ... IF NOT EXISTS`)
//! applied in ascending version order.

use std::num::ParseIntError;

use tokio_rusqlite::{Connection, params};

use super::Error;

const MIGRATIONS: &[(&str, &str)] = &[("1", include_str!("../../migrations/001_cache_entries.sql"))];

/// Apply any migrations newer than the recorded version.
///
/// # Errors
///
/// Returns an error if a migration batch fails to execute.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(Error::from)?;

        let current: i64 = conn
            .query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| {
                row.get(0)
            })
            .map_err(Error::from)?;

        for (version, sql) in MIGRATIONS {
            let version_num: i64 = version
                .parse()
                .map_err(|e: ParseIntError| Error::MigrationFailed(e.to_string()))?;
            if version_num > current {
                conn.execute_batch(sql)?;
                conn.execute(
                    "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                    params![version_num, chrono::Utc::now().to_rfc3339()],
                )
                .map_err(Error::from)?;
            }
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}
