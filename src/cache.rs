//! Per-directory change-detection cache.
//!
//! One SQLite store per directory, created lazily on first use, keyed by
//! basename. A record holds the size and mtime token observed after the
//! last successful compression; a file is compressed again only when its
//! size grew or its mtime token changed. Size plus mtime (not a content
//! hash) keeps the staleness check O(1) with no re-read of file bytes.
//!
//! Several worker processes may touch one directory's store at once; the
//! UNIQUE constraint on `fname` and SQLite's own statement transactions
//! serialize them, with a busy timeout to ride out lock contention.

use crate::error::Result;
use crate::swap::MtimeStamp;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::time::Duration;

/// Reserved store filename, one per directory.
pub const CACHE_FILE: &str = ".smally.db";

pub struct DirCache {
    conn: Connection,
}

/// Result of a staleness probe.
///
/// Carries the row identity found during lookup so that the follow-up
/// [`DirCache::record`] reuses it instead of re-querying; within one worker
/// there is no window between check and update.
pub struct Probe {
    row: Option<i64>,
    pub stale: bool,
}

impl DirCache {
    /// Opens the store for `dir`, creating file and schema on first use.
    pub fn open(dir: &Path) -> Result<DirCache> {
        let conn = Connection::open(dir.join(CACHE_FILE))?;
        conn.busy_timeout(Duration::from_secs(5))?;
        migrate(&conn)?;
        Ok(DirCache { conn })
    }

    /// Opens the store of the directory containing `file`.
    pub fn for_file(file: &Path) -> Result<DirCache> {
        let dir = match file.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        Self::open(dir)
    }

    /// Staleness check: absent record means stale; a present record is
    /// stale iff the current size exceeds the stored size or the mtime
    /// token differs from the stored one.
    pub fn probe(&self, fname: &str, size: u64, mtime: &MtimeStamp) -> Result<Probe> {
        let row: Option<(i64, i64, String)> = self
            .conn
            .query_row(
                "SELECT id, size, mtime FROM smally WHERE fname = ?1",
                params![fname],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .optional()?;

        Ok(match row {
            None => Probe {
                row: None,
                stale: true,
            },
            Some((id, recorded_size, recorded_mtime)) => Probe {
                row: Some(id),
                stale: size as i64 > recorded_size || mtime.token() != recorded_mtime,
            },
        })
    }

    /// Upsert keyed on the probe's row identity. A row id found at probe
    /// time is updated directly; a fresh insert relies on the UNIQUE
    /// constraint to merge with a concurrent worker's insert of the same
    /// basename instead of duplicating it.
    pub fn record(&self, probe: &Probe, fname: &str, size: u64, mtime: &MtimeStamp) -> Result<()> {
        match probe.row {
            Some(id) => {
                self.conn.execute(
                    "UPDATE smally SET size = ?1, mtime = ?2 WHERE id = ?3",
                    params![size as i64, mtime.token(), id],
                )?;
            }
            None => {
                self.conn.execute(
                    "INSERT INTO smally (fname, size, mtime) VALUES (?1, ?2, ?3) \
                     ON CONFLICT(fname) DO UPDATE SET size = excluded.size, mtime = excluded.mtime",
                    params![fname, size as i64, mtime.token()],
                )?;
            }
        }
        Ok(())
    }
}

/// Idempotent schema migration, run once per handle acquisition.
fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS smally (
            id    INTEGER PRIMARY KEY AUTOINCREMENT,
            fname TEXT NOT NULL UNIQUE,
            size  INTEGER NOT NULL,
            mtime TEXT NOT NULL
        );",
    )?;
    Ok(())
}
