//! In-place replacement with crash recovery.
//!
//! The destructive sequence is short and strictly ordered: delete losers,
//! delete original, rename winner, restore mtime. Every failure inside it
//! runs [`recover`] before the error is surfaced, so an interrupted run
//! always leaves exactly one file at the original's path.

use crate::codec::Candidate;
use crate::error::{Result, SmallyError};
use filetime::FileTime;
use std::fs;
use std::path::{Path, PathBuf};

/// Opaque modification-time token.
///
/// Captured before any destructive step, restored onto the replacement, and
/// stored in the cache as a canonical string so later comparisons are
/// byte-exact rather than semantically parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MtimeStamp(FileTime);

impl MtimeStamp {
    pub fn read(path: &Path) -> Result<Self> {
        Ok(Self::from_metadata(&fs::metadata(path)?))
    }

    pub fn from_metadata(meta: &fs::Metadata) -> Self {
        Self(FileTime::from_last_modification_time(meta))
    }

    pub fn restore(&self, path: &Path) -> Result<()> {
        filetime::set_file_mtime(path, self.0)?;
        Ok(())
    }

    /// Canonical token string, stable across capture, store and compare.
    pub fn token(&self) -> String {
        format!("{}.{:09}", self.0.unix_seconds(), self.0.nanoseconds())
    }
}

impl From<FileTime> for MtimeStamp {
    fn from(ft: FileTime) -> Self {
        Self(ft)
    }
}

fn race(path: &Path, source: std::io::Error) -> SmallyError {
    SmallyError::FilesystemRace {
        path: path.to_path_buf(),
        source,
    }
}

/// Applies the selector's verdict.
///
/// `winner` of `None` keeps the original: every candidate is deleted and
/// nothing else is touched. Otherwise the losers are deleted, the original
/// is deleted, the winner is renamed onto the original's path, and `stamp`
/// is restored onto the renamed file. On any failure the recovery routine
/// runs before the error propagates.
pub fn commit(
    original: &Path,
    winner: Option<usize>,
    candidates: &[Candidate],
    stamp: &MtimeStamp,
) -> Result<()> {
    let intended: Option<PathBuf> = winner.map(|i| candidates[i].path.clone());

    let sequence = || -> Result<()> {
        for (i, candidate) in candidates.iter().enumerate() {
            if Some(i) != winner {
                fs::remove_file(&candidate.path).map_err(|e| race(&candidate.path, e))?;
            }
        }
        if let Some(i) = winner {
            fs::remove_file(original).map_err(|e| race(original, e))?;
            fs::rename(&candidates[i].path, original).map_err(|e| race(original, e))?;
            stamp.restore(original)?;
        }
        Ok(())
    };

    sequence().map_err(|e| {
        let paths: Vec<&Path> = candidates.iter().map(|c| c.path.as_path()).collect();
        recover(original, &paths, intended.as_deref());
        e
    })
}

/// Repairs the directory after an interrupted replacement.
///
/// Idempotent, and silent about artifacts that are simply absent: calling
/// it when nothing needs repairing is a no-op. The outcome is always at
/// most one decision:
///
/// - original still present: leftover candidates are deleted;
/// - original gone and the intended winner known and present: the winner is
///   renamed into place, other survivors deleted;
/// - original gone, winner unknown: the smallest surviving candidate is
///   renamed into place (the delete had already committed to replacement),
///   the rest deleted.
pub fn recover(original: &Path, candidates: &[&Path], intended: Option<&Path>) {
    if original.exists() {
        for candidate in candidates {
            let _ = fs::remove_file(candidate);
        }
        return;
    }

    if let Some(winner) = intended {
        if winner.exists() && fs::rename(winner, original).is_ok() {
            for candidate in candidates {
                if *candidate != winner {
                    let _ = fs::remove_file(candidate);
                }
            }
            return;
        }
    }

    let mut survivors: Vec<(&Path, u64)> = candidates
        .iter()
        .filter_map(|c| fs::metadata(c).ok().map(|m| (*c, m.len())))
        .collect();
    survivors.sort_by_key(|&(_, len)| len);

    let mut survivors = survivors.into_iter();
    if let Some((keep, _)) = survivors.next() {
        let _ = fs::rename(keep, original);
        for (rest, _) in survivors {
            let _ = fs::remove_file(rest);
        }
    }
}
