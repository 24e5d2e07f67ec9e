//! Per-file compress-compare-replace sequence.
//!
//! Data flow: cache probe → encoder invocation → variant selection →
//! atomic replacement → cache record. Each call runs to completion inside
//! one worker; there is no concurrency here.

use crate::cache::{DirCache, Probe};
use crate::cli::Config;
use crate::codec::{self, Choice};
use crate::detect::{self, FileKind};
use crate::error::{Result, SmallyError};
use crate::swap::{self, MtimeStamp};
use std::fs;
use std::path::Path;

/// Per-file report value.
///
/// `saved` is candidate size minus original size, so it is negative when
/// bytes were won and zero when the original was kept; zero is also
/// possible after a replacement (the progressive tie-break).
#[derive(Debug)]
pub struct Outcome {
    pub saved: i64,
    pub original_size: u64,
    pub skipped: bool,
    pub jpeg_tag: Option<&'static str>,
}

impl Outcome {
    fn skipped(original_size: u64) -> Self {
        Outcome {
            saved: 0,
            original_size,
            skipped: true,
            jpeg_tag: None,
        }
    }
}

/// Compresses one file in place.
///
/// `kind` must be one of the image kinds; the caller has already matched it
/// against the enabled modes. With the cache enabled, a file unchanged
/// since its last successful compression is skipped without invoking any
/// external tool.
pub fn compress_file(path: &Path, kind: FileKind, config: &Config) -> Result<Outcome> {
    let codec = codec::for_kind(kind).ok_or_else(|| SmallyError::UnsupportedType(path.to_path_buf()))?;
    let fname = path
        .file_name()
        .ok_or_else(|| SmallyError::UnsupportedType(path.to_path_buf()))?
        .to_string_lossy()
        .into_owned();

    let meta = fs::metadata(path)?;
    let size = meta.len();
    let stamp = MtimeStamp::from_metadata(&meta);

    let cache = if config.use_cache {
        Some(DirCache::for_file(path)?)
    } else {
        None
    };
    let probe: Option<Probe> = match &cache {
        Some(cache) => {
            let probe = cache.probe(&fname, size, &stamp)?;
            if !probe.stale {
                return Ok(Outcome::skipped(size));
            }
            Some(probe)
        }
        None => None,
    };

    let candidates = match codec.produce(path) {
        Ok(candidates) => candidates,
        Err(e) => {
            cleanup_candidates(codec, path);
            return Err(e);
        }
    };

    let choice = match codec.select(path, size, &candidates) {
        Ok(choice) => choice,
        Err(e) => {
            cleanup_candidates(codec, path);
            return Err(e);
        }
    };

    let winner = match choice {
        Choice::KeepOriginal => None,
        Choice::Replace(i) => Some(i),
    };
    swap::commit(path, winner, &candidates, &stamp)?;

    let saved = match winner {
        None => 0,
        Some(i) => candidates[i].size as i64 - size as i64,
    };

    if let (Some(cache), Some(probe)) = (&cache, &probe) {
        // Store exactly what the next probe will read back: the swap
        // restored the mtime, but the filesystem may round it.
        let post_meta = fs::metadata(path)?;
        cache.record(
            probe,
            &fname,
            post_meta.len(),
            &MtimeStamp::from_metadata(&post_meta),
        )?;
    }

    let jpeg_tag = if kind == FileKind::Jpeg {
        Some(if detect::is_jpeg_progressive(path)? {
            "[p]"
        } else {
            "[b]"
        })
    } else {
        None
    };

    Ok(Outcome {
        saved,
        original_size: size,
        skipped: false,
        jpeg_tag,
    })
}

/// Pre-selection failures leave the original untouched; recovery just has
/// to sweep up whatever candidates made it to disk.
fn cleanup_candidates(codec: &dyn codec::Codec, path: &Path) {
    let paths = codec.candidate_paths(path);
    let refs: Vec<&Path> = paths.iter().map(|p| p.as_path()).collect();
    swap::recover(path, &refs, None);
}

/// Prints the per-file report line: `<path> --` when nothing changed, else
/// `<path> <saved> <percent>%`, with the JPEG encoding tag appended.
pub fn report(path: &Path, outcome: &Outcome) {
    if outcome.skipped {
        crate::verbose!("{} skipped (unchanged since last run)", path.display());
        return;
    }
    let stats = if outcome.saved == 0 {
        "--".to_string()
    } else {
        let percent = outcome.saved as f64 / outcome.original_size as f64 * 100.0;
        format!("{} {:.2}%", outcome.saved, percent)
    };
    match outcome.jpeg_tag {
        Some(tag) => crate::info!("{} {} {}", path.display(), stats, tag),
        None => crate::info!("{} {}", path.display(), stats),
    }
}
