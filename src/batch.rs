//! Directory walk and process-per-file fan-out.
//!
//! Each eligible file is handed to its own worker process running this
//! same binary, so one file's crash can never corrupt another's state and
//! the per-directory cache is only ever shared across process boundaries
//! SQLite already serializes. The pool is bounded by the configured worker
//! count, clamped to the logical CPU count.

use crate::cli::Config;
use crate::error::{Result, SmallyError};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;
use walkdir::{DirEntry, WalkDir};

/// Aggregated result of one batch run.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub compressed: usize,
    pub ineligible: usize,
    pub failed: usize,
}

/// Exit code a worker uses for a genuine per-file failure, distinct from
/// the "not eligible" codes 1 and 2.
pub const WORKER_FAILURE_CODE: i32 = 4;

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

/// Collects every regular file under `root`, following symlinks. Hidden
/// entries are skipped, which also keeps each directory's cache store out
/// of the candidate set. Type filtering happens in the workers.
pub fn collect_files(root: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut walker = WalkDir::new(root).follow_links(true);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut files = Vec::new();
    for entry in walker.into_iter().filter_entry(|e| !is_hidden(e)) {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

enum WorkerStatus {
    Compressed,
    Ineligible,
    Failed,
}

fn worker_args(config: &Config) -> Vec<&'static str> {
    let mut args = Vec::new();
    if config.jpeg {
        args.push("-j");
    }
    if config.png {
        args.push("-p");
    }
    if config.gif {
        args.push("-g");
    }
    if !config.use_cache {
        args.push("--no-cache");
    }
    if config.quiet {
        args.push("-q");
    }
    if config.verbose {
        args.push("-v");
    }
    args
}

fn spawn_worker(
    exe: &Path,
    file: &Path,
    config: &Config,
    progress: &ProgressBar,
) -> Result<WorkerStatus> {
    let output = Command::new(exe)
        .args(worker_args(config))
        .arg(file)
        .output()
        .map_err(|e| SmallyError::Dispatch {
            path: file.to_path_buf(),
            source: e,
        })?;

    // replay the worker's output under the progress bar so lines stay
    // whole even when many workers finish at once
    for line in String::from_utf8_lossy(&output.stdout).lines() {
        progress.suspend(|| println!("{line}"));
    }
    for line in String::from_utf8_lossy(&output.stderr).lines() {
        progress.suspend(|| eprintln!("{line}"));
    }

    Ok(match output.status.code() {
        Some(0) => WorkerStatus::Compressed,
        Some(1) | Some(2) => WorkerStatus::Ineligible,
        _ => WorkerStatus::Failed,
    })
}

/// Walks `root` and fans one worker process out per file.
///
/// Worker failures are counted and reported but never abort the batch;
/// only a dispatch failure (worker binary failed to launch, pool failed to
/// build) aborts with an error.
pub fn run_batch(root: &Path, config: &Config) -> Result<BatchSummary> {
    let start = Instant::now();
    let files = collect_files(root, config.recursive)?;
    if files.is_empty() {
        crate::info!("# no files found under {}", root.display());
        return Ok(BatchSummary::default());
    }

    crate::info!("# parallel worker processes: {}", config.workers);

    let exe = std::env::current_exe().map_err(|e| SmallyError::Dispatch {
        path: root.to_path_buf(),
        source: e,
    })?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .build()
        .map_err(|e| SmallyError::Dispatch {
            path: root.to_path_buf(),
            source: std::io::Error::other(e),
        })?;

    let progress = if crate::logger::is_quiet() {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(files.len() as u64)
    };
    progress.set_style(ProgressStyle::default_bar());

    let statuses: Vec<Result<WorkerStatus>> = pool.install(|| {
        files
            .par_iter()
            .map(|file| {
                let status = spawn_worker(&exe, file, config, &progress);
                progress.inc(1);
                status
            })
            .collect()
    });
    progress.finish_and_clear();

    let mut summary = BatchSummary::default();
    for status in statuses {
        match status? {
            WorkerStatus::Compressed => summary.compressed += 1,
            WorkerStatus::Ineligible => summary.ineligible += 1,
            WorkerStatus::Failed => summary.failed += 1,
        }
    }

    crate::info!("\n📊 Batch summary:");
    crate::info!("  ✅ Compressed: {}", summary.compressed);
    crate::info!("  📁 Skipped (other types): {}", summary.ineligible);
    if summary.failed > 0 {
        crate::info!("  ❌ Failed: {}", summary.failed);
    }
    crate::info!("  ⏱️  Elapsed: {:.2?}", start.elapsed());

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    #[test]
    fn test_collect_files_top_level_only() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        File::create(dir.path().join("a.jpg")).unwrap();
        File::create(sub.join("b.jpg")).unwrap();

        let files = collect_files(dir.path(), false).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("a.jpg"));
    }

    #[test]
    fn test_collect_files_recursive() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        File::create(dir.path().join("a.jpg")).unwrap();
        File::create(sub.join("b.jpg")).unwrap();

        let mut files = collect_files(dir.path(), true).unwrap();
        files.sort();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_collect_files_skips_hidden_and_cache_store() {
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join("a.png")).unwrap();
        File::create(dir.path().join(crate::cache::CACHE_FILE)).unwrap();
        File::create(dir.path().join(".hidden.png")).unwrap();

        let files = collect_files(dir.path(), false).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("a.png"));
    }

    #[test]
    fn test_collect_files_all_types_collected() {
        // the walker is type-blind; classification belongs to the workers
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join("a.txt")).unwrap();
        File::create(dir.path().join("b.gif")).unwrap();

        let files = collect_files(dir.path(), false).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_worker_args_mirror_config() {
        let config = Config {
            jpeg: true,
            png: false,
            gif: true,
            recursive: true,
            workers: 2,
            use_cache: false,
            quiet: true,
            verbose: false,
        };
        let args = worker_args(&config);
        assert!(args.contains(&"-j"));
        assert!(!args.contains(&"-p"));
        assert!(args.contains(&"-g"));
        assert!(args.contains(&"--no-cache"));
        assert!(args.contains(&"-q"));
        // recursion is resolved by the walk, never forwarded to workers
        assert!(!args.contains(&"-r"));
    }
}
