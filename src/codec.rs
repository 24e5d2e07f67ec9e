//! External encoder invocation and variant selection.
//!
//! One strategy per tool. Each strategy produces sibling candidate files at
//! deterministic names next to the original and then decides which variant
//! wins, applying its format-specific tie-break. The decision policies are
//! pure functions over sizes so they can be tested without touching disk or
//! the tools themselves.

use crate::detect::{self, FileKind};
use crate::error::{Result, SmallyError};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Suffixes appended to the original's basename for candidate files.
pub const BASELINE_SUFFIX: &str = ".smally.baseline";
pub const PROGRESSIVE_SUFFIX: &str = ".smally.progressive";
pub const SINGLE_SUFFIX: &str = ".smally";

/// Which encoding strategy produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    Baseline,
    Progressive,
    Single,
}

/// A file produced by one encoder invocation, pending selection.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub path: PathBuf,
    pub size: u64,
    pub kind: CandidateKind,
}

/// The selector's verdict: keep the original, or replace it with the
/// candidate at the given index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    KeepOriginal,
    Replace(usize),
}

pub trait Codec: Sync {
    fn tool(&self) -> &'static str;

    /// The sibling paths this codec writes candidates to, in production
    /// order. Deterministic so that crash recovery can reconstruct them.
    fn candidate_paths(&self, original: &Path) -> Vec<PathBuf>;

    /// Runs the external tool, producing candidate files without mutating
    /// the original. A candidate that is absent or empty afterwards is an
    /// `ExternalTool` error, never a zero-byte win.
    fn produce(&self, original: &Path) -> Result<Vec<Candidate>>;

    /// Format-specific winner decision over the produced candidates.
    fn select(&self, original: &Path, original_size: u64, candidates: &[Candidate])
        -> Result<Choice>;
}

pub fn for_kind(kind: FileKind) -> Option<&'static dyn Codec> {
    match kind {
        FileKind::Jpeg => Some(&Jpegtran),
        FileKind::Png => Some(&Optipng),
        FileKind::Gif => Some(&Gifsicle),
        FileKind::Directory | FileKind::Other => None,
    }
}

/// Three-way JPEG pick over the original and the jpegtran pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JpegPick {
    Original,
    Baseline,
    Progressive,
}

/// Decision policy for the dual-candidate (jpegtran) case.
///
/// The original wins when it is no larger than either candidate, except
/// that an equal-sized progressive candidate replaces a non-progressive
/// original (the normalization costs nothing). When a candidate wins and
/// the two are equal, progressive is preferred.
pub fn choose_jpeg(size: u64, baseline: u64, progressive: u64, already_progressive: bool) -> JpegPick {
    if size <= baseline && size <= progressive {
        if size == progressive && !already_progressive {
            JpegPick::Progressive
        } else {
            JpegPick::Original
        }
    } else if progressive <= baseline {
        JpegPick::Progressive
    } else {
        JpegPick::Baseline
    }
}

/// Decision policy for the single-candidate (optipng/gifsicle) case:
/// replace iff the sizes differ. Exact equality keeps the original and its
/// inode, skipping a no-op swap.
pub fn choose_single(size: u64, candidate: u64) -> bool {
    candidate != size
}

fn sibling(original: &Path, suffix: &str) -> PathBuf {
    let mut name = original
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(suffix);
    original.with_file_name(name)
}

/// Runs the tool to completion, capturing its chatter so report lines stay
/// clean. The exit status is deliberately not inspected: presence of a
/// usable candidate file is the success signal.
fn run_tool(tool: &'static str, cmd: &mut Command) -> Result<()> {
    cmd.output()
        .map(|_| ())
        .map_err(|e| SmallyError::ExternalTool {
            tool,
            detail: e.to_string(),
        })
}

fn stat_candidate(tool: &'static str, path: PathBuf, kind: CandidateKind) -> Result<Candidate> {
    match fs::metadata(&path) {
        Ok(meta) if meta.len() > 0 => Ok(Candidate {
            path,
            size: meta.len(),
            kind,
        }),
        Ok(_) => Err(SmallyError::ExternalTool {
            tool,
            detail: format!("zero-length output at {}", path.display()),
        }),
        Err(e) => Err(SmallyError::ExternalTool {
            tool,
            detail: format!("no output produced at {} ({e})", path.display()),
        }),
    }
}

/// `jpegtran -copy none`, run twice: once plain (baseline), once with
/// `-progressive`.
pub struct Jpegtran;

impl Codec for Jpegtran {
    fn tool(&self) -> &'static str {
        "jpegtran"
    }

    fn candidate_paths(&self, original: &Path) -> Vec<PathBuf> {
        vec![
            sibling(original, BASELINE_SUFFIX),
            sibling(original, PROGRESSIVE_SUFFIX),
        ]
    }

    fn produce(&self, original: &Path) -> Result<Vec<Candidate>> {
        let baseline = sibling(original, BASELINE_SUFFIX);
        let progressive = sibling(original, PROGRESSIVE_SUFFIX);

        run_tool(
            self.tool(),
            Command::new("jpegtran")
                .args(["-copy", "none", "-optimize", "-outfile"])
                .arg(&baseline)
                .arg(original),
        )?;
        run_tool(
            self.tool(),
            Command::new("jpegtran")
                .args(["-copy", "none", "-progressive", "-optimize", "-outfile"])
                .arg(&progressive)
                .arg(original),
        )?;

        Ok(vec![
            stat_candidate(self.tool(), baseline, CandidateKind::Baseline)?,
            stat_candidate(self.tool(), progressive, CandidateKind::Progressive)?,
        ])
    }

    fn select(
        &self,
        original: &Path,
        original_size: u64,
        candidates: &[Candidate],
    ) -> Result<Choice> {
        let baseline = candidates
            .iter()
            .position(|c| c.kind == CandidateKind::Baseline);
        let progressive = candidates
            .iter()
            .position(|c| c.kind == CandidateKind::Progressive);
        let (Some(b), Some(p)) = (baseline, progressive) else {
            return Err(SmallyError::ExternalTool {
                tool: self.tool(),
                detail: "candidate pair incomplete".to_string(),
            });
        };

        let already_progressive = detect::is_jpeg_progressive(original)?;
        Ok(
            match choose_jpeg(
                original_size,
                candidates[b].size,
                candidates[p].size,
                already_progressive,
            ) {
                JpegPick::Original => Choice::KeepOriginal,
                JpegPick::Baseline => Choice::Replace(b),
                JpegPick::Progressive => Choice::Replace(p),
            },
        )
    }
}

/// `optipng -fix -o7 -zm1-9`, writing to a single sibling candidate.
pub struct Optipng;

impl Codec for Optipng {
    fn tool(&self) -> &'static str {
        "optipng"
    }

    fn candidate_paths(&self, original: &Path) -> Vec<PathBuf> {
        vec![sibling(original, SINGLE_SUFFIX)]
    }

    fn produce(&self, original: &Path) -> Result<Vec<Candidate>> {
        let path = sibling(original, SINGLE_SUFFIX);
        run_tool(
            self.tool(),
            Command::new("optipng")
                .args(["-fix", "-o7", "-zm1-9"])
                .arg(original)
                .arg("-out")
                .arg(&path),
        )?;
        Ok(vec![stat_candidate(self.tool(), path, CandidateKind::Single)?])
    }

    fn select(&self, _original: &Path, original_size: u64, candidates: &[Candidate]) -> Result<Choice> {
        select_single(self.tool(), original_size, candidates)
    }
}

/// `gifsicle -O3 --colors 256`, writing to a single sibling candidate.
pub struct Gifsicle;

impl Codec for Gifsicle {
    fn tool(&self) -> &'static str {
        "gifsicle"
    }

    fn candidate_paths(&self, original: &Path) -> Vec<PathBuf> {
        vec![sibling(original, SINGLE_SUFFIX)]
    }

    fn produce(&self, original: &Path) -> Result<Vec<Candidate>> {
        let path = sibling(original, SINGLE_SUFFIX);
        run_tool(
            self.tool(),
            Command::new("gifsicle")
                .args(["-O3", "--colors", "256"])
                .arg(original)
                .arg("-o")
                .arg(&path),
        )?;
        Ok(vec![stat_candidate(self.tool(), path, CandidateKind::Single)?])
    }

    fn select(&self, _original: &Path, original_size: u64, candidates: &[Candidate]) -> Result<Choice> {
        select_single(self.tool(), original_size, candidates)
    }
}

fn select_single(tool: &'static str, original_size: u64, candidates: &[Candidate]) -> Result<Choice> {
    let Some(candidate) = candidates.first() else {
        return Err(SmallyError::ExternalTool {
            tool,
            detail: "no candidate to select from".to_string(),
        });
    };
    Ok(if choose_single(original_size, candidate.size) {
        Choice::Replace(0)
    } else {
        Choice::KeepOriginal
    })
}
