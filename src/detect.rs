//! File-type classification.
//!
//! The pipeline only ever needs to know which external tool (if any) applies
//! to a path, so classification is a magic-byte sniff, not a full decode.

use crate::error::Result;
use image::ImageFormat;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Jpeg,
    Png,
    Gif,
    Directory,
    Other,
}

/// Classifies `path` into one of the kinds the pipeline understands.
///
/// Symlinks are followed, matching the walker. Anything that is not a
/// directory or a recognizable JPEG/PNG/GIF is `Other`.
pub fn classify(path: &Path) -> Result<FileKind> {
    let meta = std::fs::metadata(path)?;
    if meta.is_dir() {
        return Ok(FileKind::Directory);
    }
    if !meta.is_file() {
        return Ok(FileKind::Other);
    }

    let mut head = Vec::with_capacity(32);
    File::open(path)?.take(32).read_to_end(&mut head)?;
    Ok(match image::guess_format(&head) {
        Ok(ImageFormat::Jpeg) => FileKind::Jpeg,
        Ok(ImageFormat::Png) => FileKind::Png,
        Ok(ImageFormat::Gif) => FileKind::Gif,
        _ => FileKind::Other,
    })
}

/// Whether `path` holds a progressive-scan JPEG.
///
/// Walks the marker segments up to the first start-of-frame and checks for
/// one of the progressive SOF codes (SOF2/6/10/14). Non-JPEG input and
/// truncated streams report `false` rather than erroring; the answer only
/// feeds the tie-break and the report tag.
pub fn is_jpeg_progressive(path: &Path) -> Result<bool> {
    let mut r = BufReader::new(File::open(path)?);

    let mut sig = [0u8; 2];
    if r.read_exact(&mut sig).is_err() || sig != [0xFF, 0xD8] {
        return Ok(false);
    }

    let mut byte = [0u8; 1];
    loop {
        if r.read_exact(&mut byte).is_err() {
            return Ok(false);
        }
        if byte[0] != 0xFF {
            continue;
        }
        // skip fill bytes between the 0xFF prefix and the marker code
        loop {
            if r.read_exact(&mut byte).is_err() {
                return Ok(false);
            }
            if byte[0] != 0xFF {
                break;
            }
        }
        match byte[0] {
            // standalone markers, no payload
            0x01 | 0xD0..=0xD8 => continue,
            // EOI or entropy-coded data reached without a SOF
            0xD9 | 0xDA => return Ok(false),
            // sequential frames
            0xC0 | 0xC1 | 0xC3 | 0xC5 | 0xC7 | 0xC9 | 0xCB | 0xCD | 0xCF => return Ok(false),
            // progressive frames
            0xC2 | 0xC6 | 0xCA | 0xCE => return Ok(true),
            _ => {
                let mut len = [0u8; 2];
                if r.read_exact(&mut len).is_err() {
                    return Ok(false);
                }
                let len = u16::from_be_bytes(len);
                if len < 2 {
                    return Ok(false);
                }
                r.seek_relative(i64::from(len) - 2)?;
            }
        }
    }
}
