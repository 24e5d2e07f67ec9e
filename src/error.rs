use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SmallyError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{tool} failed: {detail}")]
    ExternalTool { tool: &'static str, detail: String },

    #[error("file changed underneath us at {path}: {source}")]
    FilesystemRace {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cache error: {0}")]
    Cache(#[from] rusqlite::Error),

    #[error("walkdir error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("unsupported file type: {0}")]
    UnsupportedType(PathBuf),

    #[error("failed to dispatch worker for {path}: {source}")]
    Dispatch {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, SmallyError>;
