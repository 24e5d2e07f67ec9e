pub mod batch;
pub mod cache;
pub mod cli;
pub mod codec;
pub mod detect;
pub mod error;
pub mod logger;
pub mod pipeline;
pub mod swap;

pub use batch::{collect_files, run_batch, BatchSummary};
pub use cache::{DirCache, Probe, CACHE_FILE};
pub use cli::{Args, Config};
pub use codec::{choose_jpeg, choose_single, Candidate, CandidateKind, Choice, Codec, JpegPick};
pub use detect::{classify, is_jpeg_progressive, FileKind};
pub use error::{Result, SmallyError};
pub use pipeline::{compress_file, Outcome};
pub use swap::{commit, recover, MtimeStamp};
