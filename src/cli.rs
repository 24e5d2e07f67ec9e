use crate::detect::FileKind;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "smally",
    about = "Compress JPEG, PNG and GIF losslessly, in place, keeping mtime",
    long_about = "smally compresses JPEG, PNG and GIF files losslessly by delegating to \
                  jpegtran, optipng and gifsicle, keeps whichever output is smallest, \
                  replaces files in place crash-safely, preserves modification times, and \
                  remembers processed files per directory so repeated runs are cheap.",
    version,
    after_help = "EXAMPLES:\n  \
    smally photo.jpg\n  \
    smally -j -p ./images -r\n  \
    smally ./images -P 4 --no-cache"
)]
pub struct Args {
    #[arg(help = "File or directory to compress")]
    pub pathname: PathBuf,

    #[arg(short = 'j', long, help = "Use jpegtran to compress JPEG files")]
    pub jpegtran: bool,

    #[arg(short = 'p', long, help = "Use optipng to compress PNG files")]
    pub optipng: bool,

    #[arg(short = 'g', long, help = "Use gifsicle to compress GIF files")]
    pub gifsicle: bool,

    #[arg(short = 'r', long, help = "Recursively work on subdirectories")]
    pub recursive: bool,

    #[arg(
        short = 'P',
        long = "parallel",
        value_name = "N",
        help = "Number of parallel worker processes (default: logical CPU count)",
        long_help = "Number of parallel worker processes for directory targets. \
                     Clamped to the logical CPU count."
    )]
    pub parallel: Option<usize>,

    #[arg(long, help = "Disable the per-directory change-detection cache")]
    pub no_cache: bool,

    #[arg(short = 'q', long, help = "Only print errors")]
    pub quiet: bool,

    #[arg(short = 'v', long, help = "Print skipped files and other detail")]
    pub verbose: bool,
}

/// Explicit configuration handed to every component entry point.
///
/// When no mode flag is given, all three formats are enabled.
#[derive(Debug, Clone)]
pub struct Config {
    pub jpeg: bool,
    pub png: bool,
    pub gif: bool,
    pub recursive: bool,
    pub workers: usize,
    pub use_cache: bool,
    pub quiet: bool,
    pub verbose: bool,
}

impl Config {
    pub fn from_args(args: &Args) -> Self {
        let none_given = !(args.jpegtran || args.optipng || args.gifsicle);
        let cpus = num_cpus::get().max(1);
        Config {
            jpeg: args.jpegtran || none_given,
            png: args.optipng || none_given,
            gif: args.gifsicle || none_given,
            recursive: args.recursive,
            workers: args.parallel.unwrap_or(cpus).clamp(1, cpus),
            use_cache: !args.no_cache,
            quiet: args.quiet,
            verbose: args.verbose,
        }
    }

    pub fn enabled_for(&self, kind: FileKind) -> bool {
        match kind {
            FileKind::Jpeg => self.jpeg,
            FileKind::Png => self.png,
            FileKind::Gif => self.gif,
            FileKind::Directory | FileKind::Other => false,
        }
    }
}
