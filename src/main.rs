use clap::Parser;
use smally::batch::{self, WORKER_FAILURE_CODE};
use smally::cli::{Args, Config};
use smally::detect::{self, FileKind};
use smally::{logger, pipeline};
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = Args::parse();
    let config = Config::from_args(&args);
    logger::init(config.quiet, config.verbose);

    ExitCode::from(run(&args.pathname, &config))
}

fn run(pathname: &Path, config: &Config) -> u8 {
    let kind = match detect::classify(pathname) {
        Ok(kind) => kind,
        Err(e) => {
            smally::error!("{}: {}", pathname.display(), e);
            return 2;
        }
    };

    match kind {
        FileKind::Directory => match batch::run_batch(pathname, config) {
            Ok(_) => 0,
            Err(e) => {
                smally::error!("{e}");
                3
            }
        },
        FileKind::Other => {
            smally::error!("file type of {} is not supported", pathname.display());
            2
        }
        image_kind => {
            if !config.enabled_for(image_kind) {
                return 1;
            }
            match pipeline::compress_file(pathname, image_kind, config) {
                Ok(outcome) => {
                    pipeline::report(pathname, &outcome);
                    0
                }
                Err(e) => {
                    smally::error!("{}: {}", pathname.display(), e);
                    WORKER_FAILURE_CODE as u8
                }
            }
        }
    }
}
