//! Propagates curated EXIF/GPS metadata from the original capture onto an
//! edited export, in place.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;
use exif_sync::{ExifTool, Pipeline, PropagateConfig};

#[derive(Parser)]
#[command(name = "copy-exif")]
#[command(about = "Copy camera metadata from the original capture onto an edited export")]
struct Cli {
    /// Path to the exported (derivative) image
    image: PathBuf,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = err.print();
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            // Wrong usage exits 1, not clap's default 2.
            let _ = err.print();
            return ExitCode::FAILURE;
        }
    };

    let config = PropagateConfig::default();
    let backend = ExifTool::new(&config);
    let pipeline = Pipeline::new(config, backend);

    match pipeline.run(&cli.image) {
        Ok(done) => {
            println!(
                "propagated {} field(s) from {} to {}",
                done.fields.len(),
                done.source.display(),
                cli.image.display()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("copy-exif: {err}");
            ExitCode::FAILURE
        }
    }
}
