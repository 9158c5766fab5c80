//! Imports new photos from a memory card into a working directory.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use card_import::geotag::local_tz_offset;
use card_import::{import_photos, ExtensionConfig, ImportOptions};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use clap::Parser;

#[derive(Parser)]
#[command(name = "import-photos")]
#[command(about = "Copy new photos from a card into a working directory")]
struct Cli {
    /// Source directory (the card)
    #[arg(short = 's', long)]
    srcdir: PathBuf,

    /// Destination directory
    #[arg(short = 'd', long)]
    dstdir: PathBuf,

    /// Only copy files modified after this local time
    /// ("YYYY-MM-DD" or "YYYY-MM-DD HH:MM[:SS]")
    #[arg(short = 'n', long)]
    newer: Option<String>,

    /// GPX track to geotag copied files against (repeatable)
    #[arg(short = 'g', long = "gpx")]
    gpx: Vec<PathBuf>,

    /// Timezone offset for exiftool's -geosync (default: local zone)
    #[arg(long)]
    tz: Option<String>,

    /// Copyright notice to embed into copied images
    #[arg(short = 'C', long = "copyright")]
    copyright: Option<String>,

    /// Lens model to embed into copied images
    #[arg(short = 'L', long = "lens")]
    lens: Option<String>,

    /// JSON file with img/raw extension lists
    #[arg(long)]
    ext_config: Option<PathBuf>,
}

fn parse_newer(text: &str) -> Result<DateTime<Local>> {
    let naive = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        });
    let Some(naive) = naive else {
        bail!("unrecognized date for --newer: {text:?}");
    };
    Local
        .from_local_datetime(&naive)
        .single()
        .with_context(|| format!("ambiguous local time: {text:?}"))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let newer_than = cli.newer.as_deref().map(parse_newer).transpose()?;
    let extensions = match &cli.ext_config {
        Some(path) => ExtensionConfig::load(path)?,
        None => ExtensionConfig::default(),
    };

    let options = ImportOptions {
        src_dir: cli.srcdir,
        dst_dir: cli.dstdir,
        newer_than,
        gpx: cli.gpx,
        tz_offset: cli.tz.unwrap_or_else(local_tz_offset),
        copyright: cli.copyright,
        lens_model: cli.lens,
    };

    let report = import_photos(&options, &extensions)?;
    println!(
        "copied {} file(s), skipped {}, in {:.2}s",
        report.copied.len(),
        report.skipped,
        report.seconds
    );
    Ok(())
}
