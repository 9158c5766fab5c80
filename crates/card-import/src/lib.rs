//! Card-to-working-directory photo import.
//!
//! Copies new images off a memory card, skipping files already present in
//! the destination (matched by name, compared by size), optionally stamps
//! copyright and lens tags into formats that carry in-file EXIF, and
//! geotags the copied batch against GPX tracks through exiftool.
//!
//! The import is flat and stateless: one pass over the source directory,
//! no recursion, no catalog.

pub mod embed;
pub mod geotag;

use std::fs;
use std::path::PathBuf;
use std::time::{Instant, SystemTime};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// Recognized file extensions, split the way cameras split them: directly
/// viewable images and raw captures. Loadable from a JSON file so new
/// camera formats need no rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionConfig {
    pub img: Vec<String>,
    pub raw: Vec<String>,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            img: ["jpg", "jpeg", "png", "tif", "tiff", "webp"]
                .map(String::from)
                .to_vec(),
            raw: ["rw2", "orf", "dng", "cr2", "cr3", "nef", "arw", "raf"]
                .map(String::from)
                .to_vec(),
        }
    }
}

impl ExtensionConfig {
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading extension config {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("parsing extension config {}", path.display()))
    }

    /// True when `ext` (lowercase, no dot) is a recognized image format.
    pub fn is_image(&self, ext: &str) -> bool {
        self.img.iter().any(|e| e == ext) || self.raw.iter().any(|e| e == ext)
    }
}

/// One import run's parameters.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub src_dir: PathBuf,
    pub dst_dir: PathBuf,
    /// Only copy files modified at or after this local time.
    pub newer_than: Option<DateTime<Local>>,
    /// GPX tracks to correlate the copied batch against.
    pub gpx: Vec<PathBuf>,
    /// Offset handed to exiftool's `-geosync`, `±HH:MM:SS`.
    pub tz_offset: String,
    pub copyright: Option<String>,
    pub lens_model: Option<String>,
}

/// What an import run did.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub copied: Vec<PathBuf>,
    pub skipped: usize,
    pub seconds: f64,
}

/// Runs one import pass over the source directory.
pub fn import_photos(options: &ImportOptions, extensions: &ExtensionConfig) -> Result<ImportReport> {
    if !options.src_dir.is_dir() {
        bail!("source dir {} does not exist", options.src_dir.display());
    }
    if !options.dst_dir.is_dir() {
        bail!("destination dir {} does not exist", options.dst_dir.display());
    }
    let cutoff: Option<SystemTime> = options.newer_than.map(SystemTime::from);

    let started = Instant::now();
    let mut report = ImportReport::default();

    for entry in fs::read_dir(&options.src_dir)
        .with_context(|| format!("listing {}", options.src_dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        if !extensions.is_image(&ext) {
            debug!("not an image: {name}");
            report.skipped += 1;
            continue;
        }

        if let Some(cutoff) = cutoff {
            let modified = entry.metadata()?.modified()?;
            if modified < cutoff {
                debug!("old: {name}");
                report.skipped += 1;
                continue;
            }
        }

        let dst = options.dst_dir.join(entry.file_name());
        if dst.exists() {
            let src_size = entry.metadata()?.len();
            let dst_size = fs::metadata(&dst)?.len();
            if src_size != dst_size {
                warn!("size differs for {name}: card {src_size}, copy {dst_size}");
            }
            report.skipped += 1;
            continue;
        }

        info!("copy {} -> {}", path.display(), dst.display());
        fs::copy(&path, &dst)
            .with_context(|| format!("copying {} to {}", path.display(), dst.display()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&dst, fs::Permissions::from_mode(0o644))?;
        }

        if embed::supports_embedding(&ext)
            && (options.copyright.is_some() || options.lens_model.is_some())
        {
            embed::stamp(
                &dst,
                options.lens_model.as_deref(),
                options.copyright.as_deref(),
            )?;
        }

        report.copied.push(dst);
    }

    if !options.gpx.is_empty() && !report.copied.is_empty() {
        geotag::geotag(&report.copied, &options.gpx, &options.tz_offset)?;
    }

    report.seconds = started.elapsed().as_secs_f64();
    Ok(report)
}
