//! GPX correlation through exiftool's `-geotag` interface.

use std::path::PathBuf;
use std::process::Command;

use anyhow::{bail, Context, Result};
use chrono::Local;
use log::{debug, info};

/// The local UTC offset formatted for exiftool's `-geosync`, `±HH:MM:SS`.
pub fn local_tz_offset() -> String {
    format_offset(Local::now().offset().local_minus_utc())
}

fn format_offset(seconds: i32) -> String {
    let sign = if seconds < 0 { '-' } else { '+' };
    let seconds = seconds.unsigned_abs();
    format!(
        "{sign}{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// Correlates the copied files against the given GPX tracks, overwriting
/// their GPS tags in place. One exiftool invocation for the whole batch.
pub fn geotag(files: &[PathBuf], tracks: &[PathBuf], tz_offset: &str) -> Result<()> {
    let mut cmd = Command::new("exiftool");
    for track in tracks {
        cmd.arg("-geotag").arg(track);
    }
    cmd.arg(format!("-geosync={tz_offset}"))
        .arg("-overwrite_original_in_place")
        .arg("-v2")
        .arg("-P")
        .args(files);

    info!(
        "geotagging {} file(s) against {} track(s), geosync {tz_offset}",
        files.len(),
        tracks.len()
    );
    let output = cmd.output().context("running exiftool for geotagging")?;
    if !output.status.success() {
        bail!(
            "exiftool geotag failed ({:?}): {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stderr).trim_end()
        );
    }
    debug!("exiftool: {}", String::from_utf8_lossy(&output.stdout).trim_end());
    Ok(())
}
