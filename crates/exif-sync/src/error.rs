//! Error taxonomy for the propagation pipeline.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures of the propagation pipeline. Every variant is fatal for the
/// current run; there is no retry or partial-success path.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Resolution exhausted every candidate extension without a match.
    #[error("no source image named `{base_name}.*` in {}", .directory.display())]
    SourceNotFound {
        base_name: String,
        directory: PathBuf,
    },

    /// The external tool exited non-zero, printed to its error channel
    /// where none was expected, or hit the configured timeout
    /// (`exit_code` is `None` when the process had to be killed).
    #[error("exiftool {action} failed ({}): {stderr}", exit_label(.exit_code))]
    ExternalTool {
        action: &'static str,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// The extraction tool's output did not match the expected structured
    /// shape.
    #[error("unparseable exiftool output: {0}")]
    Parse(String),

    /// Filesystem failure distinct from "no match found", e.g. the search
    /// directory could not be listed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "timed out or killed".to_string(),
    }
}
