//! Locates the original capture for an edited export.
//!
//! Exports are assumed to live one directory below their originals, e.g.
//! `/photos/darktable_exported/IMG_0001_pp.jpg` was produced from
//! `/photos/IMG_0001.{JPG,RW2,ORF}`. The resolver undoes the processing
//! suffixes the editing tool appended to the name and probes the
//! grandparent directory for each configured extension in priority order.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::SyncError;

/// Strategy for undoing processing-tool name suffixes, pluggable so other
/// suffix conventions can be added without touching the matching logic.
pub type NameNormalizer = fn(&str) -> String;

/// Removes trailing `_<token>` groups appended by processing tools
/// (`_pp`, `_edit1`, `_crop`). Stripping stops at the first segment, and
/// at an all-numeric token: camera names are `PREFIX_NNNN`, so a bare
/// frame counter is part of the capture name, not a suffix.
pub fn strip_processing_suffixes(base: &str) -> String {
    let mut name = base.to_string();
    loop {
        let Some(idx) = name.rfind('_') else { break };
        if idx == 0 {
            break;
        }
        let token = &name[idx + 1..];
        if token.is_empty() || !token.chars().all(|c| c.is_ascii_alphanumeric()) {
            break;
        }
        if !token.chars().any(|c| c.is_ascii_alphabetic()) {
            break;
        }
        name.truncate(idx);
    }
    name
}

/// Finds the original capture corresponding to a derivative path.
pub struct SourceResolver {
    extensions: Vec<String>,
    normalize: NameNormalizer,
}

impl SourceResolver {
    pub fn new(extensions: Vec<String>) -> Self {
        Self {
            extensions,
            normalize: strip_processing_suffixes,
        }
    }

    /// Replaces the suffix-stripping strategy.
    pub fn with_normalizer(mut self, normalize: NameNormalizer) -> Self {
        self.normalize = normalize;
        self
    }

    /// Resolves the source image for `derivative`.
    ///
    /// The match is first-found, not best-found: extension order decides
    /// precedence when the same base name exists in two formats. For each
    /// extension an exact-case path probe runs first, then a
    /// case-insensitive scan of the search directory.
    pub fn resolve(&self, derivative: &Path) -> Result<PathBuf, SyncError> {
        let absolute = if derivative.is_absolute() {
            derivative.to_path_buf()
        } else {
            std::env::current_dir()?.join(derivative)
        };

        let search_dir = absolute.parent().and_then(Path::parent).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} has no grandparent directory", absolute.display()),
            )
        })?;

        let stem = absolute
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{} has no usable file name", absolute.display()),
                )
            })?;

        let base_name = (self.normalize)(stem);
        info!(
            "searching {} for {}.{{{}}}",
            search_dir.display(),
            base_name,
            self.extensions.join(",")
        );

        for ext in &self.extensions {
            let candidate = search_dir.join(format!("{base_name}.{ext}"));
            if candidate.exists() {
                debug!("exact match: {}", candidate.display());
                return Ok(candidate);
            }

            // Listing failures here are I/O errors, not "no match found".
            let wanted = format!("{base_name}.{ext}").to_lowercase();
            for entry in fs::read_dir(search_dir)? {
                let entry = entry?;
                let file_name = entry.file_name();
                let Some(name) = file_name.to_str() else { continue };
                if name.to_lowercase() == wanted {
                    let found = search_dir.join(name);
                    debug!("case-insensitive match: {}", found.display());
                    return Ok(found);
                }
            }
        }

        Err(SyncError::SourceNotFound {
            base_name,
            directory: search_dir.to_path_buf(),
        })
    }
}
