//! Stamps copyright and lens tags into freshly copied images.
//!
//! Raw captures are left alone; only container formats with an in-file
//! EXIF block are touched, and only right after the copy, before anything
//! else sees the file.

use std::path::Path;

use anyhow::{Context, Result};
use little_exif::exif_tag::ExifTag;
use little_exif::metadata::Metadata;
use log::debug;

/// Formats the embedding backend can write into directly.
pub fn supports_embedding(ext: &str) -> bool {
    matches!(ext, "jpg" | "jpeg" | "tif" | "tiff" | "png" | "webp")
}

/// Writes the given lens model and copyright tags into the file at `path`.
pub fn stamp(path: &Path, lens_model: Option<&str>, copyright: Option<&str>) -> Result<()> {
    let mut metadata = Metadata::new_from_path(path)
        .with_context(|| format!("reading EXIF from {}", path.display()))?;

    if let Some(lens) = lens_model {
        debug!("stamping lens model {lens:?} into {}", path.display());
        metadata.set_tag(ExifTag::LensModel(lens.to_string()));
    }
    if let Some(notice) = copyright {
        debug!("stamping copyright {notice:?} into {}", path.display());
        metadata.set_tag(ExifTag::Copyright(notice.to_string()));
    }

    metadata
        .write_to_file(path)
        .with_context(|| format!("writing EXIF to {}", path.display()))?;
    Ok(())
}
