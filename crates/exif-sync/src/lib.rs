//! EXIF/GPS metadata propagation for edited photo exports
//!
//! Editing tools usually discard or mangle most camera metadata when they
//! re-encode an export. This crate locates the original capture in the
//! directory above the export, reads its metadata through exiftool, curates
//! an allow-listed subset of fields and writes them back onto the export in
//! place.
//!
//! The pieces compose left to right:
//!
//! - [`SourceResolver`] — undoes processing-tool filename suffixes and finds
//!   the original capture next to the export directory
//! - [`MetadataBackend`] / [`ExifTool`] — process boundary to exiftool for
//!   reading and applying metadata
//! - [`curate`] — pure selection and normalization of the propagated fields
//! - [`Pipeline`] — sequences resolve → read → curate → write for one file

pub mod curate;
pub mod error;
pub mod exiftool;
pub mod pipeline;
pub mod rdf;
pub mod resolve;

pub use curate::curate;
pub use error::SyncError;
pub use exiftool::{ExifTool, MetadataBackend};
pub use pipeline::{Pipeline, Propagated, Stage, StageError};
pub use resolve::SourceResolver;

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A single tag value as reported by the extraction tool. Repeated tags
/// (RDF bags/sequences) surface as a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    Scalar(String),
    List(Vec<String>),
}

impl TagValue {
    /// First scalar in the value; the value itself if already scalar.
    pub fn first(&self) -> Option<&str> {
        match self {
            TagValue::Scalar(s) => Some(s),
            TagValue::List(items) => items.first().map(String::as_str),
        }
    }

    /// True when there is no usable scalar in this value.
    pub fn is_empty(&self) -> bool {
        self.first().map_or(true, str::is_empty)
    }
}

impl From<&str> for TagValue {
    fn from(s: &str) -> Self {
        TagValue::Scalar(s.to_string())
    }
}

/// Flat mapping from fully-qualified tag key (`Group:Tag`) to value,
/// exactly as extracted from the source image. Never mutated after parse.
pub type RawMetadata = BTreeMap<String, TagValue>;

/// Curated mapping from unqualified field name to a single scalar value,
/// ready to be applied to a derivative. Serialized for exiftool as a JSON
/// array holding this one record.
pub type CuratedMetadata = BTreeMap<String, String>;

/// Immutable configuration for a propagation run, passed into each
/// component at construction so they stay independently testable.
#[derive(Debug, Clone)]
pub struct PropagateConfig {
    /// Recognized original-capture extensions, in match-priority order.
    pub extensions: Vec<String>,
    /// Fully-qualified keys permitted to propagate, in insertion order.
    /// The first key wins when two entries share an unqualified name.
    pub allow_list: Vec<String>,
    /// Keys tried in order to fill `LensModel` when the allow list left
    /// it empty. First present, non-empty hit wins.
    pub lens_fallbacks: Vec<String>,
    /// Ask exiftool for composite (tool-computed) tags as well. Off by
    /// default: composite output varies across exiftool versions.
    pub include_composite: bool,
    /// Wall-clock limit for each exiftool invocation.
    pub tool_timeout: Option<Duration>,
}

impl Default for PropagateConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["JPG".into(), "RW2".into(), "ORF".into()],
            allow_list: vec![
                "ExifIFD:ExposureMode".into(),
                "ExifIFD:SensingMethod".into(),
                "ExifIFD:MeteringMode".into(),
                "ExifIFD:ColorSpace".into(),
                "ExifIFD:CreateDate".into(),
                "ExifIFD:DateTimeOriginal".into(),
                "ExifIFD:ExposureCompensation".into(),
                "ExifIFD:ExposureProgram".into(),
                "ExifIFD:ExposureTime".into(),
                "ExifIFD:FNumber".into(),
                "ExifIFD:FocalLength".into(),
                "ExifIFD:ISO".into(),
                "ExifIFD:LensModel".into(),
                "ExifIFD:SensitivityType".into(),
                "GPS:GPSLatitude".into(),
                "GPS:GPSLatitudeRef".into(),
                "GPS:GPSLongitude".into(),
                "GPS:GPSLongitudeRef".into(),
                "GPS:GPSPosition".into(),
                "GPS:GPSVersionID".into(),
                "IFD0:Copyright".into(),
                "IFD0:Make".into(),
                "IFD0:Model".into(),
                "IFD0:ModifyDate".into(),
            ],
            lens_fallbacks: vec![
                "LensType".into(),
                "LensID".into(),
                "Panasonic:LensType".into(),
                "ExifIFD:LensModel".into(),
                "Composite:LensType".into(),
                "Composite:LensID".into(),
            ],
            include_composite: false,
            tool_timeout: Some(Duration::from_secs(60)),
        }
    }
}
