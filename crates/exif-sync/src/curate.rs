//! Pure selection and normalization of the propagated field set.

use log::debug;

use crate::{CuratedMetadata, PropagateConfig, RawMetadata, TagValue};

const LENS_MODEL: &str = "LensModel";
const FOCAL_LENGTH: &str = "FocalLength";

/// Unqualified tag name: `ExifIFD:FocalLength` → `FocalLength`.
pub fn unqualified(key: &str) -> &str {
    key.rsplit(':').next().unwrap_or(key)
}

/// Derives the curated record from raw metadata.
///
/// Allow-listed fields are copied under their unqualified name (first
/// allow-list hit wins per name), the lens fallback chain fills a missing
/// `LensModel`, a `FocalLength` unit suffix is truncated at the first
/// space, and list values collapse to their first element. No I/O and no
/// failure mode: an empty intersection yields an empty record.
pub fn curate(raw: &RawMetadata, config: &PropagateConfig) -> CuratedMetadata {
    let mut curated = CuratedMetadata::new();

    for key in &config.allow_list {
        if let Some(value) = raw.get(key) {
            let name = unqualified(key);
            if !curated.contains_key(name) {
                curated.insert(name.to_string(), collapse(value));
            }
        }
    }

    if !curated.contains_key(LENS_MODEL) {
        for key in &config.lens_fallbacks {
            if let Some(value) = raw.get(key) {
                if !value.is_empty() {
                    debug!("lens model taken from {key}");
                    curated.insert(LENS_MODEL.to_string(), collapse(value));
                    break;
                }
            }
        }
    }

    if let Some(value) = curated.get_mut(FOCAL_LENGTH) {
        if let Some(space) = value.find(' ') {
            value.truncate(space);
        }
    }

    curated
}

fn collapse(value: &TagValue) -> String {
    value.first().unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PropagateConfig {
        PropagateConfig::default()
    }

    fn raw(entries: &[(&str, TagValue)]) -> RawMetadata {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn keeps_only_allow_listed_fields_unqualified() {
        let raw = raw(&[
            ("IFD0:Make", TagValue::from("OLY")),
            ("IFD0:Model", TagValue::from("E-M1")),
            ("MakerNotes:SecretSauce", TagValue::from("nope")),
        ]);
        let curated = curate(&raw, &config());
        assert_eq!(curated.get("Make").map(String::as_str), Some("OLY"));
        assert_eq!(curated.get("Model").map(String::as_str), Some("E-M1"));
        assert!(!curated.contains_key("SecretSauce"));
        assert!(!curated.contains_key("IFD0:Make"));
    }

    #[test]
    fn first_allow_list_hit_wins_per_unqualified_name() {
        let mut config = config();
        config.allow_list = vec!["ExifIFD:ISO".into(), "Panasonic:ISO".into()];
        let raw = raw(&[
            ("ExifIFD:ISO", TagValue::from("200")),
            ("Panasonic:ISO", TagValue::from("250")),
        ]);
        let curated = curate(&raw, &config);
        assert_eq!(curated.get("ISO").map(String::as_str), Some("200"));
        assert_eq!(curated.len(), 1);
    }

    #[test]
    fn lens_fallback_fills_missing_lens_model() {
        let raw = raw(&[("LensType", TagValue::from("Wide Zoom"))]);
        let curated = curate(&raw, &config());
        assert_eq!(curated.get("LensModel").map(String::as_str), Some("Wide Zoom"));
    }

    #[test]
    fn lens_fallback_skips_empty_values() {
        let raw = raw(&[
            ("LensType", TagValue::from("")),
            ("LensID", TagValue::from("Leica DG Summilux 25mm")),
        ]);
        let curated = curate(&raw, &config());
        assert_eq!(
            curated.get("LensModel").map(String::as_str),
            Some("Leica DG Summilux 25mm")
        );
    }

    #[test]
    fn no_lens_anywhere_means_no_fabricated_value() {
        let raw = raw(&[("IFD0:Make", TagValue::from("OLY"))]);
        let curated = curate(&raw, &config());
        assert!(!curated.contains_key("LensModel"));
    }

    #[test]
    fn allow_listed_lens_model_blocks_fallback() {
        let raw = raw(&[
            ("ExifIFD:LensModel", TagValue::from("M.Zuiko 12-40mm")),
            ("LensType", TagValue::from("Wide Zoom")),
        ]);
        let curated = curate(&raw, &config());
        assert_eq!(
            curated.get("LensModel").map(String::as_str),
            Some("M.Zuiko 12-40mm")
        );
    }

    #[test]
    fn focal_length_unit_suffix_is_truncated() {
        let raw = raw(&[("ExifIFD:FocalLength", TagValue::from("25.0 mm"))]);
        let curated = curate(&raw, &config());
        assert_eq!(curated.get("FocalLength").map(String::as_str), Some("25.0"));
    }

    #[test]
    fn focal_length_without_suffix_is_unchanged() {
        let raw = raw(&[("ExifIFD:FocalLength", TagValue::from("25.0"))]);
        let curated = curate(&raw, &config());
        assert_eq!(curated.get("FocalLength").map(String::as_str), Some("25.0"));
    }

    #[test]
    fn list_values_collapse_to_first_element() {
        let raw = raw(&[(
            "GPS:GPSVersionID",
            TagValue::List(vec!["2.2.0.0".into(), "2.3.0.0".into()]),
        )]);
        let curated = curate(&raw, &config());
        assert_eq!(
            curated.get("GPSVersionID").map(String::as_str),
            Some("2.2.0.0")
        );
    }

    #[test]
    fn curation_is_deterministic_and_idempotent() {
        let raw = raw(&[
            ("ExifIFD:FocalLength", TagValue::from("14.0 mm")),
            ("IFD0:Make", TagValue::from("OLY")),
            ("LensType", TagValue::from("Wide Zoom")),
        ]);
        let once = curate(&raw, &config());
        let twice = curate(&raw, &config());
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_raw_metadata_yields_empty_record() {
        assert!(curate(&RawMetadata::new(), &config()).is_empty());
    }
}
