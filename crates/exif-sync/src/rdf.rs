//! Parses exiftool's `-X` RDF/XML dump into a flat [`RawMetadata`] map.
//!
//! The payload looks like:
//!
//! ```xml
//! <rdf:RDF xmlns:rdf="...">
//!  <rdf:Description rdf:about="IMG_100.RW2" xmlns:ExifIFD="...">
//!   <ExifIFD:FocalLength>25.0 mm</ExifIFD:FocalLength>
//!   <IPTC:Keywords><rdf:Bag><rdf:li>alps</rdf:li><rdf:li>snow</rdf:li></rdf:Bag></IPTC:Keywords>
//!  </rdf:Description>
//! </rdf:RDF>
//! ```
//!
//! Keys keep their namespace prefix verbatim (`ExifIFD:FocalLength`);
//! `rdf:Bag`/`rdf:Seq`/`rdf:Alt` children become list values. Only the
//! first `rdf:Description` is consumed, one file is processed per run.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::SyncError;
use crate::{RawMetadata, TagValue};

const DESCRIPTION: &str = "rdf:Description";
const LIST_ITEM: &str = "rdf:li";

/// Parses one file's worth of RDF/XML into raw metadata.
///
/// The tool is trusted to emit well-formed markup; anything else is a
/// fatal [`SyncError::Parse`], not a skip-and-continue condition.
pub fn parse_description(xml: &str) -> Result<RawMetadata, SyncError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut map = RawMetadata::new();
    let mut in_description = false;
    let mut saw_description = false;
    let mut current_key: Option<String> = None;
    let mut scalar = String::new();
    let mut list: Vec<String> = Vec::new();
    let mut in_item = false;
    let mut item = String::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| SyncError::Parse(format!("invalid XML from exiftool: {e}")))?;
        match event {
            Event::Start(start) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                if name == DESCRIPTION {
                    in_description = true;
                    saw_description = true;
                } else if in_description {
                    if name == LIST_ITEM {
                        in_item = true;
                        item.clear();
                    } else if current_key.is_none() && !name.starts_with("rdf:") {
                        current_key = Some(name);
                        scalar.clear();
                        list.clear();
                    }
                }
            }
            Event::Empty(start) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                if name == DESCRIPTION {
                    saw_description = true;
                } else if in_description && current_key.is_none() && !name.starts_with("rdf:") {
                    map.insert(name, TagValue::Scalar(String::new()));
                }
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| SyncError::Parse(format!("bad character data: {e}")))?;
                if in_item {
                    item.push_str(&text);
                } else if current_key.is_some() {
                    scalar.push_str(&text);
                }
            }
            Event::End(end) => {
                let name = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                if name == LIST_ITEM {
                    list.push(std::mem::take(&mut item));
                    in_item = false;
                } else if current_key.as_deref() == Some(name.as_str()) {
                    let key = current_key.take().unwrap_or(name);
                    let value = if list.is_empty() {
                        TagValue::Scalar(std::mem::take(&mut scalar))
                    } else {
                        TagValue::List(std::mem::take(&mut list))
                    };
                    map.insert(key, value);
                } else if name == DESCRIPTION {
                    // One file per invocation: stop at the first record.
                    break;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_description {
        return Err(SyncError::Parse(
            "no rdf:Description element in exiftool output".into(),
        ));
    }
    Ok(map)
}
