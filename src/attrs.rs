//! Attribute extraction from tokenizer tag events.
//!
//! The restricted dialect allows sloppy attribute syntax (unquoted values,
//! bare flags), so extraction runs through quick-xml's lenient HTML attribute
//! iterator and drops entries it cannot make sense of instead of failing the
//! parse.

use quick_xml::events::BytesStart;
use std::collections::HashMap;

/// Collect a tag-open event's attributes into `name -> value`, names
/// lowercased, entity references in values resolved.
pub fn attributes(event: &BytesStart<'_>) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for attr in event.html_attributes().with_checks(false) {
        let attr = match attr {
            Ok(attr) => attr,
            Err(err) => {
                log::debug!("skipping unparseable attribute: {err:?}");
                continue;
            }
        };
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_ascii_lowercase();
        let value = match attr.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        };
        out.insert(key, value);
    }
    out
}
