//! Sitemap XML parser.
//!
//! Handles both `<urlset>` sitemaps and `<sitemapindex>` files: either way the
//! useful payload is the list of `<loc>` entries. Matching is on the local
//! element name, so namespaced documents (`<ns:loc>`) parse the same.

use dossier_shared::{DossierError, Result};
use quick_xml::Reader;
use quick_xml::events::Event;

/// Extract every `<loc>` value from a sitemap document, in document order.
///
/// Values are trimmed and entity-decoded; CDATA sections are accepted.
/// Returns an error only for malformed XML.
pub(crate) fn parse_sitemap_locs(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut locs = Vec::new();
    let mut buf = Vec::new();
    let mut current: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"loc" => {
                current = Some(String::new());
            }
            Ok(Event::Text(ref e)) => {
                if let Some(value) = current.as_mut() {
                    let text = e
                        .unescape()
                        .map_err(|err| DossierError::parse(format!("sitemap text: {err}")))?;
                    value.push_str(&text);
                }
            }
            Ok(Event::CData(ref e)) => {
                if let Some(value) = current.as_mut() {
                    value.push_str(&String::from_utf8_lossy(e));
                }
            }
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"loc" => {
                if let Some(value) = current.take() {
                    let value = value.trim();
                    if !value.is_empty() {
                        locs.push(value.to_string());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(DossierError::parse(format!(
                    "malformed sitemap at byte {}: {e}",
                    reader.buffer_position()
                )));
            }
        }
        buf.clear();
    }

    Ok(locs)
}
