//! Open Graph tag extraction.
//!
//! Only `<meta>` elements inside the first `<head>` of the document are
//! considered. Each match becomes one item, `"<property> <content>"`, in
//! document order.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

/// Property prefix of Open Graph tags.
pub const DEFAULT_TAG_PREFIX: &str = "og:";

static HEAD: Lazy<Selector> = Lazy::new(|| Selector::parse("head").expect("static selector"));
static META: Lazy<Selector> = Lazy::new(|| Selector::parse("meta").expect("static selector"));

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Decodes a fetched body as UTF-8, skipping a leading byte order mark.
///
/// Bytes that are not valid UTF-8 (latin-1 or windows-1252 pages) become
/// U+FFFD; the markup around them still parses, so ASCII tags survive.
pub fn decode_document(body: &[u8]) -> Cow<'_, str> {
    let body = body.strip_prefix(UTF8_BOM).unwrap_or(body);
    String::from_utf8_lossy(body)
}

/// Extracts every `<meta property="{prefix}...">` in the first `<head>`.
///
/// A document without a head section yields no items.
pub fn extract_tags(html: &str, prefix: &str) -> Vec<String> {
    let document = Html::parse_document(html);

    let Some(head) = document.select(&HEAD).next() else {
        return Vec::new();
    };

    head.select(&META)
        .filter_map(|meta| tag_item(meta, prefix))
        .collect()
}

fn tag_item(meta: ElementRef<'_>, prefix: &str) -> Option<String> {
    let element = meta.value();
    let property = element.attr("property")?;
    if !property.starts_with(prefix) {
        return None;
    }
    let content = element.attr("content").unwrap_or_default();
    Some(format!("{} {}", property, content))
}
