//! Pure feed normalisation: XML document in, headline list out.
//!
//! RSS and Atom are told apart by which element they repeat (`<item>` vs
//! `<entry>`), and each element's headline comes from the first of
//! `<title>` / `<summary>` that has text.  Nothing here touches the network,
//! so the whole fallback chain is tested with literal documents.

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8};
use roxmltree::{Document, Node, ParsingOptions};
use tracing::debug;

use super::HeadlineItem;
use crate::error::FeedError;

/// Which repeated element a document's headlines came from.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FeedFormat {
    /// RSS 0.9x / 1.0 / 2.0 `<item>`.
    Rss,
    /// Atom `<entry>`.
    Atom,
}

impl FeedFormat {
    fn element(self) -> &'static str {
        match self {
            FeedFormat::Rss => "item",
            FeedFormat::Atom => "entry",
        }
    }
}

/// Text-bearing children tried in order for each item.
const TEXT_FALLBACK: [&str; 2] = ["title", "summary"];

/// Parse raw bytes as XML and normalise up to `limit` headlines.
///
/// `charset` is the transport's hint (an HTTP `Content-Type` charset); the
/// document's own `<?xml encoding="…"?>` takes precedence over it.
pub fn parse_feed(
    bytes: &[u8],
    charset: Option<&str>,
    limit: usize,
) -> Result<Vec<HeadlineItem>, FeedError> {
    let text = decode_body(bytes, charset);
    let text = text.trim_start();
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(text, options)?;
    normalize(&doc, limit)
}

/// Decode a feed body to text.  A byte order mark wins, then the XML
/// declaration, then `charset`, then UTF-8.
fn decode_body<'a>(bytes: &'a [u8], charset: Option<&str>) -> Cow<'a, str> {
    let encoding = declared_encoding(bytes)
        .or(charset)
        .and_then(|label| Encoding::for_label(label.trim().as_bytes()))
        // UTF-16 labels map to UTF-8; a real UTF-16 body carries a BOM.
        .map(Encoding::output_encoding)
        .unwrap_or(UTF_8);
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        debug!(encoding = encoding.name(), "feed body had malformed sequences");
    }
    text
}

/// The `encoding` pseudo-attribute of a leading `<?xml … ?>` declaration.
fn declared_encoding(bytes: &[u8]) -> Option<&str> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let head = &bytes[..bytes.len().min(1024)];
    let end = head.windows(2).position(|w| w == b"?>")?;
    let decl = std::str::from_utf8(&head[..end]).ok()?;
    let decl = decl.trim_start().strip_prefix("<?xml")?;

    let rest = &decl[decl.find("encoding")? + "encoding".len()..];
    let rest = rest.trim_start().strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = &rest[1..];
    value.find(quote).map(|close| &value[..close])
}

/// Extract up to `limit` headlines in document order.
///
/// Elements that yield no text are skipped and do not count toward the
/// limit.  Returns [`FeedError::Empty`] when nothing qualifies.
pub fn normalize(doc: &Document, limit: usize) -> Result<Vec<HeadlineItem>, FeedError> {
    let (_, elements) = candidates(doc);
    let items: Vec<HeadlineItem> = elements
        .into_iter()
        .filter_map(headline_from)
        .take(limit)
        .collect();

    if items.is_empty() {
        Err(FeedError::Empty)
    } else {
        Ok(items)
    }
}

/// The repeated elements to read headlines from: `<item>`s when the
/// document has any, `<entry>`s otherwise.
pub fn candidates<'a, 'input>(doc: &'a Document<'input>) -> (FeedFormat, Vec<Node<'a, 'input>>) {
    for format in [FeedFormat::Rss, FeedFormat::Atom] {
        let found = elements_named(doc.root(), format.element());
        if !found.is_empty() {
            return (format, found);
        }
    }
    (FeedFormat::Rss, Vec::new())
}

/// Turn one `<item>`/`<entry>` into a headline, or `None` if it has no
/// usable text.
pub fn headline_from(element: Node) -> Option<HeadlineItem> {
    let text = TEXT_FALLBACK
        .iter()
        .filter_map(|tag| first_named(element, tag))
        .map(trimmed_text)
        .find(|text| !text.is_empty())?;

    HeadlineItem::new(text, link_of(element))
}

/// First `<link>` child's text, or its `href` for Atom-style empty links.
/// Links nested deeper (an Atom entry's `<source>`) belong to something else.
fn link_of(element: Node) -> Option<String> {
    let link = element
        .children()
        .find(|n| n.is_element() && n.tag_name().name() == "link")?;
    let text = trimmed_text(link);
    if !text.is_empty() {
        return Some(text);
    }
    link.attribute("href")
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(String::from)
}

// Tag names are compared by local name so `atom:entry` and RDF items match.
fn elements_named<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Vec<Node<'a, 'input>> {
    node.descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == tag)
        .collect()
}

fn first_named<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.descendants()
        .skip(1)
        .find(|n| n.is_element() && n.tag_name().name() == tag)
}

fn trimmed_text(node: Node) -> String {
    let raw: String = node
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect();
    raw.trim().to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(items: &[HeadlineItem]) -> Vec<&str> {
        items.iter().map(|i| i.text.as_str()).collect()
    }

    #[test]
    fn rss_items_in_document_order() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Channel Title</title>
    <link>https://example.com/</link>
    <item>
      <title>First Post</title>
      <link>https://example.com/1</link>
    </item>
    <item>
      <title>  Second Post  </title>
    </item>
  </channel>
</rss>"#;

        let items = parse_feed(xml.as_bytes(), None, 5).unwrap();

        assert_eq!(texts(&items), ["First Post", "Second Post"]);
        assert_eq!(items[0].link.as_deref(), Some("https://example.com/1"));
        assert!(items[1].link.is_none());
    }

    #[test]
    fn caps_at_limit() {
        let body: String = (1..=8)
            .map(|i| format!("<item><title>Story {i}</title></item>"))
            .collect();
        let xml = format!("<rss><channel>{body}</channel></rss>");

        let items = parse_feed(xml.as_bytes(), None, 5).unwrap();

        assert_eq!(
            texts(&items),
            ["Story 1", "Story 2", "Story 3", "Story 4", "Story 5"]
        );
    }

    #[test]
    fn atom_entries_when_no_items() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Feed</title>
  <entry>
    <title>Atom One</title>
    <link rel="alternate" href="https://example.org/a1"/>
  </entry>
  <entry>
    <title type="text">Atom Two</title>
  </entry>
</feed>"#;

        let doc = Document::parse(xml).unwrap();
        let (format, elements) = candidates(&doc);
        assert_eq!(format, FeedFormat::Atom);
        assert_eq!(elements.len(), 2);

        let items = normalize(&doc, 5).unwrap();
        assert_eq!(texts(&items), ["Atom One", "Atom Two"]);
        assert_eq!(items[0].link.as_deref(), Some("https://example.org/a1"));
    }

    #[test]
    fn summary_used_when_title_blank() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry><title></title><summary>From the summary</summary></entry>
  <entry><summary>  Only summary  </summary></entry>
</feed>"#;

        let items = parse_feed(xml.as_bytes(), None, 5).unwrap();

        assert_eq!(texts(&items), ["From the summary", "Only summary"]);
    }

    #[test]
    fn elements_without_text_are_skipped() {
        let xml = r#"<rss><channel>
  <item><link>https://example.com/none</link></item>
  <item><title>Kept</title></item>
</channel></rss>"#;

        let items = parse_feed(xml.as_bytes(), None, 5).unwrap();

        assert_eq!(texts(&items), ["Kept"]);
    }

    #[test]
    fn skipped_elements_do_not_count_toward_limit() {
        let mut body = String::from("<item><title> </title></item>");
        for i in 1..=5 {
            body.push_str(&format!("<item><title>T{i}</title></item>"));
        }
        let xml = format!("<rss><channel>{body}</channel></rss>");

        let items = parse_feed(xml.as_bytes(), None, 5).unwrap();

        assert_eq!(items.len(), 5);
        assert_eq!(items[0].text, "T1");
    }

    #[test]
    fn cdata_title_is_read() {
        let xml = "<rss><channel><item><title><![CDATA[Breaking & Big]]></title></item></channel></rss>";

        let items = parse_feed(xml.as_bytes(), None, 5).unwrap();

        assert_eq!(items[0].text, "Breaking & Big");
    }

    #[test]
    fn no_items_or_entries_is_empty() {
        let xml = "<rss><channel><title>Nothing</title></channel></rss>";
        assert!(matches!(parse_feed(xml.as_bytes(), None, 5), Err(FeedError::Empty)));
    }

    #[test]
    fn blank_titles_and_summaries_is_empty() {
        let xml = "<rss><channel><item><title/></item><item><summary>  </summary></item></channel></rss>";
        assert!(matches!(parse_feed(xml.as_bytes(), None, 5), Err(FeedError::Empty)));
    }

    #[test]
    fn malformed_xml_is_parse_error() {
        let xml = "<rss><channel><item><title>Unclosed";
        assert!(matches!(parse_feed(xml.as_bytes(), None, 5), Err(FeedError::Parse(_))));
    }

    #[test]
    fn doctype_and_bom_are_tolerated() {
        let xml = "\u{feff}<?xml version=\"1.0\"?>\n<!DOCTYPE rss>\n<rss version=\"0.91\"><channel><item><title>Old school</title></item></channel></rss>";

        let items = parse_feed(xml.as_bytes(), None, 5).unwrap();

        assert_eq!(texts(&items), ["Old school"]);
    }

    #[test]
    fn latin1_declaration_is_honoured() {
        let xml: &[u8] = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\
<rss><channel><item><title>Caf\xE9 news</title></item></channel></rss>";

        let items = parse_feed(xml, None, 5).unwrap();

        assert_eq!(texts(&items), ["Café news"]);
    }

    #[test]
    fn transport_charset_used_without_declaration() {
        let xml: &[u8] = b"<rss><channel><item><title>Z\xFCrich</title></item></channel></rss>";

        let items = parse_feed(xml, Some("windows-1252"), 5).unwrap();

        assert_eq!(texts(&items), ["Zürich"]);
    }

    #[test]
    fn declaration_beats_transport_charset() {
        let xml = "<?xml version='1.0' encoding='utf-8'?><rss><channel><item><title>Café</title></item></channel></rss>";

        let items = parse_feed(xml.as_bytes(), Some("iso-8859-1"), 5).unwrap();

        assert_eq!(texts(&items), ["Café"]);
    }

    #[test]
    fn declared_encoding_is_read() {
        assert_eq!(
            declared_encoding(b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><rss/>"),
            Some("ISO-8859-1")
        );
        assert_eq!(declared_encoding(b"<?xml version='1.0' encoding = 'koi8-r' ?>"), Some("koi8-r"));
        assert_eq!(declared_encoding(b"<?xml version=\"1.0\"?><rss/>"), None);
        assert_eq!(declared_encoding(b"<rss/>"), None);
    }

    #[test]
    fn link_comes_from_entry_not_its_source() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <source><link href="https://origin.example/"/></source>
    <title>Syndicated</title>
    <link href="https://example.org/story"/>
  </entry>
</feed>"#;

        let items = parse_feed(xml.as_bytes(), None, 5).unwrap();

        assert_eq!(items[0].link.as_deref(), Some("https://example.org/story"));
    }
}
