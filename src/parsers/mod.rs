pub mod config_files;
pub mod proxy_urls;

pub use config_files::{StructuredDocument, StructuredParser, YamlParser};

use log::{debug, warn};

use crate::models::{DetectionResult, ProxyCollection};
use crate::parsers::config_files::{has_proxies_key, scan_proxies_count};
use crate::parsers::proxy_urls::scan_lines;

/// The interpretation of a subscription that gets normalized and written.
#[derive(Debug, Clone)]
pub enum Representation {
    /// Fully parsed structured document with typed entries.
    Structured(StructuredDocument),
    /// Structured document known only through the count-only scan.
    StructuredScan,
    /// Line-oriented list; holds every non-empty trimmed line.
    Lines(Vec<String>),
    Unrecognized,
}

#[derive(Debug, Clone)]
pub struct Detection {
    pub result: DetectionResult,
    pub collection: ProxyCollection,
    pub representation: Representation,
    /// Set when a structured parse was attempted and failed.
    pub parse_failure: Option<String>,
}

/// Run both interpretations over `text` and reconcile them.
///
/// Never fails: a parser error degrades the structured path to the
/// count-only scan and is reported through `parse_failure`.
pub fn sniff(text: &str, parser: Option<&dyn StructuredParser>) -> Detection {
    let scanned = scan_proxies_count(text);
    let mut parse_failure = None;
    let mut document = None;

    if let Some(parser) = parser.filter(|_| has_proxies_key(text)) {
        match parser.parse(text) {
            Ok(doc) => {
                debug!("{} parser found {} proxies (scan found {})", parser.name(), doc.entries().len(), scanned);
                document = Some(doc);
            }
            Err(err) => {
                warn!("{} parse failed, falling back to scan: {}", parser.name(), err);
                parse_failure = Some(err.to_string());
            }
        }
    }

    let structured_count = document.as_ref().map_or(scanned, |doc| doc.entries().len());
    let lines = scan_lines(text);
    let result = DetectionResult::new(structured_count, lines.counts);
    debug!(
        "structured: {}, line-format: {}, total: {}",
        result.structured_count(),
        result.line_count(),
        result.total()
    );

    let (representation, collection) = if result.structured_count() > 0 {
        match document {
            Some(doc) => {
                let entries = doc.entries().to_vec();
                (Representation::Structured(doc), entries)
            }
            None => (Representation::StructuredScan, ProxyCollection::new()),
        }
    } else if result.line_count() > 0 {
        (Representation::Lines(lines.lines), lines.entries)
    } else {
        (Representation::Unrecognized, ProxyCollection::new())
    };

    Detection {
        result,
        collection,
        representation,
        parse_failure,
    }
}
