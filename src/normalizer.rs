use log::warn;
use serde::Serialize;

use crate::config::{BLOCK_UDP_MARKER, LINE_UDP_MARKER};
use crate::parsers::config_files::proxies_declaration_end;
use crate::parsers::{Detection, Representation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum UdpInjection {
    /// Typed entries were switched to `udp: true`.
    Entries { changed: usize },
    /// Only marker comments were added; UDP support is not verified.
    Annotated { markers: usize },
}

/// Mark the detected proxies as UDP capable.
///
/// A typed document is mutated in place and the detection's collection is
/// refreshed from it. Every other representation gets marker comments in
/// `text`, which is the output that will be written.
pub fn inject_udp(detection: &mut Detection, text: &mut String) -> UdpInjection {
    let injection = match &mut detection.representation {
        Representation::Structured(doc) => {
            let changed = doc.enable_udp();
            detection.collection = doc.entries().to_vec();
            UdpInjection::Entries { changed }
        }
        Representation::StructuredScan => UdpInjection::Annotated {
            markers: annotate_block(text),
        },
        Representation::Lines(lines) => {
            let (annotated, markers) = annotate_lines(lines);
            *text = annotated;
            UdpInjection::Annotated { markers }
        }
        Representation::Unrecognized => UdpInjection::Annotated { markers: 0 },
    };

    if let UdpInjection::Annotated { markers } = injection {
        if markers > 0 {
            warn!("added {} UDP marker(s); UDP support is not verified per protocol", markers);
        }
    }
    injection
}

fn annotate_block(text: &mut String) -> usize {
    let Some(end) = proxies_declaration_end(text) else {
        return 0;
    };
    let already_marked = text[end..]
        .lines()
        .next()
        .is_some_and(|line| line.trim() == BLOCK_UDP_MARKER);
    if already_marked {
        return 0;
    }
    let separator = if text[..end].ends_with('\n') { "" } else { "\n" };
    text.insert_str(end, &format!("{separator}{BLOCK_UDP_MARKER}\n"));
    1
}

fn annotate_lines(lines: &[String]) -> (String, usize) {
    let mut out = Vec::with_capacity(lines.len() * 2);
    let mut markers = 0;
    let mut iter = lines.iter().peekable();
    while let Some(line) = iter.next() {
        out.push(line.as_str());
        if line == LINE_UDP_MARKER {
            continue;
        }
        if iter.peek().is_some_and(|next| next.as_str() == LINE_UDP_MARKER) {
            continue;
        }
        out.push(LINE_UDP_MARKER);
        markers += 1;
    }
    (out.join("\n"), markers)
}
