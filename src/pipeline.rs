use log::{debug, warn};

use crate::decoder::decode;
use crate::error::{AppError, OutputError, ParseError};
use crate::models::EncodingLayer;
use crate::normalizer::{inject_udp, UdpInjection};
use crate::parsers::{sniff, Detection, Representation, StructuredParser, YamlParser};

#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    pub inject_udp: bool,
    /// Run without the structured parse capability.
    pub scan_only: bool,
}

#[derive(Debug)]
pub struct Analysis {
    pub layers: Vec<EncodingLayer>,
    pub detection: Detection,
    pub udp: Option<UdpInjection>,
    text: String,
}

/// Decode, sniff and optionally normalize a fetched payload.
pub fn analyze(raw: &[u8], options: &Options) -> Result<Analysis, AppError> {
    let decoded = decode(raw)?;
    debug!("decoded {} chars via {:?}", decoded.text.len(), decoded.layers);

    let parser: Option<&dyn StructuredParser> = if options.scan_only {
        warn!("structured parsing disabled, proxies are counted without reading their fields");
        None
    } else {
        Some(&YamlParser)
    };

    let mut detection = sniff(&decoded.text, parser);
    if parser.is_some() {
        if let Some(failure) = detection.parse_failure.take() {
            return Err(ParseError(failure).into());
        }
    }

    let mut text = decoded.text;
    let udp = options
        .inject_udp
        .then(|| inject_udp(&mut detection, &mut text));

    Ok(Analysis {
        layers: decoded.layers,
        detection,
        udp,
        text,
    })
}

impl Analysis {
    /// Content for the output sink, matching the detected representation.
    pub fn render_output(&self) -> Result<String, OutputError> {
        match &self.detection.representation {
            Representation::Structured(doc) if self.udp.is_some() => doc.to_yaml(),
            Representation::Lines(lines) if self.udp.is_none() => Ok(lines.join("\n")),
            _ => Ok(self.text.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn full() -> Options {
        Options::default()
    }

    #[test]
    fn test_gzip_structured_payload() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"proxies:\n  - name: a\n").unwrap();
        let raw = encoder.finish().unwrap();

        let analysis = analyze(&raw, &full()).unwrap();
        assert_eq!(analysis.layers, vec![EncodingLayer::Gzip]);
        assert_eq!(analysis.detection.result.structured_count(), 1);
        assert_eq!(analysis.detection.result.total(), 1);
    }

    #[test]
    fn test_base64_line_payload() {
        let raw = STANDARD.encode("vmess://abc\ntrojan://pw@host:443\nplain text line");
        let analysis = analyze(raw.as_bytes(), &full()).unwrap();
        assert_eq!(analysis.detection.result.line_count(), 2);
        assert_eq!(analysis.detection.result.breakdown().trojan, 1);
        assert_eq!(
            analysis.render_output().unwrap(),
            "vmess://abc\ntrojan://pw@host:443\nplain text line"
        );
    }

    #[test]
    fn test_structured_injection_rewrites_document() {
        let raw = b"proxies:\n  - name: a\n    udp: true\n  - name: b\n";
        let options = Options { inject_udp: true, ..full() };
        let analysis = analyze(raw, &options).unwrap();
        assert_eq!(analysis.udp, Some(UdpInjection::Entries { changed: 1 }));
        assert!(analysis.detection.collection.iter().all(|e| e.udp_enabled));

        let output = analysis.render_output().unwrap();
        assert_eq!(output.matches("udp: true").count(), 2);
    }

    #[test]
    fn test_output_without_injection_is_decoded_text() {
        let raw = b"# my sub\nproxies:\n  - name: a\n";
        let analysis = analyze(raw, &full()).unwrap();
        assert!(analysis.udp.is_none());
        assert_eq!(analysis.render_output().unwrap(), "# my sub\nproxies:\n  - name: a\n");
    }

    #[test]
    fn test_line_injection_annotates_output() {
        let options = Options { inject_udp: true, ..full() };
        let analysis = analyze(b"ss://a@h:1\nvless://b@h:2\n", &options).unwrap();
        assert_eq!(analysis.udp, Some(UdpInjection::Annotated { markers: 2 }));
        assert_eq!(
            analysis.render_output().unwrap(),
            "ss://a@h:1\n# injected_udp: true\nvless://b@h:2\n# injected_udp: true"
        );
    }

    #[test]
    fn test_malformed_document_is_fatal_only_with_parser() {
        let raw = b"proxies:\n  - name: [broken\n  - name: ok\n";
        let err = analyze(raw, &full()).unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));
        assert_eq!(err.exit_code(), 3);

        let options = Options { scan_only: true, ..full() };
        let analysis = analyze(raw, &options).unwrap();
        assert_eq!(analysis.detection.result.structured_count(), 2);
    }

    #[test]
    fn test_empty_payload_is_decode_error() {
        let err = analyze(b"", &full()).unwrap_err();
        assert!(matches!(err, AppError::Decode(_)));
    }
}
