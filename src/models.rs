use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

use crate::config::UNNAMED_PROXY;


/// Encoding layer peeled off a payload by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingLayer {
    Gzip,
    Base64,
}

impl fmt::Display for EncodingLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodingLayer::Gzip => f.write_str("gzip"),
            EncodingLayer::Base64 => f.write_str("base64"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub layers: Vec<EncodingLayer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Vmess,
    Vless,
    Ss,
    Trojan,
}

impl Protocol {
    pub const ALL: [Protocol; 4] = [Protocol::Vmess, Protocol::Vless, Protocol::Ss, Protocol::Trojan];

    pub fn scheme(&self) -> &'static str {
        match self {
            Protocol::Vmess => "vmess",
            Protocol::Vless => "vless",
            Protocol::Ss => "ss",
            Protocol::Trojan => "trojan",
        }
    }

    pub fn from_scheme(scheme: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.scheme() == scheme)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProtocolCounts {
    pub vmess: usize,
    pub vless: usize,
    pub ss: usize,
    pub trojan: usize,
    pub other: usize,
}

impl ProtocolCounts {
    pub fn record(&mut self, protocol: Option<Protocol>) {
        match protocol {
            Some(Protocol::Vmess) => self.vmess += 1,
            Some(Protocol::Vless) => self.vless += 1,
            Some(Protocol::Ss) => self.ss += 1,
            Some(Protocol::Trojan) => self.trojan += 1,
            None => self.other += 1,
        }
    }

    /// Buckets in report order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, usize)> {
        [
            ("vmess", self.vmess),
            ("vless", self.vless),
            ("ss", self.ss),
            ("trojan", self.trojan),
            ("other", self.other),
        ]
        .into_iter()
    }

    pub fn sum(&self) -> usize {
        self.iter().map(|(_, n)| n).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProxyEntry {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub proxy_type: String,
    pub server: Option<String>,
    pub port: Option<String>,
    #[serde(rename = "udp")]
    pub udp_enabled: bool,
}

impl ProxyEntry {
    pub fn new(proxy_type: impl Into<String>) -> Self {
        Self {
            proxy_type: proxy_type.into(),
            ..Default::default()
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNNAMED_PROXY)
    }
}

pub type ProxyCollection = Vec<ProxyEntry>;

/// Counts from both interpretations plus the reconciled total.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DetectionResult {
    structured_count: usize,
    line_count: usize,
    breakdown: ProtocolCounts,
    total: usize,
}

impl DetectionResult {
    pub fn new(structured_count: usize, breakdown: ProtocolCounts) -> Self {
        let line_count = breakdown.sum();
        Self {
            structured_count,
            line_count,
            total: structured_count.max(line_count),
            breakdown,
        }
    }

    pub fn structured_count(&self) -> usize {
        self.structured_count
    }

    pub fn line_count(&self) -> usize {
        self.line_count
    }

    pub fn breakdown(&self) -> &ProtocolCounts {
        &self.breakdown
    }

    pub fn total(&self) -> usize {
        self.total
    }
}

pub struct RegexPatterns {
    pub proxies_key_regex: Regex,
    pub list_item_regex: Regex,
    pub proxy_line_regex: Regex,
    pub authority_regex: Regex,
}

impl RegexPatterns {
    fn new() -> Self {
        Self {
            proxies_key_regex: Regex::new(r"^proxies:\s*(?:#.*)?$").expect("valid regex"),
            list_item_regex: Regex::new(r"^(?P<indent>[ \t]*)-(?:[ \t]|$)").expect("valid regex"),
            proxy_line_regex: Regex::new(r"^(?P<p>vmess|vless|ss|trojan)://").expect("valid regex"),
            authority_regex: Regex::new(r"^[a-z0-9]+://(?:[^@?#]*@)?(?P<hostport>[^/?#]+)").expect("valid regex"),
        }
    }

    pub fn global() -> &'static Self {
        static PATTERNS: LazyLock<RegexPatterns> = LazyLock::new(RegexPatterns::new);
        &PATTERNS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_is_max_of_counts() {
        let mut breakdown = ProtocolCounts::default();
        breakdown.record(Some(Protocol::Vmess));
        breakdown.record(None);

        let result = DetectionResult::new(5, breakdown.clone());
        assert_eq!(result.line_count(), 2);
        assert_eq!(result.total(), 5);

        let result = DetectionResult::new(1, breakdown);
        assert_eq!(result.total(), 2);
        assert!(result.total() >= result.structured_count());
    }

    #[test]
    fn test_protocol_schemes() {
        assert_eq!(Protocol::from_scheme("trojan"), Some(Protocol::Trojan));
        assert_eq!(Protocol::from_scheme("VMESS"), None);
        assert_eq!(Protocol::from_scheme("ssr"), None);
    }

    #[test]
    fn test_entry_placeholders() {
        let entry = ProxyEntry::new("ss");
        assert_eq!(entry.display_name(), "unnamed");
        assert_eq!(entry.proxy_type, "ss");
        assert!(!entry.udp_enabled);
    }
}
