use log::debug;
use serde_yaml::{Mapping, Value};

use crate::config::{PROXIES_KEY, UNKNOWN_PROXY_TYPE};
use crate::error::{OutputError, ParseError};
use crate::models::{ProxyCollection, ProxyEntry, RegexPatterns};

/// A parsed subscription document together with the typed view of its
/// `proxies` items. `entries[i]` mirrors the i-th mapping item.
#[derive(Debug, Clone)]
pub struct StructuredDocument {
    root: Value,
    entries: ProxyCollection,
}

impl StructuredDocument {
    pub fn entries(&self) -> &[ProxyEntry] {
        &self.entries
    }

    /// Set `udp: true` on every proxy that does not have it yet.
    pub fn enable_udp(&mut self) -> usize {
        let mut changed = 0;
        let mut entries = self.entries.iter_mut();
        for item in proxy_mappings_mut(&mut self.root) {
            let Some(entry) = entries.next() else { break };
            if entry.udp_enabled {
                continue;
            }
            item.insert(Value::from("udp"), Value::Bool(true));
            entry.udp_enabled = true;
            changed += 1;
        }
        changed
    }

    pub fn to_yaml(&self) -> Result<String, OutputError> {
        Ok(serde_yaml::to_string(&self.root)?)
    }
}

/// Capability for turning a structured subscription into typed entries.
pub trait StructuredParser {
    fn name(&self) -> &'static str;

    fn parse(&self, text: &str) -> Result<StructuredDocument, ParseError>;
}

pub struct YamlParser;

impl StructuredParser for YamlParser {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn parse(&self, text: &str) -> Result<StructuredDocument, ParseError> {
        let root: Value = serde_yaml::from_str(text)?;
        if !root.is_mapping() {
            return Err(ParseError("document root is not a mapping".to_string()));
        }
        let entries = proxy_mappings(&root).map(entry_from_mapping).collect();
        Ok(StructuredDocument { root, entries })
    }
}

/// True when a column-0 `proxies:` key is present.
pub fn has_proxies_key(text: &str) -> bool {
    text.lines().any(|line| {
        line.strip_prefix(PROXIES_KEY)
            .is_some_and(|rest| rest.starts_with(':'))
    })
}

/// Count `proxies` items without parsing the document.
///
/// Finds the first column-0 `proxies:` line and counts the list items of the
/// indented block below it. Only items at the block's own indentation are
/// counted, so nested lists inside a proxy do not inflate the result.
pub fn scan_proxies_count(text: &str) -> usize {
    let patterns = RegexPatterns::global();
    let mut lines = text.lines();
    if !lines.any(|line| patterns.proxies_key_regex.is_match(line)) {
        return 0;
    }

    let mut item_indent: Option<&str> = None;
    let mut count = 0;
    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if !line.starts_with([' ', '\t', '-']) {
            break;
        }
        let Some(cap) = patterns.list_item_regex.captures(line) else {
            continue;
        };
        let indent = cap.name("indent").map_or("", |m| m.as_str());
        match item_indent {
            None => {
                item_indent = Some(indent);
                count += 1;
            }
            Some(expected) if expected == indent => count += 1,
            Some(_) => {}
        }
    }
    count
}

/// Byte offset just past the first `proxies:` declaration line.
pub fn proxies_declaration_end(text: &str) -> Option<usize> {
    let patterns = RegexPatterns::global();
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        offset += line.len();
        if patterns.proxies_key_regex.is_match(line.trim_end_matches(['\r', '\n'])) {
            return Some(offset);
        }
    }
    None
}

fn proxy_mappings(root: &Value) -> impl Iterator<Item = &Mapping> {
    root.get(PROXIES_KEY)
        .and_then(Value::as_sequence)
        .into_iter()
        .flatten()
        .filter_map(Value::as_mapping)
}

fn proxy_mappings_mut(root: &mut Value) -> impl Iterator<Item = &mut Mapping> {
    root.get_mut(PROXIES_KEY)
        .and_then(Value::as_sequence_mut)
        .into_iter()
        .flatten()
        .filter_map(Value::as_mapping_mut)
}

fn entry_from_mapping(item: &Mapping) -> ProxyEntry {
    let field = |key: &str| item.get(key).and_then(scalar_to_string);
    let entry = ProxyEntry {
        name: field("name"),
        proxy_type: field("type").unwrap_or_else(|| UNKNOWN_PROXY_TYPE.to_string()),
        server: field("server"),
        port: field("port"),
        udp_enabled: item.get("udp").is_some_and(is_truthy),
    };
    debug!("structured entry {} ({})", entry.display_name(), entry.proxy_type);
    entry
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLASH: &str = "\
port: 7890
proxies:
  - name: hk-01
    type: ss
    server: hk.example.com
    port: 8388
    cipher: aes-256-gcm
  - name: jp-01
    type: vmess
    server: jp.example.com
    port: \"443\"
    udp: true
    alpn:
      - h2
      - http/1.1
  - plain-string-item
proxy-groups:
  - name: auto
    proxies:
      - hk-01
";

    #[test]
    fn test_scan_counts_top_level_items_only() {
        assert_eq!(scan_proxies_count(CLASH), 3);
    }

    #[test]
    fn test_scan_two_named_items() {
        let text = "proxies:\n  - name: foo\n  - name: bar\n";
        assert_eq!(scan_proxies_count(text), 2);
    }

    #[test]
    fn test_scan_without_trailing_newline_or_indent() {
        assert_eq!(scan_proxies_count("proxies:\n- name: a\n- name: b"), 2);
    }

    #[test]
    fn test_scan_skips_comment_lines() {
        let text = "proxies:\n# udp: true\n  - name: a\n  # disabled\n  - name: b\nrules: []\n";
        assert_eq!(scan_proxies_count(text), 2);
    }

    #[test]
    fn test_scan_requires_root_key() {
        assert_eq!(scan_proxies_count("groups:\n  proxies:\n    - a\n"), 0);
        assert_eq!(scan_proxies_count("Proxies:\n  - a\n"), 0);
        assert_eq!(scan_proxies_count("vmess://abc\nss://def"), 0);
    }

    #[test]
    fn test_yaml_parse_builds_typed_entries() {
        let doc = YamlParser.parse(CLASH).unwrap();
        let entries = doc.entries();
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].name.as_deref(), Some("hk-01"));
        assert_eq!(entries[0].proxy_type, "ss");
        assert_eq!(entries[0].server.as_deref(), Some("hk.example.com"));
        assert_eq!(entries[0].port.as_deref(), Some("8388"));
        assert!(!entries[0].udp_enabled);

        assert_eq!(entries[1].port.as_deref(), Some("443"));
        assert!(entries[1].udp_enabled);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let doc = YamlParser.parse("proxies:\n  - server: 1.2.3.4\n").unwrap();
        let entry = &doc.entries()[0];
        assert_eq!(entry.display_name(), "unnamed");
        assert_eq!(entry.proxy_type, "unknown");
        assert!(entry.port.is_none());
    }

    #[test]
    fn test_malformed_yaml_is_a_parse_error() {
        assert!(YamlParser.parse("proxies:\n  - name: [unclosed\n").is_err());
        assert!(YamlParser.parse("- just\n- a list\n").is_err());
    }

    #[test]
    fn test_enable_udp_is_idempotent() {
        let mut doc = YamlParser.parse(CLASH).unwrap();
        assert_eq!(doc.enable_udp(), 1);
        assert!(doc.entries().iter().all(|e| e.udp_enabled));
        assert_eq!(doc.enable_udp(), 0);

        let yaml = doc.to_yaml().unwrap();
        let reparsed = YamlParser.parse(&yaml).unwrap();
        assert!(reparsed.entries().iter().all(|e| e.udp_enabled));
    }

    #[test]
    fn test_serialization_keeps_key_order() {
        let mut doc = YamlParser.parse(CLASH).unwrap();
        doc.enable_udp();
        let yaml = doc.to_yaml().unwrap();
        let port = yaml.find("port: 7890").unwrap();
        let proxies = yaml.find("proxies:").unwrap();
        let groups = yaml.find("proxy-groups:").unwrap();
        assert!(port < proxies && proxies < groups);

        let cipher = yaml.find("cipher: aes-256-gcm").unwrap();
        let udp = yaml.find("udp: true").unwrap();
        assert!(cipher < udp);
    }

    #[test]
    fn test_declaration_end() {
        let text = "port: 1\nproxies:\n  - name: a\n";
        assert_eq!(proxies_declaration_end(text), Some("port: 1\nproxies:\n".len()));
        assert_eq!(proxies_declaration_end("nothing here"), None);
    }

    #[test]
    fn test_has_proxies_key() {
        assert!(has_proxies_key("a: 1\nproxies: []\n"));
        assert!(!has_proxies_key("  proxies:\n"));
        assert!(!has_proxies_key("proxies-extra: 1\n"));
    }
}
