use serde_json::Value;

use crate::decoder::decode_base64;
use crate::models::{Protocol, ProtocolCounts, ProxyCollection, ProxyEntry, RegexPatterns};

/// Result of scanning a text line by line for proxy URIs.
#[derive(Debug, Default)]
pub struct LineScan {
    pub counts: ProtocolCounts,
    /// Every non-empty trimmed line, in source order.
    pub lines: Vec<String>,
    /// Entries for lines with a recognized scheme.
    pub entries: ProxyCollection,
}

pub fn scan_lines(text: &str) -> LineScan {
    let mut scan = LineScan::default();

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        scan.lines.push(line.to_string());
        if !line.contains("://") {
            continue;
        }
        let protocol = recognized_protocol(line);
        scan.counts.record(protocol);
        if let Some(protocol) = protocol {
            scan.entries.push(parse_proxy_line(line, protocol));
        }
    }

    scan
}

pub fn recognized_protocol(line: &str) -> Option<Protocol> {
    RegexPatterns::global()
        .proxy_line_regex
        .captures(line)
        .and_then(|cap| cap.name("p"))
        .and_then(|m| Protocol::from_scheme(m.as_str()))
}

/// Best-effort entry for a URI line; fields that cannot be read stay unset.
pub fn parse_proxy_line(line: &str, protocol: Protocol) -> ProxyEntry {
    let parsed = match protocol {
        Protocol::Vmess => parse_vmess(line),
        _ => parse_protocol_url(line, protocol),
    };
    parsed.unwrap_or_else(|| ProxyEntry::new(protocol.scheme()))
}

fn parse_vmess(line: &str) -> Option<ProxyEntry> {
    let payload = line.strip_prefix("vmess://")?.trim();
    let decoded = decode_base64(payload.as_bytes())?;
    let config: Value = serde_json::from_slice(&decoded).ok()?;

    let field = |key: &str| match config.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };
    Some(ProxyEntry {
        name: field("ps"),
        server: field("add"),
        port: field("port"),
        ..ProxyEntry::new(Protocol::Vmess.scheme())
    })
}

fn parse_protocol_url(line: &str, protocol: Protocol) -> Option<ProxyEntry> {
    let mut entry = ProxyEntry::new(protocol.scheme());

    if let Some((_, fragment)) = line.split_once('#') {
        let name = urlencoding::decode(fragment)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| fragment.to_string());
        entry.name = (!name.is_empty()).then_some(name);
    }

    let cap = RegexPatterns::global().authority_regex.captures(line)?;
    let hostport = cap.name("hostport")?.as_str();
    match hostport.rfind(':') {
        Some(colon_pos) if hostport[colon_pos + 1..].parse::<u16>().is_ok() => {
            let host = hostport[..colon_pos].trim_start_matches('[').trim_end_matches(']');
            entry.server = Some(host.to_string());
            entry.port = Some(hostport[colon_pos + 1..].to_string());
        }
        _ => {}
    }

    Some(entry)
}
