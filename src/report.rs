use serde::Serialize;

use crate::models::{DetectionResult, EncodingLayer, ProxyEntry};
use crate::normalizer::UdpInjection;
use crate::pipeline::Analysis;

#[derive(Serialize)]
struct JsonReport<'a> {
    encoding: &'a [EncodingLayer],
    #[serde(flatten)]
    result: &'a DetectionResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    udp_injection: Option<UdpInjection>,
    #[serde(skip_serializing_if = "<[ProxyEntry]>::is_empty")]
    entries: &'a [ProxyEntry],
}

pub fn render_json(analysis: &Analysis, with_entries: bool) -> Result<String, serde_json::Error> {
    let entries: &[ProxyEntry] = if with_entries { &analysis.detection.collection } else { &[] };
    serde_json::to_string_pretty(&JsonReport {
        encoding: &analysis.layers,
        result: &analysis.detection.result,
        udp_injection: analysis.udp,
        entries,
    })
}

pub fn render_text(analysis: &Analysis, with_entries: bool) -> String {
    let result = &analysis.detection.result;
    let mut out = String::from("Subscription parsing result:\n");

    out.push_str(&format!("  Encoding: {}\n", encoding_label(&analysis.layers)));
    out.push_str(&format!("  Structured proxies: {}\n", result.structured_count()));
    out.push_str(&format!("  Line-format nodes total: {}\n", result.line_count()));
    out.push_str("  Protocol breakdown:\n");
    for (protocol, count) in result.breakdown().iter() {
        out.push_str(&format!("    {}: {}\n", protocol, count));
    }
    out.push_str(&format!("  Total (best-effort): {}\n", result.total()));

    match analysis.udp {
        Some(UdpInjection::Entries { changed }) => {
            out.push_str(&format!("  UDP enabled on {} proxies\n", changed))
        }
        Some(UdpInjection::Annotated { markers }) => {
            out.push_str(&format!("  UDP markers added: {} (not verified per protocol)\n", markers))
        }
        None => {}
    }

    if with_entries && !analysis.detection.collection.is_empty() {
        out.push('\n');
        out.push_str(&entries_table(&analysis.detection.collection));
    }
    out
}

fn encoding_label(layers: &[EncodingLayer]) -> String {
    if layers.is_empty() {
        return "plain".to_string();
    }
    layers.iter().map(ToString::to_string).collect::<Vec<_>>().join(" + ")
}

fn entries_table(entries: &[ProxyEntry]) -> String {
    let mut content = String::from("| Name | Type | Server | Port | UDP |\n|:-----|:-----|:-------|-----:|:---:|\n");
    for entry in entries {
        content.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            entry.display_name(),
            entry.proxy_type,
            entry.server.as_deref().unwrap_or("—"),
            entry.port.as_deref().unwrap_or("—"),
            if entry.udp_enabled { "yes" } else { "no" },
        ));
    }
    content
}
