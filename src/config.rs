use clap::{Parser, ValueEnum};
use std::time::Duration;


pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

// Base64 heuristic
pub const MIN_BASE64_LEN: usize = 16;
// Share of replacement/control chars above which decoded text counts as garbage
pub const MAX_GARBAGE_RATIO: f64 = 0.1;

// Structured-document conventions
pub const PROXIES_KEY: &str = "proxies";
pub const UNNAMED_PROXY: &str = "unnamed";
pub const UNKNOWN_PROXY_TYPE: &str = "unknown";

// Annotation markers for UDP injection without a typed document
pub const LINE_UDP_MARKER: &str = "# injected_udp: true";
pub const BLOCK_UDP_MARKER: &str = "# udp: true";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(about = "Subscription decoder and proxy counter")]
pub struct Args {
    /// Subscription URL
    #[arg(short, long)]
    pub url: String,

    /// Output path for the proxies YAML or processed subscription
    #[arg(short, long)]
    pub output: Option<String>,

    /// Mark proxies as UDP capable where possible
    #[arg(long)]
    pub inject_udp: bool,

    /// Only print counts and exit
    #[arg(long)]
    pub count_only: bool,

    /// Fetch timeout in seconds
    #[arg(short, long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Skip the full YAML parse and only count `proxies` items
    #[arg(long)]
    pub scan_only: bool,

    /// Console report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}
