use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} timed out after {}s", .timeout.as_secs())]
    Timeout { url: String, timeout: Duration },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    #[error("subscription response is empty")]
    Empty,

    #[error("unable to decode subscription response")]
    NoText,
}

#[derive(Error, Debug)]
#[error("malformed structured document: {0}")]
pub struct ParseError(pub String);

impl From<serde_yaml::Error> for ParseError {
    fn from(err: serde_yaml::Error) -> Self {
        Self(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("error writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("error serializing document: {0}")]
    Serialize(#[from] serde_yaml::Error),

    #[error("error serializing report: {0}")]
    Report(#[from] serde_json::Error),
}

/// Every way a run can end early; each variant maps to its own exit code.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("error fetching URL: {0}")]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Output(#[from] OutputError),
}

impl AppError {
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Fetch(FetchError::Client(_)) => 1,
            AppError::Fetch(_) => 2,
            AppError::Decode(_) | AppError::Parse(_) => 3,
            AppError::Output(_) => 4,
        }
    }
}
