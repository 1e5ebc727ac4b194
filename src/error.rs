use std::path::PathBuf;

use thiserror::Error;

/// Failures the sync pipeline reports and then degrades past.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{} not found", path.display())]
    MissingFile { path: PathBuf },

    #[error("failed to parse {}: {source}", path.display())]
    MalformedJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected shape: {0}")]
    UnexpectedShape(String),

    #[error("expected {expected} for '{field}', found {found}")]
    InvalidInputKind {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("request to {url} failed with HTTP {status}")]
    RemoteFetchFailed {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("failed to reach {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("no GitHub token configured; set GITHUB_TOKEN")]
    MissingCredential,

    #[error("no organization configured; set GITHUB_ORG or pass --org")]
    MissingOrganization,

    #[error("no output file configured; set CSPELL_OUTPUT_FILE or pass --output")]
    MissingOutputTarget,

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Human-readable JSON type name for diagnostics.
pub fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
