use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no mapping for index '{0}' in metadata response")]
    MappingNotFound(String),

    #[error("cannot read mapping from input")]
    MissingMappingLine,

    #[error("no scroll id in search response")]
    MissingScrollId,

    #[error("search response has no hits array")]
    MalformedHits,

    /// Index creation answered 400 or 503: either the index already
    /// exists (creation race) or the cluster is overloaded. The reshard
    /// orchestrator retries the whole import step on this; nothing else
    /// is ever retried.
    #[error("temporary failure during index creation")]
    TemporaryFailure,

    #[error("unexpected response code during {op}: {status}")]
    UnexpectedStatus { op: &'static str, status: u16 },

    #[error("unexpected count: {expected} documents expected in exported file, got {actual}")]
    SpillCountMismatch { expected: u64, actual: u64 },

    #[error("count mismatch: {exported} documents exported, but {imported} imported")]
    CountMismatch { exported: u64, imported: u64 },

    #[error("index creation still failing after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
}

pub type Result<T> = std::result::Result<T, Error>;
