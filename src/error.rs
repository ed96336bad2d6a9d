use thiserror::Error;

/// Failures talking to the hosted backend.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("backend is not configured (missing base URL or API key)")]
    NotConfigured,
    #[error("invalid backend URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("realtime channel failed: {0}")]
    Realtime(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("realtime channel rejected: {0}")]
    ChannelRejected(String),
    #[error("could not decode backend payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("{0} returned no row")]
    MissingRow(&'static str),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tokio_tungstenite::tungstenite::Error> for ApiError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Realtime(Box::new(err))
    }
}

/// Failures loading or saving `coachdesk.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no configuration directory available on this platform")]
    NoConfigDir,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("could not serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Failures of the local conversation cache.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("no data directory available on this platform")]
    NoDataDir,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("could not encode cached row: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("cache lock poisoned")]
    Poisoned,
}
