use std::path::PathBuf;

/// Transport error of the built-in HTTP client.
#[cfg(feature = "network")]
pub type HttpError = reqwest::Error;
#[cfg(not(feature = "network"))]
pub type HttpError = std::convert::Infallible;

#[derive(Debug, thiserror::Error)]
pub enum OrcError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] HttpError),

    #[error("network error: {0}")]
    Network(String),

    #[error("API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    #[error("invalid response from OpenRouter for model {0}: missing `data`")]
    UpstreamData(String),

    #[error("cannot read model cache {}: {reason}", path.display())]
    CacheRead { path: PathBuf, reason: String },

    #[error("failed to refresh endpoints for model {0} and no cached data available")]
    RefreshUnavailable(String),

    #[error("cannot write model cache: {0}")]
    CacheWrite(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(String),

    #[error("bad override table: {0}")]
    Config(String),
}

impl OrcError {
    /// Whether a failed refresh should fall back to the on-disk cache.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Http(_)
                | Self::Network(_)
                | Self::Api { .. }
                | Self::UpstreamData(_)
                | Self::CacheWrite(_)
                | Self::Json(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, OrcError>;
