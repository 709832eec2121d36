use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Transport failure, timeout or error status from one of the source APIs
    #[error("Source API unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Failed to decode JSON, error: {0}")]
    Decode(String),

    #[error("Artist field has no second line: {0:?}")]
    MalformedArtistField(String),

    /// The resolver answered but gave no usable URL
    #[error("Resolver rejected {0}")]
    ResolveRejected(String),

    #[error("Storage error: {0}")]
    StoreUnavailable(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("HTTP server error: {0}")]
    Server(String),
}

pub type Result<T> = std::result::Result<T, Error>;

// Bodies are decoded with serde_json, so every reqwest failure is a transport one
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::SourceUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(err.to_string())
    }
}

impl From<async_duckdb::Error> for Error {
    fn from(err: async_duckdb::Error) -> Self {
        Error::StoreUnavailable(err.to_string())
    }
}
