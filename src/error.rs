use std::path::PathBuf;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the GENESIS-Online client.
///
/// Parameter-name mismatches are deliberately *not* part of this taxonomy:
/// the server is the authority on parameter validity, so unknown names only
/// produce a `log::warn!` and the request proceeds.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The server answered with an unsuccessful HTTP status.
    #[error("HTTP error occurred: {status} for url ({url})")]
    Http {
        status: reqwest::StatusCode,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The client could not connect to the server.
    #[error("connection error occurred")]
    Connection(#[source] reqwest::Error),

    /// The request timed out.
    #[error("timeout error occurred")]
    Timeout(#[source] reqwest::Error),

    /// Any other transport-level failure.
    #[error("request error occurred")]
    Request(#[source] reqwest::Error),

    /// The response carried a content type the client cannot handle.
    #[error("unexpected content type: {content_type}")]
    UnexpectedContent { content_type: String },

    /// Reshaping a raw response into the normalized envelope failed.
    #[error("standardization error occurred: {message}")]
    Standardization {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// No result identifier could be extracted from a background-job status
    /// message.
    #[error("could not extract a result identifier from status message {message:?}")]
    ResultId { message: String },

    /// Reading or writing the result store failed.
    #[error("store error for {path}")]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// (De)serializing an envelope failed.
    #[error("JSON error")]
    Json(#[from] serde_json::Error),

    /// Configuration could not be assembled from arguments, environment, or
    /// the rc file.
    #[error("missing configuration: {0}")]
    Config(String),
}

impl Error {
    /// Classifies a `reqwest` failure into the transport taxonomy.
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout(err)
        } else if err.is_connect() {
            Error::Connection(err)
        } else {
            Error::Request(err)
        }
    }

    pub(crate) fn standardization(message: impl Into<String>) -> Self {
        Error::Standardization { message: message.into(), source: None }
    }
}
