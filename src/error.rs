//! Error types and transport error mapping

use thiserror::Error;

/// Result type for this crate
pub type Result<T> = std::result::Result<T, Error>;

/// [`Error::Network`] code for a connection that could not be established
pub const CONNECT_FAILED: i64 = -1004;

/// Errors surfaced by the client.
///
/// Only fatal errors ever reach callers of [`Client::run`](crate::Client::run). Transient
/// transport failures are retried by the pipeline and, if they persist, folded into the
/// caller's response state as an unexpected error.
#[derive(Debug, Error)]
pub enum Error {
    /// URL could not be built from the endpoint
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Header name or value is not valid HTTP
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// The request could not be constructed
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Network error reported by the HTTP engine
    #[error("Network error: {message} (code: {code})")]
    Network {
        /// Engine specific error code, `-1` when unknown
        code: i64,
        /// Error message
        message: String,
    },

    /// Timeout error
    #[error("Request timed out")]
    Timeout,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 conversion error
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Query string serialization error
    #[error("Query encoding error: {0}")]
    UrlEncoded(#[from] serde_urlencoded::ser::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the error is a transport failure worth retrying.
    ///
    /// Everything else is a programming or construction error and is fatal.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Network { .. } | Error::Timeout)
    }

    /// Whether the engine could not reach the host at all
    pub fn is_connect(&self) -> bool {
        matches!(self, Error::Network { code, .. } if *code == CONNECT_FAILED)
    }
}

impl From<url::ParseError> for Error {
    fn from(error: url::ParseError) -> Self {
        Error::InvalidUrl(error.to_string())
    }
}

impl From<http::header::InvalidHeaderName> for Error {
    fn from(error: http::header::InvalidHeaderName) -> Self {
        Error::InvalidHeader(error.to_string())
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(error: http::header::InvalidHeaderValue) -> Self {
        Error::InvalidHeader(error.to_string())
    }
}

#[cfg(feature = "backend-reqwest")]
impl Error {
    /// Convert a reqwest error to our Error type
    pub(crate) fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_builder() {
            Error::InvalidRequest(error.to_string())
        } else if error.is_timeout() {
            Error::Timeout
        } else if error.is_connect() {
            Error::Network {
                code: CONNECT_FAILED,
                message: format!("Could not connect: {}", error),
            }
        } else {
            Error::Network {
                code: -1,
                message: format!("Request failed: {}", error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_are_network_and_timeout() {
        assert!(Error::Timeout.is_transient());
        assert!(
            Error::Network {
                code: -1,
                message: "reset".into()
            }
            .is_transient()
        );
        assert!(!Error::InvalidUrl("nope".into()).is_transient());
        assert!(!Error::Io(std::io::ErrorKind::NotFound.into()).is_transient());
        assert!(!Error::Internal("boom".into()).is_transient());
    }

    #[test]
    fn only_connect_failures_are_connect_class() {
        let refused = Error::Network {
            code: CONNECT_FAILED,
            message: "refused".into(),
        };
        assert!(refused.is_connect());
        assert!(
            !Error::Network {
                code: -1,
                message: "reset".into()
            }
            .is_connect()
        );
        assert!(!Error::Timeout.is_connect());
    }

    #[test]
    fn parse_error_maps_to_invalid_url() {
        let err: Error = url::Url::parse("not a url").unwrap_err().into();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }
}
