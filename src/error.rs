//! Error types for request building and execution.
//!
//! Two kinds of failure exist. [`Error`] is returned synchronously while a
//! request is being configured (bad URI, bad header, zero timeout). Everything
//! that can go wrong once a request is in flight is captured as a
//! [`CallError`] inside the returned [`ExecutionResult`](crate::ExecutionResult)
//! rather than propagated.

use http::StatusCode;
use std::time::Duration;
use url::Url;

/// An error raised while configuring a request or settings.
///
/// # Examples
///
/// ```
/// use httpcall::Error;
///
/// let err = httpcall::request("not a url").unwrap_err();
/// assert!(matches!(err, Error::ConfigurationError(_)));
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Invalid configuration was provided.
    ///
    /// This covers malformed or relative URIs, invalid header names or values,
    /// non-positive timeouts and settings installed too late.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Failed to serialize the request body.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),
}

/// A specialized `Result` type for request configuration.
pub type Result<T> = std::result::Result<T, Error>;

/// The failure captured in an unsuccessful [`ExecutionResult`](crate::ExecutionResult).
///
/// Every variant carries the URI of the request that failed.
#[derive(thiserror::Error, Debug)]
pub enum CallError {
    /// The transport failed, or the server answered with a status the
    /// expectation does not accept.
    ///
    /// `status` is `None` when no response was received at all (DNS failure,
    /// connection refused, TLS error).
    #[error("HTTP request to {uri} failed: {}", describe_transport(.status, .source))]
    Transport {
        /// The request URI.
        uri: Url,
        /// The response status, if a response arrived.
        status: Option<StatusCode>,
        /// An excerpt of the response body, if one was read.
        raw_response: Option<String>,
        /// The underlying transport error.
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The request did not complete within its timeout.
    #[error("HTTP request timed out. Timeout: {}ms", .timeout.as_millis())]
    Timeout {
        /// The request URI.
        uri: Url,
        /// The effective timeout of the request.
        timeout: Duration,
        /// Time spent sending before the request was abandoned.
        elapsed: Duration,
    },

    /// The response was accepted but its body could not be decoded.
    #[error("Failed to deserialize response (status {status}): {message}")]
    Deserialization {
        /// The request URI.
        uri: Url,
        /// The response status.
        status: StatusCode,
        /// The start of the body that failed to decode.
        raw_excerpt: String,
        /// The decoder's error message.
        message: String,
    },

    /// Something outside the request/response cycle failed, e.g. no client
    /// could be obtained from the pool.
    #[error("Unexpected error calling {uri}: {message}")]
    Unexpected {
        /// The request URI.
        uri: Url,
        /// What went wrong.
        message: String,
    },
}

impl CallError {
    /// Returns the URI of the failed request.
    pub fn uri(&self) -> &Url {
        match self {
            CallError::Transport { uri, .. }
            | CallError::Timeout { uri, .. }
            | CallError::Deserialization { uri, .. }
            | CallError::Unexpected { uri, .. } => uri,
        }
    }

    /// Returns the HTTP status code if a response was received.
    ///
    /// # Examples
    ///
    /// ```
    /// use httpcall::CallError;
    /// use std::time::Duration;
    ///
    /// let err = CallError::Timeout {
    ///     uri: "https://example.com/".parse().unwrap(),
    ///     timeout: Duration::from_secs(1),
    ///     elapsed: Duration::from_secs(1),
    /// };
    /// assert_eq!(err.status(), None);
    /// assert_eq!(err.to_string(), "HTTP request timed out. Timeout: 1000ms");
    /// ```
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            CallError::Transport { status, .. } => *status,
            CallError::Deserialization { status, .. } => Some(*status),
            CallError::Timeout { .. } | CallError::Unexpected { .. } => None,
        }
    }

    /// Returns the (possibly truncated) response body if one was read.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            CallError::Transport { raw_response, .. } => raw_response.as_deref(),
            CallError::Deserialization { raw_excerpt, .. } => Some(raw_excerpt),
            _ => None,
        }
    }

    /// Returns `true` for [`CallError::Timeout`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, CallError::Timeout { .. })
    }

    /// A short, stable name for the variant, used in log fields.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            CallError::Transport { .. } => "transport",
            CallError::Timeout { .. } => "timeout",
            CallError::Deserialization { .. } => "deserialization",
            CallError::Unexpected { .. } => "unexpected",
        }
    }
}

fn describe_transport(status: &Option<StatusCode>, source: &Option<reqwest::Error>) -> String {
    match (status, source) {
        (Some(status), _) => format!("unexpected status {}", status),
        (None, Some(source)) => source.to_string(),
        (None, None) => "no response received".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri() -> Url {
        Url::parse("https://example.com/items").unwrap()
    }

    #[test]
    fn transport_error_with_status_reports_it() {
        let err = CallError::Transport {
            uri: uri(),
            status: Some(StatusCode::NOT_FOUND),
            raw_response: Some("missing".to_string()),
            source: None,
        };

        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(err.raw_response(), Some("missing"));
        assert_eq!(
            err.to_string(),
            "HTTP request to https://example.com/items failed: unexpected status 404 Not Found"
        );
        assert!(!err.is_timeout());
    }

    #[test]
    fn deserialization_error_keeps_status_and_excerpt() {
        let err = CallError::Deserialization {
            uri: uri(),
            status: StatusCode::OK,
            raw_excerpt: "not json".to_string(),
            message: "expected value".to_string(),
        };

        assert_eq!(err.status(), Some(StatusCode::OK));
        assert_eq!(err.raw_response(), Some("not json"));
        assert_eq!(err.uri().as_str(), "https://example.com/items");
        assert_eq!(err.kind(), "deserialization");
    }

    #[test]
    fn timeout_has_no_status() {
        let err = CallError::Timeout {
            uri: uri(),
            timeout: Duration::from_millis(250),
            elapsed: Duration::from_millis(251),
        };

        assert!(err.is_timeout());
        assert_eq!(err.status(), None);
        assert_eq!(err.raw_response(), None);
        assert_eq!(err.to_string(), "HTTP request timed out. Timeout: 250ms");
    }
}
