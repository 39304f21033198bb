//! The outcome of executing a request.
//!
//! Ordinary failures (timeouts, connection errors, unexpected statuses,
//! undecodable bodies) are reported through [`ExecutionResult`] instead of an
//! `Err`, so callers always get the status, headers and timing of the attempt.

use crate::CallError;
use http::{HeaderMap, StatusCode};
use std::time::Duration;

/// The structured outcome of one request.
///
/// Invariants:
///
/// - `success` implies `error` is `None` and `status` satisfied the
///   expectation's success predicate.
/// - `status` is `None` only when no response was received.
/// - `data` is only present on success.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> Result<(), httpcall::Error> {
/// let result = httpcall::request("https://api.example.com/health")?
///     .expect_string()
///     .get()
///     .await;
///
/// if result.success {
///     println!("Healthy: {}", result.data.unwrap_or_default());
/// } else if let Some(status) = result.status {
///     println!("Unhealthy ({}) after {:?}", status, result.latency);
/// } else {
///     println!("No response: {:?}", result.error);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ExecutionResult<T> {
    /// Whether the request succeeded per its expectation.
    pub success: bool,

    /// The response status, if a response was received.
    pub status: Option<StatusCode>,

    /// The decoded payload. Always `None` for `expect_http_success`.
    pub data: Option<T>,

    /// The failure, when `success` is `false`.
    pub error: Option<CallError>,

    /// The response headers. Empty when no response was received.
    pub headers: HeaderMap,

    /// Time from dispatch until the outcome was known.
    ///
    /// Pool acquisition and before-send hooks are not included.
    pub latency: Duration,
}

impl<T> ExecutionResult<T> {
    /// Creates a successful result.
    pub fn succeeded(
        status: StatusCode,
        data: Option<T>,
        headers: HeaderMap,
        latency: Duration,
    ) -> Self {
        Self {
            success: true,
            status: Some(status),
            data,
            error: None,
            headers,
            latency,
        }
    }

    /// Creates a failed result.
    pub fn failed(
        error: CallError,
        status: Option<StatusCode>,
        headers: HeaderMap,
        latency: Duration,
    ) -> Self {
        Self {
            success: false,
            status,
            data: None,
            error: Some(error),
            headers,
            latency,
        }
    }

    /// Converts into a `Result` for use with `?`.
    ///
    /// Successful results without a payload (such as those from
    /// `expect_http_success`) yield `Ok(None)`.
    pub fn into_result(self) -> Result<Option<T>, CallError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.data),
        }
    }

    /// Maps the payload to a different type, keeping the metadata.
    ///
    /// # Examples
    ///
    /// ```
    /// # use httpcall::ExecutionResult;
    /// # use http::{HeaderMap, StatusCode};
    /// # use std::time::Duration;
    /// let result = ExecutionResult::succeeded(
    ///     StatusCode::OK,
    ///     Some(42),
    ///     HeaderMap::new(),
    ///     Duration::from_millis(100),
    /// );
    ///
    /// let result = result.map(|n| n.to_string());
    /// assert_eq!(result.data.as_deref(), Some("42"));
    /// ```
    pub fn map<U, F>(self, f: F) -> ExecutionResult<U>
    where
        F: FnOnce(T) -> U,
    {
        ExecutionResult {
            success: self.success,
            status: self.status,
            data: self.data.map(f),
            error: self.error,
            headers: self.headers,
            latency: self.latency,
        }
    }

    /// Returns a header value by name.
    ///
    /// # Examples
    ///
    /// ```
    /// # use httpcall::ExecutionResult;
    /// # use http::{HeaderMap, HeaderValue, StatusCode};
    /// # use std::time::Duration;
    /// let mut headers = HeaderMap::new();
    /// headers.insert("content-type", HeaderValue::from_static("application/json"));
    ///
    /// let result = ExecutionResult::<()>::succeeded(
    ///     StatusCode::OK,
    ///     None,
    ///     headers,
    ///     Duration::from_millis(100),
    /// );
    ///
    /// assert_eq!(result.header("content-type"), Some("application/json"));
    /// ```
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}
