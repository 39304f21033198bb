//! Response expectations: what counts as success and how the body is decoded.
//!
//! An expectation is chosen with one of the `expect_*` methods on
//! [`RequestBuilder`](crate::RequestBuilder). Implement [`Expectation`] to
//! plug in another decoder or success rule.

use http::StatusCode;
use serde::de::DeserializeOwned;
use std::fmt;
use std::marker::PhantomData;

/// Decides whether a response succeeded and decodes its body.
///
/// # Examples
///
/// ```
/// use httpcall::Expectation;
/// use http::StatusCode;
///
/// /// Treats 404 as a successful "absent" answer.
/// struct ExpectOptionalText;
///
/// impl Expectation for ExpectOptionalText {
///     type Output = Option<String>;
///
///     fn name(&self) -> &'static str {
///         "Deserialize: optional text"
///     }
///
///     fn is_success(&self, status: StatusCode) -> bool {
///         status.is_success() || status == StatusCode::NOT_FOUND
///     }
///
///     fn decode(&self, status: StatusCode, body: &[u8]) -> Result<Option<Self::Output>, String> {
///         if status == StatusCode::NOT_FOUND {
///             return Ok(Some(None));
///         }
///         Ok(Some(Some(String::from_utf8_lossy(body).into_owned())))
///     }
/// }
/// ```
pub trait Expectation: Send + Sync {
    /// The decoded payload type.
    type Output: Send;

    /// Name used for the general profiling scope around decoding.
    fn name(&self) -> &'static str;

    /// The success predicate. Defaults to any 2xx status.
    fn is_success(&self, status: StatusCode) -> bool {
        status.is_success()
    }

    /// Whether a successful response body must be read and decoded.
    fn needs_body(&self) -> bool {
        true
    }

    /// Decodes a successful response body.
    ///
    /// `Ok(None)` means success without a payload. An `Err` turns the result
    /// into a deserialization failure carrying the message.
    fn decode(&self, status: StatusCode, body: &[u8]) -> Result<Option<Self::Output>, String>;
}

/// Any 2xx status is success; the body is never read.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpectHttpSuccess;

impl Expectation for ExpectHttpSuccess {
    type Output = ();

    fn name(&self) -> &'static str {
        "Deserialize: none"
    }

    fn needs_body(&self) -> bool {
        false
    }

    fn decode(&self, _status: StatusCode, _body: &[u8]) -> Result<Option<()>, String> {
        Ok(None)
    }
}

/// The body as text. Invalid UTF-8 is replaced rather than rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpectString;

impl Expectation for ExpectString {
    type Output = String;

    fn name(&self) -> &'static str {
        "Deserialize: string"
    }

    fn decode(&self, _status: StatusCode, body: &[u8]) -> Result<Option<String>, String> {
        Ok(Some(String::from_utf8_lossy(body).into_owned()))
    }
}

/// The body as raw bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpectBytes;

impl Expectation for ExpectBytes {
    type Output = Vec<u8>;

    fn name(&self) -> &'static str {
        "Deserialize: bytes"
    }

    fn decode(&self, _status: StatusCode, body: &[u8]) -> Result<Option<Vec<u8>>, String> {
        Ok(Some(body.to_vec()))
    }
}

/// The body deserialized from JSON into `T`.
pub struct ExpectJson<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> ExpectJson<T> {
    /// Creates a JSON expectation for `T`.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for ExpectJson<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for ExpectJson<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ExpectJson<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ExpectJson")
    }
}

impl<T> Expectation for ExpectJson<T>
where
    T: DeserializeOwned + Send,
{
    type Output = T;

    fn name(&self) -> &'static str {
        "Deserialize: JSON"
    }

    fn decode(&self, _status: StatusCode, body: &[u8]) -> Result<Option<T>, String> {
        serde_json::from_slice(body)
            .map(Some)
            .map_err(|e| e.to_string())
    }
}
