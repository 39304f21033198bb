//! Fluent request building.
//!
//! A request starts as an untyped [`RequestBuilder`], which accumulates the
//! URI, headers, body, timeout and logging rules. Choosing an expectation
//! (`expect_json`, `expect_string`, ...) turns it into a [`TypedRequest`],
//! the only stage that can be sent.

use crate::executor;
use crate::expect::{ExpectBytes, ExpectHttpSuccess, ExpectJson, ExpectString, Expectation};
use crate::settings::Settings;
use crate::{Error, ExecutionResult, Result};
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const PLAINTEXT: &str = "text/plain; charset=utf-8";
const JSON: &str = "application/json";
const FORM: &str = "application/x-www-form-urlencoded";

/// A serialized request body and its content type.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    content: Bytes,
    content_type: Option<HeaderValue>,
}

impl Body {
    /// Creates a body from raw bytes.
    pub fn new(content: impl Into<Bytes>, content_type: Option<HeaderValue>) -> Self {
        Self {
            content: content.into(),
            content_type,
        }
    }

    /// The serialized content.
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    /// The content type sent with the body, if any.
    pub fn content_type(&self) -> Option<&HeaderValue> {
        self.content_type.as_ref()
    }

    /// The content as text, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }
}

/// Everything needed to send one request.
///
/// Before-send hooks receive it mutably. Headers, body, suppression and log
/// data can be changed there; the URI cannot.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    method: Method,
    uri: Url,
    headers: HeaderMap,
    body: Option<Body>,
    timeout: Option<Duration>,
    suppressed_statuses: HashSet<StatusCode>,
    suppress_all_errors: bool,
    log_data: Vec<(String, String)>,
}

impl RequestSpec {
    fn new(uri: Url) -> Self {
        Self {
            method: Method::GET,
            uri,
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
            suppressed_statuses: HashSet::new(),
            suppress_all_errors: false,
            log_data: Vec::new(),
        }
    }

    /// The HTTP method. `GET` until a terminal verb picks one.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request URI.
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    /// The request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to the request headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Sets a header, replacing any existing value.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn set_header(&mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<()> {
        let (name, value) = parse_header(name.as_ref(), value.as_ref())?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// The request body, if one was set.
    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// Replaces the body.
    pub fn set_body(&mut self, body: Option<Body>) {
        self.body = body;
    }

    /// The per-request timeout override.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Whether failures of this request are kept from the exception hooks.
    ///
    /// Failures without a status are only suppressed by
    /// [`RequestBuilder::without_error_logging`].
    pub fn is_suppressed(&self, status: Option<StatusCode>) -> bool {
        self.suppress_all_errors
            || status.is_some_and(|status| self.suppressed_statuses.contains(&status))
    }

    /// Keeps failures with `status` from the exception hooks.
    pub fn suppress_status(&mut self, status: StatusCode) {
        self.suppressed_statuses.insert(status);
    }

    /// Keeps every failure of this request from the exception hooks, or
    /// restores the per-status rules when `suppress` is false.
    pub fn set_suppress_all_errors(&mut self, suppress: bool) {
        self.suppress_all_errors = suppress;
    }

    /// Diagnostic pairs added with [`RequestBuilder::add_log_data`].
    pub fn log_data(&self) -> &[(String, String)] {
        &self.log_data
    }

    /// Adds a diagnostic pair for the exception hooks.
    pub fn add_log_data(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.log_data.push((key.into(), value.into()));
    }

    pub(crate) fn set_method(&mut self, method: Method) {
        self.method = method;
    }
}

/// The untyped stage of a request.
///
/// # Examples
///
/// ```
/// let builder = httpcall::request("https://example.com/")
///     .unwrap()
///     .send_plaintext("test");
///
/// assert_eq!(builder.spec().uri().as_str(), "https://example.com/");
/// assert_eq!(builder.spec().body().and_then(|b| b.as_str()), Some("test"));
/// ```
#[derive(Debug)]
pub struct RequestBuilder {
    settings: Arc<Settings>,
    spec: RequestSpec,
}

impl RequestBuilder {
    /// Creates a builder for `uri` using the given settings.
    ///
    /// # Errors
    ///
    /// Returns a configuration error unless `uri` is an absolute `http` or
    /// `https` URL.
    pub fn new(uri: impl AsRef<str>, settings: Arc<Settings>) -> Result<Self> {
        let uri = parse_uri(uri.as_ref())?;
        Ok(Self {
            settings,
            spec: RequestSpec::new(uri),
        })
    }

    /// The request accumulated so far.
    pub fn spec(&self) -> &RequestSpec {
        &self.spec
    }

    /// The settings this request will run with.
    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    /// Adds a header, replacing any existing value for the name.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn add_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        self.spec.set_header(name, value)?;
        Ok(self)
    }

    /// Adds several headers.
    ///
    /// # Errors
    ///
    /// Returns an error on the first invalid header name or value.
    pub fn add_headers<I, K, V>(mut self, headers: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (name, value) in headers {
            self.spec.set_header(name, value)?;
        }
        Ok(self)
    }

    /// Sends `body` as UTF-8 plain text.
    pub fn send_plaintext(mut self, body: impl Into<String>) -> Self {
        let body: String = body.into();
        self.spec.body = Some(Body::new(body, Some(HeaderValue::from_static(PLAINTEXT))));
        self
    }

    /// Sends `body` serialized as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if `body` cannot be serialized.
    pub fn send_json<T>(mut self, body: &T) -> Result<Self>
    where
        T: Serialize + ?Sized,
    {
        let json = serde_json::to_vec(body).map_err(|e| Error::SerializationFailed(e.to_string()))?;
        self.spec.body = Some(Body::new(json, Some(HeaderValue::from_static(JSON))));
        Ok(self)
    }

    /// Sends `pairs` as an URL-encoded form.
    pub fn send_form<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        self.spec.body = Some(Body::new(encoded, Some(HeaderValue::from_static(FORM))));
        self
    }

    /// Sends raw bytes with the given content type.
    ///
    /// # Errors
    ///
    /// Returns an error if `content_type` is not a valid header value.
    pub fn send_bytes(mut self, content_type: impl AsRef<str>, body: impl Into<Bytes>) -> Result<Self> {
        let content_type = HeaderValue::try_from(content_type.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid content type: {}", e)))?;
        self.spec.body = Some(Body::new(body, Some(content_type)));
        Ok(self)
    }

    /// Overrides the settings' default timeout for this request.
    ///
    /// # Errors
    ///
    /// Returns an error if `timeout` is zero.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Err(Error::ConfigurationError(
                "Timeout must be positive".to_string(),
            ));
        }
        self.spec.timeout = Some(timeout);
        Ok(self)
    }

    /// Keeps failures with any of these statuses from the exception hooks.
    ///
    /// The returned result still reports the failure.
    pub fn without_logging(mut self, statuses: impl IntoIterator<Item = StatusCode>) -> Self {
        for status in statuses {
            self.spec.suppress_status(status);
        }
        self
    }

    /// Keeps every failure of this request from the exception hooks.
    pub fn without_error_logging(mut self) -> Self {
        self.spec.set_suppress_all_errors(true);
        self
    }

    /// Attaches a diagnostic pair reported to exception hooks on failure.
    pub fn add_log_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.spec.add_log_data(key, value);
        self
    }

    /// Succeeds on any 2xx status without reading the body.
    pub fn expect_http_success(self) -> TypedRequest<ExpectHttpSuccess> {
        self.expect(ExpectHttpSuccess)
    }

    /// Succeeds on 2xx and returns the body as text.
    pub fn expect_string(self) -> TypedRequest<ExpectString> {
        self.expect(ExpectString)
    }

    /// Succeeds on 2xx and returns the body as bytes.
    pub fn expect_bytes(self) -> TypedRequest<ExpectBytes> {
        self.expect(ExpectBytes)
    }

    /// Succeeds on 2xx when the body deserializes as `T`.
    pub fn expect_json<T>(self) -> TypedRequest<ExpectJson<T>>
    where
        T: DeserializeOwned + Send,
    {
        self.expect(ExpectJson::new())
    }

    /// Uses a custom expectation.
    pub fn expect<E: Expectation>(self, expectation: E) -> TypedRequest<E> {
        TypedRequest {
            builder: self,
            expectation,
        }
    }
}

/// A request with an expectation, ready to send.
///
/// Every terminal verb consumes the request, so each one is sent at most
/// once.
///
/// # Examples
///
/// ```no_run
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct User {
///     name: String,
/// }
///
/// # async fn example() -> Result<(), httpcall::Error> {
/// let result = httpcall::request("https://api.example.com/users/1")?
///     .expect_json::<User>()
///     .get()
///     .await;
///
/// match result.data {
///     Some(user) => println!("User: {}", user.name),
///     None => eprintln!("Failed: {:?}", result.error),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TypedRequest<E> {
    builder: RequestBuilder,
    expectation: E,
}

impl<E: Expectation> TypedRequest<E> {
    /// The request accumulated so far.
    pub fn spec(&self) -> &RequestSpec {
        &self.builder.spec
    }

    /// The chosen expectation.
    pub fn expectation(&self) -> &E {
        &self.expectation
    }

    /// Sends the request with `method`.
    pub async fn send(self, method: Method) -> ExecutionResult<E::Output> {
        let TypedRequest {
            builder,
            expectation,
        } = self;
        let RequestBuilder { settings, mut spec } = builder;
        spec.set_method(method);
        executor::execute(&settings, spec, &expectation).await
    }

    /// Sends a `GET` request.
    pub async fn get(self) -> ExecutionResult<E::Output> {
        self.send(Method::GET).await
    }

    /// Sends a `POST` request.
    pub async fn post(self) -> ExecutionResult<E::Output> {
        self.send(Method::POST).await
    }

    /// Sends a `PUT` request.
    pub async fn put(self) -> ExecutionResult<E::Output> {
        self.send(Method::PUT).await
    }

    /// Sends a `DELETE` request.
    pub async fn delete(self) -> ExecutionResult<E::Output> {
        self.send(Method::DELETE).await
    }

    /// Sends a `PATCH` request.
    pub async fn patch(self) -> ExecutionResult<E::Output> {
        self.send(Method::PATCH).await
    }

    /// Sends a `HEAD` request.
    pub async fn head(self) -> ExecutionResult<E::Output> {
        self.send(Method::HEAD).await
    }
}

fn parse_uri(uri: &str) -> Result<Url> {
    let parsed = Url::parse(uri)
        .map_err(|e| Error::ConfigurationError(format!("Invalid URI {:?}: {}", uri, e)))?;
    if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() {
        Ok(parsed)
    } else {
        Err(Error::ConfigurationError(format!(
            "URI must be an absolute http(s) URL: {:?}",
            uri
        )))
    }
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let name = HeaderName::try_from(name)
        .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
    let value = HeaderValue::try_from(value)
        .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
    Ok((name, value))
}

pub(crate) fn content_type_of(spec: &RequestSpec) -> Option<&HeaderValue> {
    spec.headers
        .get(CONTENT_TYPE)
        .or_else(|| spec.body.as_ref().and_then(Body::content_type))
}
