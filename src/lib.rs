//! # httpcall - fluent, observable outbound HTTP calls
//!
//! `httpcall` builds requests declaratively, runs them on pooled `reqwest`
//! clients and returns a structured [`ExecutionResult`] for every call:
//! success flag, status, decoded payload and a typed error. Timeouts,
//! before-send mutation, exception hooks and profiling scopes are configured
//! once in [`Settings`] and applied to every call site.
//!
//! ## Quick Start
//!
//! ```no_run
//! use serde::{Deserialize, Serialize};
//! use std::time::Duration;
//!
//! #[derive(Serialize)]
//! struct CreateUser {
//!     name: String,
//! }
//!
//! #[derive(Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), httpcall::Error> {
//!     let result = httpcall::request("https://api.example.com/users/123")?
//!         .with_timeout(Duration::from_secs(2))?
//!         .expect_json::<User>()
//!         .get()
//!         .await;
//!
//!     if let Some(user) = result.data {
//!         println!("User {}: {}", user.id, user.name);
//!     }
//!
//!     let created = httpcall::request("https://api.example.com/users")?
//!         .send_json(&CreateUser { name: "Alice".to_string() })?
//!         .expect_json::<User>()
//!         .post()
//!         .await;
//!     println!("Created: {} ({:?})", created.success, created.status);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Failures are values
//!
//! Only configuration mistakes (bad URI, bad header, zero timeout) are
//! returned as [`Error`]. Everything that happens on the wire ends up in the
//! result:
//!
//! ```no_run
//! use httpcall::CallError;
//!
//! # async fn example() -> Result<(), httpcall::Error> {
//! let result = httpcall::request("https://api.example.com/slow")?
//!     .expect_string()
//!     .get()
//!     .await;
//!
//! match result.error {
//!     None => println!("Body: {}", result.data.unwrap_or_default()),
//!     Some(CallError::Timeout { timeout, .. }) => eprintln!("Timed out after {:?}", timeout),
//!     Some(CallError::Deserialization { raw_excerpt, .. }) => eprintln!("Bad body: {}", raw_excerpt),
//!     Some(e) => eprintln!("Failed ({:?}): {}", result.status, e),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Hooks
//!
//! ```no_run
//! use httpcall::Settings;
//! use http::{HeaderValue, StatusCode};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), httpcall::Error> {
//! let settings = Arc::new(
//!     Settings::builder()
//!         .on_before_send(|req| {
//!             req.headers_mut()
//!                 .insert("authorization", HeaderValue::from_static("Bearer secret"));
//!         })
//!         .on_exception(|args| {
//!             eprintln!("{} failed: {}", args.request.uri(), args.error);
//!         })
//!         .build(),
//! );
//!
//! // A 404 here is expected, so keep it out of the exception hook.
//! let result = httpcall::request_with("https://api.example.com/maybe", settings)?
//!     .without_logging([StatusCode::NOT_FOUND])
//!     .expect_http_success()
//!     .delete()
//!     .await;
//! # Ok(())
//! # }
//! ```

mod classify;
mod error;
mod executor;
pub mod expect;
pub mod pool;
mod request;
mod response;
pub mod settings;

pub use error::{CallError, Error, Result};
pub use expect::{ExpectBytes, ExpectHttpSuccess, ExpectJson, ExpectString, Expectation};
pub use pool::{ClientPool, DefaultClientPool, PoolConfig, PoolKey};
pub use request::{Body, RequestBuilder, RequestSpec, TypedRequest};
pub use response::ExecutionResult;
pub use settings::{ExceptionArgs, Settings, SettingsBuilder};

use std::sync::Arc;

/// Starts a request to `uri` using the process-wide [`Settings::global`].
///
/// # Errors
///
/// Returns a configuration error unless `uri` is an absolute `http` or
/// `https` URL.
pub fn request(uri: impl AsRef<str>) -> Result<RequestBuilder> {
    RequestBuilder::new(uri, Settings::global())
}

/// Starts a request to `uri` using explicit settings.
///
/// # Errors
///
/// Returns a configuration error unless `uri` is an absolute `http` or
/// `https` URL.
pub fn request_with(uri: impl AsRef<str>, settings: Arc<Settings>) -> Result<RequestBuilder> {
    RequestBuilder::new(uri, settings)
}
