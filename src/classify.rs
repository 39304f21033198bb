//! Classification of raw transport outcomes.
//!
//! [`classify`] is pure: it performs no I/O and fires no hooks, so every
//! branch can be exercised with synthetic outcomes.

use crate::expect::Expectation;
use crate::{CallError, ExecutionResult};
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use std::time::Duration;
use url::Url;

/// Longest body excerpt carried by an error.
pub(crate) const MAX_EXCERPT_LEN: usize = 2048;

/// What the transport produced for one request.
#[derive(Debug)]
pub(crate) enum RawOutcome {
    /// A response arrived. `body` is `None` when it was not read.
    Response {
        status: StatusCode,
        headers: HeaderMap,
        body: Option<Result<Bytes, reqwest::Error>>,
    },
    /// The transport failed before a response arrived.
    Failed(reqwest::Error),
    /// The request was abandoned when its timeout expired.
    TimedOut,
}

/// Request facts the classifier needs.
#[derive(Debug, Clone)]
pub(crate) struct CallContext {
    pub uri: Url,
    pub timeout: Duration,
    pub latency: Duration,
}

pub(crate) fn classify<E: Expectation>(
    outcome: RawOutcome,
    expectation: &E,
    ctx: &CallContext,
) -> ExecutionResult<E::Output> {
    match outcome {
        RawOutcome::TimedOut => timed_out(ctx),
        RawOutcome::Failed(source) if source.is_timeout() => timed_out(ctx),
        RawOutcome::Failed(source) => ExecutionResult::failed(
            CallError::Transport {
                uri: ctx.uri.clone(),
                status: None,
                raw_response: None,
                source: Some(source),
            },
            None,
            HeaderMap::new(),
            ctx.latency,
        ),
        RawOutcome::Response {
            status,
            headers,
            body,
        } => classify_response(status, headers, body, expectation, ctx),
    }
}

fn timed_out<T>(ctx: &CallContext) -> ExecutionResult<T> {
    ExecutionResult::failed(
        CallError::Timeout {
            uri: ctx.uri.clone(),
            timeout: ctx.timeout,
            elapsed: ctx.latency,
        },
        None,
        HeaderMap::new(),
        ctx.latency,
    )
}

fn classify_response<E: Expectation>(
    status: StatusCode,
    headers: HeaderMap,
    body: Option<Result<Bytes, reqwest::Error>>,
    expectation: &E,
    ctx: &CallContext,
) -> ExecutionResult<E::Output> {
    if !expectation.is_success(status) {
        let raw_response = match &body {
            Some(Ok(bytes)) => Some(excerpt(bytes)),
            _ => None,
        };
        return ExecutionResult::failed(
            CallError::Transport {
                uri: ctx.uri.clone(),
                status: Some(status),
                raw_response,
                source: body.and_then(Result::err),
            },
            Some(status),
            headers,
            ctx.latency,
        );
    }

    if !expectation.needs_body() {
        return ExecutionResult::succeeded(status, None, headers, ctx.latency);
    }

    let bytes = match body {
        Some(Ok(bytes)) => bytes,
        Some(Err(source)) => {
            return ExecutionResult::failed(
                CallError::Transport {
                    uri: ctx.uri.clone(),
                    status: Some(status),
                    raw_response: None,
                    source: Some(source),
                },
                Some(status),
                headers,
                ctx.latency,
            );
        }
        None => Bytes::new(),
    };

    match expectation.decode(status, &bytes) {
        Ok(data) => ExecutionResult::succeeded(status, data, headers, ctx.latency),
        Err(message) => ExecutionResult::failed(
            CallError::Deserialization {
                uri: ctx.uri.clone(),
                status,
                raw_excerpt: excerpt(&bytes),
                message,
            },
            Some(status),
            headers,
            ctx.latency,
        ),
    }
}

/// The body as text, cut to [`MAX_EXCERPT_LEN`] bytes on a char boundary.
pub(crate) fn excerpt(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    if text.len() <= MAX_EXCERPT_LEN {
        return text.into_owned();
    }
    let mut end = MAX_EXCERPT_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expect::{ExpectHttpSuccess, ExpectJson, ExpectString};
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: u32,
    }

    fn ctx() -> CallContext {
        CallContext {
            uri: Url::parse("https://example.com/items/1").unwrap(),
            timeout: Duration::from_secs(1),
            latency: Duration::from_millis(1001),
        }
    }

    fn response(status: u16, body: &'static str) -> RawOutcome {
        RawOutcome::Response {
            status: StatusCode::from_u16(status).unwrap(),
            headers: HeaderMap::new(),
            body: Some(Ok(Bytes::from_static(body.as_bytes()))),
        }
    }

    #[test]
    fn test_json_success() {
        let result = classify(response(200, r#"{"id": 1}"#), &ExpectJson::<Item>::new(), &ctx());

        assert!(result.success);
        assert_eq!(result.status, Some(StatusCode::OK));
        assert_eq!(result.data, Some(Item { id: 1 }));
        assert!(result.error.is_none());
    }

    #[test]
    fn test_malformed_json_keeps_status() {
        let result = classify(response(200, "invalid json"), &ExpectJson::<Item>::new(), &ctx());

        assert!(!result.success);
        assert_eq!(result.status, Some(StatusCode::OK));
        assert!(result.data.is_none());
        match result.error {
            Some(CallError::Deserialization {
                status,
                raw_excerpt,
                ..
            }) => {
                assert_eq!(status, StatusCode::OK);
                assert_eq!(raw_excerpt, "invalid json");
            }
            other => panic!("Expected Deserialization, got {:?}", other),
        }
    }

    #[test]
    fn test_unexpected_status_is_transport_failure() {
        let result = classify(response(404, "Not found"), &ExpectString, &ctx());

        assert!(!result.success);
        assert_eq!(result.status, Some(StatusCode::NOT_FOUND));
        assert!(result.data.is_none());
        match result.error {
            Some(CallError::Transport {
                status,
                raw_response,
                ..
            }) => {
                assert_eq!(status, Some(StatusCode::NOT_FOUND));
                assert_eq!(raw_response.as_deref(), Some("Not found"));
            }
            other => panic!("Expected Transport, got {:?}", other),
        }
    }

    #[test]
    fn test_http_success_ignores_unread_body() {
        let outcome = RawOutcome::Response {
            status: StatusCode::ACCEPTED,
            headers: HeaderMap::new(),
            body: None,
        };
        let result = classify(outcome, &ExpectHttpSuccess, &ctx());

        assert!(result.success);
        assert_eq!(result.status, Some(StatusCode::ACCEPTED));
        assert!(result.data.is_none());
    }

    #[test]
    fn test_timeout_has_no_status() {
        let result = classify(RawOutcome::TimedOut, &ExpectHttpSuccess, &ctx());

        assert!(!result.success);
        assert!(result.status.is_none());
        match result.error {
            Some(CallError::Timeout {
                timeout, elapsed, ..
            }) => {
                assert_eq!(timeout, Duration::from_secs(1));
                assert!(elapsed >= timeout);
            }
            other => panic!("Expected Timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_excerpt_truncates_on_char_boundary() {
        let body = "é".repeat(MAX_EXCERPT_LEN);
        let cut = excerpt(body.as_bytes());
        assert!(cut.len() <= MAX_EXCERPT_LEN);
        assert!(cut.chars().all(|c| c == 'é'));
    }
}
