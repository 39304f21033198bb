//! Request execution: hooks, pooling, timeout and classification.

use crate::classify::{classify, CallContext, RawOutcome, MAX_EXCERPT_LEN};
use crate::expect::Expectation;
use crate::pool::PoolKey;
use crate::request::{content_type_of, RequestSpec};
use crate::settings::{ExceptionArgs, Settings};
use crate::{CallError, ExecutionResult};
use bytes::{Bytes, BytesMut};
use http::header::{CONTENT_TYPE, USER_AGENT};
use http::{HeaderMap, HeaderValue};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};

/// Runs one request to completion and returns its classified outcome.
///
/// Ordering within a request: before-send hooks, then the send, then
/// classification, then exception hooks.
pub(crate) async fn execute<E: Expectation>(
    settings: &Settings,
    mut spec: RequestSpec,
    expectation: &E,
) -> ExecutionResult<E::Output> {
    let timeout = spec.timeout().unwrap_or_else(|| settings.default_timeout());

    run_before_send(settings, &mut spec);
    if !spec.headers().contains_key(USER_AGENT) {
        match HeaderValue::try_from(settings.user_agent()) {
            Ok(value) => {
                spec.headers_mut().insert(USER_AGENT, value);
            }
            Err(e) => tracing::warn!(error = %e, "Ignoring invalid user agent"),
        }
    }

    let client = match settings.client_pool().get(&PoolKey::new(timeout)) {
        Ok(client) => client,
        Err(e) => {
            let result = ExecutionResult::failed(
                CallError::Unexpected {
                    uri: spec.uri().clone(),
                    message: e.to_string(),
                },
                None,
                HeaderMap::new(),
                Duration::ZERO,
            );
            report_failure(settings, &spec, &result);
            return result;
        }
    };

    let request = build_request(&client, &spec);

    tracing::debug!(
        method = %spec.method(),
        url = %spec.uri(),
        timeout_ms = timeout.as_millis(),
        "Executing HTTP request"
    );

    let request_scope = settings.profile_request(&spec);
    let start_time = Instant::now();
    let outcome = match tokio::time::timeout(timeout, send(request, expectation)).await {
        Ok(outcome) => outcome,
        Err(_) => RawOutcome::TimedOut,
    };
    let latency = start_time.elapsed();
    drop(request_scope);

    let ctx = CallContext {
        uri: spec.uri().clone(),
        timeout,
        latency,
    };
    let decoding = matches!(
        &outcome,
        RawOutcome::Response { status, .. }
            if expectation.is_success(*status) && expectation.needs_body()
    );
    let result = {
        let _decode_scope = if decoding {
            settings.profile_general(expectation.name())
        } else {
            None
        };
        classify(outcome, expectation, &ctx)
    };

    match result.status {
        Some(status) => tracing::info!(
            status = status.as_u16(),
            latency_ms = latency.as_millis(),
            success = result.success,
            "Received HTTP response"
        ),
        None => tracing::debug!(
            latency_ms = latency.as_millis(),
            "No HTTP response received"
        ),
    }

    if !result.success {
        report_failure(settings, &spec, &result);
    }
    result
}

/// Sends the request and reads as much of the body as the classifier needs.
///
/// Runs entirely inside the timeout, so dropping it on expiry abandons the
/// connection attempt and any partially read body.
async fn send<E: Expectation>(request: reqwest::RequestBuilder, expectation: &E) -> RawOutcome {
    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => return RawOutcome::Failed(e),
    };

    let status = response.status();
    let headers = response.headers().clone();
    let body = if !expectation.is_success(status) {
        Some(read_excerpt(response).await)
    } else if expectation.needs_body() {
        Some(response.bytes().await)
    } else {
        None
    };

    RawOutcome::Response {
        status,
        headers,
        body,
    }
}

/// Reads a rejected response's body until [`MAX_EXCERPT_LEN`] bytes are
/// buffered. Only an excerpt of it is ever kept.
async fn read_excerpt(mut response: reqwest::Response) -> Result<Bytes, reqwest::Error> {
    let mut buf = BytesMut::new();
    while buf.len() < MAX_EXCERPT_LEN {
        match response.chunk().await? {
            Some(chunk) => buf.extend_from_slice(&chunk),
            None => break,
        }
    }
    Ok(buf.freeze())
}

fn build_request(client: &reqwest::Client, spec: &RequestSpec) -> reqwest::RequestBuilder {
    let mut headers = spec.headers().clone();
    if let Some(content_type) = content_type_of(spec) {
        headers.insert(CONTENT_TYPE, content_type.clone());
    }

    let mut request = client
        .request(spec.method().clone(), spec.uri().clone())
        .headers(headers);
    if let Some(body) = spec.body() {
        request = request.body(body.content().clone());
    }
    request
}

fn run_before_send(settings: &Settings, spec: &mut RequestSpec) {
    for hook in settings.before_send_hooks() {
        if catch_unwind(AssertUnwindSafe(|| hook(&mut *spec))).is_err() {
            tracing::error!(url = %spec.uri(), "Before-send hook panicked");
        }
    }
}

/// Logs a failure and notifies exception hooks unless the request
/// suppresses it.
fn report_failure<T>(settings: &Settings, spec: &RequestSpec, result: &ExecutionResult<T>) {
    let Some(error) = result.error.as_ref() else {
        return;
    };

    if spec.is_suppressed(result.status) {
        tracing::debug!(
            error = %error,
            method = %spec.method(),
            url = %spec.uri(),
            "Request failed (suppressed)"
        );
        return;
    }

    tracing::warn!(
        error = %error,
        kind = error.kind(),
        method = %spec.method(),
        url = %spec.uri(),
        "Request failed"
    );

    let hooks = settings.exception_hooks();
    if hooks.is_empty() {
        return;
    }

    let args = ExceptionArgs {
        request: spec,
        error,
        data: error_data(settings.error_data_prefix(), spec, error),
    };
    for hook in hooks {
        if catch_unwind(AssertUnwindSafe(|| hook(&args))).is_err() {
            tracing::error!(url = %spec.uri(), "Exception hook panicked");
        }
    }
}

/// Diagnostic pairs for exception hooks, each key carrying `prefix`.
fn error_data(prefix: &str, spec: &RequestSpec, error: &CallError) -> Vec<(String, String)> {
    let mut data = vec![
        (format!("{}Url", prefix), spec.uri().to_string()),
        (format!("{}Method", prefix), spec.method().to_string()),
    ];
    if let Some(status) = error.status() {
        data.push((format!("{}Status", prefix), status.as_u16().to_string()));
    }
    if let CallError::Timeout { timeout, .. } = error {
        data.push((
            format!("{}Timeout", prefix),
            format!("{}ms", timeout.as_millis()),
        ));
    }
    if let Some(raw) = error.raw_response() {
        data.push((format!("{}Response", prefix), raw.to_string()));
    }
    data.extend(
        spec.log_data()
            .iter()
            .map(|(key, value)| (format!("{}{}", prefix, key), value.clone())),
    );
    data
}
