//! Classification of HTTP exchanges into [`ProtocolError`]s.

use std::time::Duration;

use comply_core::error::SUGGESTED_RECONNECT_DELAY;
use comply_core::protocol::ErrorEnvelope;
use comply_core::ProtocolError;
use reqwest::header::{HeaderValue, RETRY_AFTER};
use reqwest::Response;
use serde::de::DeserializeOwned;

/// Maps a failed `send()` (or body read) to a network error.
pub(crate) fn classify_transport_error(err: reqwest::Error, endpoint: &str) -> ProtocolError {
    let timeout = err.is_timeout();
    let connect = err.is_connect();

    let message = if timeout {
        format!("{endpoint} timed out")
    } else if connect {
        format!("failed to connect for {endpoint}: {err}")
    } else {
        format!("{endpoint} request failed: {err}")
    };

    let classified = ProtocolError::network(message, timeout, connect);
    let classified = if connect {
        classified.with_retry_after(SUGGESTED_RECONNECT_DELAY)
    } else {
        classified
    };
    classified.with_cause(err)
}

/// Maps a non-success status and its body to the matching error kind.
///
/// 401/403 are authentication failures whatever the body says; any other
/// status is `http_structured` when the body is the error envelope and
/// plain `http` otherwise.
pub(crate) fn classify_status(
    status: u16,
    body: &str,
    retry_after: Option<Duration>,
) -> ProtocolError {
    let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok();

    let err = if status == 401 || status == 403 {
        let message = envelope
            .map(|e| e.error.message)
            .unwrap_or_else(|| format!("credentials rejected (HTTP {status})"));
        ProtocolError::authentication(status, message)
    } else if let Some(envelope) = envelope {
        let body = envelope.error;
        ProtocolError::http_structured(
            status,
            body.message,
            body.code,
            body.details,
            body.recovery_actions,
        )
    } else {
        ProtocolError::http(status, body)
    };

    match retry_after {
        Some(delay) if err.should_retry() => err.with_retry_after(delay),
        _ => err,
    }
}

/// Reads a response, returning the decoded body or a classified error.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: Response,
    endpoint: &str,
) -> Result<T, ProtocolError> {
    let status = response.status();
    if !status.is_success() {
        let retry_after = parse_retry_after(response.headers().get(RETRY_AFTER));
        let body = response.text().await.unwrap_or_default();
        return Err(classify_status(status.as_u16(), &body, retry_after));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|err| classify_transport_error(err, endpoint))?;

    serde_json::from_slice(&bytes).map_err(|err| {
        ProtocolError::protocol(format!("invalid {endpoint} response: {err}")).with_cause(err)
    })
}

/// Parses an integer-seconds `Retry-After` header. HTTP dates are ignored.
pub(crate) fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
