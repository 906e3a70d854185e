//! Error taxonomy for the Compliance Protocol client.
//!
//! Every failure a caller can observe is a [`ConsoleError`]. Failures that
//! came back from (or on the way to) a Compliant Application are carried by
//! [`ProtocolError`], which knows whether it is worth retrying and how long
//! to wait before doing so.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::protocol::Action;
use crate::retry::RetryPolicy;

/// Delay suggested to callers after a recoverable transport failure.
pub const SUGGESTED_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// A local, pre-flight rejection of a request. Never sent over the wire.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Validation error on '{field}': {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Discriminates the classes of failure the client distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Network,
    Http,
    HttpStructured,
    Protocol,
    Authentication,
    Validation,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Http => "http",
            Self::HttpStructured => "http_structured",
            Self::Protocol => "protocol",
            Self::Authentication => "authentication",
            Self::Validation => "validation",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport or HTTP level detail attached to a [`ProtocolError`].
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorDetail {
    Network {
        /// The request exceeded its deadline.
        timeout: bool,
        /// The TCP/TLS connection could not be established.
        connect: bool,
    },
    Http {
        status: u16,
        code: Option<String>,
        details: Option<Value>,
        recovery_actions: Vec<Action>,
        /// Raw response body when it was not a structured envelope.
        body: Option<String>,
    },
}

/// A classified failure of a protocol exchange.
///
/// Constructed once through the helpers below and never mutated afterwards.
#[derive(Error, Debug, Clone)]
#[error("{kind} error: {message}")]
pub struct ProtocolError {
    kind: ErrorKind,
    message: String,
    detail: Option<ErrorDetail>,
    #[source]
    cause: Option<Arc<dyn std::error::Error + Send + Sync>>,
    recoverable: bool,
    retry_after: Option<Duration>,
}

impl ProtocolError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
            cause: None,
            recoverable: false,
            retry_after: None,
        }
    }

    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a transport-level error. Always recoverable.
    pub fn network(message: impl Into<String>, timeout: bool, connect: bool) -> Self {
        let mut err = Self::new(ErrorKind::Network, message);
        err.detail = Some(ErrorDetail::Network { timeout, connect });
        err.recoverable = true;
        err
    }

    /// Creates a plain HTTP status error whose body was not a structured envelope.
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let message = if body.trim().is_empty() {
            format!("HTTP {status}")
        } else {
            format!("HTTP {status}: {}", body.trim())
        };
        let mut err = Self::new(ErrorKind::Http, message);
        err.recoverable = is_retryable_status(status);
        err.detail = Some(ErrorDetail::Http {
            status,
            code: None,
            details: None,
            recovery_actions: Vec::new(),
            body: Some(body),
        });
        err
    }

    /// Creates an error from a server-declared structured error envelope.
    pub fn http_structured(
        status: u16,
        message: impl Into<String>,
        code: impl Into<String>,
        details: Option<Value>,
        recovery_actions: Vec<Action>,
    ) -> Self {
        let mut err = Self::new(ErrorKind::HttpStructured, message);
        err.recoverable = is_retryable_status(status);
        err.detail = Some(ErrorDetail::Http {
            status,
            code: Some(code.into()),
            details,
            recovery_actions,
            body: None,
        });
        err
    }

    /// Creates an error for a malformed response or an incompatible peer.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Protocol, message)
    }

    /// Creates an error for rejected credentials.
    pub fn authentication(status: u16, message: impl Into<String>) -> Self {
        let mut err = Self::new(ErrorKind::Authentication, message);
        err.detail = Some(ErrorDetail::Http {
            status,
            code: None,
            details: None,
            recovery_actions: Vec::new(),
            body: None,
        });
        err
    }

    /// Attaches the underlying cause.
    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Arc::new(cause));
        self
    }

    /// Attaches a server- or client-suggested delay before trying again.
    pub fn with_retry_after(mut self, delay: Duration) -> Self {
        self.retry_after = Some(delay);
        self
    }

    // ============================================================================
    // Accessors
    // ============================================================================

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn detail(&self) -> Option<&ErrorDetail> {
        self.detail.as_ref()
    }

    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    pub fn recoverable(&self) -> bool {
        self.recoverable
    }

    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    pub fn status(&self) -> Option<u16> {
        match &self.detail {
            Some(ErrorDetail::Http { status, .. }) => Some(*status),
            _ => None,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match &self.detail {
            Some(ErrorDetail::Http { code, .. }) => code.as_deref(),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self.detail,
            Some(ErrorDetail::Network { timeout: true, .. })
        )
    }

    pub fn recovery_actions(&self) -> &[Action] {
        match &self.detail {
            Some(ErrorDetail::Http {
                recovery_actions, ..
            }) => recovery_actions,
            _ => &[],
        }
    }

    // ============================================================================
    // Retry decisions
    // ============================================================================

    /// Whether the Retry Executor should try the request again.
    ///
    /// Only network timeouts and HTTP 429/5xx responses are retried.
    pub fn should_retry(&self) -> bool {
        match self.kind {
            ErrorKind::Network => self.is_timeout(),
            ErrorKind::Http | ErrorKind::HttpStructured => {
                self.status().is_some_and(is_retryable_status)
            }
            ErrorKind::Protocol | ErrorKind::Authentication | ErrorKind::Validation => false,
        }
    }

    /// Delay before retry number `attempt` (0-based) under the default policy.
    pub fn retry_delay(&self, attempt: u32) -> Option<Duration> {
        RetryPolicy::default().delay_for(self, attempt)
    }
}

fn is_retryable_status(status: u16) -> bool {
    status == 429 || status >= 500
}

/// The error type returned by every client operation.
#[derive(Error, Debug, Clone)]
pub enum ConsoleError {
    /// Request rejected locally before any network I/O
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Invalid connection parameters or an operation that needs a connection
    #[error("Connection error: {0}")]
    Connection(String),

    /// Classified failure of a protocol exchange
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The caller cancelled the operation
    #[error("Operation cancelled")]
    Cancelled,

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ConsoleError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Validation(_) => Some(ErrorKind::Validation),
            Self::Protocol(err) => Some(err.kind()),
            _ => None,
        }
    }

    pub fn as_protocol(&self) -> Option<&ProtocolError> {
        match self {
            Self::Protocol(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    pub fn is_network(&self) -> bool {
        self.kind() == Some(ErrorKind::Network)
    }

    pub fn is_protocol(&self) -> bool {
        self.kind() == Some(ErrorKind::Protocol)
    }

    pub fn is_authentication(&self) -> bool {
        self.kind() == Some(ErrorKind::Authentication)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// The offending field of a validation failure.
    pub fn validation_field(&self) -> Option<&str> {
        match self {
            Self::Validation(err) => Some(&err.field),
            _ => None,
        }
    }

    pub fn recoverable(&self) -> bool {
        self.as_protocol().is_some_and(ProtocolError::recoverable)
    }

    pub fn should_retry(&self) -> bool {
        self.as_protocol().is_some_and(ProtocolError::should_retry)
    }

    pub fn retry_after(&self) -> Option<Duration> {
        self.as_protocol().and_then(ProtocolError::retry_after)
    }

    pub fn recovery_actions(&self) -> &[Action] {
        self.as_protocol()
            .map(ProtocolError::recovery_actions)
            .unwrap_or(&[])
    }

    /// Server-supplied recovery actions, or a single "Dismiss" when there are none.
    pub fn with_default_recovery(&self) -> Vec<Action> {
        let actions = self.recovery_actions();
        if actions.is_empty() {
            vec![Action::dismiss()]
        } else {
            actions.to_vec()
        }
    }
}

/// A type alias for `Result<T, ConsoleError>`.
pub type Result<T> = std::result::Result<T, ConsoleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_timeout_is_retryable_with_exponential_delay() {
        let err = ProtocolError::network("deadline exceeded", true, false);
        assert!(err.should_retry());
        assert!(err.recoverable());
        assert_eq!(err.retry_delay(0), Some(Duration::from_secs(1)));
        assert_eq!(err.retry_delay(1), Some(Duration::from_secs(2)));
        assert_eq!(err.retry_delay(3), Some(Duration::from_secs(8)));
    }

    #[test]
    fn test_connect_failure_is_recoverable_but_not_retried() {
        let err = ProtocolError::network("connection refused", false, true)
            .with_retry_after(SUGGESTED_RECONNECT_DELAY);
        assert!(err.recoverable());
        assert!(!err.should_retry());
        assert_eq!(err.retry_delay(0), None);
        assert_eq!(err.retry_after(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_http_status_classification() {
        for status in [429, 500, 502, 503, 504] {
            let err = ProtocolError::http(status, "busy");
            assert!(err.should_retry(), "status {status} should retry");
            assert_eq!(err.retry_delay(0), Some(Duration::from_secs(5)));
            assert_eq!(err.retry_delay(1), Some(Duration::from_secs(5)));
        }
        for status in [400, 404, 409, 422] {
            let err = ProtocolError::http(status, "nope");
            assert!(!err.should_retry(), "status {status} should not retry");
            assert_eq!(err.retry_delay(0), None);
        }
    }

    #[test]
    fn test_retry_after_overrides_fixed_delay() {
        let err = ProtocolError::http(429, "").with_retry_after(Duration::from_secs(12));
        assert_eq!(err.retry_delay(0), Some(Duration::from_secs(12)));
    }

    #[test]
    fn test_non_retryable_kinds() {
        assert!(!ProtocolError::protocol("bad json").should_retry());
        assert!(!ProtocolError::authentication(401, "denied").should_retry());
        let validation: ConsoleError = ValidationError::new("command", "empty").into();
        assert!(!validation.should_retry());
        assert_eq!(validation.kind(), Some(ErrorKind::Validation));
        assert_eq!(validation.validation_field(), Some("command"));
    }

    #[test]
    fn test_structured_error_carries_server_message() {
        let err = ProtocolError::http_structured(
            503,
            "maintenance window",
            "MAINTENANCE",
            None,
            vec![Action::new("retry", "Retry", "status")],
        );
        assert_eq!(err.kind(), ErrorKind::HttpStructured);
        assert_eq!(err.message(), "maintenance window");
        assert_eq!(err.code(), Some("MAINTENANCE"));
        assert_eq!(err.status(), Some(503));
        assert_eq!(err.recovery_actions().len(), 1);
        assert!(err.to_string().contains("http_structured"));
    }

    #[test]
    fn test_default_recovery_adds_dismiss() {
        let err: ConsoleError = ProtocolError::protocol("version mismatch").into();
        let actions = err.with_default_recovery();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].id, "dismiss");
    }

    #[test]
    fn test_cause_is_exposed_as_source() {
        use std::error::Error as _;

        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = ProtocolError::network("connect failed", false, true).with_cause(io);
        assert!(err.source().is_some());
        assert!(err.cause().is_some());
    }
}
