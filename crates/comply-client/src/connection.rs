//! Connection Manager: handshake and the command-style endpoints.

use std::time::{Duration, Instant};

use comply_core::error::SUGGESTED_RECONNECT_DELAY;
use comply_core::protocol::{
    endpoints, ActionRequest, CancelRequest, CancelResponse, CommandRequest, CommandResponse,
    OperationStatus, ProgressRequest, ProgressResponse, ResponseType, SpecResponse,
    SuggestRequest, SuggestResponse, Suggestion, PROTOCOL_VERSION,
};
use comply_core::{
    validation, AuthConfig, AuthManager, ClientConfig, ConsoleError, ProtocolError, Result,
};
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::Span;

use crate::http::{classify_transport_error, read_json};
use crate::retry::RetryExecutor;
use crate::state::ConnectionState;

/// Suggestions offered when the application cannot be asked.
pub fn fallback_suggestions() -> Vec<Suggestion> {
    vec![
        Suggestion::new("help", "Show available commands"),
        Suggestion::new("status", "Show application status"),
        Suggestion::new("version", "Show application version"),
    ]
}

/// Live HTTP session created by a successful handshake.
#[derive(Clone)]
struct HttpSession {
    client: Client,
    base_url: String,
    auth_header: Option<String>,
}

impl HttpSession {
    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_header {
            Some(value) => request.header(AUTHORIZATION, value),
            None => request,
        }
    }
}

#[derive(Default)]
struct Inner {
    state: ConnectionState,
    session: Option<HttpSession>,
}

/// Progress payload before its range and status are checked.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProgress {
    #[serde(default)]
    operation_id: Option<String>,
    progress: f64,
    status: String,
    #[serde(default)]
    message: Option<String>,
}

/// Owns the connection to one Compliant Application.
///
/// All state lives behind a lock so a background health monitor can share
/// the manager with the UI. Callers get [`ConnectionState`] copies.
pub struct ConnectionManager {
    inner: RwLock<Inner>,
    config: ClientConfig,
    retry: RetryExecutor,
    span: Span,
}

impl ConnectionManager {
    pub fn new(config: ClientConfig) -> Self {
        let span = tracing::info_span!("connection_manager");
        let retry = RetryExecutor::new(config.retry.policy()).with_span(span.clone());
        Self {
            inner: RwLock::new(Inner::default()),
            config,
            retry,
            span,
        }
    }

    /// Replaces the span events are emitted under.
    pub fn with_span(mut self, span: Span) -> Self {
        self.retry = self.retry.with_span(span.clone());
        self.span = span;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // ============================================================================
    // Connection lifecycle
    // ============================================================================

    /// Performs the handshake with the application at `host` (`host:port`,
    /// optionally prefixed with `http://` or `https://`).
    pub async fn connect(&self, host: &str, auth: Option<AuthConfig>) -> Result<ConnectionState> {
        let result = self.handshake(host, auth.as_ref()).await;

        let mut inner = self.inner.write().await;
        match result {
            Ok((spec, session)) => {
                tracing::info!(
                    parent: &self.span,
                    host,
                    app = %spec.app_name,
                    version = %spec.app_version,
                    "connected"
                );
                let stats = std::mem::take(&mut inner.state.stats);
                inner.state = ConnectionState {
                    host: host.to_string(),
                    auth,
                    connected: true,
                    app_name: Some(spec.app_name),
                    app_version: Some(spec.app_version),
                    protocol_version: Some(spec.protocol_version),
                    features: spec.features,
                    last_error: None,
                    stats,
                };
                inner.session = Some(session);
                Ok(inner.state.clone())
            }
            Err(err) => {
                tracing::warn!(parent: &self.span, host, error = %err, "handshake failed");
                let stats = std::mem::take(&mut inner.state.stats);
                inner.state = ConnectionState {
                    host: host.to_string(),
                    auth,
                    last_error: Some(err.clone()),
                    stats,
                    ..ConnectionState::default()
                };
                inner.session = None;
                Err(err)
            }
        }
    }

    async fn handshake(
        &self,
        host: &str,
        auth: Option<&AuthConfig>,
    ) -> Result<(SpecResponse, HttpSession)> {
        let base_url = base_url(host)?;
        if let Some(auth) = auth {
            AuthManager::validate(auth)?;
        }

        let timeout = self.config.timeouts.handshake();
        let client = Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| ConsoleError::connection(format!("failed to build HTTP client: {e}")))?;

        let session = HttpSession {
            client,
            base_url,
            auth_header: auth.and_then(AuthManager::create_auth_header),
        };

        let started = Instant::now();
        let request = session
            .authorize(session.client.get(session.url(endpoints::SPEC)))
            .timeout(timeout);
        let outcome = match request.send().await {
            Ok(response) => read_json::<SpecResponse>(response, endpoints::SPEC).await,
            Err(err) => Err(classify_transport_error(err, endpoints::SPEC)
                .with_retry_after(SUGGESTED_RECONNECT_DELAY)),
        };
        self.record(started.elapsed(), outcome.is_ok()).await;

        let spec = outcome?;
        if spec.protocol_version != PROTOCOL_VERSION {
            return Err(ProtocolError::protocol(format!(
                "unsupported protocol version '{}' (expected '{}')",
                spec.protocol_version, PROTOCOL_VERSION
            ))
            .into());
        }

        Ok((spec, session))
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.read().await.state.connected
    }

    /// Clears the connection state and drops the pooled HTTP connections.
    pub async fn disconnect(&self) {
        let mut inner = self.inner.write().await;
        if inner.state.connected {
            tracing::info!(parent: &self.span, host = %inner.state.host, "disconnected");
        }
        *inner = Inner::default();
    }

    pub async fn last_error(&self) -> Option<ConsoleError> {
        self.inner.read().await.state.last_error.clone()
    }

    /// A copy of the current connection state.
    pub async fn state(&self) -> ConnectionState {
        self.inner.read().await.state.clone()
    }

    // ============================================================================
    // Endpoints
    // ============================================================================

    /// Executes a free-text command, retrying transient failures.
    pub async fn execute_command(
        &self,
        request: &CommandRequest,
        cancel: &CancellationToken,
    ) -> Result<CommandResponse> {
        validation::validate_command(request)?;
        let result = self.execute_retried(endpoints::COMMAND, request, cancel).await;
        self.finish(result).await
    }

    /// Executes a predefined action, optionally scoped to a workflow.
    pub async fn execute_action(
        &self,
        request: &ActionRequest,
        cancel: &CancellationToken,
    ) -> Result<CommandResponse> {
        validation::validate_action(request)?;
        let result = self.execute_retried(endpoints::ACTION, request, cancel).await;
        self.finish(result).await
    }

    /// Asks for completions of partial input.
    ///
    /// Only validation failures are returned; every other failure degrades
    /// to [`fallback_suggestions`]. Never retried.
    pub async fn get_suggestions(&self, request: &SuggestRequest) -> Result<Vec<Suggestion>> {
        validation::validate_suggest(request)?;

        let result: Result<Vec<Suggestion>> = async {
            let session = self.session().await?;
            let response: SuggestResponse = self
                .post_json(&session, endpoints::SUGGEST, request, self.config.timeouts.suggest())
                .await?;
            Ok(response.suggestions)
        }
        .await;

        match result {
            Ok(suggestions) => Ok(suggestions),
            Err(err) => {
                tracing::debug!(parent: &self.span, error = %err, "using fallback suggestions");
                Ok(fallback_suggestions())
            }
        }
    }

    /// Polls the progress of a long-running operation.
    pub async fn get_progress(&self, request: &ProgressRequest) -> Result<ProgressResponse> {
        validation::validate_progress(request)?;

        let result: Result<ProgressResponse> = async {
            let session = self.session().await?;
            let raw: RawProgress = self
                .post_json(&session, endpoints::PROGRESS, request, self.config.timeouts.progress())
                .await?;
            validate_progress_response(raw, &request.operation_id)
        }
        .await;

        self.finish(result).await
    }

    /// Cancels an operation or a workflow.
    pub async fn cancel_operation(&self, request: &CancelRequest) -> Result<CancelResponse> {
        validation::validate_cancel(request)?;

        let result: Result<CancelResponse> = async {
            let session = self.session().await?;
            let response: CancelResponse = self
                .post_json(&session, endpoints::CANCEL, request, self.config.timeouts.cancel())
                .await?;
            if response.message.trim().is_empty() {
                return Err(ProtocolError::protocol("cancel response is missing a message").into());
            }
            Ok(response)
        }
        .await;

        self.finish(result).await
    }

    // ============================================================================
    // Internals
    // ============================================================================

    async fn execute_retried<Req: Serialize>(
        &self,
        endpoint: &'static str,
        request: &Req,
        cancel: &CancellationToken,
    ) -> Result<CommandResponse> {
        let session = self.session().await?;
        let timeout = self.config.timeouts.command();

        self.retry
            .execute(cancel, |attempt| {
                let session = session.clone();
                async move {
                    if attempt > 0 {
                        self.inner.write().await.state.stats.retries += 1;
                    }
                    let response: CommandResponse =
                        self.post_json(&session, endpoint, request, timeout).await?;
                    check_command_response(response)
                }
            })
            .await
    }

    async fn session(&self) -> Result<HttpSession> {
        let inner = self.inner.read().await;
        match (&inner.session, inner.state.connected) {
            (Some(session), true) => Ok(session.clone()),
            _ => Err(ConsoleError::connection("not connected; call connect first")),
        }
    }

    async fn post_json<Req, Resp>(
        &self,
        session: &HttpSession,
        endpoint: &str,
        body: &Req,
        timeout: Duration,
    ) -> std::result::Result<Resp, ProtocolError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let started = Instant::now();
        let request = session
            .authorize(session.client.post(session.url(endpoint)))
            .json(body)
            .timeout(timeout);

        let outcome = match request.send().await {
            Ok(response) => read_json(response, endpoint).await,
            Err(err) => Err(classify_transport_error(err, endpoint)),
        };

        let latency = started.elapsed();
        tracing::debug!(
            parent: &self.span,
            endpoint,
            latency_ms = latency.as_millis() as u64,
            ok = outcome.is_ok(),
            "request finished"
        );
        self.record(latency, outcome.is_ok()).await;
        outcome
    }

    async fn record(&self, latency: Duration, success: bool) {
        self.inner.write().await.state.stats.record(latency, success);
    }

    /// Stores the error of a finished operation as the last error.
    async fn finish<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            if !err.is_cancelled() {
                self.inner.write().await.state.last_error = Some(err.clone());
            }
        }
        result
    }
}

/// Turns `host:port` (with optional http/https scheme) into a base URL.
fn base_url(host: &str) -> Result<String> {
    let host = host.trim();
    if host.is_empty() {
        return Err(ConsoleError::connection("host must not be empty"));
    }

    let (scheme, authority) = match host.split_once("://") {
        Some((scheme @ ("http" | "https"), rest)) => (scheme, rest),
        Some((scheme, _)) => {
            return Err(ConsoleError::connection(format!(
                "unsupported scheme '{scheme}'"
            )));
        }
        None => ("http", host),
    };

    let authority = authority.trim_end_matches('/');
    if authority.contains('/') {
        return Err(ConsoleError::connection("host must not contain a path"));
    }

    let has_port = authority
        .rsplit_once(':')
        .is_some_and(|(name, port)| !name.is_empty() && port.parse::<u16>().is_ok());
    if !has_port {
        return Err(ConsoleError::connection(format!(
            "host '{host}' must include a port, e.g. localhost:8080"
        )));
    }

    Ok(format!("{scheme}://{authority}"))
}

fn check_command_response(response: CommandResponse) -> Result<CommandResponse> {
    let missing = response.content.as_ref().is_none_or(|content| content.is_null());
    if response.response_type == ResponseType::Structured && missing {
        return Err(ProtocolError::protocol("structured response without content").into());
    }
    Ok(response)
}

fn validate_progress_response(raw: RawProgress, requested: &str) -> Result<ProgressResponse> {
    if !(0.0..=100.0).contains(&raw.progress) {
        return Err(ProtocolError::protocol(format!(
            "progress {} is outside 0-100",
            raw.progress
        ))
        .into());
    }

    let status = OperationStatus::parse(&raw.status).ok_or_else(|| {
        ProtocolError::protocol(format!("unknown operation status '{}'", raw.status))
    })?;

    Ok(ProgressResponse {
        operation_id: raw
            .operation_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| requested.to_string()),
        progress: raw.progress,
        status,
        message: raw.message,
    })
}
