//! Connection state exposed to callers as read-only snapshots.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use comply_core::{AuthConfig, ConsoleError};

/// Rolling request statistics for one connection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionStats {
    pub requests_sent: u64,
    pub requests_failed: u64,
    pub retries: u64,
    pub total_latency: Duration,
    pub last_request_at: Option<DateTime<Utc>>,
}

impl ConnectionStats {
    pub fn average_latency(&self) -> Duration {
        if self.requests_sent == 0 {
            return Duration::ZERO;
        }
        let count = u32::try_from(self.requests_sent).unwrap_or(u32::MAX);
        self.total_latency / count
    }

    pub(crate) fn record(&mut self, latency: Duration, success: bool) {
        self.requests_sent += 1;
        if !success {
            self.requests_failed += 1;
        }
        self.total_latency += latency;
        self.last_request_at = Some(Utc::now());
    }
}

/// Everything the client knows about its current connection.
#[derive(Debug, Clone, Default)]
pub struct ConnectionState {
    pub host: String,
    pub auth: Option<AuthConfig>,
    pub connected: bool,
    pub app_name: Option<String>,
    pub app_version: Option<String>,
    pub protocol_version: Option<String>,
    pub features: BTreeMap<String, bool>,
    pub last_error: Option<ConsoleError>,
    pub stats: ConnectionStats,
}

impl ConnectionState {
    /// Whether the application advertised `feature` during the handshake.
    pub fn supports(&self, feature: &str) -> bool {
        self.features.get(feature).copied().unwrap_or(false)
    }
}
