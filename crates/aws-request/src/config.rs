//! Configuration, credentials, and region handling.
//!
//! [`Config`] plays the role of the SDK-wide options value. Every member is
//! optional so that a session default can be layered with per-client
//! overrides via [`Config::merge`]. A [`ConfigProvider`] turns the layered
//! value into a [`ClientConfig`] for one named service.

use crate::handlers::Handlers;
use crate::transport::Transport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

// ── Regions ─────────────────────────────────────────────────────────────

/// Standard AWS regions.
pub const AWS_REGIONS: &[&str] = &[
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "af-south-1",
    "ap-east-1",
    "ap-south-1",
    "ap-south-2",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-southeast-3",
    "ap-southeast-4",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-northeast-3",
    "ca-central-1",
    "ca-west-1",
    "eu-central-1",
    "eu-central-2",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "eu-south-1",
    "eu-south-2",
    "eu-north-1",
    "il-central-1",
    "me-south-1",
    "me-central-1",
    "sa-east-1",
    // GovCloud
    "us-gov-east-1",
    "us-gov-west-1",
    // China
    "cn-north-1",
    "cn-northwest-1",
];

/// An AWS region code such as `us-west-2`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Region {
    pub name: String,
}

impl Region {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    /// Return the service endpoint for a given service in this region.
    /// Follows the standard AWS endpoint pattern: `https://{service}.{region}.amazonaws.com`
    pub fn endpoint(&self, service: &str) -> String {
        match self.partition() {
            "aws-cn" => format!("https://{}.{}.amazonaws.com.cn", service, self.name),
            _ => format!("https://{}.{}.amazonaws.com", service, self.name),
        }
    }

    /// Check if this is a known AWS region.
    pub fn is_valid(&self) -> bool {
        AWS_REGIONS.contains(&self.name.as_str())
    }

    /// Return the partition for this region (aws, aws-cn, aws-us-gov).
    pub fn partition(&self) -> &str {
        if self.name.starts_with("cn-") {
            "aws-cn"
        } else if self.name.starts_with("us-gov-") {
            "aws-us-gov"
        } else {
            "aws"
        }
    }
}

// ── Credentials ─────────────────────────────────────────────────────────

/// Static or temporary AWS credentials.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct Credentials {
    /// Access key ID (AKIA* for long-term, ASIA* for temporary).
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Present for temporary credentials issued by STS.
    pub session_token: Option<String>,
    /// None for long-term IAM credentials.
    pub expiration: Option<DateTime<Utc>>,
    /// Where the credentials came from, for diagnostics.
    pub provider_name: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "** redacted **"),
            )
            .field("expiration", &self.expiration)
            .field("provider_name", &self.provider_name)
            .finish()
    }
}

impl Credentials {
    /// Create new long-term credentials.
    pub fn new(access_key_id: &str, secret_access_key: &str) -> Self {
        Self {
            access_key_id: access_key_id.to_string(),
            secret_access_key: secret_access_key.to_string(),
            session_token: None,
            expiration: None,
            provider_name: Some("static".to_string()),
        }
    }

    /// Create temporary credentials with a session token.
    pub fn new_temporary(
        access_key_id: &str,
        secret_access_key: &str,
        session_token: &str,
        expiration: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.to_string(),
            secret_access_key: secret_access_key.to_string(),
            session_token: Some(session_token.to_string()),
            expiration,
            provider_name: Some("static".to_string()),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration.map(|exp| now >= exp).unwrap_or(false)
    }

    /// Resolve credentials from `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`
    /// (and optionally `AWS_SESSION_TOKEN`).
    pub fn from_environment() -> Option<Self> {
        let access_key = std::env::var("AWS_ACCESS_KEY_ID").ok()?;
        let secret_key = std::env::var("AWS_SECRET_ACCESS_KEY").ok()?;
        if access_key.is_empty() || secret_key.is_empty() {
            return None;
        }
        let session_token = std::env::var("AWS_SESSION_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());
        Some(Self {
            access_key_id: access_key,
            secret_access_key: secret_key,
            session_token,
            expiration: None,
            provider_name: Some("environment".to_string()),
        })
    }
}

// ── Retry Configuration ─────────────────────────────────────────────────

/// Retry configuration following the AWS SDK standard retry mode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt (default: 3).
    pub max_retries: u32,
    pub mode: RetryMode,
    /// Initial backoff duration in milliseconds (default: 500).
    pub initial_backoff_ms: u64,
    /// Maximum backoff duration in milliseconds (default: 20_000).
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            mode: RetryMode::Standard,
            initial_backoff_ms: 500,
            max_backoff_ms: 20_000,
        }
    }
}

impl RetryConfig {
    /// No retries at all.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Exponential backoff before retry number `retry_count` (0-based),
    /// capped at `max_backoff_ms`.
    pub fn backoff(&self, retry_count: u32) -> Duration {
        let exponential = self
            .initial_backoff_ms
            .saturating_mul(2u64.saturating_pow(retry_count));
        let capped = exponential.min(self.max_backoff_ms);

        let millis = match self.mode {
            RetryMode::Adaptive | RetryMode::Standard => {
                // Full jitter: random between 0 and capped
                use rand::Rng;
                let mut rng = rand::thread_rng();
                rng.gen_range(0..=capped)
            }
            RetryMode::Legacy => capped,
        };
        Duration::from_millis(millis)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RetryMode {
    /// Exponential backoff with full jitter.
    Standard,
    /// Same schedule as Standard; reserved for client-side rate limiting.
    Adaptive,
    /// Exponential backoff without jitter.
    Legacy,
}

// ── Logging ─────────────────────────────────────────────────────────────

/// How much of the request lifecycle the pipeline reports through `log`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    #[default]
    Off,
    /// One line per attempt and per response.
    Debug,
    /// Also the canonical request and string to sign.
    DebugWithSigning,
    /// Also request and response bodies.
    DebugWithHttpBody,
}

// ── Config ──────────────────────────────────────────────────────────────

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Layered SDK options. `None` means "inherit from the layer below".
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub credentials: Option<Credentials>,
    pub region: Option<String>,
    /// Endpoint override (for local mocks or non-standard deployments).
    pub endpoint: Option<String>,
    pub disable_ssl: Option<bool>,
    pub retry: Option<RetryConfig>,
    pub request_timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    pub log_level: Option<LogLevel>,
    /// Appended to the `user-agent` header.
    pub user_agent_suffix: Option<String>,
    /// HTTP transport; the client installs a reqwest one when unset.
    pub transport: Option<Arc<dyn Transport>>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_region(mut self, region: &str) -> Self {
        self.region = Some(region.to_string());
        self
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = Some(endpoint.to_string());
        self
    }

    pub fn with_disable_ssl(mut self, disable: bool) -> Self {
        self.disable_ssl = Some(disable);
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        let mut retry = self.retry.take().unwrap_or_default();
        retry.max_retries = max_retries;
        self.retry = Some(retry);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = Some(level);
        self
    }

    pub fn with_user_agent_suffix(mut self, suffix: &str) -> Self {
        self.user_agent_suffix = Some(suffix.to_string());
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Overlay every member that `other` sets onto `self`.
    pub fn merge(&mut self, other: &Config) {
        if other.credentials.is_some() {
            self.credentials = other.credentials.clone();
        }
        if other.region.is_some() {
            self.region = other.region.clone();
        }
        if other.endpoint.is_some() {
            self.endpoint = other.endpoint.clone();
        }
        if other.disable_ssl.is_some() {
            self.disable_ssl = other.disable_ssl;
        }
        if other.retry.is_some() {
            self.retry = other.retry.clone();
        }
        if other.request_timeout.is_some() {
            self.request_timeout = other.request_timeout;
        }
        if other.connect_timeout.is_some() {
            self.connect_timeout = other.connect_timeout;
        }
        if other.log_level.is_some() {
            self.log_level = other.log_level;
        }
        if other.user_agent_suffix.is_some() {
            self.user_agent_suffix = other.user_agent_suffix.clone();
        }
        if other.transport.is_some() {
            self.transport = other.transport.clone();
        }
    }

    pub fn disable_ssl(&self) -> bool {
        self.disable_ssl.unwrap_or(false)
    }

    pub fn retry_config(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT)
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level.unwrap_or_default()
    }

    /// Resolve `(endpoint, signing_region)` for `service`.
    ///
    /// An explicit endpoint always wins. Without one the region decides, and
    /// without a region both values stay empty; the validate handlers report
    /// that when a request is built.
    pub fn resolve_endpoint(&self, service: &str) -> (String, String) {
        let region = self
            .region
            .as_deref()
            .filter(|r| !r.is_empty())
            .map(Region::new);
        let signing_region = region
            .as_ref()
            .map(|r| r.name.clone())
            .unwrap_or_default();

        let endpoint = match self.endpoint.as_deref().filter(|e| !e.is_empty()) {
            Some(explicit) => add_scheme(explicit, self.disable_ssl()),
            None => match region {
                Some(ref r) => {
                    let resolved = r.endpoint(service);
                    if self.disable_ssl() {
                        resolved.replacen("https://", "http://", 1)
                    } else {
                        resolved
                    }
                }
                None => String::new(),
            },
        };
        (endpoint, signing_region)
    }
}

fn add_scheme(endpoint: &str, disable_ssl: bool) -> String {
    if endpoint.contains("://") {
        endpoint.trim_end_matches('/').to_string()
    } else {
        let scheme = if disable_ssl { "http" } else { "https" };
        format!("{}://{}", scheme, endpoint.trim_end_matches('/'))
    }
}

// ── Client Config ───────────────────────────────────────────────────────

/// Everything a service constructor needs from its provider.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub config: Config,
    /// Independent copy of the provider's default handler chain.
    pub handlers: Handlers,
    pub endpoint: String,
    pub signing_region: String,
}

/// Source of per-service client configuration (a [`crate::Session`] in
/// practice).
pub trait ConfigProvider {
    /// Layer `overrides` (in order) onto the provider's own config and
    /// resolve it for `service_name`.
    fn client_config(&self, service_name: &str, overrides: &[Config]) -> ClientConfig;
}
