//! Generic service client: metadata, config, and a handler chain.
//!
//! Service crates embed a [`Client`], push their protocol and signing
//! handlers onto it at construction time, and create one [`Request`] per
//! API call with [`Client::new_request`].

use crate::config::Config;
use crate::handlers::Handlers;
use crate::request::{Operation, Request};
use crate::transport::ReqwestTransport;
use serde_json::Value;
use std::sync::Arc;

/// Runs once on a freshly constructed client.
pub type ClientInitHook = Arc<dyn Fn(&mut Client) + Send + Sync>;

/// Runs on every request a service client creates.
pub type RequestInitHook = Arc<dyn Fn(&mut Request) + Send + Sync>;

/// Static metadata describing the service a client talks to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub service_name: String,
    /// SigV4 service name when it differs from `service_name`.
    pub signing_name: Option<String>,
    pub signing_region: String,
    pub endpoint: String,
    pub api_version: String,
    /// JSON-RPC protocol version, e.g. "1.1".
    pub json_version: String,
    /// JSON-RPC `x-amz-target` prefix.
    pub target_prefix: String,
}

impl ClientInfo {
    pub fn signing_name(&self) -> &str {
        self.signing_name.as_deref().unwrap_or(&self.service_name)
    }
}

/// Cloning is cheap and yields an independent handler chain.
#[derive(Debug, Clone)]
pub struct Client {
    config: Config,
    info: ClientInfo,
    handlers: Handlers,
}

impl Client {
    /// Installs a reqwest transport when the config does not carry one, so
    /// every request from this client shares one connection pool.
    pub fn new(mut config: Config, info: ClientInfo, handlers: Handlers) -> Self {
        if config.transport.is_none() {
            config.transport = Some(Arc::new(ReqwestTransport::from_config(&config)));
        }
        log::debug!(
            "created {} client (api {}, endpoint '{}', signing region '{}')",
            info.service_name,
            info.api_version,
            info.endpoint,
            info.signing_region
        );
        Self {
            config,
            info,
            handlers,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn info(&self) -> &ClientInfo {
        &self.info
    }

    pub fn handlers(&self) -> &Handlers {
        &self.handlers
    }

    /// For construction-time wiring and client-init hooks.
    pub fn handlers_mut(&mut self) -> &mut Handlers {
        &mut self.handlers
    }

    pub fn new_request(&self, operation: Operation, params: Value) -> Request {
        Request::new(
            self.config.clone(),
            self.info.clone(),
            self.handlers.clone(),
            operation,
            params,
        )
    }
}
