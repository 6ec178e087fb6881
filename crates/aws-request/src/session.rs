//! Default [`ConfigProvider`]: a base config plus the default handler chain.

use crate::config::{ClientConfig, Config, ConfigProvider, Credentials};
use crate::corehandlers;
use crate::handlers::Handlers;

#[derive(Debug, Clone)]
pub struct Session {
    pub config: Config,
    pub handlers: Handlers,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            handlers: corehandlers::default_handlers(),
        }
    }

    /// Credentials from `AWS_ACCESS_KEY_ID`/`AWS_SECRET_ACCESS_KEY`, region
    /// from `AWS_REGION` or `AWS_DEFAULT_REGION`, endpoint from
    /// `AWS_ENDPOINT_URL`.
    pub fn from_env() -> Self {
        Self::new(config_from_env(|key| std::env::var(key).ok()))
    }
}

fn config_from_env<F>(lookup: F) -> Config
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

    let mut config = Config::new();
    if let Some(credentials) = Credentials::from_environment() {
        config = config.with_credentials(credentials);
    }
    if let Some(region) = non_empty("AWS_REGION").or_else(|| non_empty("AWS_DEFAULT_REGION")) {
        config = config.with_region(&region);
    }
    if let Some(endpoint) = non_empty("AWS_ENDPOINT_URL") {
        config = config.with_endpoint(&endpoint);
    }
    config
}

impl ConfigProvider for Session {
    fn client_config(&self, service_name: &str, overrides: &[Config]) -> ClientConfig {
        let mut config = self.config.clone();
        for layer in overrides {
            config.merge(layer);
        }
        let (endpoint, signing_region) = config.resolve_endpoint(service_name);
        if endpoint.is_empty() {
            log::warn!("no endpoint resolved for '{}': region is not configured", service_name);
        }
        ClientConfig {
            config,
            handlers: self.handlers.clone(),
            endpoint,
            signing_region,
        }
    }
}
