//! ECS client construction.
//!
//! [`Ecs::new`] resolves the service against a [`ConfigProvider`], builds an
//! [`aws_request::Client`] carrying the ECS metadata, and appends the SigV4
//! signer and the JSON-RPC protocol handlers to the chain the provider
//! handed out. Customisation hooks are passed in through [`EcsOptions`]
//! rather than registered globally.

use aws_request::protocol::jsonrpc;
use aws_request::{
    signing, AwsError, AwsResult, Client, ClientConfig, ClientInfo, ClientInitHook, Config,
    ConfigProvider, Handlers, Operation, Request, RequestInitHook,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

pub const SERVICE_NAME: &str = "ecs";
pub const API_VERSION: &str = "2014-11-13";
pub const JSON_VERSION: &str = "1.1";
pub const TARGET_PREFIX: &str = "AmazonEC2ContainerServiceV20141113";

/// Optional construction hooks.
#[derive(Clone, Default)]
pub struct EcsOptions {
    /// Runs once on the freshly built client, after protocol handlers are
    /// installed.
    pub client_init: Option<ClientInitHook>,
    /// Runs on every request the client creates, before it is returned.
    pub request_init: Option<RequestInitHook>,
}

impl EcsOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client_init<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Client) + Send + Sync + 'static,
    {
        self.client_init = Some(Arc::new(hook));
        self
    }

    pub fn with_request_init<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Request) + Send + Sync + 'static,
    {
        self.request_init = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for EcsOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EcsOptions")
            .field("client_init", &self.client_init.is_some())
            .field("request_init", &self.request_init.is_some())
            .finish()
    }
}

/// Amazon EC2 Container Service client.
///
/// Cheap to clone and safe to share across tasks: every operation takes
/// `&self` and works on its own copy of the handler chain.
#[derive(Clone)]
pub struct Ecs {
    client: Client,
    request_init: Option<RequestInitHook>,
}

impl Ecs {
    /// Create a client from `provider`, with `overrides` merged over the
    /// provider's config in order.
    ///
    /// Never fails: a missing region or endpoint surfaces as an error from
    /// the first request.
    pub fn new(provider: &impl ConfigProvider, overrides: &[Config]) -> Self {
        Self::with_options(provider, overrides, EcsOptions::default())
    }

    pub fn with_options(
        provider: &impl ConfigProvider,
        overrides: &[Config],
        options: EcsOptions,
    ) -> Self {
        let ClientConfig {
            config,
            handlers,
            endpoint,
            signing_region,
        } = provider.client_config(SERVICE_NAME, overrides);
        Self::new_client(config, handlers, endpoint, signing_region, options)
    }

    fn new_client(
        config: Config,
        handlers: Handlers,
        endpoint: String,
        signing_region: String,
        options: EcsOptions,
    ) -> Self {
        let info = ClientInfo {
            service_name: SERVICE_NAME.to_string(),
            signing_name: None,
            signing_region,
            endpoint,
            api_version: API_VERSION.to_string(),
            json_version: JSON_VERSION.to_string(),
            target_prefix: TARGET_PREFIX.to_string(),
        };
        let mut client = Client::new(config, info, handlers);

        let chain = client.handlers_mut();
        chain.sign.push_back_named(signing::sign_handler());
        chain.build.push_back_named(jsonrpc::build_handler());
        chain.unmarshal.push_back_named(jsonrpc::unmarshal_handler());
        chain
            .unmarshal_meta
            .push_back_named(jsonrpc::unmarshal_meta_handler());
        chain
            .unmarshal_error
            .push_back_named(jsonrpc::unmarshal_error_handler());

        if let Some(ref hook) = options.client_init {
            hook(&mut client);
        }

        Self {
            client,
            request_init: options.request_init,
        }
    }

    /// A request for `operation`, with the request-init hook applied.
    pub(crate) fn new_request(&self, operation: Operation, params: Value) -> Request {
        let mut req = self.client.new_request(operation, params);
        if let Some(ref hook) = self.request_init {
            hook(&mut req);
        }
        req
    }

    /// Encode `input` and create the request for `operation`.
    pub(crate) fn request_for<I>(&self, operation: Operation, input: &I) -> AwsResult<Request>
    where
        I: Serialize,
    {
        let params = serde_json::to_value(input).map_err(|e| {
            AwsError::serialization(
                SERVICE_NAME,
                &format!("failed to encode {}Input: {}", operation.name, e),
            )
            .with_action(operation.name)
        })?;
        Ok(self.new_request(operation, params))
    }

    /// Send `operation` and decode the response body.
    pub(crate) async fn invoke<I, O>(&self, operation: Operation, input: &I) -> AwsResult<O>
    where
        I: Serialize,
        O: DeserializeOwned + Default,
    {
        let mut req = self.request_for(operation, input)?;
        req.send().await?;
        decode_output(&req)
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn client_info(&self) -> &ClientInfo {
        self.client.info()
    }

    pub fn handlers(&self) -> &Handlers {
        self.client.handlers()
    }

    pub fn config(&self) -> &Config {
        self.client.config()
    }
}

impl fmt::Debug for Ecs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ecs")
            .field("client", &self.client)
            .field("request_init", &self.request_init.is_some())
            .finish()
    }
}

/// Typed output of a completed request. A missing or `null` body is the
/// output's default.
pub fn decode_output<O>(req: &Request) -> AwsResult<O>
where
    O: DeserializeOwned + Default,
{
    match req.data {
        None | Some(Value::Null) => Ok(O::default()),
        Some(ref data) => serde_json::from_value(data.clone()).map_err(|e| {
            let mut err = AwsError::serialization(
                SERVICE_NAME,
                &format!("failed to decode {}Output: {}", req.operation.name, e),
            )
            .with_action(req.operation.name);
            if let Some(ref id) = req.request_id {
                err = err.with_request_id(id.clone());
            }
            err
        }),
    }
}
