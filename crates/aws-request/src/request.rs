//! A single API call moving through the handler stages.
//!
//! ```text
//! build()  : validate ─▶ build                        (once)
//! sign()   : build() ─▶ sign                          (every attempt)
//! send()   : sign() ─▶ transport ─▶ unmarshal_meta ─▶ validate_response
//!              ├─ ok    ─▶ unmarshal ─▶ complete
//!              └─ error ─▶ unmarshal_error ─▶ retry ─▶ after_retry
//!                            ├─ cleared ─▶ sleep ─▶ next attempt
//!                            └─ kept    ─▶ complete ─▶ Err
//! ```

use crate::client::ClientInfo;
use crate::config::{Config, LogLevel};
use crate::error::{AwsError, AwsResult};
use crate::handlers::{HandlerList, Handlers};
use crate::transport::{ReqwestTransport, Transport};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Static description of an API operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub name: &'static str,
    pub http_method: &'static str,
    pub http_path: &'static str,
    /// Top-level input members that must be present and non-null.
    pub required: &'static [&'static str],
}

impl Operation {
    /// A `POST /` operation, which is every JSON-RPC call.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            http_method: "POST",
            http_path: "/",
            required: &[],
        }
    }

    pub const fn with_required(mut self, required: &'static [&'static str]) -> Self {
        self.required = required;
        self
    }
}

/// Outgoing HTTP message. Header names are lowercase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

/// Incoming HTTP message. Header names are lowercase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One API call, owning its own copy of config and handler chain.
#[derive(Debug, Clone)]
pub struct Request {
    pub config: Config,
    pub client_info: ClientInfo,
    pub handlers: Handlers,
    pub operation: Operation,
    /// Serialized operation input.
    pub params: Value,
    /// Unmarshalled response body.
    pub data: Option<Value>,
    pub http_request: HttpRequest,
    pub http_response: Option<HttpResponse>,
    pub error: Option<AwsError>,
    pub retry_count: u32,
    /// Set by the retry stage, consumed by the after-retry stage.
    pub retryable: bool,
    pub retry_delay: Duration,
    pub request_id: Option<String>,
    /// Stable across retries of this call.
    pub invocation_id: String,
    pub signing_time: DateTime<Utc>,
    built: bool,
}

impl Request {
    pub fn new(
        config: Config,
        client_info: ClientInfo,
        handlers: Handlers,
        operation: Operation,
        params: Value,
    ) -> Self {
        let http_request = HttpRequest {
            method: operation.http_method.to_string(),
            url: format!("{}{}", client_info.endpoint, operation.http_path),
            headers: BTreeMap::new(),
            body: String::new(),
        };
        Self {
            config,
            client_info,
            handlers,
            operation,
            params,
            data: None,
            http_request,
            http_response: None,
            error: None,
            retry_count: 0,
            retryable: false,
            retry_delay: Duration::ZERO,
            request_id: None,
            invocation_id: uuid::Uuid::new_v4().to_string(),
            signing_time: Utc::now(),
            built: false,
        }
    }

    /// Service name and operation, e.g. `ecs/ListClusters`.
    pub fn description(&self) -> String {
        format!("{}/{}", self.client_info.service_name, self.operation.name)
    }

    /// Attach service and action to a pipeline error.
    pub fn annotate(&self, error: AwsError) -> AwsError {
        let error = if error.action.is_none() {
            error.with_action(self.operation.name)
        } else {
            error
        };
        if error.service.is_empty() || error.service == "http" || error.service == "json" {
            error.with_service(&self.client_info.service_name)
        } else {
            error
        }
    }

    fn run_stage(&mut self, stage: fn(&Handlers) -> &HandlerList) {
        let list = stage(&self.handlers).clone();
        list.run(self);
    }

    fn current_error(&self) -> AwsResult<()> {
        match self.error {
            Some(ref err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Run the validate and build stages. Subsequent calls are no-ops.
    pub fn build(&mut self) -> AwsResult<()> {
        if self.built {
            return self.current_error();
        }
        self.run_stage(|h| &h.validate);
        self.current_error()?;
        self.run_stage(|h| &h.build);
        self.current_error()?;
        self.built = true;
        Ok(())
    }

    /// Build if needed, then (re)sign with a fresh signing time.
    pub fn sign(&mut self) -> AwsResult<()> {
        self.build()?;
        self.signing_time = Utc::now();
        self.run_stage(|h| &h.sign);
        self.current_error()
    }

    fn transport(&self) -> Arc<dyn Transport> {
        match self.config.transport {
            Some(ref transport) => Arc::clone(transport),
            None => Arc::new(ReqwestTransport::from_config(&self.config)),
        }
    }

    /// Drive the request to completion, retrying per the retry handlers.
    pub async fn send(&mut self) -> AwsResult<()> {
        let transport = self.transport();
        loop {
            if let Err(err) = self.sign() {
                return Err(self.annotate(err));
            }
            self.log_attempt();

            self.http_response = None;
            match transport.send(&self.http_request).await {
                Ok(response) => {
                    self.log_response(&response);
                    self.http_response = Some(response);
                    self.run_stage(|h| &h.unmarshal_meta);
                    self.run_stage(|h| &h.validate_response);
                    if self.error.is_some() {
                        self.run_stage(|h| &h.unmarshal_error);
                    }
                }
                Err(err) => {
                    self.error = Some(self.annotate(err));
                }
            }

            if self.error.is_none() {
                self.run_stage(|h| &h.unmarshal);
                self.run_stage(|h| &h.complete);
                return self.current_error().map_err(|e| self.annotate(e));
            }

            self.run_stage(|h| &h.retry);
            self.run_stage(|h| &h.after_retry);

            if let Some(err) = self.error.clone() {
                self.run_stage(|h| &h.complete);
                return Err(self.annotate(err));
            }
            tokio::time::sleep(self.retry_delay).await;
        }
    }

    fn log_attempt(&self) {
        let level = self.config.log_level();
        if level >= LogLevel::Debug {
            log::debug!(
                "{} attempt {} -> {} {} headers={:?}",
                self.description(),
                self.retry_count + 1,
                self.http_request.method,
                self.http_request.url,
                redacted_headers(&self.http_request.headers)
            );
        }
        if level >= LogLevel::DebugWithHttpBody {
            log::trace!("{} request body: {}", self.description(), self.http_request.body);
        }
    }

    fn log_response(&self, response: &HttpResponse) {
        let level = self.config.log_level();
        if level >= LogLevel::Debug {
            log::debug!("{} <- HTTP {}", self.description(), response.status);
        }
        if level >= LogLevel::DebugWithHttpBody {
            log::trace!("{} response body: {}", self.description(), response.body);
        }
    }
}

/// Copy of `headers` safe to log.
pub fn redacted_headers(headers: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(k, v)| {
            let value = match k.as_str() {
                "authorization" | "x-amz-security-token" => "** redacted **".to_string(),
                _ => v.clone(),
            };
            (k.clone(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::NamedHandler;
    use crate::transport::tests::StaticTransport;

    fn info() -> ClientInfo {
        ClientInfo {
            service_name: "svc".to_string(),
            endpoint: "https://svc.us-east-1.amazonaws.com".to_string(),
            signing_region: "us-east-1".to_string(),
            ..ClientInfo::default()
        }
    }

    fn request_with(handlers: Handlers, transport: Arc<StaticTransport>) -> Request {
        let config = Config::new()
            .with_transport(transport)
            .with_retry(crate::config::RetryConfig {
                initial_backoff_ms: 0,
                max_backoff_ms: 0,
                ..Default::default()
            });
        Request::new(config, info(), handlers, Operation::new("Ping"), Value::Null)
    }

    #[test]
    fn new_request_targets_endpoint_and_path() {
        let req = Request::new(
            Config::new(),
            info(),
            Handlers::new(),
            Operation::new("Ping"),
            Value::Null,
        );
        assert_eq!(req.http_request.method, "POST");
        assert_eq!(req.http_request.url, "https://svc.us-east-1.amazonaws.com/");
        assert_eq!(req.description(), "svc/Ping");
        assert!(!req.invocation_id.is_empty());
    }

    #[test]
    fn build_runs_once() {
        let mut handlers = Handlers::new();
        handlers.build.push_back(|req: &mut Request| req.http_request.body.push('x'));
        let mut req = request_with(handlers, Arc::new(StaticTransport::new(vec![])));

        req.build().unwrap();
        req.build().unwrap();
        req.sign().unwrap();
        assert_eq!(req.http_request.body, "x");
    }

    #[test]
    fn validate_error_skips_build() {
        let mut handlers = Handlers::new();
        handlers.validate.push_back_named(NamedHandler::new("v", |req: &mut Request| {
            req.error = Some(AwsError::validation("svc", "bad input"));
        }));
        handlers.build.push_back(|req: &mut Request| req.http_request.body.push('x'));
        let mut req = request_with(handlers, Arc::new(StaticTransport::new(vec![])));

        let err = req.build().unwrap_err();
        assert_eq!(err.code, "InvalidParameter");
        assert!(req.http_request.body.is_empty());
        assert!(req.build().is_err());
    }

    #[tokio::test]
    async fn send_success_runs_unmarshal_and_complete() {
        let transport = Arc::new(StaticTransport::new(vec![Ok(HttpResponse {
            status: 200,
            headers: BTreeMap::new(),
            body: "{\"ok\":true}".to_string(),
        })]));
        let mut handlers = Handlers::new();
        handlers.unmarshal.push_back(|req: &mut Request| {
            let body = req.http_response.as_ref().map(|r| r.body.clone()).unwrap_or_default();
            req.data = serde_json::from_str(&body).ok();
        });
        handlers.complete.push_back(|req: &mut Request| req.request_id = Some("done".into()));

        let mut req = request_with(handlers, transport.clone());
        req.send().await.unwrap();
        assert_eq!(req.data, Some(serde_json::json!({"ok": true})));
        assert_eq!(req.request_id.as_deref(), Some("done"));
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn transport_error_is_annotated() {
        let transport = Arc::new(StaticTransport::new(vec![Err(AwsError::new(
            "http",
            "RequestError",
            "connection refused",
            0,
        ))]));
        let mut req = request_with(Handlers::new(), transport);
        let err = req.send().await.unwrap_err();
        assert_eq!(err.service, "svc");
        assert_eq!(err.action.as_deref(), Some("Ping"));
    }

    #[tokio::test]
    async fn cleared_error_triggers_another_attempt() {
        let transport = Arc::new(StaticTransport::new(vec![
            Ok(HttpResponse { status: 500, ..Default::default() }),
            Ok(HttpResponse { status: 200, ..Default::default() }),
        ]));
        let mut handlers = Handlers::new();
        handlers.validate_response.push_back(|req: &mut Request| {
            let status = req.http_response.as_ref().map(|r| r.status).unwrap_or(0);
            if status >= 300 {
                req.error = Some(AwsError::new("svc", "ServerException", "down", status));
            }
        });
        handlers.after_retry.push_back(|req: &mut Request| {
            req.retry_count += 1;
            req.error = None;
        });

        let mut req = request_with(handlers, transport.clone());
        req.send().await.unwrap();
        assert_eq!(req.retry_count, 1);
        assert_eq!(transport.sent().len(), 2);
    }

    #[test]
    fn redaction_hides_secrets() {
        let mut headers = BTreeMap::new();
        headers.insert("authorization".to_string(), "AWS4-HMAC-SHA256 ...".to_string());
        headers.insert("x-amz-security-token".to_string(), "tok".to_string());
        headers.insert("host".to_string(), "example.com".to_string());
        let redacted = redacted_headers(&headers);
        assert_eq!(redacted["authorization"], "** redacted **");
        assert_eq!(redacted["x-amz-security-token"], "** redacted **");
        assert_eq!(redacted["host"], "example.com");
    }
}
