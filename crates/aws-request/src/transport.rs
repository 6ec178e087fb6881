//! HTTP transport used by the send step.
//!
//! Sending is the only asynchronous step in the pipeline, so it sits behind
//! a trait instead of a handler list. `Config::with_transport` swaps it out.

use crate::config::Config;
use crate::error::{AwsError, AwsResult};
use crate::request::{HttpRequest, HttpResponse};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::BTreeMap;
use std::fmt::Debug;

#[async_trait]
pub trait Transport: Send + Sync + Debug {
    async fn send(&self, request: &HttpRequest) -> AwsResult<HttpResponse>;
}

/// Pooled reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    pub fn from_config(config: &Config) -> Self {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .pool_max_idle_per_host(10)
            .build()
            .unwrap_or_else(|err| {
                log::warn!("falling back to default HTTP client: {}", err);
                Client::new()
            });
        Self { http }
    }

    pub fn with_client(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> AwsResult<HttpResponse> {
        let method: reqwest::Method = request.method.parse().map_err(|_| {
            AwsError::validation("http", &format!("invalid HTTP method: {}", request.method))
        })?;

        let mut req = self.http.request(method, &request.url);
        for (key, value) in &request.headers {
            // reqwest derives it from the URL
            if key == "host" {
                continue;
            }
            req = req.header(key.as_str(), value.as_str());
        }
        if !request.body.is_empty() {
            req = req.body(request.body.clone());
        }

        let resp = req.send().await.map_err(AwsError::from)?;

        let status = resp.status().as_u16();
        let mut headers = BTreeMap::new();
        for (key, value) in resp.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(key.as_str().to_lowercase(), v.to_string());
            }
        }
        let body = resp.text().await.map_err(AwsError::from)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned responses and records what was sent.
    #[derive(Debug)]
    pub(crate) struct StaticTransport {
        responses: Mutex<VecDeque<AwsResult<HttpResponse>>>,
        sent: Mutex<Vec<HttpRequest>>,
    }

    impl StaticTransport {
        pub(crate) fn new(responses: Vec<AwsResult<HttpResponse>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                sent: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn sent(&self) -> Vec<HttpRequest> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for StaticTransport {
        async fn send(&self, request: &HttpRequest) -> AwsResult<HttpResponse> {
            self.sent.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(HttpResponse { status: 200, ..Default::default() }))
        }
    }

    #[tokio::test]
    async fn reqwest_transport_rejects_bad_method() {
        let transport = ReqwestTransport::from_config(&Config::new());
        let request = HttpRequest {
            method: "NOT A METHOD".to_string(),
            url: "http://127.0.0.1:9/".to_string(),
            ..Default::default()
        };
        let err = transport.send(&request).await.unwrap_err();
        assert_eq!(err.code, "InvalidParameter");
    }

    #[tokio::test]
    async fn caller_supplied_client_is_used() {
        let http = Client::builder()
            .user_agent("ecs-agent-test")
            .build()
            .unwrap();
        let transport = ReqwestTransport::with_client(http);
        let request = HttpRequest {
            method: "BAD METHOD".to_string(),
            url: "http://127.0.0.1:9/".to_string(),
            ..Default::default()
        };
        let err = transport.send(&request).await.unwrap_err();
        assert_eq!(err.code, "InvalidParameter");
        assert!(format!("{:?}", transport).contains("ReqwestTransport"));
    }

    #[tokio::test]
    async fn static_transport_replays_in_order() {
        let transport = StaticTransport::new(vec![
            Ok(HttpResponse { status: 500, ..Default::default() }),
            Ok(HttpResponse { status: 201, ..Default::default() }),
        ]);
        let req = HttpRequest::default();
        assert_eq!(transport.send(&req).await.unwrap().status, 500);
        assert_eq!(transport.send(&req).await.unwrap().status, 201);
        assert_eq!(transport.send(&req).await.unwrap().status, 200);
        assert_eq!(transport.sent().len(), 3);
    }
}
