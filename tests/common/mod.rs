//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use aws_request::{AwsResult, HttpRequest, HttpResponse, Transport};
use ecs_client::{Config, Credentials, Ecs, EcsOptions, RetryConfig, RetryMode, Session};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Replays scripted responses in order and records every request sent.
/// Once the script runs out it answers `200 {}`.
#[derive(Debug, Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<AwsResult<HttpResponse>>>,
    sent: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, response: AwsResult<HttpResponse>) {
        self.script.lock().unwrap().push_back(response);
    }

    pub fn push_json(&self, status: u16, body: serde_json::Value) {
        let mut headers = BTreeMap::new();
        headers.insert("x-amzn-requestid".to_string(), format!("req-{}", status));
        self.push(Ok(HttpResponse {
            status,
            headers,
            body: body.to_string(),
        }));
    }

    pub fn sent(&self) -> Vec<HttpRequest> {
        self.sent.lock().unwrap().clone()
    }

    /// Decoded JSON bodies of everything sent so far.
    pub fn sent_bodies(&self) -> Vec<serde_json::Value> {
        self.sent()
            .iter()
            .map(|r| serde_json::from_str(&r.body).unwrap())
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &HttpRequest) -> AwsResult<HttpResponse> {
        self.sent.lock().unwrap().push(request.clone());
        self.script.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(HttpResponse {
                status: 200,
                headers: BTreeMap::new(),
                body: "{}".to_string(),
            })
        })
    }
}

/// Retries with no delay between attempts.
pub fn instant_retries(max_retries: u32) -> RetryConfig {
    RetryConfig {
        max_retries,
        mode: RetryMode::Legacy,
        initial_backoff_ms: 0,
        max_backoff_ms: 0,
    }
}

/// A signed-in session in us-west-2 whose HTTP goes to `transport`.
pub fn session(transport: &Arc<MockTransport>) -> Session {
    Session::new(
        Config::new()
            .with_region("us-west-2")
            .with_credentials(Credentials::new("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY"))
            .with_retry(instant_retries(2))
            .with_transport(transport.clone()),
    )
}

pub fn ecs(transport: &Arc<MockTransport>) -> Ecs {
    Ecs::new(&session(transport), &[])
}

pub fn ecs_with(transport: &Arc<MockTransport>, options: EcsOptions) -> Ecs {
    Ecs::with_options(&session(transport), &[], options)
}
