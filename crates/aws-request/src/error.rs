//! Error type shared by every stage of the request pipeline.
//!
//! Handlers never return errors directly. They leave an [`AwsError`] on the
//! request, and the chain stops at the first one. The service layer surfaces
//! it as the `Err` side of [`AwsResult`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error produced by the pipeline or returned by an AWS service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwsError {
    /// The AWS error code (e.g., "ClientException", "MissingRegion").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// HTTP status code, or 0 when the request never reached the service.
    pub status_code: u16,
    /// AWS request ID (from the `x-amzn-requestid` response header).
    pub request_id: Option<String>,
    /// Service the request was addressed to.
    pub service: String,
    /// Operation that failed.
    pub action: Option<String>,
    /// Whether the retry handlers may try again.
    pub retryable: bool,
}

impl fmt::Display for AwsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AWS {} error [{}]: {}", self.service, self.code, self.message)?;
        if self.status_code != 0 {
            write!(f, " (HTTP {})", self.status_code)?;
        }
        if let Some(ref action) = self.action {
            write!(f, " during {}", action)?;
        }
        if let Some(ref req_id) = self.request_id {
            write!(f, " [RequestId: {}]", req_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for AwsError {}

impl AwsError {
    /// Create a new error; retryability is derived from code and status.
    pub fn new(service: &str, code: &str, message: &str, status_code: u16) -> Self {
        let retryable = Self::is_retryable_code(code, status_code);
        Self {
            code: code.to_string(),
            message: message.to_string(),
            status_code,
            request_id: None,
            service: service.to_string(),
            action: None,
            retryable,
        }
    }

    fn client_side(service: &str, code: &str, message: String) -> Self {
        Self {
            code: code.to_string(),
            message,
            status_code: 0,
            request_id: None,
            service: service.to_string(),
            action: None,
            retryable: false,
        }
    }

    /// No region configured, so neither an endpoint nor a signing scope exists.
    pub fn missing_region(service: &str) -> Self {
        Self::client_side(
            service,
            "MissingRegion",
            "could not find region configuration".to_string(),
        )
    }

    /// A region is known but no endpoint could be resolved for it.
    pub fn missing_endpoint(service: &str) -> Self {
        Self::client_side(
            service,
            "MissingEndpoint",
            "'Endpoint' configuration is required for this service".to_string(),
        )
    }

    /// Parameter validation failure.
    pub fn validation(service: &str, message: &str) -> Self {
        Self::client_side(service, "InvalidParameter", message.to_string())
    }

    /// Credentials are unusable (expired or malformed).
    pub fn credential_error(service: &str, code: &str, message: &str) -> Self {
        Self::client_side(service, code, message.to_string())
    }

    /// Request or response body could not be (de)serialized.
    pub fn serialization(service: &str, message: &str) -> Self {
        Self::client_side(service, "SerializationError", message.to_string())
    }

    /// With request ID.
    pub fn with_request_id(mut self, id: String) -> Self {
        self.request_id = Some(id);
        self
    }

    /// With action.
    pub fn with_action(mut self, action: &str) -> Self {
        self.action = Some(action.to_string());
        self
    }

    /// With service, for errors raised before the service name was known.
    pub fn with_service(mut self, service: &str) -> Self {
        self.service = service.to_string();
        self
    }

    /// Determine if an error code/status is retryable per AWS SDK retry policy.
    fn is_retryable_code(code: &str, status_code: u16) -> bool {
        if status_code == 429 || (500..600).contains(&status_code) {
            return true;
        }
        matches!(
            code,
            "Throttling"
                | "ThrottlingException"
                | "ThrottledException"
                | "RequestThrottledException"
                | "TooManyRequestsException"
                | "ProvisionedThroughputExceededException"
                | "TransactionInProgressException"
                | "RequestLimitExceeded"
                | "BandwidthLimitExceeded"
                | "LimitExceededException"
                | "RequestThrottled"
                | "InternalError"
                | "InternalFailure"
                | "ServerException"
                | "ServiceUnavailable"
                | "RequestTimeout"
                | "RequestTimeoutException"
                | "RequestError"
        )
    }

    /// Parse an AWS JSON error response.
    ///
    /// AWS JSON error format:
    /// ```json
    /// {
    ///   "__type": "ClientException",
    ///   "message": "Cluster not found."
    /// }
    /// ```
    pub fn parse_json_error(service: &str, status_code: u16, body: &str) -> Self {
        if let Ok(val) = serde_json::from_str::<serde_json::Value>(body) {
            let code = val
                .get("__type")
                .or_else(|| val.get("code"))
                .or_else(|| val.get("Code"))
                .and_then(|v| v.as_str())
                // __type can be "com.amazonaws.ecs#ClientException"
                .map(|s| s.rsplit('#').next().unwrap_or(s).to_string())
                .unwrap_or_else(|| "UnknownError".to_string());
            let message = val
                .get("message")
                .or_else(|| val.get("Message"))
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown error")
                .to_string();
            Self::new(service, &code, &message, status_code)
        } else {
            let snippet: String = body.chars().take(200).collect();
            Self::new(
                service,
                "SerializationError",
                &format!("failed to decode error response: {}", snippet),
                status_code,
            )
        }
    }
}

impl From<reqwest::Error> for AwsError {
    fn from(err: reqwest::Error) -> Self {
        Self {
            code: "RequestError".to_string(),
            message: err.to_string(),
            status_code: err.status().map(|s| s.as_u16()).unwrap_or(0),
            request_id: None,
            service: "http".to_string(),
            action: None,
            retryable: err.is_timeout() || err.is_connect() || err.is_request(),
        }
    }
}

impl From<serde_json::Error> for AwsError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization("json", &err.to_string())
    }
}

/// Convenience result type for AWS operations.
pub type AwsResult<T> = Result<T, AwsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = AwsError::new("ecs", "ClientException", "Cluster not found.", 400);
        let s = err.to_string();
        assert!(s.contains("ecs"));
        assert!(s.contains("ClientException"));
        assert!(s.contains("400"));
    }

    #[test]
    fn error_display_with_request_id_and_action() {
        let err = AwsError::new("ecs", "ClientException", "nope", 400)
            .with_request_id("req-abc-123".into())
            .with_action("DeleteCluster");
        let s = err.to_string();
        assert!(s.contains("req-abc-123"));
        assert!(s.contains("DeleteCluster"));
    }

    #[test]
    fn client_side_errors_have_no_status() {
        let err = AwsError::missing_region("ecs");
        assert_eq!(err.code, "MissingRegion");
        assert_eq!(err.status_code, 0);
        assert!(!err.retryable);
        assert!(!err.to_string().contains("HTTP"));
    }

    #[test]
    fn parse_json_error_strips_namespace() {
        let json = r#"{"__type":"com.amazonaws.ecs#ClusterNotFoundException","message":"Cluster not found."}"#;
        let err = AwsError::parse_json_error("ecs", 400, json);
        assert_eq!(err.code, "ClusterNotFoundException");
        assert_eq!(err.message, "Cluster not found.");
        assert!(!err.retryable);
    }

    #[test]
    fn parse_json_error_garbage_body() {
        let err = AwsError::parse_json_error("ecs", 502, "<html>bad gateway</html>");
        assert_eq!(err.code, "SerializationError");
        assert!(err.message.contains("bad gateway"));
        assert!(err.retryable);
    }

    #[test]
    fn retryable_throttling() {
        let err = AwsError::new("ecs", "ThrottlingException", "Rate exceeded", 400);
        assert!(err.retryable);
    }

    #[test]
    fn retryable_server_exception() {
        let err = AwsError::new("ecs", "ServerException", "oops", 500);
        assert!(err.retryable);
    }

    #[test]
    fn not_retryable_client_exception() {
        let err = AwsError::new("ecs", "AccessDeniedException", "Not authorized", 400);
        assert!(!err.retryable);
    }

    #[test]
    fn serde_json_error_converts() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: AwsError = parse_err.into();
        assert_eq!(err.code, "SerializationError");
    }
}
