//! Default handlers installed by [`crate::Session`].

use crate::error::AwsError;
use crate::handlers::{Handlers, NamedHandler};
use crate::request::Request;
use serde_json::Value;

pub const VALIDATE_ENDPOINT: &str = "core.ValidateEndpoint";
pub const VALIDATE_PARAMETERS: &str = "core.ValidateParameters";
pub const USER_AGENT: &str = "core.UserAgent";
pub const INVOCATION_ID: &str = "core.InvocationId";
pub const REQUEST_ATTEMPT: &str = "core.RequestAttempt";
pub const VALIDATE_RESPONSE: &str = "core.ValidateResponse";
pub const RETRY_DECISION: &str = "core.RetryDecision";
pub const AFTER_RETRY: &str = "core.AfterRetry";

pub const SDK_NAME: &str = "aws-request";
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The chain every session hands to new clients.
pub fn default_handlers() -> Handlers {
    let mut handlers = Handlers::new();
    handlers.validate.push_back_named(validate_endpoint());
    handlers.validate.push_back_named(validate_parameters());
    handlers.build.push_back_named(user_agent());
    handlers.build.push_back_named(invocation_id());
    handlers.sign.push_back_named(request_attempt());
    handlers.validate_response.push_back_named(validate_response());
    handlers.retry.push_back_named(retry_decision());
    handlers.after_retry.push_back_named(after_retry());
    handlers
}

pub fn validate_endpoint() -> NamedHandler {
    NamedHandler::new(VALIDATE_ENDPOINT, |req: &mut Request| {
        let service = req.client_info.service_name.clone();
        if req.client_info.signing_region.is_empty() && req.config.region.is_none() {
            req.error = Some(AwsError::missing_region(&service));
        } else if req.client_info.endpoint.is_empty() {
            req.error = Some(AwsError::missing_endpoint(&service));
        }
    })
}

/// Checks the operation's required members.
pub fn validate_parameters() -> NamedHandler {
    NamedHandler::new(VALIDATE_PARAMETERS, |req: &mut Request| {
        let service = req.client_info.service_name.clone();
        let input = format!("{}Input", req.operation.name);
        let missing: Vec<&'static str> = match req.params {
            Value::Object(ref map) => req
                .operation
                .required
                .iter()
                .copied()
                .filter(|field| map.get(*field).map(Value::is_null).unwrap_or(true))
                .collect(),
            Value::Null => req.operation.required.to_vec(),
            _ => {
                req.error = Some(AwsError::validation(
                    &service,
                    &format!("{} must be a JSON object", input),
                ));
                return;
            }
        };
        if !missing.is_empty() {
            let fields = missing
                .iter()
                .map(|f| format!("{}.{}", input, f))
                .collect::<Vec<_>>()
                .join(", ");
            req.error = Some(AwsError::validation(
                &service,
                &format!("missing required field(s): {}", fields),
            ));
        }
    })
}

pub fn user_agent() -> NamedHandler {
    NamedHandler::new(USER_AGENT, |req: &mut Request| {
        let mut agent = format!("{}/{} (rust)", SDK_NAME, SDK_VERSION);
        if let Some(ref suffix) = req.config.user_agent_suffix {
            agent.push(' ');
            agent.push_str(suffix);
        }
        req.http_request.headers.insert("user-agent".to_string(), agent);
    })
}

pub fn invocation_id() -> NamedHandler {
    NamedHandler::new(INVOCATION_ID, |req: &mut Request| {
        let id = req.invocation_id.clone();
        req.http_request
            .headers
            .insert("amz-sdk-invocation-id".to_string(), id);
    })
}

/// Runs before signing on every attempt so the header is covered by the
/// signature.
pub fn request_attempt() -> NamedHandler {
    NamedHandler::new(REQUEST_ATTEMPT, |req: &mut Request| {
        let max = req.config.retry_config().max_retries + 1;
        let value = format!("attempt={}; max={}", req.retry_count + 1, max);
        req.http_request
            .headers
            .insert("amz-sdk-request".to_string(), value);
    })
}

/// Any non-2xx status becomes a provisional error for the unmarshal-error
/// stage to refine.
pub fn validate_response() -> NamedHandler {
    NamedHandler::new(VALIDATE_RESPONSE, |req: &mut Request| {
        let status = match req.http_response {
            Some(ref resp) if !resp.is_success() => resp.status,
            _ => return,
        };
        let service = req.client_info.service_name.clone();
        req.error = Some(
            AwsError::new(
                &service,
                "UnknownError",
                &format!("unknown error, HTTP {}", status),
                status,
            )
            .with_action(req.operation.name),
        );
    })
}

pub fn retry_decision() -> NamedHandler {
    NamedHandler::new(RETRY_DECISION, |req: &mut Request| {
        req.retryable = req.error.as_ref().map(|e| e.retryable).unwrap_or(false);
    })
}

/// Clears a retryable error while retries remain and schedules the backoff.
pub fn after_retry() -> NamedHandler {
    NamedHandler::new(AFTER_RETRY, |req: &mut Request| {
        let retry = req.config.retry_config();
        if !req.retryable || req.retry_count >= retry.max_retries {
            return;
        }
        req.retry_delay = retry.backoff(req.retry_count);
        req.retry_count += 1;
        if let Some(err) = req.error.take() {
            log::warn!(
                "{} retryable error (retry {}/{}): {} - retrying in {}ms",
                req.description(),
                req.retry_count,
                retry.max_retries,
                err.code,
                req.retry_delay.as_millis()
            );
        }
        req.retryable = false;
        req.http_response = None;
    })
}
