//! AWS JSON-RPC protocol (`application/x-amz-json-1.x` + `x-amz-target`).
//!
//! Every call is a `POST` whose body is the JSON-encoded input and whose
//! target header names `{TargetPrefix}.{Operation}`. Errors come back as
//! `{"__type": "...", "message": "..."}` with a non-2xx status.

use crate::error::AwsError;
use crate::handlers::NamedHandler;
use crate::request::Request;
use serde_json::Value;

pub const BUILD: &str = "jsonrpc.Build";
pub const UNMARSHAL: &str = "jsonrpc.Unmarshal";
pub const UNMARSHAL_META: &str = "jsonrpc.UnmarshalMeta";
pub const UNMARSHAL_ERROR: &str = "jsonrpc.UnmarshalError";

/// Fallback when the client metadata carries no JSON version.
const DEFAULT_JSON_VERSION: &str = "1.1";

pub fn build_handler() -> NamedHandler {
    NamedHandler::new(BUILD, build)
}

pub fn unmarshal_handler() -> NamedHandler {
    NamedHandler::new(UNMARSHAL, unmarshal)
}

pub fn unmarshal_meta_handler() -> NamedHandler {
    NamedHandler::new(UNMARSHAL_META, unmarshal_meta)
}

pub fn unmarshal_error_handler() -> NamedHandler {
    NamedHandler::new(UNMARSHAL_ERROR, unmarshal_error)
}

/// Serialize params into the body and set the protocol headers.
pub fn build(req: &mut Request) {
    let body = match req.params {
        Value::Null => "{}".to_string(),
        ref params => match serde_json::to_string(params) {
            Ok(body) => body,
            Err(err) => {
                req.error = Some(AwsError::serialization(
                    &req.client_info.service_name,
                    &format!("failed to encode {} input: {}", req.operation.name, err),
                ));
                return;
            }
        },
    };

    req.http_request.method = req.operation.http_method.to_string();
    req.http_request.url = format!("{}{}", req.client_info.endpoint, req.operation.http_path);
    req.http_request.body = body;

    let json_version = if req.client_info.json_version.is_empty() {
        DEFAULT_JSON_VERSION
    } else {
        req.client_info.json_version.as_str()
    };
    let content_type = format!("application/x-amz-json-{}", json_version);

    let headers = &mut req.http_request.headers;
    headers.insert("content-type".to_string(), content_type);
    if let Some(host) = host_header(&req.http_request.url) {
        headers.insert("host".to_string(), host);
    }
    if !req.client_info.target_prefix.is_empty() {
        headers.insert(
            "x-amz-target".to_string(),
            format!("{}.{}", req.client_info.target_prefix, req.operation.name),
        );
    }
}

/// Decode the body into `Request::data`; an empty body decodes as `null`.
pub fn unmarshal(req: &mut Request) {
    let body = match req.http_response {
        Some(ref resp) => resp.body.trim(),
        None => "",
    };
    if body.is_empty() {
        req.data = Some(Value::Null);
        return;
    }
    match serde_json::from_str::<Value>(body) {
        Ok(value) => req.data = Some(value),
        Err(err) => {
            let status = req.http_response.as_ref().map(|r| r.status).unwrap_or(0);
            let mut error = AwsError::serialization(
                &req.client_info.service_name,
                &format!("failed to decode {} output: {}", req.operation.name, err),
            );
            error.status_code = status;
            req.error = Some(error);
        }
    }
}

pub fn unmarshal_meta(req: &mut Request) {
    let request_id = req.http_response.as_ref().and_then(|resp| {
        resp.headers
            .get("x-amzn-requestid")
            .or_else(|| resp.headers.get("x-amz-request-id"))
            .cloned()
    });
    if request_id.is_some() {
        req.request_id = request_id;
    }
}

/// Replace the provisional error with the service's `__type` / `message`.
pub fn unmarshal_error(req: &mut Request) {
    let (status, body) = match req.http_response {
        Some(ref resp) => (resp.status, resp.body.clone()),
        None => return,
    };
    let mut error = if body.trim().is_empty() {
        AwsError::new(
            &req.client_info.service_name,
            "UnknownError",
            &format!("empty error response, HTTP {}", status),
            status,
        )
    } else {
        AwsError::parse_json_error(&req.client_info.service_name, status, &body)
    };
    error = error.with_action(req.operation.name);
    if let Some(ref id) = req.request_id {
        error = error.with_request_id(id.clone());
    }
    req.error = Some(error);
}

/// `host[:port]`, with the port only when it is not the scheme default.
fn host_header(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(match parsed.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientInfo;
    use crate::config::Config;
    use crate::handlers::Handlers;
    use crate::request::{HttpResponse, Operation};
    use std::collections::BTreeMap;

    fn info() -> ClientInfo {
        ClientInfo {
            service_name: "ecs".to_string(),
            endpoint: "https://ecs.us-west-2.amazonaws.com".to_string(),
            signing_region: "us-west-2".to_string(),
            api_version: "2014-11-13".to_string(),
            json_version: "1.1".to_string(),
            target_prefix: "AmazonEC2ContainerServiceV20141113".to_string(),
            ..ClientInfo::default()
        }
    }

    fn request(params: Value) -> Request {
        Request::new(
            Config::new(),
            info(),
            Handlers::new(),
            Operation::new("ListClusters"),
            params,
        )
    }

    fn respond(req: &mut Request, status: u16, body: &str, request_id: Option<&str>) {
        let mut headers = BTreeMap::new();
        if let Some(id) = request_id {
            headers.insert("x-amzn-requestid".to_string(), id.to_string());
        }
        req.http_response = Some(HttpResponse {
            status,
            headers,
            body: body.to_string(),
        });
    }

    #[test]
    fn build_sets_target_and_body() {
        let mut req = request(serde_json::json!({"maxResults": 10}));
        build(&mut req);

        let http = &req.http_request;
        assert_eq!(http.method, "POST");
        assert_eq!(http.url, "https://ecs.us-west-2.amazonaws.com/");
        assert_eq!(http.body, r#"{"maxResults":10}"#);
        assert_eq!(http.headers["content-type"], "application/x-amz-json-1.1");
        assert_eq!(
            http.headers["x-amz-target"],
            "AmazonEC2ContainerServiceV20141113.ListClusters"
        );
        assert_eq!(http.headers["host"], "ecs.us-west-2.amazonaws.com");
    }

    #[test]
    fn build_null_params_is_empty_object() {
        let mut req = request(Value::Null);
        build(&mut req);
        assert_eq!(req.http_request.body, "{}");
    }

    #[test]
    fn build_without_prefix_omits_target() {
        let mut req = request(Value::Null);
        req.client_info.target_prefix.clear();
        req.client_info.json_version.clear();
        build(&mut req);
        assert!(!req.http_request.headers.contains_key("x-amz-target"));
        assert_eq!(
            req.http_request.headers["content-type"],
            "application/x-amz-json-1.1"
        );
    }

    #[test]
    fn host_header_keeps_non_default_port() {
        assert_eq!(host_header("http://localhost:4566/").as_deref(), Some("localhost:4566"));
        assert_eq!(host_header("https://ecs.amazonaws.com:443/").as_deref(), Some("ecs.amazonaws.com"));
        assert_eq!(host_header("not a url"), None);
    }

    #[test]
    fn unmarshal_json_body() {
        let mut req = request(Value::Null);
        respond(&mut req, 200, r#"{"clusterArns":["arn:a"]}"#, None);
        unmarshal(&mut req);
        assert_eq!(req.data.unwrap()["clusterArns"][0], "arn:a");
    }

    #[test]
    fn unmarshal_empty_body_is_null() {
        let mut req = request(Value::Null);
        respond(&mut req, 200, "  ", None);
        unmarshal(&mut req);
        assert_eq!(req.data, Some(Value::Null));
        assert!(req.error.is_none());
    }

    #[test]
    fn unmarshal_invalid_json_is_serialization_error() {
        let mut req = request(Value::Null);
        respond(&mut req, 200, "{not json", None);
        unmarshal(&mut req);
        let err = req.error.unwrap();
        assert_eq!(err.code, "SerializationError");
        assert_eq!(err.status_code, 200);
    }

    #[test]
    fn unmarshal_meta_reads_request_id() {
        let mut req = request(Value::Null);
        respond(&mut req, 200, "{}", Some("abc-123"));
        unmarshal_meta(&mut req);
        assert_eq!(req.request_id.as_deref(), Some("abc-123"));
    }

    #[test]
    fn unmarshal_error_decodes_type_and_message() {
        let mut req = request(Value::Null);
        respond(
            &mut req,
            400,
            r#"{"__type":"ClientException","message":"Cluster not found."}"#,
            Some("rid-1"),
        );
        unmarshal_meta(&mut req);
        unmarshal_error(&mut req);

        let err = req.error.unwrap();
        assert_eq!(err.code, "ClientException");
        assert_eq!(err.message, "Cluster not found.");
        assert_eq!(err.status_code, 400);
        assert_eq!(err.request_id.as_deref(), Some("rid-1"));
        assert_eq!(err.action.as_deref(), Some("ListClusters"));
    }

    #[test]
    fn unmarshal_error_with_empty_body() {
        let mut req = request(Value::Null);
        respond(&mut req, 503, "", None);
        unmarshal_error(&mut req);
        let err = req.error.unwrap();
        assert_eq!(err.code, "UnknownError");
        assert!(err.retryable);
    }
}
