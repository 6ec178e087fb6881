//! AWS Signature Version 4.
//!
//! Implements the SigV4 algorithm as documented at:
//! <https://docs.aws.amazon.com/general/latest/gr/sigv4_signing.html>
//!
//! 1. Create a canonical request
//! 2. Create the string to sign
//! 3. Calculate the signing key
//! 4. Add the signature to the request
//!
//! [`sign_handler`] wraps the signer as the `sigv4.Sign` stage handler.

use crate::config::LogLevel;
use crate::error::AwsError;
use crate::handlers::NamedHandler;
use crate::request::Request;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Name of the stage handler returned by [`sign_handler`].
pub const SIGN_HANDLER: &str = "sigv4.Sign";

/// Hash of an empty payload.
pub const EMPTY_PAYLOAD_HASH: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

#[derive(Debug, Clone)]
pub struct SigV4Signer {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    pub region: String,
    pub service: String,
}

/// Intermediate products of a signature, kept for debug logging.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub canonical_request: String,
    pub string_to_sign: String,
    pub authorization: String,
}

impl SigV4Signer {
    pub fn new(
        access_key_id: &str,
        secret_access_key: &str,
        session_token: Option<&str>,
        region: &str,
        service: &str,
    ) -> Self {
        Self {
            access_key_id: access_key_id.to_string(),
            secret_access_key: secret_access_key.to_string(),
            session_token: session_token.map(|s| s.to_string()),
            region: region.to_string(),
            service: service.to_string(),
        }
    }

    /// Add `x-amz-date`, `x-amz-content-sha256`, the optional security
    /// token, and `authorization` to `headers`. Every header present when
    /// this is called is signed, except a stale `authorization`.
    pub fn sign(
        &self,
        method: &str,
        url: &str,
        headers: &mut BTreeMap<String, String>,
        body: &str,
        timestamp: DateTime<Utc>,
    ) -> Signature {
        let date_stamp = timestamp.format("%Y%m%d").to_string();
        let amz_date = timestamp.format("%Y%m%dT%H%M%SZ").to_string();

        headers.remove("authorization");
        headers.insert("x-amz-date".to_string(), amz_date.clone());
        if let Some(ref token) = self.session_token {
            headers.insert("x-amz-security-token".to_string(), token.clone());
        }
        let payload_hash = sha256_hex(body);
        headers.insert("x-amz-content-sha256".to_string(), payload_hash.clone());

        let (canonical_uri, canonical_querystring) = parse_url_components(url);

        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            method,
            canonical_uri,
            canonical_querystring,
            canonical_headers(headers),
            signed_header_names(headers),
            payload_hash
        );

        let credential_scope = format!(
            "{}/{}/{}/aws4_request",
            date_stamp, self.region, self.service
        );
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            amz_date,
            credential_scope,
            sha256_hex(&canonical_request)
        );

        let signing_key = self.derive_signing_key(&date_stamp);
        let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()));

        let authorization = format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM,
            self.access_key_id,
            credential_scope,
            signed_header_names(headers),
            signature
        );
        headers.insert("authorization".to_string(), authorization.clone());

        Signature {
            canonical_request,
            string_to_sign,
            authorization,
        }
    }

    /// kSecret  = "AWS4" + SecretAccessKey
    /// kDate    = HMAC-SHA256(kSecret, Date)
    /// kRegion  = HMAC-SHA256(kDate, Region)
    /// kService = HMAC-SHA256(kRegion, Service)
    /// kSigning = HMAC-SHA256(kService, "aws4_request")
    fn derive_signing_key(&self, date_stamp: &str) -> Vec<u8> {
        let k_secret = format!("AWS4{}", self.secret_access_key);
        let k_date = hmac_sha256(k_secret.as_bytes(), date_stamp.as_bytes());
        let k_region = hmac_sha256(&k_date, self.region.as_bytes());
        let k_service = hmac_sha256(&k_region, self.service.as_bytes());
        hmac_sha256(&k_service, b"aws4_request")
    }
}

/// The `sigv4.Sign` handler.
///
/// Requests without credentials go out unsigned. Expired credentials fail
/// the request with `ExpiredToken`.
pub fn sign_handler() -> NamedHandler {
    NamedHandler::new(SIGN_HANDLER, |req: &mut Request| {
        let credentials = match req.config.credentials {
            Some(ref c) => c.clone(),
            None => {
                log::debug!("{}: no credentials, sending anonymously", req.description());
                return;
            }
        };
        if credentials.is_expired_at(req.signing_time) {
            req.error = Some(AwsError::credential_error(
                &req.client_info.service_name,
                "ExpiredToken",
                "credentials have expired",
            ));
            return;
        }

        let signer = SigV4Signer::new(
            &credentials.access_key_id,
            &credentials.secret_access_key,
            credentials.session_token.as_deref(),
            &req.client_info.signing_region,
            req.client_info.signing_name(),
        );
        let signature = signer.sign(
            &req.http_request.method,
            &req.http_request.url,
            &mut req.http_request.headers,
            &req.http_request.body,
            req.signing_time,
        );

        if req.config.log_level() >= LogLevel::DebugWithSigning {
            log::trace!(
                "{} canonical request:\n{}\nstring to sign:\n{}",
                req.description(),
                signature.canonical_request,
                signature.string_to_sign
            );
        }
    })
}

// ── Helper functions ────────────────────────────────────────────────────

pub fn sha256_hex(data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    hex::encode(hasher.finalize())
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length, so new_from_slice cannot fail here.
    let mut mac = match HmacSha256::new_from_slice(key) {
        Ok(mac) => mac,
        Err(_) => return Vec::new(),
    };
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Lowercased, value-trimmed `name:value\n` lines in name order.
fn canonical_headers(headers: &BTreeMap<String, String>) -> String {
    let mut sorted: Vec<(String, String)> = headers
        .iter()
        .map(|(k, v)| (k.to_lowercase(), v.trim().to_string()))
        .collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    sorted
        .iter()
        .map(|(k, v)| format!("{}:{}\n", k, v))
        .collect::<String>()
}

fn signed_header_names(headers: &BTreeMap<String, String>) -> String {
    let mut names: Vec<String> = headers.keys().map(|k| k.to_lowercase()).collect();
    names.sort();
    names.join(";")
}

/// Parse a URL into (canonical_uri, canonical_querystring).
fn parse_url_components(url: &str) -> (String, String) {
    if let Ok(parsed) = url::Url::parse(url) {
        let path = if parsed.path().is_empty() {
            "/".to_string()
        } else {
            uri_encode_path(parsed.path())
        };

        let mut query_params: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        query_params.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

        let query_string = query_params
            .iter()
            .map(|(k, v)| format!("{}={}", uri_encode(k), uri_encode(v)))
            .collect::<Vec<String>>()
            .join("&");

        (path, query_string)
    } else {
        ("/".to_string(), String::new())
    }
}

/// URI-encode a string per SigV4 (RFC 3986 unreserved characters pass through).
pub fn uri_encode(input: &str) -> String {
    use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
    const AWS_ENCODE_SET: &AsciiSet = &CONTROLS
        .add(b' ')
        .add(b'!')
        .add(b'"')
        .add(b'#')
        .add(b'$')
        .add(b'%')
        .add(b'&')
        .add(b'\'')
        .add(b'(')
        .add(b')')
        .add(b'*')
        .add(b'+')
        .add(b',')
        .add(b'/')
        .add(b':')
        .add(b';')
        .add(b'<')
        .add(b'=')
        .add(b'>')
        .add(b'?')
        .add(b'@')
        .add(b'[')
        .add(b'\\')
        .add(b']')
        .add(b'^')
        .add(b'`')
        .add(b'{')
        .add(b'|')
        .add(b'}');

    utf8_percent_encode(input, AWS_ENCODE_SET).to_string()
}

/// URI-encode a URL path, preserving forward slashes.
fn uri_encode_path(path: &str) -> String {
    path.split('/')
        .map(uri_encode)
        .collect::<Vec<String>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientInfo;
    use crate::config::{Config, Credentials};
    use crate::handlers::Handlers;
    use crate::request::Operation;

    fn test_signer() -> SigV4Signer {
        SigV4Signer::new(
            "AKIDEXAMPLE",
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            None,
            "us-east-1",
            "service",
        )
    }

    fn fixed_time() -> DateTime<Utc> {
        chrono::NaiveDate::from_ymd_opt(2015, 8, 30)
            .unwrap()
            .and_hms_opt(12, 36, 0)
            .unwrap()
            .and_utc()
    }

    #[test]
    fn sha256_empty_string() {
        assert_eq!(sha256_hex(""), EMPTY_PAYLOAD_HASH);
    }

    #[test]
    fn signing_key_matches_aws_documentation() {
        // Example key derivation from the SigV4 documentation.
        let signer = SigV4Signer::new(
            "AKIDEXAMPLE",
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            None,
            "us-east-1",
            "iam",
        );
        assert_eq!(
            hex::encode(signer.derive_signing_key("20150830")),
            "c4afb1cc5771d871763a393e44b703571b55cc28424d1a5e86da6ed3c154a4b9"
        );
    }

    #[test]
    fn uri_encode_reserved_and_unreserved() {
        assert_eq!(uri_encode("hello world"), "hello%20world");
        assert_eq!(uri_encode("key=value"), "key%3Dvalue");
        assert_eq!(uri_encode("a/b"), "a%2Fb");
        assert_eq!(uri_encode("abcABC123-_.~"), "abcABC123-_.~");
    }

    #[test]
    fn path_keeps_slashes() {
        let (path, query) = parse_url_components("https://example.com/path/to/resource");
        assert_eq!(path, "/path/to/resource");
        assert_eq!(query, "");
    }

    #[test]
    fn query_is_sorted() {
        let (_, query) = parse_url_components("https://example.com/?Z=1&A=2&M=3");
        assert_eq!(query, "A=2&M=3&Z=1");
    }

    #[test]
    fn sign_adds_required_headers() {
        let signer = test_signer();
        let mut headers = BTreeMap::new();
        headers.insert("host".to_string(), "example.amazonaws.com".to_string());

        let sig = signer.sign("GET", "https://example.amazonaws.com/", &mut headers, "", fixed_time());

        assert_eq!(headers["x-amz-date"], "20150830T123600Z");
        assert_eq!(headers["x-amz-content-sha256"], EMPTY_PAYLOAD_HASH);
        assert_eq!(headers["authorization"], sig.authorization);
        assert!(sig.authorization.starts_with(
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/service/aws4_request"
        ));
        assert!(sig
            .authorization
            .contains("SignedHeaders=host;x-amz-content-sha256;x-amz-date,"));
    }

    #[test]
    fn canonical_request_layout() {
        let signer = test_signer();
        let mut headers = BTreeMap::new();
        headers.insert("host".to_string(), "example.amazonaws.com".to_string());

        let sig = signer.sign("GET", "https://example.amazonaws.com/", &mut headers, "", fixed_time());
        let expected = format!(
            "GET\n/\n\nhost:example.amazonaws.com\nx-amz-content-sha256:{h}\nx-amz-date:20150830T123600Z\n\nhost;x-amz-content-sha256;x-amz-date\n{h}",
            h = EMPTY_PAYLOAD_HASH
        );
        assert_eq!(sig.canonical_request, expected);
        assert!(sig.string_to_sign.starts_with(
            "AWS4-HMAC-SHA256\n20150830T123600Z\n20150830/us-east-1/service/aws4_request\n"
        ));
    }

    #[test]
    fn signing_is_deterministic_and_resign_replaces_authorization() {
        let signer = test_signer();
        let mut first = BTreeMap::new();
        first.insert("host".to_string(), "example.amazonaws.com".to_string());
        let mut second = first.clone();

        let a = signer.sign("POST", "https://example.amazonaws.com/", &mut first, "{}", fixed_time());
        let b = signer.sign("POST", "https://example.amazonaws.com/", &mut second, "{}", fixed_time());
        assert_eq!(a, b);

        // Re-signing must not fold the previous authorization header in.
        let c = signer.sign("POST", "https://example.amazonaws.com/", &mut first, "{}", fixed_time());
        assert_eq!(a.authorization, c.authorization);
    }

    #[test]
    fn session_token_is_signed() {
        let signer = SigV4Signer::new("ASIAEXAMPLE", "secret", Some("token123"), "us-east-1", "ecs");
        let mut headers = BTreeMap::new();
        headers.insert("host".to_string(), "ecs.us-east-1.amazonaws.com".to_string());

        let sig = signer.sign("POST", "https://ecs.us-east-1.amazonaws.com/", &mut headers, "{}", fixed_time());
        assert_eq!(headers["x-amz-security-token"], "token123");
        assert!(sig.authorization.contains("x-amz-security-token"));
    }

    #[test]
    fn payload_hash_tracks_body() {
        let signer = test_signer();
        let mut headers = BTreeMap::new();
        signer.sign("PUT", "https://example.com/key", &mut headers, "file contents", fixed_time());
        assert_ne!(headers["x-amz-content-sha256"], EMPTY_PAYLOAD_HASH);
    }

    fn request_with(config: Config) -> Request {
        let info = ClientInfo {
            service_name: "ecs".to_string(),
            endpoint: "https://ecs.us-west-2.amazonaws.com".to_string(),
            signing_region: "us-west-2".to_string(),
            ..ClientInfo::default()
        };
        let mut req = Request::new(
            config,
            info,
            Handlers::new(),
            Operation::new("ListClusters"),
            serde_json::Value::Null,
        );
        req.http_request.body = "{}".to_string();
        req.http_request
            .headers
            .insert("host".to_string(), "ecs.us-west-2.amazonaws.com".to_string());
        req
    }

    #[test]
    fn handler_rejects_expired_credentials() {
        let past = Utc::now() - chrono::Duration::seconds(60);
        let creds = Credentials::new_temporary("ASIAEXAMPLE", "secret", "token", Some(past));
        let mut req = request_with(Config::new().with_credentials(creds));

        (sign_handler().func)(&mut req);

        let err = req.error.expect("expired credentials must fail signing");
        assert_eq!(err.code, "ExpiredToken");
        assert!(!req.http_request.headers.contains_key("authorization"));
        assert!(!req.http_request.headers.contains_key("x-amz-security-token"));
    }

    #[test]
    fn handler_leaves_anonymous_requests_unsigned() {
        let mut req = request_with(Config::new());
        let before = req.http_request.headers.clone();

        (sign_handler().func)(&mut req);

        assert!(req.error.is_none());
        assert_eq!(req.http_request.headers, before);
    }

    #[test]
    fn handler_signs_with_client_scope_and_session_token() {
        let future = Utc::now() + chrono::Duration::hours(1);
        let creds = Credentials::new_temporary("ASIAEXAMPLE", "secret", "token", Some(future));
        let mut req = request_with(
            Config::new()
                .with_credentials(creds)
                .with_log_level(LogLevel::DebugWithSigning),
        );

        (sign_handler().func)(&mut req);

        assert!(req.error.is_none());
        let headers = &req.http_request.headers;
        assert_eq!(headers["x-amz-security-token"], "token");
        let auth = &headers["authorization"];
        assert!(auth.contains("/us-west-2/ecs/aws4_request"));
        assert!(auth.contains("x-amz-security-token"));
    }
}
