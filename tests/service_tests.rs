mod common;

use aws_request::corehandlers;
use aws_request::protocol::jsonrpc;
use aws_request::signing;
use common::{ecs, ecs_with, session, MockTransport};
use ecs_client::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_client_metadata() {
    let transport = MockTransport::new();
    let ecs = ecs(&transport);
    let info = ecs.client_info();

    assert_eq!(info.service_name, "ecs");
    assert_eq!(info.api_version, "2014-11-13");
    assert_eq!(info.json_version, "1.1");
    assert_eq!(info.target_prefix, "AmazonEC2ContainerServiceV20141113");
    assert_eq!(info.endpoint, "https://ecs.us-west-2.amazonaws.com");
    assert_eq!(info.signing_region, "us-west-2");
    assert_eq!(ecs.config().region.as_deref(), Some("us-west-2"));
}

#[test]
fn test_overrides_layer_over_session() {
    let transport = MockTransport::new();
    let ecs = Ecs::new(
        &session(&transport),
        &[Config::new().with_endpoint("localhost:4566").with_disable_ssl(true)],
    );
    assert_eq!(ecs.client_info().endpoint, "http://localhost:4566");
    assert_eq!(ecs.client_info().signing_region, "us-west-2");
}

#[test]
fn test_handler_chain_order() {
    let transport = MockTransport::new();
    let ecs = ecs(&transport);
    let h = ecs.handlers();

    assert_eq!(
        h.validate.names(),
        vec![corehandlers::VALIDATE_ENDPOINT, corehandlers::VALIDATE_PARAMETERS]
    );
    assert_eq!(
        h.build.names(),
        vec!["core.UserAgent", "core.InvocationId", "jsonrpc.Build"]
    );
    assert_eq!(h.sign.names(), vec!["core.RequestAttempt", "sigv4.Sign"]);
    assert_eq!(h.unmarshal.names(), vec!["jsonrpc.Unmarshal"]);
    assert_eq!(h.unmarshal_meta.names(), vec!["jsonrpc.UnmarshalMeta"]);
    assert_eq!(h.unmarshal_error.names(), vec!["jsonrpc.UnmarshalError"]);
    assert!(h.complete.is_empty());
}

#[test]
fn test_clients_do_not_share_handlers() {
    let transport = MockTransport::new();
    let session = session(&transport);

    let strip_signer = EcsOptions::new().with_client_init(|client: &mut Client| {
        client.handlers_mut().sign.remove(signing::SIGN_HANDLER);
    });
    let unsigned = Ecs::with_options(&session, &[], strip_signer);
    let signed = Ecs::new(&session, &[]);

    assert!(!unsigned.handlers().sign.contains(signing::SIGN_HANDLER));
    assert!(signed.handlers().sign.contains(signing::SIGN_HANDLER));
    assert_eq!(signed.handlers().build.len(), 3);
}

#[test]
fn test_client_init_runs_once() {
    let transport = MockTransport::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let options = EcsOptions::new().with_client_init(move |client: &mut Client| {
        assert_eq!(client.info().service_name, "ecs");
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let ecs = ecs_with(&transport, options);
    let _copy = ecs.clone();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_request_init_runs_per_request() {
    let transport = MockTransport::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let options = EcsOptions::new().with_request_init(move |req: &mut Request| {
        counter.fetch_add(1, Ordering::SeqCst);
        req.http_request
            .headers
            .insert("x-test-hook".to_string(), req.operation.name.to_string());
    });
    let ecs = ecs_with(&transport, options);

    ecs.list_clusters(&ListClustersInput::default()).await.unwrap();
    ecs.describe_clusters(&DescribeClustersInput::default()).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    let sent = transport.sent();
    assert_eq!(sent[0].headers["x-test-hook"], "ListClusters");
    assert_eq!(sent[1].headers["x-test-hook"], "DescribeClusters");
}

#[tokio::test]
async fn test_request_init_can_replace_handlers() {
    let transport = MockTransport::new();
    let options = EcsOptions::new().with_request_init(|req: &mut Request| {
        req.handlers.sign.remove(signing::SIGN_HANDLER);
    });
    let ecs = ecs_with(&transport, options);

    ecs.list_clusters(&ListClustersInput::default()).await.unwrap();

    let sent = transport.sent();
    assert!(!sent[0].headers.contains_key("authorization"));
    assert!(ecs.handlers().sign.contains(signing::SIGN_HANDLER));
}

#[tokio::test]
async fn test_missing_region_reported_at_request_time() {
    let transport = MockTransport::new();
    let session = Session::new(Config::new().with_transport(transport.clone()));
    let ecs = Ecs::new(&session, &[]);
    assert!(ecs.client_info().endpoint.is_empty());

    let err = ecs
        .list_clusters(&ListClustersInput::default())
        .await
        .unwrap_err();
    assert_eq!(err.code, "MissingRegion");
    assert_eq!(err.action.as_deref(), Some("ListClusters"));
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn test_anonymous_requests_are_unsigned() {
    let transport = MockTransport::new();
    let session = Session::new(
        Config::new()
            .with_region("eu-west-1")
            .with_transport(transport.clone()),
    );
    let ecs = Ecs::new(&session, &[]);

    ecs.list_clusters(&ListClustersInput::default()).await.unwrap();
    let sent = transport.sent();
    assert!(!sent[0].headers.contains_key("authorization"));
    assert_eq!(sent[0].url, "https://ecs.eu-west-1.amazonaws.com/");
}

#[test]
fn test_client_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync + Clone>() {}
    assert_send_sync::<Ecs>();
    assert_send_sync::<EcsOptions>();
}

#[test]
fn test_jsonrpc_handlers_are_exported() {
    assert_eq!(jsonrpc::BUILD, "jsonrpc.Build");
    assert_eq!(signing::SIGN_HANDLER, "sigv4.Sign");
}
