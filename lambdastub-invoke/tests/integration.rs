//! Integration tests for the Invoke endpoint
//!
//! These tests drive the endpoint through the AWS SDK Lambda client, which is
//! what the stub has to stay compatible with.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_sdk_lambda::{
    primitives::Blob,
    types::{InvocationType, LogType},
    Client,
};
use base64::{engine::general_purpose, Engine};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use lambdastub_invoke::{
    FunctionRegistry, Handler, IdentifierResolver, InvocationContext, InvokeService, InvokeState,
};

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct BoomError(String);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TestRequest {
    name: String,
    success: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct TestResponse {
    name: String,
    success: bool,
}

fn test_registry() -> FunctionRegistry {
    FunctionRegistry::builder()
        .register(
            "Greeter",
            Handler::no_input(|| async { Ok::<_, Infallible>("hello world!?") }),
        )
        .register(
            "Echo",
            Handler::raw(|_ctx, payload: Bytes| async move { Ok::<_, Infallible>(payload) }),
        )
        .register(
            "HelloWorldFunction",
            Handler::json(|_ctx: InvocationContext, request: TestRequest| async move {
                assert_eq!(request.name, "Sample");
                assert!(request.success);
                Ok::<_, Infallible>(TestResponse {
                    name: "name".to_string(),
                    success: true,
                })
            }),
        )
        .register(
            "Fail",
            Handler::no_input(|| async { Err::<(), _>(BoomError("boom".to_string())) }),
        )
        .build()
        .unwrap()
}

/// Start a test server and return the port
async fn start_test_server() -> (u16, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let service =
        InvokeService::new(test_registry()).with_resolver(IdentifierResolver::new("us-east-1"));
    let router = lambdastub_invoke::router(Arc::new(InvokeState::new(service)));

    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    // Give the server a moment to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    (port, handle)
}

/// Create a test Lambda client pointing to our local server
async fn create_test_client(port: u16) -> Client {
    let config = aws_config::defaults(BehaviorVersion::latest())
        .endpoint_url(format!("http://127.0.0.1:{}", port))
        .credentials_provider(aws_sdk_lambda::config::Credentials::new(
            "ACCESS_KEY_ID",
            "SECRET_KEY",
            Some("TOKEN".to_string()),
            None,
            "test",
        ))
        .region(aws_sdk_lambda::config::Region::new("us-west-1"))
        .load()
        .await;

    Client::new(&config)
}

#[tokio::test]
async fn test_invoke_without_payload() {
    let (port, _handle) = start_test_server().await;
    let client = create_test_client(port).await;

    let output = client
        .invoke()
        .function_name("Greeter")
        .send()
        .await
        .expect("Invoke should succeed");

    assert_eq!(output.status_code(), 200);
    assert_eq!(output.function_error(), None);
    assert_eq!(output.executed_version(), Some("1"));
    assert_eq!(output.payload().unwrap().as_ref(), br#""hello world!?""#);
}

#[tokio::test]
async fn test_invoke_typed_handler() {
    let (port, _handle) = start_test_server().await;
    let client = create_test_client(port).await;

    let payload = serde_json::to_vec(&serde_json::json!({"Name": "Sample", "Success": true})).unwrap();
    let output = client
        .invoke()
        .function_name("HelloWorldFunction")
        .payload(Blob::new(payload))
        .send()
        .await
        .expect("Invoke should succeed");

    let body: serde_json::Value = serde_json::from_slice(output.payload().unwrap().as_ref()).unwrap();
    assert_eq!(body, serde_json::json!({"Name": "name", "Success": true}));
}

#[tokio::test]
async fn test_invoke_with_qualifier() {
    let (port, _handle) = start_test_server().await;
    let client = create_test_client(port).await;

    let output = client
        .invoke()
        .function_name("Echo")
        .qualifier("5")
        .payload(Blob::new(r#"{"n":1}"#))
        .send()
        .await
        .expect("Invoke should succeed");

    assert_eq!(output.executed_version(), Some("5"));
    assert_eq!(output.payload().unwrap().as_ref(), br#"{"n":1}"#);
}

#[tokio::test]
async fn test_invoke_by_arn() {
    let (port, _handle) = start_test_server().await;
    let client = create_test_client(port).await;

    let output = client
        .invoke()
        .function_name("arn:aws:lambda:us-east-1:123456789012:function:Echo:$LATEST")
        .payload(Blob::new("by-arn"))
        .send()
        .await
        .expect("Invoke by ARN should succeed");

    assert_eq!(output.executed_version(), Some("$LATEST"));
    assert_eq!(output.payload().unwrap().as_ref(), b"by-arn");
}

#[tokio::test]
async fn test_invoke_missing_function() {
    let (port, _handle) = start_test_server().await;
    let client = create_test_client(port).await;

    let err = client
        .invoke()
        .function_name("Missing")
        .send()
        .await
        .expect_err("Missing function should fail");

    let service_error = err.into_service_error();
    assert!(
        service_error.is_resource_not_found_exception(),
        "unexpected error: {:?}",
        service_error
    );
}

#[tokio::test]
async fn test_invoke_function_error() {
    let (port, _handle) = start_test_server().await;
    let client = create_test_client(port).await;

    let output = client
        .invoke()
        .function_name("Fail")
        .payload(Blob::new("{}"))
        .send()
        .await
        .expect("Function errors are not protocol errors");

    assert_eq!(output.status_code(), 200);
    assert_eq!(output.function_error(), Some("BoomError"));
    let body: serde_json::Value = serde_json::from_slice(output.payload().unwrap().as_ref()).unwrap();
    assert_eq!(
        body,
        serde_json::json!({"errorMessage": "boom", "errorType": "BoomError"})
    );
}

#[tokio::test]
async fn test_invoke_log_tail() {
    let (port, _handle) = start_test_server().await;
    let client = create_test_client(port).await;

    let output = client
        .invoke()
        .function_name("Echo")
        .log_type(LogType::Tail)
        .payload(Blob::new(r#"{"tail":true}"#))
        .send()
        .await
        .expect("Invoke should succeed");

    let log_result = output.log_result().expect("log result should be present");
    let log = String::from_utf8(general_purpose::STANDARD_NO_PAD.decode(log_result).unwrap()).unwrap();
    assert!(log.contains("START RequestId:"));
    assert!(log.contains(r#"{"tail":true}"#));
    assert!(log.contains("END RequestId:"));
    assert!(log.contains("REPORT RequestId:"));
}

#[tokio::test]
async fn test_event_invocation_has_no_log_tail() {
    let (port, _handle) = start_test_server().await;
    let client = create_test_client(port).await;

    let output = client
        .invoke()
        .function_name("Echo")
        .invocation_type(InvocationType::Event)
        .log_type(LogType::Tail)
        .payload(Blob::new("{}"))
        .send()
        .await
        .expect("Invoke should succeed");

    assert_eq!(output.log_result(), None);
}
