use modelbridge::{Error, ErrorKind, InvokeContext, PlatformHandler, TextGenerationRequest};
use serde_json::json;
use std::time::Duration;
use tokio_test::assert_err;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::platforms::{
    alibaba::AlibabaTestSetup, sse_response, volcengine::VolcengineTestSetup, PlatformTestSetup,
};

async fn mount_chat(mock_server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(response)
        .mount(mock_server)
        .await;
}

fn hello(model: &str) -> TextGenerationRequest {
    TextGenerationRequest::new(model, "Hello")
}

#[tokio::test]
async fn test_zero_choices_is_rejected() {
    let config = VolcengineTestSetup::get_config();
    let mock_server = MockServer::start().await;
    mount_chat(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(json!({
            "id": "r2",
            "choices": [],
            "usage": {"prompt_tokens": 1, "completion_tokens": 0, "total_tokens": 1}
        })),
    )
    .await;

    let handler = VolcengineTestSetup::create_handler(&mock_server.uri());
    let err = assert_err!(
        handler
            .text_generation(&hello(config.text_model), &InvokeContext::new())
            .await
    );
    assert_eq!(err.kind(), ErrorKind::Platform);
    assert!(err.to_string().contains("no result entries"));
}

/// Non-2xx bodies carrying an error object become structured errors
async fn run_error_status_test<T: PlatformTestSetup>() {
    let config = T::get_config();
    let mock_server = MockServer::start().await;
    mount_chat(
        &mock_server,
        ResponseTemplate::new(401).set_body_json(json!({
            "error": {
                "code": "AuthenticationError",
                "message": "The API key in the request is missing or invalid.",
                "type": "Unauthorized"
            }
        })),
    )
    .await;

    let handler = T::create_handler(&mock_server.uri());
    let err = handler
        .text_generation(&hello(config.text_model), &InvokeContext::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Platform);
    assert_eq!(err.status(), Some(401));
    match err {
        Error::Api {
            provider,
            code,
            error_type,
            ..
        } => {
            assert_eq!(provider, config.name);
            assert_eq!(code.as_deref(), Some("AuthenticationError"));
            assert_eq!(error_type.as_deref(), Some("Unauthorized"));
        }
        other => panic!("Expected API error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_volcengine_error_status() {
    run_error_status_test::<VolcengineTestSetup>().await;
}

#[tokio::test]
async fn test_alibaba_error_status() {
    run_error_status_test::<AlibabaTestSetup>().await;
}

#[tokio::test]
async fn test_error_status_on_streaming_request() {
    let config = VolcengineTestSetup::get_config();
    let mock_server = MockServer::start().await;
    mount_chat(
        &mock_server,
        ResponseTemplate::new(429).set_body_json(json!({
            "error": {"code": "RateLimitExceeded.EndpointRPMExceeded", "message": "Too many requests"}
        })),
    )
    .await;

    let handler = VolcengineTestSetup::create_handler(&mock_server.uri());
    let err = handler
        .text_generation_stream(&hello(config.text_model), &InvokeContext::new())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(429));
    assert!(err.to_string().contains("RateLimitExceeded"));
}

#[tokio::test]
async fn test_unstructured_error_body_falls_back_to_raw_text() {
    let config = AlibabaTestSetup::get_config();
    let mock_server = MockServer::start().await;
    mount_chat(
        &mock_server,
        ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"),
    )
    .await;

    let handler = AlibabaTestSetup::create_handler(&mock_server.uri());
    let err = handler
        .text_generation(&hello(config.text_model), &InvokeContext::new())
        .await
        .unwrap_err();

    match err {
        Error::Api {
            status,
            code,
            message,
            ..
        } => {
            assert_eq!(status, Some(502));
            assert_eq!(code, None);
            assert_eq!(message, "<html>Bad Gateway</html>");
        }
        other => panic!("Expected API error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_error_envelope_in_success_body() {
    let config = VolcengineTestSetup::get_config();
    let mock_server = MockServer::start().await;
    mount_chat(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(json!({
            "error": {"code": "InvalidParameter", "message": "max_tokens out of range", "type": "BadRequest"}
        })),
    )
    .await;

    let handler = VolcengineTestSetup::create_handler(&mock_server.uri());
    let err = handler
        .text_generation(&hello(config.text_model), &InvokeContext::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Platform);
    assert!(err.to_string().contains("InvalidParameter"));
}

#[tokio::test]
async fn test_malformed_body_is_internal_error() {
    let config = VolcengineTestSetup::get_config();
    let mock_server = MockServer::start().await;
    mount_chat(
        &mock_server,
        ResponseTemplate::new(200).set_body_raw("{\"id\": \"r2\", \"choices\": [", "application/json"),
    )
    .await;

    let handler = VolcengineTestSetup::create_handler(&mock_server.uri());
    let err = handler
        .text_generation(&hello(config.text_model), &InvokeContext::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Internal);
    match err {
        Error::Decode { payload, .. } => assert!(payload.starts_with("{\"id\"")),
        other => panic!("Expected decode error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_timeout_bounds_the_exchange() {
    let config = VolcengineTestSetup::get_config();
    let mock_server = MockServer::start().await;
    mount_chat(
        &mock_server,
        sse_response("hello_stream.sse").set_delay(Duration::from_secs(5)),
    )
    .await;

    let handler = VolcengineTestSetup::create_handler_with_timeout(
        &mock_server.uri(),
        Duration::from_millis(200),
    );
    let err = handler
        .text_generation(&hello(config.text_model).stream(true), &InvokeContext::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
}

/// A stream that keeps delivering data is still bounded by the timeout
#[tokio::test]
async fn test_timeout_bounds_a_trickling_stream() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = vec![0u8; 4096];
        let _ = socket.read(&mut request).await;
        let head = "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\nconnection: close\r\n\r\n";
        if socket.write_all(head.as_bytes()).await.is_err() {
            return;
        }
        for _ in 0..100 {
            let line = "data: {\"id\":\"r9\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\".\"}}]}\n\n";
            if socket.write_all(line.as_bytes()).await.is_err() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    });

    let config = VolcengineTestSetup::get_config();
    let handler = VolcengineTestSetup::create_handler_with_timeout(
        &format!("http://{addr}"),
        Duration::from_millis(300),
    );
    let stream = handler
        .text_generation_stream(&hello(config.text_model), &InvokeContext::new())
        .await
        .unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), stream.aggregate())
        .await
        .expect("timeout did not bound the stream");
    let err = assert_err!(result);
    assert_eq!(err.kind(), ErrorKind::Timeout);
}

#[tokio::test]
async fn test_cancellation_aborts_pending_request() {
    let config = VolcengineTestSetup::get_config();
    let mock_server = MockServer::start().await;
    mount_chat(
        &mock_server,
        sse_response("hello_stream.sse").set_delay(Duration::from_secs(5)),
    )
    .await;

    let handler = VolcengineTestSetup::create_handler(&mock_server.uri());
    let ctx = InvokeContext::new();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let err = handler
        .text_generation_stream(&hello(config.text_model), &ctx)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
}

#[tokio::test]
async fn test_invalid_request_sends_nothing() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let handler = VolcengineTestSetup::create_handler(&mock_server.uri());
    let err = handler
        .text_generation(&TextGenerationRequest::new("", "Hello"), &InvokeContext::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);

    let err = handler
        .text_generation_stream(
            &TextGenerationRequest::new(VolcengineTestSetup::get_config().text_model, ""),
            &InvokeContext::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
}
