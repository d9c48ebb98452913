use futures_util::StreamExt;
use modelbridge::{
    Error, ErrorKind, FinishReason, InvokeContext, PlatformHandler, StreamChunk, Termination,
    TextGenerationRequest, Usage,
};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer};

use super::platforms::{
    alibaba::AlibabaTestSetup, init_tracing, sse_response, volcengine::VolcengineTestSetup,
    PlatformTestSetup, TEST_API_KEY,
};

/// Stream the "Hello" fixture and check the aggregate and the request on the wire
async fn run_stream_aggregate_test<T: PlatformTestSetup>() {
    init_tracing();
    let config = T::get_config();
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", format!("Bearer {TEST_API_KEY}").as_str()))
        .and(header("accept", "text/event-stream"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "model": config.text_model,
            "messages": [{"role": "user", "content": "Hello"}],
            "stream": true,
            "stream_options": {"include_usage": true},
            "max_tokens": 16
        })))
        .respond_with(sse_response("hello_stream.sse"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let handler = T::create_handler(&mock_server.uri());
    let request = TextGenerationRequest::new(config.text_model, "Hello")
        .max_tokens(16)
        .param("stream_options_include_usage", true);

    let stream = assert_ok!(
        handler
            .text_generation_stream(&request, &InvokeContext::new())
            .await
    );
    assert_eq!(stream.provider(), config.name);

    let aggregate = assert_ok!(stream.aggregate().await);
    assert_eq!(aggregate.termination, Termination::Completed);
    assert_eq!(aggregate.response.id, "r1");
    assert_eq!(aggregate.response.generated_text, "Hello");
    assert_eq!(aggregate.response.finish_reason, Some(FinishReason::Stop));
    assert_eq!(aggregate.response.usage, Some(Usage::new(5, 2)));
}

#[tokio::test]
async fn test_volcengine_stream_aggregate() {
    run_stream_aggregate_test::<VolcengineTestSetup>().await;
}

#[tokio::test]
async fn test_alibaba_stream_aggregate() {
    run_stream_aggregate_test::<AlibabaTestSetup>().await;
}

#[tokio::test]
async fn test_live_stream_yields_chunks_in_order() {
    let config = VolcengineTestSetup::get_config();
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(sse_response("hello_stream.sse"))
        .mount(&mock_server)
        .await;

    let handler = VolcengineTestSetup::create_handler(&mock_server.uri());
    let request = TextGenerationRequest::new(config.text_model, "Hello");
    let stream = handler
        .text_generation_stream(&request, &InvokeContext::new())
        .await
        .unwrap();

    let chunks: Vec<StreamChunk> = stream
        .stream()
        .map(|chunk| chunk.expect("Stream should parse correctly"))
        .collect()
        .await;

    let deltas: Vec<&str> = chunks.iter().map(|c| c.delta.as_str()).collect();
    assert_eq!(deltas, vec!["Hel", "lo", "", ""]);
    assert!(chunks.iter().all(|c| c.id == "r1"));

    // Exactly one terminal chunk, and it comes last
    assert_eq!(chunks.iter().filter(|c| c.is_final).count(), 1);
    assert!(chunks.last().unwrap().is_final);
    assert_eq!(chunks[2].usage, Some(Usage::new(5, 2)));
}

#[tokio::test]
async fn test_stream_flag_aggregates_through_text_generation() {
    let config = VolcengineTestSetup::get_config();
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("accept", "text/event-stream"))
        .respond_with(sse_response("hello_stream.sse"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let handler = VolcengineTestSetup::create_handler(&mock_server.uri());
    let request = TextGenerationRequest::new(config.text_model, "Hello").stream(true);
    let response = assert_ok!(handler.text_generation(&request, &InvokeContext::new()).await);

    assert_eq!(response.id, "r1");
    assert_eq!(response.generated_text, "Hello");
}

#[tokio::test]
async fn test_truncated_stream_is_distinguished_from_completion() {
    let config = VolcengineTestSetup::get_config();
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(sse_response("truncated_stream.sse"))
        .mount(&mock_server)
        .await;

    let handler = VolcengineTestSetup::create_handler(&mock_server.uri());
    let ctx = InvokeContext::new();

    let request = TextGenerationRequest::new(config.text_model, "Tell me a story");
    let aggregate = handler
        .text_generation_stream(&request, &ctx)
        .await
        .unwrap()
        .aggregate()
        .await
        .unwrap();
    assert_eq!(aggregate.termination, Termination::TruncatedByTransport);
    assert!(!aggregate.is_complete());
    assert_eq!(aggregate.response.generated_text, "Once upon a time");

    // The aggregating path reports it as an error carrying the partial text
    let err = assert_err!(
        handler
            .text_generation(&request.clone().stream(true), &ctx)
            .await
    );
    assert_eq!(err.kind(), ErrorKind::Truncated);
    assert_eq!(
        err.partial_response().map(|r| r.generated_text.as_str()),
        Some("Once upon a time")
    );
}

#[tokio::test]
async fn test_error_envelope_mid_stream_fails_request() {
    let config = AlibabaTestSetup::get_config();
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(sse_response("error_midstream.sse"))
        .mount(&mock_server)
        .await;

    let handler = AlibabaTestSetup::create_handler(&mock_server.uri());
    let request = TextGenerationRequest::new(config.text_model, "Hello");

    // Live consumers see the valid chunks, then the error, then nothing
    let items: Vec<Result<StreamChunk, Error>> = handler
        .text_generation_stream(&request, &InvokeContext::new())
        .await
        .unwrap()
        .stream()
        .collect()
        .await;
    assert_eq!(items.len(), 3);
    assert!(items[0].is_ok() && items[1].is_ok());
    match &items[2] {
        Err(Error::Api {
            code,
            error_type,
            message,
            status,
            ..
        }) => {
            assert_eq!(code.as_deref(), Some("SensitiveContentDetected"));
            assert_eq!(error_type.as_deref(), Some("BadRequest"));
            assert!(message.contains("sensitive"));
            assert_eq!(*status, None);
        }
        other => panic!("Expected API error, got {other:?}"),
    }

    // Aggregation discards the partial text
    let err = handler
        .text_generation(&request.stream(true), &InvokeContext::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Platform);
    assert!(err.partial_response().is_none());
}

#[tokio::test]
async fn test_completed_stream_without_choices_is_rejected() {
    let config = VolcengineTestSetup::get_config();
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(sse_response("zero_choices_stream.sse"))
        .mount(&mock_server)
        .await;

    let handler = VolcengineTestSetup::create_handler(&mock_server.uri());
    let request = TextGenerationRequest::new(config.text_model, "Hello").stream(true);
    let err = handler
        .text_generation(&request, &InvokeContext::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Platform);
    assert!(err.to_string().contains("no result entries"));
}
