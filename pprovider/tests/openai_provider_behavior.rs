#![cfg(feature = "provider-openai")]

use std::sync::{Arc, Mutex};

use futures_util::StreamExt;

use pprovider::adapters::openai::{
    OpenAiAuth, OpenAiChunkStream, OpenAiFinishReason, OpenAiProvider, OpenAiRequest,
    OpenAiResponse, OpenAiStreamChunk, OpenAiTransport, OpenAiUsage,
};
use pprovider::{
    ChatProvider, ChatRequest, Message, ProviderError, ProviderErrorKind, ProviderFuture,
    ProviderId, SecureCredentialManager, StopReason, StreamEvent,
};

#[derive(Debug, Default)]
struct FakeTransport {
    captured_auth: Mutex<Option<OpenAiAuth>>,
    captured_request: Mutex<Option<OpenAiRequest>>,
}

impl OpenAiTransport for FakeTransport {
    fn complete<'a>(
        &'a self,
        request: OpenAiRequest,
        auth: OpenAiAuth,
    ) -> ProviderFuture<'a, Result<OpenAiResponse, ProviderError>> {
        Box::pin(async move {
            *self.captured_request.lock().expect("request lock") = Some(request);
            *self.captured_auth.lock().expect("auth lock") = Some(auth);

            Ok(OpenAiResponse {
                model: "gpt-3.5-turbo".to_string(),
                content: "hello world".to_string(),
                finish_reason: OpenAiFinishReason::Stop,
                usage: OpenAiUsage {
                    prompt_tokens: 7,
                    completion_tokens: 3,
                    total_tokens: 10,
                },
            })
        })
    }

    fn stream<'a>(
        &'a self,
        request: OpenAiRequest,
        auth: OpenAiAuth,
    ) -> ProviderFuture<'a, Result<OpenAiChunkStream<'a>, ProviderError>> {
        Box::pin(async move {
            *self.captured_request.lock().expect("request lock") = Some(request);
            *self.captured_auth.lock().expect("auth lock") = Some(auth);

            let chunks = futures_util::stream::iter(vec![
                Ok(OpenAiStreamChunk::TextDelta("hello".to_string())),
                Ok(OpenAiStreamChunk::TextDelta(" world".to_string())),
                Ok(OpenAiStreamChunk::Complete(OpenAiResponse {
                    model: "gpt-3.5-turbo".to_string(),
                    content: "hello world".to_string(),
                    finish_reason: OpenAiFinishReason::Stop,
                    usage: OpenAiUsage::default(),
                })),
            ]);

            Ok(Box::pin(chunks) as OpenAiChunkStream<'a>)
        })
    }
}

fn credentials_with_key() -> Arc<SecureCredentialManager> {
    let credentials = Arc::new(SecureCredentialManager::new());
    credentials
        .set_openai_api_key("sk-live-123")
        .expect("key should set");
    credentials
}

#[tokio::test]
async fn complete_maps_openai_response_to_chat_reply() {
    let transport = Arc::new(FakeTransport::default());
    let provider = OpenAiProvider::new(credentials_with_key(), transport.clone());

    let request = ChatRequest::new("gpt-3.5-turbo", vec![Message::user("hi")])
        .with_temperature(0.7)
        .with_max_tokens(1000);

    let reply = provider
        .complete(request)
        .await
        .expect("completion should succeed");

    assert_eq!(reply.provider, ProviderId::OpenAi);
    assert_eq!(reply.text, "hello world");
    assert_eq!(reply.stop_reason, StopReason::EndTurn);
    assert_eq!(reply.usage.total_tokens, 10);

    let auth = transport
        .captured_auth
        .lock()
        .expect("auth lock")
        .clone()
        .expect("auth should be captured");
    assert_eq!(auth.api_key, "sk-live-123");

    let captured = transport
        .captured_request
        .lock()
        .expect("request lock")
        .clone()
        .expect("request should be captured");
    assert_eq!(captured.model, "gpt-3.5-turbo");
    assert_eq!(captured.temperature, Some(0.7));
    assert_eq!(captured.max_tokens, Some(1000));
    assert!(!captured.stream);
}

#[tokio::test]
async fn stream_yields_deltas_then_completed_reply() {
    let transport = Arc::new(FakeTransport::default());
    let provider = OpenAiProvider::new(credentials_with_key(), transport.clone());

    let request = ChatRequest::new("gpt-3.5-turbo", vec![Message::user("hi")]);
    let mut stream = provider.stream(request).await.expect("stream should open");

    let mut deltas = Vec::new();
    let mut completed = None;
    while let Some(event) = stream.next().await {
        match event.expect("event should be ok") {
            StreamEvent::TextDelta(delta) => deltas.push(delta),
            StreamEvent::ReplyComplete(reply) => completed = Some(reply),
        }
    }

    assert_eq!(deltas, vec!["hello".to_string(), " world".to_string()]);
    let reply = completed.expect("stream should complete");
    assert_eq!(reply.provider, ProviderId::OpenAi);
    assert_eq!(reply.text, "hello world");

    let captured = transport
        .captured_request
        .lock()
        .expect("request lock")
        .clone()
        .expect("request should be captured");
    assert!(captured.stream);
}

#[tokio::test]
async fn requests_fail_without_configured_key() {
    let transport = Arc::new(FakeTransport::default());
    let provider = OpenAiProvider::new(Arc::new(SecureCredentialManager::new()), transport);

    let request = ChatRequest::new("gpt-3.5-turbo", vec![Message::user("hi")]);
    let err = provider
        .complete(request)
        .await
        .expect_err("missing key must fail");
    assert_eq!(err.kind, ProviderErrorKind::Authentication);
}

#[test]
fn openai_key_prefix_is_enforced() {
    let credentials = SecureCredentialManager::new();
    let err = credentials
        .set_openai_api_key("bad-prefix")
        .expect_err("wrong prefix must fail");
    assert_eq!(err.kind, ProviderErrorKind::Authentication);
}
