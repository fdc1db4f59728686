//! Groq provider implemented via the OpenAI-compatible transport.

use std::sync::Arc;

use async_stream::try_stream;
use futures_util::StreamExt;
use reqwest::Client;

use crate::adapters::openai::{
    OpenAiAuth, OpenAiHttpTransport, OpenAiMessage, OpenAiRequest, OpenAiStreamChunk,
    OpenAiTransport,
};
use crate::{
    BoxedEventStream, ChatProvider, ChatReply, ChatRequest, ProviderError, ProviderFuture,
    ProviderId, SecureCredentialManager, StreamEvent,
};

pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

#[derive(Clone)]
pub struct GroqProvider {
    credentials: Arc<SecureCredentialManager>,
    transport: Arc<dyn OpenAiTransport>,
    fallback_model: String,
}

impl GroqProvider {
    pub fn new(
        credentials: Arc<SecureCredentialManager>,
        transport: Arc<dyn OpenAiTransport>,
    ) -> Self {
        Self {
            credentials,
            transport,
            fallback_model: "llama-3.3-70b-versatile".to_string(),
        }
    }

    pub fn with_fallback_model(mut self, model: impl Into<String>) -> Self {
        self.fallback_model = model.into();
        self
    }

    pub fn default_http_transport(client: Client) -> OpenAiHttpTransport {
        OpenAiHttpTransport::new(client).with_base_url(GROQ_BASE_URL)
    }

    fn build_request(&self, request: ChatRequest, stream: bool) -> OpenAiRequest {
        let model = if request.model.trim().is_empty() {
            self.fallback_model.clone()
        } else {
            request.model
        };

        let messages = request
            .messages
            .into_iter()
            .map(OpenAiMessage::from)
            .collect::<Vec<_>>();

        OpenAiRequest {
            model,
            messages,
            temperature: request.options.temperature,
            max_tokens: request.options.max_tokens,
            stream,
        }
    }
}

impl SecureCredentialManager {
    /// Stores a Groq API key for provider-authenticated requests.
    ///
    /// Groq keys are expected to start with `gsk_`.
    pub fn set_groq_api_key(&self, api_key: impl Into<String>) -> Result<(), ProviderError> {
        let api_key = api_key.into();
        if !api_key.starts_with("gsk_") {
            return Err(ProviderError::authentication(
                "Groq API key must start with 'gsk_'",
            ));
        }

        self.set_api_key(ProviderId::Groq, api_key)
    }
}

fn resolve_groq_auth(credentials: &SecureCredentialManager) -> Result<OpenAiAuth, ProviderError> {
    if let Some(api_key) = credentials.api_key(ProviderId::Groq)? {
        return Ok(OpenAiAuth::new(api_key));
    }

    Err(ProviderError::authentication("no Groq API key configured"))
}

impl ChatProvider for GroqProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Groq
    }

    fn complete<'a>(
        &'a self,
        request: ChatRequest,
    ) -> ProviderFuture<'a, Result<ChatReply, ProviderError>> {
        Box::pin(async move {
            request.validate()?;
            let auth = resolve_groq_auth(&self.credentials)?;
            let groq_request = self.build_request(request, false);
            let response = self.transport.complete(groq_request, auth).await?;
            Ok(response.into_chat_reply(ProviderId::Groq))
        })
    }

    fn stream<'a>(
        &'a self,
        request: ChatRequest,
    ) -> ProviderFuture<'a, Result<BoxedEventStream<'a>, ProviderError>> {
        Box::pin(async move {
            request.validate()?;
            let auth = resolve_groq_auth(&self.credentials)?;
            let groq_request = self.build_request(request, true);
            let mut chunks = self.transport.stream(groq_request, auth).await?;

            let stream = try_stream! {
                while let Some(chunk) = chunks.next().await {
                    yield match chunk? {
                        OpenAiStreamChunk::TextDelta(delta) => StreamEvent::TextDelta(delta),
                        OpenAiStreamChunk::Complete(response) => {
                            StreamEvent::ReplyComplete(response.into_chat_reply(ProviderId::Groq))
                        }
                    };
                }
            };

            Ok(Box::pin(stream) as BoxedEventStream<'a>)
        })
    }
}
