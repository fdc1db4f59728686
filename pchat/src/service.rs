//! Chat service: one user message in, one assistant reply out, with provider
//! fallback across the registry's candidate order.

use std::sync::Arc;

use futures_util::StreamExt;
use pprovider::{
    ChatReply, ChatRequest, Message, ProviderEntry, ProviderError, ProviderErrorKind,
    ProviderRegistry, StopReason, StreamEvent, TokenUsage,
};

use crate::relay::{RelaySink, RelayStream};
use crate::{ChatError, ChatEvent, ChatTurnReply, ChatTurnRequest, ConversationStore, NoopTurnHooks, TurnHooks};

const RELAY_CAPACITY: usize = 16;

/// Orchestration policy knobs with the documented defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatPolicy {
    /// Upper character bound for one user message.
    pub max_message_chars: usize,
    /// Token cap forwarded to every provider attempt.
    pub max_reply_tokens: Option<u32>,
    /// Whether `InvalidRequest` failures may fall back to the next provider.
    /// Off by default: the same request fails on every backend.
    pub failover_invalid_request: bool,
    /// Whether unclassified failures may fall back. On by default, matching
    /// the catch-all behavior callers expect from a multi-provider setup.
    pub failover_unknown: bool,
}

impl Default for ChatPolicy {
    fn default() -> Self {
        Self {
            max_message_chars: 4000,
            max_reply_tokens: Some(1000),
            failover_invalid_request: false,
            failover_unknown: true,
        }
    }
}

impl ChatPolicy {
    pub fn fallback_eligible(&self, error: &ProviderError) -> bool {
        match error.kind {
            ProviderErrorKind::Authentication
            | ProviderErrorKind::RateLimited
            | ProviderErrorKind::Timeout
            | ProviderErrorKind::Transport
            | ProviderErrorKind::Unavailable
            | ProviderErrorKind::NotConfigured => true,
            ProviderErrorKind::InvalidRequest => self.failover_invalid_request,
            ProviderErrorKind::Other => self.failover_unknown,
        }
    }

    /// Caller temperature is clamped into the provider-sane range rather
    /// than rejected.
    pub fn clamp_temperature(&self, temperature: f32) -> f32 {
        temperature.clamp(0.0, 2.0)
    }
}

#[derive(Clone)]
pub struct ChatService {
    registry: Arc<ProviderRegistry>,
    store: Arc<ConversationStore>,
    policy: ChatPolicy,
    hooks: Arc<dyn TurnHooks>,
}

impl ChatService {
    pub fn new(registry: Arc<ProviderRegistry>, store: Arc<ConversationStore>) -> Self {
        Self::builder(registry, store).build()
    }

    pub fn builder(
        registry: Arc<ProviderRegistry>,
        store: Arc<ConversationStore>,
    ) -> ChatServiceBuilder {
        ChatServiceBuilder {
            registry,
            store,
            policy: ChatPolicy::default(),
            hooks: Arc::new(NoopTurnHooks),
        }
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Blocking path: the full reply is accumulated before returning.
    pub async fn run_turn(&self, request: ChatTurnRequest) -> Result<ChatTurnReply, ChatError> {
        let turn = self.prepare_turn(&request)?;
        let _guard = turn.guard;

        let mut last_error = None;
        for entry in turn.candidates {
            self.hooks
                .on_attempt_start(&request.session_id, entry.descriptor.id, false);
            let provider_request =
                self.build_provider_request(&entry, turn.window.clone(), request.temperature, false)?;

            match entry.client.complete(provider_request).await {
                Ok(reply) => {
                    self.store
                        .append(&request.session_id, Message::assistant(reply.text.clone()))?;
                    self.hooks
                        .on_turn_complete(&request.session_id, reply.provider, reply.usage);

                    return Ok(ChatTurnReply {
                        session_id: request.session_id,
                        message: reply.text,
                        provider: reply.provider,
                        model: reply.model,
                        usage: reply.usage,
                    });
                }
                Err(error) if self.policy.fallback_eligible(&error) => {
                    self.hooks
                        .on_fallback(&request.session_id, entry.descriptor.id, &error);
                    last_error = Some(error);
                }
                Err(error) => {
                    let error = ChatError::from(error);
                    self.hooks.on_turn_failed(&request.session_id, &error);
                    return Err(error);
                }
            }
        }

        let error = ChatError::all_providers_failed(last_error);
        self.hooks.on_turn_failed(&request.session_id, &error);
        Err(error)
    }

    /// Streaming path: returns the caller end of the relay; a producer task
    /// owns the provider attempts and pushes events as they happen. Dropping
    /// the returned stream cancels the turn.
    pub async fn stream_turn(&self, request: ChatTurnRequest) -> Result<RelayStream, ChatError> {
        let turn = self.prepare_turn(&request)?;

        let worker = TurnWorker {
            store: Arc::clone(&self.store),
            policy: self.policy.clone(),
            hooks: Arc::clone(&self.hooks),
            request,
        };

        let (sink, rx) = RelayStream::channel(RELAY_CAPACITY);
        let guard = turn.guard;
        let candidates = turn.candidates;
        let window = turn.window;
        let producer = tokio::spawn(async move {
            let _guard = guard;
            worker.run(candidates, window, sink).await;
        });

        Ok(RelayStream::new(rx, producer))
    }

    fn prepare_turn(&self, request: &ChatTurnRequest) -> Result<PreparedTurn, ChatError> {
        let message = self.validate_message(&request.message)?;

        let candidates = self.registry.candidates();
        if candidates.is_empty() {
            return Err(ChatError::no_provider_configured());
        }

        let guard = self.store.begin_turn(&request.session_id)?;
        self.store
            .append(&request.session_id, Message::user(message))?;
        let window = self.store.window(&request.session_id)?;

        Ok(PreparedTurn {
            guard,
            candidates,
            window,
        })
    }

    fn validate_message(&self, raw: &str) -> Result<String, ChatError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ChatError::empty_message());
        }

        if trimmed.chars().count() > self.policy.max_message_chars {
            return Err(ChatError::message_too_long(self.policy.max_message_chars));
        }

        Ok(trimmed.to_string())
    }

    fn build_provider_request(
        &self,
        entry: &ProviderEntry,
        window: Vec<Message>,
        temperature: Option<f32>,
        streaming: bool,
    ) -> Result<ChatRequest, ChatError> {
        build_provider_request(&self.policy, entry, window, temperature, streaming)
    }
}

pub struct ChatServiceBuilder {
    registry: Arc<ProviderRegistry>,
    store: Arc<ConversationStore>,
    policy: ChatPolicy,
    hooks: Arc<dyn TurnHooks>,
}

impl ChatServiceBuilder {
    pub fn policy(mut self, policy: ChatPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn hooks(mut self, hooks: Arc<dyn TurnHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn build(self) -> ChatService {
        ChatService {
            registry: self.registry,
            store: self.store,
            policy: self.policy,
            hooks: self.hooks,
        }
    }
}

struct PreparedTurn {
    guard: crate::TurnGuard,
    candidates: Vec<ProviderEntry>,
    window: Vec<Message>,
}

fn build_provider_request(
    policy: &ChatPolicy,
    entry: &ProviderEntry,
    window: Vec<Message>,
    temperature: Option<f32>,
    streaming: bool,
) -> Result<ChatRequest, ChatError> {
    let mut request = ChatRequest::new(entry.descriptor.model.clone(), window);

    if let Some(temperature) = temperature {
        request = request.with_temperature(policy.clamp_temperature(temperature));
    }

    if let Some(max_tokens) = policy.max_reply_tokens {
        request = request.with_max_tokens(max_tokens);
    }

    if streaming {
        request = request.enable_streaming();
    }

    request.validate().map_err(ChatError::from)?;
    Ok(request)
}

enum Attempt {
    /// A full reply was produced and every fragment reached the caller.
    Served(ChatReply),
    /// Failed before any fragment reached the caller; the next candidate may
    /// be tried silently.
    Fallback(ProviderError),
    /// Failed in a way that must surface immediately.
    Failed(ProviderError),
    /// The caller went away; stop without persisting anything.
    Disconnected,
}

struct TurnWorker {
    store: Arc<ConversationStore>,
    policy: ChatPolicy,
    hooks: Arc<dyn TurnHooks>,
    request: ChatTurnRequest,
}

impl TurnWorker {
    async fn run(self, candidates: Vec<ProviderEntry>, window: Vec<Message>, sink: RelaySink) {
        let session_id = self.request.session_id.clone();
        let mut last_error = None;

        for entry in candidates {
            let streaming = entry.descriptor.capability.supports_streaming();
            self.hooks
                .on_attempt_start(&session_id, entry.descriptor.id, streaming);

            let provider_request = match build_provider_request(
                &self.policy,
                &entry,
                window.clone(),
                self.request.temperature,
                streaming,
            ) {
                Ok(request) => request,
                Err(error) => {
                    let _ = sink.send(ChatEvent::Error(error.clone())).await;
                    self.hooks.on_turn_failed(&session_id, &error);
                    return;
                }
            };

            let attempt = if streaming {
                self.attempt_stream(&entry, provider_request, &sink).await
            } else {
                self.attempt_blocking(&entry, provider_request, &sink).await
            };

            match attempt {
                Attempt::Served(reply) => {
                    if let Err(error) = self
                        .store
                        .append(&session_id, Message::assistant(reply.text.clone()))
                    {
                        let _ = sink.send(ChatEvent::Error(error.clone())).await;
                        self.hooks.on_turn_failed(&session_id, &error);
                        return;
                    }

                    let _ = sink
                        .send(ChatEvent::Done {
                            provider: reply.provider,
                            model: reply.model,
                            usage: reply.usage,
                        })
                        .await;
                    self.hooks
                        .on_turn_complete(&session_id, reply.provider, reply.usage);
                    return;
                }
                Attempt::Fallback(error) => {
                    self.hooks
                        .on_fallback(&session_id, entry.descriptor.id, &error);
                    last_error = Some(error);
                }
                Attempt::Failed(error) => {
                    let error = ChatError::from(error);
                    let _ = sink.send(ChatEvent::Error(error.clone())).await;
                    self.hooks.on_turn_failed(&session_id, &error);
                    return;
                }
                Attempt::Disconnected => return,
            }
        }

        let error = ChatError::all_providers_failed(last_error);
        let _ = sink.send(ChatEvent::Error(error.clone())).await;
        self.hooks.on_turn_failed(&session_id, &error);
    }

    async fn attempt_stream(
        &self,
        entry: &ProviderEntry,
        request: ChatRequest,
        sink: &RelaySink,
    ) -> Attempt {
        let mut events = match entry.client.stream(request).await {
            Ok(events) => events,
            Err(error) => return self.before_first_fragment(error),
        };

        let mut accumulated = String::new();
        let mut completed = None;

        while let Some(event) = events.next().await {
            match event {
                Ok(StreamEvent::TextDelta(delta)) => {
                    if delta.is_empty() {
                        continue;
                    }

                    accumulated.push_str(&delta);
                    if sink.send(ChatEvent::Chunk(delta)).await.is_err() {
                        return Attempt::Disconnected;
                    }
                }
                Ok(StreamEvent::ReplyComplete(reply)) => {
                    completed = Some(reply);
                    break;
                }
                Err(error) => {
                    if accumulated.is_empty() {
                        return self.before_first_fragment(error);
                    }

                    // The caller has seen partial output attributable to this
                    // provider; surfacing beats stitching replies together.
                    return Attempt::Failed(error);
                }
            }
        }

        let reply = match completed {
            Some(mut reply) => {
                if reply.text.is_empty() {
                    reply.text = accumulated;
                }
                reply
            }
            None if !accumulated.is_empty() => ChatReply {
                provider: entry.descriptor.id,
                model: entry.descriptor.model.clone(),
                text: accumulated,
                stop_reason: StopReason::Other,
                usage: TokenUsage::default(),
            },
            None => {
                return self
                    .before_first_fragment(ProviderError::other("stream ended without output"));
            }
        };

        Attempt::Served(reply)
    }

    async fn attempt_blocking(
        &self,
        entry: &ProviderEntry,
        request: ChatRequest,
        sink: &RelaySink,
    ) -> Attempt {
        match entry.client.complete(request).await {
            Ok(reply) => {
                if !reply.text.is_empty()
                    && sink.send(ChatEvent::Chunk(reply.text.clone())).await.is_err()
                {
                    return Attempt::Disconnected;
                }

                Attempt::Served(reply)
            }
            Err(error) => self.before_first_fragment(error),
        }
    }

    fn before_first_fragment(&self, error: ProviderError) -> Attempt {
        if self.policy.fallback_eligible(&error) {
            Attempt::Fallback(error)
        } else {
            Attempt::Failed(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use futures_util::StreamExt;
    use pcommon::SessionId;
    use pprovider::{
        BoxedEventStream, ChatProvider, PendingEventStream, ProviderDescriptor, ProviderFuture,
        ProviderId, ProviderRegistry, VecEventStream,
    };

    use super::*;
    use crate::ChatErrorKind;

    enum Script {
        StreamOk(Vec<String>),
        ErrorBeforeFirstFragment(ProviderErrorKind),
        ErrorAfterFirstFragment {
            delta: String,
            kind: ProviderErrorKind,
        },
        StallAfterFragment(String),
    }

    struct ScriptedProvider {
        id: ProviderId,
        script: Script,
        calls: AtomicUsize,
        last_request: Mutex<Option<ChatRequest>>,
    }

    impl ScriptedProvider {
        fn new(id: ProviderId, script: Script) -> Arc<Self> {
            Arc::new(Self {
                id,
                script,
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_request(&self) -> Option<ChatRequest> {
            self.last_request.lock().expect("request lock").clone()
        }

        fn scripted_reply(&self, model: String, text: String) -> ChatReply {
            ChatReply {
                provider: self.id,
                model,
                text,
                stop_reason: StopReason::EndTurn,
                usage: TokenUsage {
                    input_tokens: 3,
                    output_tokens: 2,
                    total_tokens: 5,
                },
            }
        }

        fn record(&self, request: &ChatRequest) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().expect("request lock") = Some(request.clone());
        }
    }

    fn scripted_error(kind: ProviderErrorKind) -> ProviderError {
        ProviderError::new(kind, "scripted failure", false)
    }

    impl ChatProvider for ScriptedProvider {
        fn id(&self) -> ProviderId {
            self.id
        }

        fn complete<'a>(
            &'a self,
            request: ChatRequest,
        ) -> ProviderFuture<'a, Result<ChatReply, ProviderError>> {
            Box::pin(async move {
                self.record(&request);
                match &self.script {
                    Script::StreamOk(deltas) => {
                        Ok(self.scripted_reply(request.model, deltas.concat()))
                    }
                    Script::ErrorBeforeFirstFragment(kind)
                    | Script::ErrorAfterFirstFragment { kind, .. } => Err(scripted_error(*kind)),
                    Script::StallAfterFragment(_) => Err(ProviderError::other("not used")),
                }
            })
        }

        fn stream<'a>(
            &'a self,
            request: ChatRequest,
        ) -> ProviderFuture<'a, Result<BoxedEventStream<'a>, ProviderError>> {
            Box::pin(async move {
                self.record(&request);
                match &self.script {
                    Script::StreamOk(deltas) => {
                        let mut events = deltas
                            .iter()
                            .cloned()
                            .map(|delta| Ok(StreamEvent::TextDelta(delta)))
                            .collect::<Vec<_>>();
                        events.push(Ok(StreamEvent::ReplyComplete(
                            self.scripted_reply(request.model, deltas.concat()),
                        )));
                        Ok(Box::pin(VecEventStream::new(events)) as BoxedEventStream<'a>)
                    }
                    Script::ErrorBeforeFirstFragment(kind) => Err(scripted_error(*kind)),
                    Script::ErrorAfterFirstFragment { delta, kind } => {
                        let events = vec![
                            Ok(StreamEvent::TextDelta(delta.clone())),
                            Err(scripted_error(*kind)),
                        ];
                        Ok(Box::pin(VecEventStream::new(events)) as BoxedEventStream<'a>)
                    }
                    Script::StallAfterFragment(delta) => {
                        let events = vec![Ok(StreamEvent::TextDelta(delta.clone()))];
                        Ok(Box::pin(PendingEventStream::new(events)) as BoxedEventStream<'a>)
                    }
                }
            })
        }
    }

    fn service_over(
        providers: Vec<(Arc<ScriptedProvider>, u32)>,
        store: Arc<ConversationStore>,
    ) -> ChatService {
        let mut builder = ProviderRegistry::builder();
        for (provider, priority) in providers {
            let descriptor = ProviderDescriptor::new(provider.id, "test-model", priority);
            builder = builder.register(descriptor, provider);
        }

        let registry = Arc::new(builder.build().expect("registry should build"));
        ChatService::new(registry, store)
    }

    async fn drain(stream: RelayStream) -> Vec<ChatEvent> {
        stream.collect::<Vec<_>>().await
    }

    #[tokio::test]
    async fn stream_turn_relays_fragments_in_order_then_done_and_persists() {
        let provider = ScriptedProvider::new(
            ProviderId::Groq,
            Script::StreamOk(vec!["Hi".into(), " there!".into()]),
        );
        let store = Arc::new(ConversationStore::new(10).with_preamble("be helpful"));
        let service = service_over(vec![(provider.clone(), 10)], store.clone());

        let session = SessionId::new("s1");
        let stream = service
            .stream_turn(ChatTurnRequest::new(session.clone(), "Hello"))
            .await
            .expect("stream should open");

        let events = drain(stream).await;
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], ChatEvent::Chunk("Hi".into()));
        assert_eq!(events[1], ChatEvent::Chunk(" there!".into()));
        assert!(matches!(events[2], ChatEvent::Done { provider: ProviderId::Groq, .. }));

        let window = store.window(&session).expect("window should load");
        assert_eq!(window.len(), 3);
        assert_eq!(window[0], Message::system("be helpful"));
        assert_eq!(window[1], Message::user("Hello"));
        assert_eq!(window[2], Message::assistant("Hi there!"));

        // The turn guard is released once the stream finishes.
        store.begin_turn(&session).expect("session should be free");
    }

    #[tokio::test]
    async fn falls_back_silently_when_provider_fails_before_any_fragment() {
        let first = ScriptedProvider::new(
            ProviderId::Groq,
            Script::ErrorBeforeFirstFragment(ProviderErrorKind::Unavailable),
        );
        let second =
            ScriptedProvider::new(ProviderId::OpenAi, Script::StreamOk(vec!["backup".into()]));
        let store = Arc::new(ConversationStore::new(10));
        let service = service_over(vec![(first.clone(), 20), (second.clone(), 10)], store);

        let stream = service
            .stream_turn(ChatTurnRequest::new("s2", "Hello"))
            .await
            .expect("stream should open");
        let events = drain(stream).await;

        assert_eq!(events[0], ChatEvent::Chunk("backup".into()));
        assert!(matches!(events[1], ChatEvent::Done { provider: ProviderId::OpenAi, .. }));
        assert_eq!(first.calls(), 1);
        assert_eq!(second.calls(), 1);
    }

    #[tokio::test]
    async fn surfaces_terminal_error_after_first_fragment_without_fallback() {
        let first = ScriptedProvider::new(
            ProviderId::Groq,
            Script::ErrorAfterFirstFragment {
                delta: "partial".into(),
                kind: ProviderErrorKind::Unavailable,
            },
        );
        let second =
            ScriptedProvider::new(ProviderId::OpenAi, Script::StreamOk(vec!["backup".into()]));
        let store = Arc::new(ConversationStore::new(10));
        let service =
            service_over(vec![(first.clone(), 20), (second.clone(), 10)], store.clone());

        let session = SessionId::new("s3");
        let stream = service
            .stream_turn(ChatTurnRequest::new(session.clone(), "Hello"))
            .await
            .expect("stream should open");
        let events = drain(stream).await;

        assert_eq!(events.len(), 2);
        assert_eq!(events[0], ChatEvent::Chunk("partial".into()));
        assert!(matches!(&events[1], ChatEvent::Error(error) if error.kind == ChatErrorKind::Provider));
        assert_eq!(second.calls(), 0);

        // The user's message stays; no partial assistant reply is stored.
        let history = store.history(&session).expect("history should load");
        assert_eq!(history, vec![Message::user("Hello")]);
    }

    #[tokio::test]
    async fn blank_message_is_rejected_without_store_or_provider_activity() {
        let provider =
            ScriptedProvider::new(ProviderId::Groq, Script::StreamOk(vec!["unused".into()]));
        let store = Arc::new(ConversationStore::new(10));
        let service = service_over(vec![(provider.clone(), 10)], store.clone());

        let session = SessionId::new("s4");
        let err = service
            .stream_turn(ChatTurnRequest::new(session.clone(), "   \n\t"))
            .await
            .expect_err("blank message must fail");

        assert_eq!(err.kind, ChatErrorKind::EmptyMessage);
        assert_eq!(provider.calls(), 0);
        assert!(store.history(&session).expect("history should load").is_empty());
    }

    #[tokio::test]
    async fn caller_temperature_is_clamped_into_provider_range() {
        let provider =
            ScriptedProvider::new(ProviderId::Groq, Script::StreamOk(vec!["ok".into()]));
        let store = Arc::new(ConversationStore::new(10));
        let service = service_over(vec![(provider.clone(), 10)], store);

        let stream = service
            .stream_turn(ChatTurnRequest::new("s5", "Hello").with_temperature(9.5))
            .await
            .expect("stream should open");
        drain(stream).await;

        let request = provider.last_request().expect("request should be captured");
        assert_eq!(request.options.temperature, Some(2.0));
        assert_eq!(request.options.max_tokens, Some(1000));
        assert!(request.options.stream);
    }
}
