//! Runtime wiring: configuration in, transport-facing operations out.

use std::sync::Arc;

use pchat::{
    ChatError, ChatPolicy, ChatService, ChatTurnReply, ChatTurnRequest, ConversationStore,
    RelayStream, TurnHooks,
};
use pcommon::SessionId;
use pprovider::{
    Message, ProviderDescriptor, ProviderId, ProviderPreference, ProviderRegistry,
};
use pobserve::TracingTurnHooks;

use crate::config::AssistantConfig;
use crate::providers::{ProviderBuildConfig, build_provider_with_config};

// Auto order tries Groq first: faster and cheaper for interactive chat.
const GROQ_PRIORITY: u32 = 20;
const OPENAI_PRIORITY: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSummary {
    pub id: ProviderId,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    pub preference: ProviderPreference,
    pub selected: Option<ProviderId>,
    pub providers: Vec<ProviderSummary>,
}

#[derive(Clone)]
pub struct AssistantRuntime {
    registry: Arc<ProviderRegistry>,
    store: Arc<ConversationStore>,
    chat: ChatService,
}

impl std::fmt::Debug for AssistantRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantRuntime").finish_non_exhaustive()
    }
}

/// Builds the full runtime from configuration: one client per configured
/// provider key, the priority-ordered registry, the bounded store, and the
/// chat service with tracing hooks installed.
pub fn build_runtime(config: AssistantConfig) -> Result<AssistantRuntime, ChatError> {
    config.validate()?;

    let mut builder = ProviderRegistry::builder();

    if let Some(api_key) = &config.groq_api_key {
        let client = build_provider_with_config(
            ProviderBuildConfig::new(ProviderId::Groq, api_key)
                .with_timeout(config.request_timeout),
        )?;
        builder = builder.register(
            ProviderDescriptor::new(ProviderId::Groq, config.groq_model.clone(), GROQ_PRIORITY),
            client,
        );
    }

    if let Some(api_key) = &config.openai_api_key {
        let client = build_provider_with_config(
            ProviderBuildConfig::new(ProviderId::OpenAi, api_key)
                .with_timeout(config.request_timeout),
        )?;
        builder = builder.register(
            ProviderDescriptor::new(
                ProviderId::OpenAi,
                config.openai_model.clone(),
                OPENAI_PRIORITY,
            ),
            client,
        );
    }

    let registry = Arc::new(builder.preference(config.preference).build()?);

    let mut store = ConversationStore::new(config.retention_pairs);
    if let Some(preamble) = &config.system_preamble {
        store = store.with_preamble(preamble.clone());
    }
    let store = Arc::new(store);

    let policy = ChatPolicy {
        max_message_chars: config.max_message_chars,
        max_reply_tokens: Some(config.max_reply_tokens),
        ..ChatPolicy::default()
    };

    Ok(build_runtime_with(
        registry,
        store,
        policy,
        Arc::new(TracingTurnHooks),
    ))
}

/// Wires a runtime from already-built parts. Lets tests and embedders supply
/// their own registry, store, or hooks.
pub fn build_runtime_with(
    registry: Arc<ProviderRegistry>,
    store: Arc<ConversationStore>,
    policy: ChatPolicy,
    hooks: Arc<dyn TurnHooks>,
) -> AssistantRuntime {
    let chat = ChatService::builder(Arc::clone(&registry), Arc::clone(&store))
        .policy(policy)
        .hooks(hooks)
        .build();

    AssistantRuntime {
        registry,
        store,
        chat,
    }
}

impl AssistantRuntime {
    pub fn chat(&self) -> &ChatService {
        &self.chat
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    /// Blocking chat path: the whole reply is returned as one unit.
    pub async fn handle_chat(
        &self,
        session_id: impl Into<SessionId>,
        message: impl Into<String>,
        temperature: Option<f32>,
    ) -> Result<ChatTurnReply, ChatError> {
        self.chat.run_turn(turn_request(session_id, message, temperature)).await
    }

    /// Streaming chat path: returns the relay the transport layer drains.
    pub async fn handle_chat_streaming(
        &self,
        session_id: impl Into<SessionId>,
        message: impl Into<String>,
        temperature: Option<f32>,
    ) -> Result<RelayStream, ChatError> {
        self.chat
            .stream_turn(turn_request(session_id, message, temperature))
            .await
    }

    pub fn clear_session(&self, session_id: &SessionId) -> Result<(), ChatError> {
        self.store.clear(session_id)
    }

    /// Retained turns for display; the system preamble is excluded.
    pub fn history(&self, session_id: &SessionId) -> Result<Vec<Message>, ChatError> {
        self.store.history(session_id)
    }

    pub fn health(&self) -> HealthReport {
        HealthReport {
            preference: self.registry.preference(),
            selected: self
                .registry
                .selected()
                .map(|entry| entry.descriptor.id),
            providers: self
                .registry
                .entries()
                .iter()
                .map(|entry| ProviderSummary {
                    id: entry.descriptor.id,
                    model: entry.descriptor.model.clone(),
                })
                .collect(),
        }
    }
}

fn turn_request(
    session_id: impl Into<SessionId>,
    message: impl Into<String>,
    temperature: Option<f32>,
) -> ChatTurnRequest {
    let mut request = ChatTurnRequest::new(session_id, message);
    request.temperature = temperature;
    request
}
