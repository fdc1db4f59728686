//! Unified facade over the parley workspace crates.
//!
//! This crate is designed to be the single dependency for most applications.
//! It re-exports the core crates and provides configuration loading and
//! runtime wiring for common setups.
//!
//! ```rust
//! use parley::{AssistantConfig, build_runtime};
//!
//! let config = AssistantConfig::default().with_groq_api_key("gsk_live_123");
//! let runtime = build_runtime(config).expect("runtime should build");
//! assert_eq!(runtime.health().providers.len(), 1);
//! ```

pub mod config;
pub mod providers;
pub mod runtime;

pub use pchat;
pub use pcommon;
pub use pobserve;
pub use pprovider;

pub use pchat::{
    ChatError, ChatErrorKind, ChatEvent, ChatPolicy, ChatService, ChatServiceBuilder,
    ChatTurnReply, ChatTurnRequest, ConversationStore, NoopTurnHooks, RelayStream, SseFrame,
    TurnGuard, TurnHooks, sse_frame,
};
pub use pcommon::{BoxFuture, GenerationOptions, SessionId};
pub use pobserve::{MetricsTurnHooks, TracingTurnHooks};
pub use pprovider::{
    BoxedEventStream, ChatProvider, ChatReply, ChatRequest, ChatRequestBuilder, Message,
    ModelEventStream, ProviderCapability, ProviderDescriptor, ProviderEntry, ProviderError,
    ProviderErrorKind, ProviderFuture, ProviderId, ProviderPreference, ProviderRegistry,
    ProviderRegistryBuilder, Role, SecureCredentialManager, StopReason, StreamEvent, TokenUsage,
    VecEventStream,
};

pub use config::AssistantConfig;
pub use providers::{ProviderBuildConfig, build_provider_from_api_key, build_provider_with_config};
pub use runtime::{AssistantRuntime, HealthReport, ProviderSummary, build_runtime, build_runtime_with};

pub mod prelude {
    pub use crate::{
        AssistantConfig, AssistantRuntime, ChatError, ChatErrorKind, ChatEvent, ChatPolicy,
        ChatService, ChatTurnReply, ChatTurnRequest, ConversationStore, HealthReport, Message,
        ProviderId, ProviderPreference, RelayStream, Role, SessionId, build_runtime, sse_frame,
    };
}
