//! Conversational orchestration over model providers: bounded session
//! history, provider fallback, and incremental reply relay.

mod error;
mod hooks;
mod relay;
mod service;
mod store;
mod types;

pub mod prelude {
    pub use crate::{
        ChatError, ChatErrorKind, ChatEvent, ChatPolicy, ChatService, ChatServiceBuilder,
        ChatTurnReply, ChatTurnRequest, ConversationStore, NoopTurnHooks, RelayStream, SseFrame,
        TurnGuard, TurnHooks, sse_frame,
    };
    pub use pcommon::SessionId;
    pub use pprovider::prelude::*;
}

pub use error::{ChatError, ChatErrorKind};
pub use hooks::{NoopTurnHooks, TurnHooks};
pub use relay::{RelayStream, SseFrame, sse_frame};
pub use service::{ChatPolicy, ChatService, ChatServiceBuilder};
pub use store::{ConversationStore, TurnGuard};
pub use types::{ChatEvent, ChatTurnReply, ChatTurnRequest};
