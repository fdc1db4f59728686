//! Chat turn and caller-visible stream event types.

use pcommon::SessionId;
use pprovider::{ProviderId, TokenUsage};

use crate::ChatError;

#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurnRequest {
    pub session_id: SessionId,
    pub message: String,
    pub temperature: Option<f32>,
}

impl ChatTurnRequest {
    pub fn new(session_id: impl Into<SessionId>, message: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            message: message.into(),
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// One full assistant turn as returned by the blocking path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurnReply {
    pub session_id: SessionId,
    pub message: String,
    pub provider: ProviderId,
    pub model: String,
    pub usage: TokenUsage,
}

/// Caller-visible stream event union. Each request produces zero or more
/// `Chunk`s followed by exactly one terminal event (`Done` or `Error`).
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    Chunk(String),
    Error(ChatError),
    Done {
        provider: ProviderId,
        model: String,
        usage: TokenUsage,
    },
}

impl ChatEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error(_) | Self::Done { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_events_are_done_and_error() {
        assert!(!ChatEvent::Chunk("hi".into()).is_terminal());
        assert!(ChatEvent::Error(ChatError::session_busy()).is_terminal());
        assert!(
            ChatEvent::Done {
                provider: ProviderId::Groq,
                model: "llama-3.3-70b-versatile".into(),
                usage: TokenUsage::default(),
            }
            .is_terminal()
        );
    }
}
