//! Observation points raised by the chat service during a turn.

use pcommon::SessionId;
use pprovider::{ProviderError, ProviderId, TokenUsage};

use crate::ChatError;

pub trait TurnHooks: Send + Sync {
    fn on_attempt_start(&self, _session: &SessionId, _provider: ProviderId, _streaming: bool) {}

    fn on_fallback(&self, _session: &SessionId, _provider: ProviderId, _error: &ProviderError) {}

    fn on_turn_complete(&self, _session: &SessionId, _provider: ProviderId, _usage: TokenUsage) {}

    fn on_turn_failed(&self, _session: &SessionId, _error: &ChatError) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTurnHooks;

impl TurnHooks for NoopTurnHooks {}
