//! Tracing-based observability hooks for chat turn phases.
//!
//! ```rust
//! use pchat::TurnHooks;
//! use pobserve::TracingTurnHooks;
//!
//! fn accepts_turn_hooks(_hooks: &dyn TurnHooks) {}
//!
//! let hooks = TracingTurnHooks;
//! accepts_turn_hooks(&hooks);
//! ```

use pchat::{ChatError, TurnHooks};
use pcommon::SessionId;
use pprovider::{ProviderError, ProviderId, TokenUsage};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTurnHooks;

impl TurnHooks for TracingTurnHooks {
    fn on_attempt_start(&self, session: &SessionId, provider: ProviderId, streaming: bool) {
        tracing::info!(
            phase = "turn",
            event = "attempt_start",
            session = %session,
            provider = %provider,
            streaming
        );
    }

    fn on_fallback(&self, session: &SessionId, provider: ProviderId, error: &ProviderError) {
        tracing::warn!(
            phase = "turn",
            event = "fallback",
            session = %session,
            provider = %provider,
            error_kind = ?error.kind,
            retryable = error.retryable,
            error = %error
        );
    }

    fn on_turn_complete(&self, session: &SessionId, provider: ProviderId, usage: TokenUsage) {
        tracing::info!(
            phase = "turn",
            event = "complete",
            session = %session,
            provider = %provider,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            total_tokens = usage.total_tokens
        );
    }

    fn on_turn_failed(&self, session: &SessionId, error: &ChatError) {
        tracing::error!(
            phase = "turn",
            event = "failed",
            session = %session,
            error_kind = ?error.kind,
            wire_kind = error.wire_kind(),
            error = %error
        );
    }
}
