//! Metrics-based observability hooks for chat turn phases.
//!
//! ```rust
//! use pchat::TurnHooks;
//! use pobserve::MetricsTurnHooks;
//!
//! fn accepts_turn_hooks(_hooks: &dyn TurnHooks) {}
//!
//! let hooks = MetricsTurnHooks;
//! accepts_turn_hooks(&hooks);
//! ```

use pchat::{ChatError, TurnHooks};
use pcommon::SessionId;
use pprovider::{ProviderError, ProviderId, TokenUsage};

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsTurnHooks;

impl TurnHooks for MetricsTurnHooks {
    fn on_attempt_start(&self, _session: &SessionId, provider: ProviderId, streaming: bool) {
        metrics::counter!(
            "parley_turn_attempt_start_total",
            "provider" => provider.to_string(),
            "streaming" => streaming.to_string()
        )
        .increment(1);
    }

    fn on_fallback(&self, _session: &SessionId, provider: ProviderId, error: &ProviderError) {
        metrics::counter!(
            "parley_turn_fallback_total",
            "provider" => provider.to_string(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
    }

    fn on_turn_complete(&self, _session: &SessionId, provider: ProviderId, usage: TokenUsage) {
        metrics::counter!(
            "parley_turn_complete_total",
            "provider" => provider.to_string()
        )
        .increment(1);
        metrics::histogram!(
            "parley_turn_total_tokens",
            "provider" => provider.to_string()
        )
        .record(usage.total_tokens as f64);
    }

    fn on_turn_failed(&self, _session: &SessionId, error: &ChatError) {
        metrics::counter!(
            "parley_turn_failed_total",
            "error_kind" => error.wire_kind().to_string()
        )
        .increment(1);
    }
}
