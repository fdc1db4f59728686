//! Production-friendly observability hooks for chat turn phases.
//!
//! ```rust
//! use pobserve::{MetricsTurnHooks, TracingTurnHooks};
//!
//! let _tracing = TracingTurnHooks;
//! let _metrics = MetricsTurnHooks;
//! ```

mod metrics_hooks;
mod tracing_hooks;

pub use metrics_hooks::MetricsTurnHooks;
pub use tracing_hooks::TracingTurnHooks;

pub mod prelude {
    pub use crate::{MetricsTurnHooks, TracingTurnHooks};
}
