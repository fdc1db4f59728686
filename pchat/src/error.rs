//! Chat-layer errors and classification.
//!
//! ```rust
//! use pchat::{ChatError, ChatErrorKind};
//!
//! let busy = ChatError::session_busy();
//! assert_eq!(busy.kind, ChatErrorKind::SessionBusy);
//! assert_eq!(busy.wire_kind(), "session_busy");
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};

use pprovider::{ProviderError, ProviderErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatErrorKind {
    EmptyMessage,
    MessageTooLong,
    SessionBusy,
    NoProviderConfigured,
    AllProvidersFailed,
    Provider,
    Store,
}

impl ChatErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmptyMessage => "empty_message",
            Self::MessageTooLong => "message_too_long",
            Self::SessionBusy => "session_busy",
            Self::NoProviderConfigured => "no_provider_configured",
            Self::AllProvidersFailed => "all_providers_failed",
            Self::Provider => "provider",
            Self::Store => "store",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatError {
    pub kind: ChatErrorKind,
    pub message: String,
    /// Classified provider kind for `Provider` and `AllProvidersFailed` errors.
    pub provider_kind: Option<ProviderErrorKind>,
}

impl ChatError {
    pub fn new(kind: ChatErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            provider_kind: None,
        }
    }

    pub fn empty_message() -> Self {
        Self::new(
            ChatErrorKind::EmptyMessage,
            "message must not be empty or whitespace only",
        )
    }

    pub fn message_too_long(max_chars: usize) -> Self {
        Self::new(
            ChatErrorKind::MessageTooLong,
            format!("message exceeds the {max_chars} character bound"),
        )
    }

    pub fn session_busy() -> Self {
        Self::new(
            ChatErrorKind::SessionBusy,
            "another request is in flight for this session",
        )
    }

    pub fn no_provider_configured() -> Self {
        Self::new(
            ChatErrorKind::NoProviderConfigured,
            "no provider holds valid credentials",
        )
    }

    pub fn all_providers_failed(last_error: Option<ProviderError>) -> Self {
        let (message, provider_kind) = match last_error {
            Some(error) => (format!("all providers failed; last error: {error}"), Some(error.kind)),
            None => ("all providers failed".to_string(), None),
        };

        Self {
            kind: ChatErrorKind::AllProvidersFailed,
            message,
            provider_kind,
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Store, message)
    }

    /// Stable label for the wire-level error frame. Provider failures report
    /// their classified kind instead of the generic `provider` label.
    pub fn wire_kind(&self) -> &'static str {
        match (self.kind, self.provider_kind) {
            (ChatErrorKind::Provider, Some(kind)) => kind.as_str(),
            (kind, _) => kind.as_str(),
        }
    }
}

impl Display for ChatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for ChatError {}

impl From<ProviderError> for ChatError {
    fn from(value: ProviderError) -> Self {
        Self {
            kind: ChatErrorKind::Provider,
            message: value.message.clone(),
            provider_kind: Some(value.kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_errors_keep_their_classification() {
        let error = ChatError::from(ProviderError::rate_limited("slow down"));

        assert_eq!(error.kind, ChatErrorKind::Provider);
        assert_eq!(error.provider_kind, Some(ProviderErrorKind::RateLimited));
        assert_eq!(error.wire_kind(), "rate_limited");
    }

    #[test]
    fn all_providers_failed_carries_last_seen_kind() {
        let error =
            ChatError::all_providers_failed(Some(ProviderError::unavailable("backend down")));

        assert_eq!(error.kind, ChatErrorKind::AllProvidersFailed);
        assert_eq!(error.provider_kind, Some(ProviderErrorKind::Unavailable));
        assert_eq!(error.wire_kind(), "all_providers_failed");
        assert!(error.message.contains("backend down"));
    }

    #[test]
    fn validation_errors_use_their_own_wire_labels() {
        assert_eq!(ChatError::empty_message().wire_kind(), "empty_message");
        assert_eq!(
            ChatError::message_too_long(4000).wire_kind(),
            "message_too_long"
        );
        assert_eq!(
            ChatError::no_provider_configured().wire_kind(),
            "no_provider_configured"
        );
    }
}
