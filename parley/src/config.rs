//! Environment-backed assistant configuration with a programmatic builder.
//!
//! ```rust
//! use parley::AssistantConfig;
//!
//! let config = AssistantConfig::default().with_groq_api_key("gsk_live_123");
//! assert!(config.validate().is_ok());
//! ```

use std::time::Duration;

use pchat::ChatError;
use pprovider::{ProviderId, ProviderPreference};

const DEFAULT_SYSTEM_MESSAGE: &str =
    "You are a helpful, friendly, and knowledgeable AI assistant.";

#[derive(Debug, Clone, PartialEq)]
pub struct AssistantConfig {
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub groq_api_key: Option<String>,
    pub groq_model: String,
    /// `Auto` tries providers in priority order; a pinned provider is tried
    /// first with the rest kept as fallback.
    pub preference: ProviderPreference,
    /// Max retained user/assistant pairs per session.
    pub retention_pairs: usize,
    pub system_preamble: Option<String>,
    pub max_message_chars: usize,
    pub max_reply_tokens: u32,
    pub request_timeout: Duration,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_model: "gpt-3.5-turbo".to_string(),
            groq_api_key: None,
            groq_model: "llama-3.3-70b-versatile".to_string(),
            preference: ProviderPreference::Auto,
            retention_pairs: 10,
            system_preamble: Some(DEFAULT_SYSTEM_MESSAGE.to_string()),
            max_message_chars: 4000,
            max_reply_tokens: 1000,
            request_timeout: Duration::from_secs(90),
        }
    }
}

impl AssistantConfig {
    /// Reads configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through an injectable lookup, which keeps the
    /// parsing logic testable without touching the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            openai_api_key: lookup("OPENAI_API_KEY").filter(|key| !key.trim().is_empty()),
            openai_model: lookup("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            groq_api_key: lookup("GROQ_API_KEY").filter(|key| !key.trim().is_empty()),
            groq_model: lookup("GROQ_MODEL").unwrap_or(defaults.groq_model),
            preference: parse_preference(lookup("AI_PROVIDER").as_deref()),
            retention_pairs: parse_number(
                lookup("MAX_CONVERSATION_HISTORY"),
                defaults.retention_pairs,
            ),
            system_preamble: match lookup("SYSTEM_MESSAGE") {
                Some(message) if message.trim().is_empty() => None,
                Some(message) => Some(message),
                None => defaults.system_preamble,
            },
            max_message_chars: parse_number(
                lookup("MAX_MESSAGE_LENGTH"),
                defaults.max_message_chars,
            ),
            max_reply_tokens: parse_number(
                lookup("MAX_RESPONSE_TOKENS"),
                defaults.max_reply_tokens,
            ),
            request_timeout: Duration::from_secs(parse_number(
                lookup("REQUEST_TIMEOUT_SECS"),
                defaults.request_timeout.as_secs(),
            )),
        }
    }

    pub fn with_openai_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.openai_api_key = Some(api_key.into());
        self
    }

    pub fn with_groq_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.groq_api_key = Some(api_key.into());
        self
    }

    pub fn with_preference(mut self, preference: ProviderPreference) -> Self {
        self.preference = preference;
        self
    }

    pub fn with_retention_pairs(mut self, retention_pairs: usize) -> Self {
        self.retention_pairs = retention_pairs;
        self
    }

    pub fn with_system_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.system_preamble = Some(preamble.into());
        self
    }

    pub fn without_system_preamble(mut self) -> Self {
        self.system_preamble = None;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// At least one provider key must be present.
    pub fn validate(&self) -> Result<(), ChatError> {
        if self.openai_api_key.is_none() && self.groq_api_key.is_none() {
            return Err(ChatError::no_provider_configured());
        }

        Ok(())
    }
}

fn parse_preference(value: Option<&str>) -> ProviderPreference {
    match value.map(|value| value.to_ascii_lowercase()).as_deref() {
        Some("openai") => ProviderPreference::Pinned(ProviderId::OpenAi),
        Some("groq") => ProviderPreference::Pinned(ProviderId::Groq),
        // `auto` and anything unrecognized use the priority order.
        _ => ProviderPreference::Auto,
    }
}

fn parse_number<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}
