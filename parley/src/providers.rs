//! Stable provider construction surface for facade consumers.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use pprovider::{ChatProvider, ProviderError, ProviderId, SecureCredentialManager};

#[derive(Debug, Clone)]
pub struct ProviderBuildConfig {
    pub provider_id: ProviderId,
    pub api_key: String,
    pub timeout: Duration,
}

impl ProviderBuildConfig {
    pub fn new(provider_id: ProviderId, api_key: impl Into<String>) -> Self {
        Self {
            provider_id,
            api_key: api_key.into(),
            timeout: Duration::from_secs(90),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub fn build_provider_from_api_key(
    provider_id: ProviderId,
    api_key: impl Into<String>,
) -> Result<Arc<dyn ChatProvider>, ProviderError> {
    build_provider_with_config(ProviderBuildConfig::new(provider_id, api_key))
}

pub fn build_provider_with_config(
    config: ProviderBuildConfig,
) -> Result<Arc<dyn ChatProvider>, ProviderError> {
    let api_key = config.api_key.trim().to_string();
    if api_key.is_empty() {
        return Err(ProviderError::authentication(
            "provider API key must not be empty",
        ));
    }

    let credentials = Arc::new(SecureCredentialManager::new());
    let http = Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|err| ProviderError::transport(err.to_string()))?;

    match config.provider_id {
        ProviderId::OpenAi => build_openai_provider(credentials, api_key, http),
        ProviderId::Groq => build_groq_provider(credentials, api_key, http),
    }
}

#[cfg(feature = "provider-openai")]
fn build_openai_provider(
    credentials: Arc<SecureCredentialManager>,
    api_key: String,
    http: Client,
) -> Result<Arc<dyn ChatProvider>, ProviderError> {
    credentials.set_openai_api_key(api_key)?;
    let transport = Arc::new(pprovider::adapters::openai::OpenAiHttpTransport::new(http));
    Ok(Arc::new(pprovider::adapters::openai::OpenAiProvider::new(
        credentials,
        transport,
    )))
}

#[cfg(not(feature = "provider-openai"))]
fn build_openai_provider(
    _credentials: Arc<SecureCredentialManager>,
    _api_key: String,
    _http: Client,
) -> Result<Arc<dyn ChatProvider>, ProviderError> {
    Err(ProviderError::not_configured(
        "provider-openai feature is not enabled on parley",
    ))
}

#[cfg(feature = "provider-groq")]
fn build_groq_provider(
    credentials: Arc<SecureCredentialManager>,
    api_key: String,
    http: Client,
) -> Result<Arc<dyn ChatProvider>, ProviderError> {
    credentials.set_groq_api_key(api_key)?;
    let transport = Arc::new(pprovider::adapters::groq::GroqProvider::default_http_transport(http));
    Ok(Arc::new(pprovider::adapters::groq::GroqProvider::new(
        credentials,
        transport,
    )))
}

#[cfg(not(feature = "provider-groq"))]
fn build_groq_provider(
    _credentials: Arc<SecureCredentialManager>,
    _api_key: String,
    _http: Client,
) -> Result<Arc<dyn ChatProvider>, ProviderError> {
    Err(ProviderError::not_configured(
        "provider-groq feature is not enabled on parley",
    ))
}
