//! Model gateway implementations for parley.
//!
//! All providers implement the `parley_core::Provider` trait.

pub mod openai_compat;

use std::sync::Arc;
use parley_config::AppConfig;
use parley_core::error::ProviderError;
use parley_core::provider::Provider;

pub use openai_compat::OpenAiCompatProvider;

/// Build the configured provider.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let api_key = config
        .api_key
        .clone()
        .ok_or_else(|| ProviderError::NotConfigured("no API key configured".into()))?;

    let provider = OpenAiCompatProvider::new(
        &config.provider.name,
        &config.provider.api_url,
        api_key,
    )
    .with_timeout_secs(config.provider.request_timeout_secs);

    Ok(Arc::new(provider))
}
