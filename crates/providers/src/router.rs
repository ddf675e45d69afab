//! Provider router — selects the correct LLM provider based on config.

use std::collections::HashMap;
use std::sync::Arc;

use handsfree_core::error::ProviderError;
use handsfree_core::provider::Provider;

use crate::anthropic::AnthropicProvider;
use crate::openai_compat::OpenAiCompatProvider;

/// Routes model requests to the correct provider.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get the default provider.
    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// List all registered provider names.
    pub fn list(&self) -> Vec<&str> {
        self.providers.keys().map(|s| s.as_str()).collect()
    }
}

/// Build the configured provider.
///
/// Fails fast at startup when no API key is available, rather than on the
/// first spoken command.
pub fn build_from_config(
    config: &handsfree_config::AppConfig,
) -> Result<Arc<dyn Provider>, ProviderError> {
    let api_key = config.api_key.clone().ok_or_else(|| {
        ProviderError::NotConfigured(
            "No API key found (set HANDSFREE_API_KEY or ANTHROPIC_API_KEY, or add \
             api_key to ~/.handsfree/config.toml)"
                .into(),
        )
    })?;

    let provider: Arc<dyn Provider> = match config.provider.as_str() {
        "anthropic" => {
            let mut p = AnthropicProvider::new(&api_key);
            if let Some(url) = &config.api_url {
                p = p.with_base_url(url);
            }
            Arc::new(p)
        }
        "openai_compat" => {
            let base_url = config
                .api_url
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".into());
            Arc::new(OpenAiCompatProvider::new("openai_compat", base_url, &api_key))
        }
        other => {
            return Err(ProviderError::NotConfigured(format!(
                "Unknown provider \"{other}\""
            )));
        }
    };

    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn router_register_and_lookup() {
        let mut router = ProviderRouter::new("anthropic");
        let provider = Arc::new(AnthropicProvider::new("sk-ant-test"));
        router.register("anthropic", provider);

        assert!(router.get("anthropic").is_some());
        assert!(router.get("nonexistent").is_none());
        assert!(router.default().is_some());
    }

    #[test]
    fn build_fails_without_api_key() {
        let config = handsfree_config::AppConfig::default();
        let result = build_from_config(&config);
        assert!(matches!(result, Err(ProviderError::NotConfigured(_))));
    }

    #[test]
    fn build_anthropic_with_key() {
        let config = handsfree_config::AppConfig {
            api_key: Some("sk-ant-test".into()),
            ..Default::default()
        };
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "anthropic");
    }

    #[test]
    fn build_openai_compat_with_custom_url() {
        let config = handsfree_config::AppConfig {
            api_key: Some("sk-test".into()),
            provider: "openai_compat".into(),
            api_url: Some("http://localhost:8000/v1".into()),
            ..Default::default()
        };
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "openai_compat");
    }
}
