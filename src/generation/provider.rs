//! Generation provider configuration and factory.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::embedding::provider::resolve_api_key;
use crate::generation::{GenerationService, NoopGenerationService, OpenAiGenerationService};
use crate::ScopeError;

/// Generation provider configuration (`[generation]` table of `config.toml`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum GenerationProviderConfig {
    /// OpenAI-compatible chat completions (default points at a local Ollama).
    #[serde(rename = "openai")]
    OpenAi {
        #[serde(default = "default_base_url")]
        base_url: String,
        #[serde(default = "default_model")]
        model: String,
        #[serde(default)]
        api_key_env: Option<String>,
        #[serde(default = "default_temperature")]
        temperature: f32,
        #[serde(default = "default_max_tokens")]
        max_tokens: u32,
    },
    /// No generation backend; narrative generation fails fast.
    Disabled,
}

fn default_base_url() -> String {
    "http://localhost:11434/v1".to_string()
}

fn default_model() -> String {
    "mistral-nemo".to_string()
}

fn default_temperature() -> f32 {
    0.9
}

fn default_max_tokens() -> u32 {
    512
}

impl Default for GenerationProviderConfig {
    fn default() -> Self {
        Self::OpenAi {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl GenerationProviderConfig {
    /// Sampling settings applied to every summarization prompt.
    pub fn sampling(&self) -> (f32, u32) {
        match self {
            Self::OpenAi {
                temperature,
                max_tokens,
                ..
            } => (*temperature, *max_tokens),
            Self::Disabled => (default_temperature(), default_max_tokens()),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::OpenAi { model, .. } => format!("openai:{}", model),
            Self::Disabled => "disabled".to_string(),
        }
    }
}

/// Create a generation service from provider configuration.
pub fn create_generation_service(
    config: &GenerationProviderConfig,
) -> Result<Arc<dyn GenerationService>, ScopeError> {
    match config {
        GenerationProviderConfig::OpenAi {
            base_url,
            model,
            api_key_env,
            ..
        } => {
            let api_key = resolve_api_key(api_key_env.as_deref())?;
            info!("Using generation model {} at {}", model, base_url);
            Ok(Arc::new(OpenAiGenerationService::new(
                base_url,
                api_key,
                model.clone(),
            )))
        }
        GenerationProviderConfig::Disabled => Ok(Arc::new(NoopGenerationService)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_target_local_server() {
        let config = GenerationProviderConfig::default();
        assert_eq!(config.label(), "openai:mistral-nemo");
        assert_eq!(config.sampling(), (0.9, 512));
    }

    #[test]
    fn test_disabled_creates_unavailable_service() {
        let config: GenerationProviderConfig = toml::from_str(r#"provider = "disabled""#).unwrap();
        let service = create_generation_service(&config).unwrap();
        assert!(!service.is_available());
    }

    #[test]
    fn test_partial_openai_config_fills_defaults() {
        let config: GenerationProviderConfig =
            toml::from_str("provider = \"openai\"\nmodel = \"gpt-4o-mini\"\ntemperature = 0.3\n")
                .unwrap();
        assert_eq!(config.sampling(), (0.3, 512));
        assert_eq!(config.label(), "openai:gpt-4o-mini");
    }
}
