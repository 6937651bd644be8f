//! Text generation backends used to summarize clusters into narratives.

pub(crate) mod client;
pub mod openai;
pub mod provider;

use async_trait::async_trait;

use crate::ScopeError;

pub use openai::OpenAiGenerationService;
pub use provider::{create_generation_service, GenerationProviderConfig};

/// A single system + user prompt exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl GenerationRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            temperature: 0.9,
            max_tokens: 512,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Service trait for prompt-conditioned text generation.
///
/// Output is free-form; callers extract whatever structure they need.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ScopeError>;

    /// Model identifier, for logs and reports.
    fn model_name(&self) -> &str;

    fn is_available(&self) -> bool;
}

/// Generation disabled. Every call fails with a provider error.
pub struct NoopGenerationService;

#[async_trait]
impl GenerationService for NoopGenerationService {
    async fn generate(&self, _request: &GenerationRequest) -> Result<String, ScopeError> {
        Err(ScopeError::provider(
            "Generation service is not available (disabled)",
        ))
    }

    fn model_name(&self) -> &str {
        "none"
    }

    fn is_available(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_generation_fails() {
        let service = NoopGenerationService;
        assert!(!service.is_available());
        let request = GenerationRequest::new("sys", "user");
        assert!(matches!(
            service.generate(&request).await,
            Err(ScopeError::Provider { .. })
        ));
    }

    #[test]
    fn test_request_builders() {
        let request = GenerationRequest::new("s", "u")
            .with_temperature(0.2)
            .with_max_tokens(64);
        assert_eq!(request.temperature, 0.2);
        assert_eq!(request.max_tokens, 64);
    }
}
