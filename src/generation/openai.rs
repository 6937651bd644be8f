use async_trait::async_trait;

use crate::generation::client::{ChatMessage, ChatRequest, OpenAiClient};
use crate::generation::{GenerationRequest, GenerationService};
use crate::ScopeError;

/// Chat-completions generation against any OpenAI-compatible server.
pub struct OpenAiGenerationService {
    client: OpenAiClient,
    model: String,
}

impl OpenAiGenerationService {
    pub fn new(base_url: &str, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client: OpenAiClient::new(base_url, api_key),
            model: model.into(),
        }
    }
}

#[async_trait]
impl GenerationService for OpenAiGenerationService {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ScopeError> {
        let chat = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: request.system.clone(),
                },
                ChatMessage {
                    role: "user",
                    content: request.user.clone(),
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };
        self.client.chat(&chat).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn is_available(&self) -> bool {
        true
    }
}
