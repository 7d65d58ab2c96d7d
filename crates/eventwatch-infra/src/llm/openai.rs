//! OpenAI-compatible chat model used as both classifier and extractor.
//!
//! Uses [`async_openai`] against any OpenAI-compatible base URL. The prompts
//! and reply parsing live in `eventwatch-core`; this type only performs the
//! single-turn chat completion.

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
};
use secrecy::{ExposeSecret, SecretString};

use eventwatch_core::ingest::classifier::{
    Classification, Classifier, classification_prompt, parse_classification,
};
use eventwatch_core::ingest::extractor::{Extractor, extraction_prompt};
use eventwatch_types::config::LlmConfig;
use eventwatch_types::error::PipelineError;

/// Chat-completion backed classifier and extractor.
///
/// Does NOT derive Debug: the `async_openai::Client` holds the API key.
/// Cloning shares the underlying HTTP client.
#[derive(Clone)]
pub struct OpenAiEventModel {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAiEventModel {
    pub fn new(config: &LlmConfig, api_key: &SecretString) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key.expose_secret())
            .with_api_base(&config.base_url);

        Self {
            client: Client::with_config(openai_config),
            model: config.model.clone(),
            temperature: config.temperature,
        }
    }

    /// Build from config, reading the key from `config.api_key_env`.
    ///
    /// Returns `None` when the variable is unset or empty.
    pub fn from_env(config: &LlmConfig) -> Option<Self> {
        let key = std::env::var(&config.api_key_env).ok()?;
        if key.trim().is_empty() {
            return None;
        }
        Some(Self::new(config, &SecretString::from(key)))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, prompt: String) -> CreateChatCompletionRequest {
        CreateChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessage {
                    content: ChatCompletionRequestUserMessageContent::Text(prompt),
                    name: None,
                },
            )],
            temperature: Some(self.temperature),
            ..Default::default()
        }
    }

    /// Send one user prompt and return the first choice's text.
    async fn complete(&self, prompt: String) -> Result<String, String> {
        let response = self
            .client
            .chat()
            .create(self.build_request(prompt))
            .await
            .map_err(|e| e.to_string())?;

        response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| "model returned an empty reply".to_string())
    }
}

impl Classifier for OpenAiEventModel {
    async fn classify(&self, text: &str) -> Result<Classification, PipelineError> {
        let reply = self
            .complete(classification_prompt(text))
            .await
            .map_err(PipelineError::Classifier)?;
        tracing::debug!(reply = %reply, "Classifier reply");
        parse_classification(&reply)
    }
}

impl Extractor for OpenAiEventModel {
    async fn extract(
        &self,
        text: &str,
        existing_summary: Option<&str>,
    ) -> Result<String, PipelineError> {
        self.complete(extraction_prompt(text, existing_summary))
            .await
            .map_err(PipelineError::Extractor)
    }
}
