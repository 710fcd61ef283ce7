//! Model backends behind the `TextGenerator` and `ImageGenerator` seams.

pub mod gemini;
pub mod ollama;
pub mod openai;
pub mod types;

use anyhow::{anyhow, Result};
use async_openai::{config::OpenAIConfig, Client as OpenAIClient};
use async_trait::async_trait;
use ollama_rs::Ollama;
use tracing::info;

pub use gemini::GeminiClient;
pub use types::*;

use crate::environment::{Config, Provider};
use crate::error::ConfigError;

#[derive(Clone, Debug)]
pub enum LLMClient {
    Gemini(GeminiClient),
    OpenAI(OpenAIClient<OpenAIConfig>),
    Ollama(Ollama),
}

#[derive(Clone, Debug)]
pub struct LLMParams {
    pub llm_client: LLMClient,
    pub model: String,
    pub image_model: String,
    pub temperature: f32,
}

impl LLMParams {
    pub fn from_config(config: &Config, http: reqwest::Client) -> Result<Self, ConfigError> {
        let llm_client = match config.provider {
            Provider::Gemini => {
                let api_key = config
                    .gemini_api_key
                    .as_deref()
                    .ok_or(ConfigError::Missing("GEMINI_API_KEY"))?;
                LLMClient::Gemini(GeminiClient::new(api_key, http))
            }
            Provider::OpenAI => {
                let api_key = config
                    .openai_api_key
                    .as_deref()
                    .ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;
                let openai_config = OpenAIConfig::new().with_api_key(api_key);
                LLMClient::OpenAI(OpenAIClient::with_config(openai_config))
            }
            Provider::Ollama => {
                LLMClient::Ollama(Ollama::new(config.ollama_host.clone(), config.ollama_port))
            }
        };
        info!(
            "Using {:?} backend with model {} (image model: {})",
            config.provider,
            config.model,
            if config.image_model.is_empty() { "none" } else { &config.image_model }
        );

        Ok(Self {
            llm_client,
            model: config.model.clone(),
            image_model: config.image_model.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl TextGenerator for LLMParams {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse> {
        match &self.llm_client {
            LLMClient::Gemini(client) => {
                client
                    .generate_content(&self.model, request, self.temperature)
                    .await
            }
            LLMClient::OpenAI(client) => {
                openai::chat(client, &self.model, self.temperature, request).await
            }
            LLMClient::Ollama(client) => {
                ollama::generate(client, &self.model, self.temperature, request).await
            }
        }
    }

    fn supports_web_search(&self) -> bool {
        matches!(self.llm_client, LLMClient::Gemini(_))
    }
}

#[async_trait]
impl ImageGenerator for LLMParams {
    async fn generate_image(&self, request: &ImageRequest) -> Result<GeneratedImage> {
        match &self.llm_client {
            LLMClient::Gemini(client) => client.predict_image(&self.image_model, request).await,
            LLMClient::OpenAI(client) => {
                openai::create_image(client, &self.image_model, request).await
            }
            LLMClient::Ollama(_) => Err(anyhow!("the Ollama backend cannot generate images")),
        }
    }
}
