//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Text generation providers for the cognitive service

use crate::services::templates::{SYSTEM_INSTRUCTION, TemplateRegistry};
use crate::services::types::{ChatMessage, ServiceError, ServiceResult, TemplateInput};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Configuration for a text generation provider
#[derive(Debug, Clone)]
pub struct TextServiceConfig {
    pub provider: String,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_seconds: u64,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl TextServiceConfig {
    /// OpenAI-compatible configuration with the hosted endpoint
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: "openai".to_string(),
            endpoint: "https://api.openai.com/v1".to_string(),
            api_key: Some(api_key.into()),
            model: model.into(),
            timeout_seconds: 30,
            temperature: 0.7,
            max_tokens: 512,
        }
    }

    /// Local Ollama configuration
    pub fn ollama(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: "ollama".to_string(),
            endpoint: endpoint.into(),
            api_key: None,
            model: model.into(),
            timeout_seconds: 30,
            temperature: 0.7,
            max_tokens: 512,
        }
    }
}

/// A service that completes a rendered prompt template into text
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGeneration: Send + Sync {
    /// Render the named template with `input` and complete it
    async fn complete(&self, template: &str, input: &TemplateInput) -> ServiceResult<String>;

    /// Health probe
    async fn is_available(&self) -> bool;

    /// Provider name for logs and metrics
    fn name(&self) -> &str;
}

/// OpenAI chat-completions text generation
pub struct OpenAiTextGeneration {
    config: TextServiceConfig,
    registry: TemplateRegistry,
    client: reqwest::Client,
}

impl OpenAiTextGeneration {
    pub fn new(config: TextServiceConfig, registry: TemplateRegistry) -> ServiceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ServiceError::Config(format!("http client: {e}")))?;
        Ok(Self {
            config,
            registry,
            client,
        })
    }
}

#[async_trait]
impl TextGeneration for OpenAiTextGeneration {
    async fn complete(&self, template: &str, input: &TemplateInput) -> ServiceResult<String> {
        #[derive(Serialize)]
        struct CompletionRequest<'a> {
            model: &'a str,
            messages: Vec<ChatMessage>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct CompletionResponse {
            choices: Vec<CompletionChoice>,
        }
        #[derive(Deserialize)]
        struct CompletionChoice {
            message: CompletionMessage,
        }
        #[derive(Deserialize)]
        struct CompletionMessage {
            content: String,
        }

        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| ServiceError::Auth("OpenAI API key not configured".to_string()))?;
        let prompt = self.registry.render(template, input)?;
        let body = CompletionRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage::system(SYSTEM_INSTRUCTION),
                ChatMessage::user(prompt),
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        debug!(template, model = %self.config.model, "openai completion request");
        let started = Instant::now();
        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.endpoint))
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;
        metrics::histogram!("service.text.duration", "provider" => "openai")
            .record(started.elapsed().as_secs_f64());

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(ServiceError::Auth(format!("OpenAI rejected key: {status}")));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ServiceError::Api(format!("OpenAI {status}: {detail}")));
        }
        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Api(format!("OpenAI response parse: {e}")))?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ServiceError::Api("OpenAI returned no choices".to_string()))?;
        metrics::counter!("service.text.requests", "provider" => "openai").increment(1);
        Ok(content)
    }

    async fn is_available(&self) -> bool {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return false;
        };
        self.client
            .get(format!("{}/models", self.config.endpoint))
            .header("Authorization", format!("Bearer {api_key}"))
            .send()
            .await
            .map(|response| response.status().is_success())
            .unwrap_or(false)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// Ollama chat text generation for local models
pub struct OllamaTextGeneration {
    config: TextServiceConfig,
    registry: TemplateRegistry,
    client: reqwest::Client,
}

impl OllamaTextGeneration {
    pub fn new(config: TextServiceConfig, registry: TemplateRegistry) -> ServiceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ServiceError::Config(format!("http client: {e}")))?;
        Ok(Self {
            config,
            registry,
            client,
        })
    }
}

#[async_trait]
impl TextGeneration for OllamaTextGeneration {
    async fn complete(&self, template: &str, input: &TemplateInput) -> ServiceResult<String> {
        #[derive(Serialize)]
        struct OllamaOptions {
            temperature: f32,
        }
        #[derive(Serialize)]
        struct OllamaRequest<'a> {
            model: &'a str,
            messages: Vec<ChatMessage>,
            stream: bool,
            options: OllamaOptions,
        }
        #[derive(Deserialize)]
        struct OllamaResponse {
            message: OllamaMessage,
        }
        #[derive(Deserialize)]
        struct OllamaMessage {
            content: String,
        }

        let prompt = self.registry.render(template, input)?;
        let body = OllamaRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage::system(SYSTEM_INSTRUCTION),
                ChatMessage::user(prompt),
            ],
            stream: false,
            options: OllamaOptions {
                temperature: self.config.temperature,
            },
        };

        debug!(template, model = %self.config.model, "ollama completion request");
        let started = Instant::now();
        let response = self
            .client
            .post(format!("{}/api/chat", self.config.endpoint))
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;
        metrics::histogram!("service.text.duration", "provider" => "ollama")
            .record(started.elapsed().as_secs_f64());

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ServiceError::Api(format!("Ollama {status}: {detail}")));
        }
        let completion: OllamaResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Api(format!("Ollama response parse: {e}")))?;
        metrics::counter!("service.text.requests", "provider" => "ollama").increment(1);
        Ok(completion.message.content)
    }

    async fn is_available(&self) -> bool {
        self.client
            .get(format!("{}/api/tags", self.config.endpoint))
            .send()
            .await
            .map(|response| response.status().is_success())
            .unwrap_or(false)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// Build the configured text generation provider
pub fn build_text_generation(
    config: TextServiceConfig,
    registry: TemplateRegistry,
) -> ServiceResult<Arc<dyn TextGeneration>> {
    match config.provider.to_lowercase().as_str() {
        "openai" => Ok(Arc::new(OpenAiTextGeneration::new(config, registry)?)),
        "ollama" => Ok(Arc::new(OllamaTextGeneration::new(config, registry)?)),
        other => {
            warn!(provider = other, "unknown text generation provider");
            Err(ServiceError::Config(format!(
                "unknown text generation provider '{other}'"
            )))
        }
    }
}


// Made with Bob
