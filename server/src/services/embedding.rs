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

//! Embedding providers backing memory relevance scoring

use crate::services::types::{ServiceError, ServiceResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for an embedding provider
#[derive(Debug, Clone)]
pub struct EmbeddingServiceConfig {
    pub provider: String,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_seconds: u64,
    /// Entries held by the in-process cache in front of the provider
    pub cache_capacity: u64,
}

impl EmbeddingServiceConfig {
    /// OpenAI-compatible configuration with the hosted endpoint
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: "openai".to_string(),
            endpoint: "https://api.openai.com/v1".to_string(),
            api_key: Some(api_key.into()),
            model: model.into(),
            timeout_seconds: 30,
            cache_capacity: 10_000,
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
            cache_capacity: 10_000,
        }
    }
}

/// A service producing vector embeddings for text
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Embeddings: Send + Sync {
    /// Embed a piece of text
    async fn embed(&self, text: &str) -> ServiceResult<Vec<f32>>;

    /// Health probe
    async fn is_available(&self) -> bool;

    /// Provider name for logs and metrics
    fn name(&self) -> &str;
}

/// OpenAI embeddings endpoint
pub struct OpenAiEmbeddings {
    config: EmbeddingServiceConfig,
    client: reqwest::Client,
}

impl OpenAiEmbeddings {
    pub fn new(config: EmbeddingServiceConfig) -> ServiceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ServiceError::Config(format!("http client: {e}")))?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl Embeddings for OpenAiEmbeddings {
    async fn embed(&self, text: &str) -> ServiceResult<Vec<f32>> {
        #[derive(Serialize)]
        struct EmbeddingRequest<'a> {
            model: &'a str,
            input: &'a str,
        }
        #[derive(Deserialize)]
        struct EmbeddingResponse {
            data: Vec<EmbeddingData>,
        }
        #[derive(Deserialize)]
        struct EmbeddingData {
            embedding: Vec<f32>,
        }

        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| ServiceError::Auth("OpenAI API key not configured".to_string()))?;
        let response = self
            .client
            .post(format!("{}/embeddings", self.config.endpoint))
            .header("Authorization", format!("Bearer {api_key}"))
            .json(&EmbeddingRequest {
                model: &self.config.model,
                input: text,
            })
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(ServiceError::Auth(format!("OpenAI rejected key: {status}")));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ServiceError::Api(format!("OpenAI {status}: {detail}")));
        }
        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Api(format!("OpenAI response parse: {e}")))?;
        let vector = parsed
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| ServiceError::Api("OpenAI returned no embedding".to_string()))?;
        metrics::counter!("service.embedding.requests", "provider" => "openai").increment(1);
        Ok(vector)
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

/// Ollama embeddings endpoint for local models
pub struct OllamaEmbeddings {
    config: EmbeddingServiceConfig,
    client: reqwest::Client,
}

impl OllamaEmbeddings {
    pub fn new(config: EmbeddingServiceConfig) -> ServiceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ServiceError::Config(format!("http client: {e}")))?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl Embeddings for OllamaEmbeddings {
    async fn embed(&self, text: &str) -> ServiceResult<Vec<f32>> {
        #[derive(Serialize)]
        struct EmbeddingRequest<'a> {
            model: &'a str,
            prompt: &'a str,
        }
        #[derive(Deserialize)]
        struct EmbeddingResponse {
            embedding: Vec<f32>,
        }

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.config.endpoint))
            .json(&EmbeddingRequest {
                model: &self.config.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ServiceError::Api(format!("Ollama {status}: {detail}")));
        }
        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::Api(format!("Ollama response parse: {e}")))?;
        metrics::counter!("service.embedding.requests", "provider" => "ollama").increment(1);
        Ok(parsed.embedding)
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

/// Caching layer over any embedding provider.
///
/// Agents re-embed the same descriptions constantly (focal points, repeated
/// events), so a small in-process cache removes most provider round trips.
pub struct CachedEmbeddings {
    inner: Arc<dyn Embeddings>,
    cache: moka::future::Cache<String, Vec<f32>>,
}

impl CachedEmbeddings {
    pub fn new(inner: Arc<dyn Embeddings>, capacity: u64) -> Self {
        let cache = moka::future::Cache::builder()
            .max_capacity(capacity)
            .time_to_idle(Duration::from_secs(3600))
            .build();
        Self { inner, cache }
    }
}

#[async_trait]
impl Embeddings for CachedEmbeddings {
    async fn embed(&self, text: &str) -> ServiceResult<Vec<f32>> {
        if let Some(vector) = self.cache.get(text).await {
            metrics::counter!("service.embedding.cache.hits").increment(1);
            return Ok(vector);
        }
        metrics::counter!("service.embedding.cache.misses").increment(1);
        let vector = self.inner.embed(text).await?;
        self.cache.insert(text.to_string(), vector.clone()).await;
        debug!(len = vector.len(), "cached new embedding");
        Ok(vector)
    }

    async fn is_available(&self) -> bool {
        self.inner.is_available().await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

/// Build the configured embedding provider, wrapped in the cache
pub fn build_embeddings(config: EmbeddingServiceConfig) -> ServiceResult<Arc<dyn Embeddings>> {
    let capacity = config.cache_capacity;
    let inner: Arc<dyn Embeddings> = match config.provider.to_lowercase().as_str() {
        "openai" => Arc::new(OpenAiEmbeddings::new(config)?),
        "ollama" => Arc::new(OllamaEmbeddings::new(config)?),
        other => {
            warn!(provider = other, "unknown embedding provider");
            return Err(ServiceError::Config(format!(
                "unknown embedding provider '{other}'"
            )));
        }
    };
    Ok(Arc::new(CachedEmbeddings::new(inner, capacity)))
}


// Made with Bob
