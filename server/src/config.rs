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

use crate::services::embedding::EmbeddingServiceConfig;
use crate::services::text::TextServiceConfig;
use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_env_field::EnvField;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Arguments {
    #[arg(
        short = 'c',
        long = "config",
        help = "Path to configuration file",
        default_value = "server/config.yaml"
    )]
    pub config_file: String,

    #[arg(
        short = 'e',
        long = "env",
        help = "Path to environment file",
        default_value = "server/.env"
    )]
    pub env_file: Option<String>,
}

impl Default for Arguments {
    fn default() -> Self {
        Self {
            config_file: "config.yaml".to_string(),
            env_file: Some(".env".to_string()),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub services: ServicesConfig,

    #[serde(default)]
    pub scenario: ScenarioConfig,

    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl Configuration {
    pub fn load(path: &str) -> Result<Configuration, String> {
        let conf = serde_yaml::from_reader(
            std::fs::File::open(path).map_err(|e| format!("Failed to open config file: {}", e))?,
        )
        .map_err(|e| format!("Failed to parse config file: {}", e))?;

        Ok(conf)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ServicesConfig {
    #[serde(default)]
    pub text: TextProviderConfig,

    #[serde(default)]
    pub embedding: EmbeddingProviderConfig,

    /// Directory of prompt template overrides, applied on top of the built-ins
    pub templates_dir: Option<EnvField<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TextProviderConfig {
    #[serde(default)]
    pub provider: EnvField<ProviderName>,

    #[serde(default)]
    pub endpoint: EnvField<ServiceEndpoint>,

    /// Bearer token for hosted providers, unused by local Ollama
    pub api_key: Option<EnvField<String>>,

    #[serde(default)]
    pub model: EnvField<TextModel>,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl TextProviderConfig {
    pub fn service_config(&self) -> TextServiceConfig {
        TextServiceConfig {
            provider: self.provider.as_str().to_string(),
            endpoint: self.endpoint.as_str().to_string(),
            api_key: self.api_key.as_ref().map(|key| key.as_str().to_string()),
            model: self.model.as_str().to_string(),
            timeout_seconds: self.timeout_seconds,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

impl Default for TextProviderConfig {
    fn default() -> Self {
        Self {
            provider: Default::default(),
            endpoint: Default::default(),
            api_key: None,
            model: Default::default(),
            timeout_seconds: default_timeout_seconds(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EmbeddingProviderConfig {
    #[serde(default)]
    pub provider: EnvField<ProviderName>,

    #[serde(default)]
    pub endpoint: EnvField<ServiceEndpoint>,

    /// Bearer token for hosted providers, unused by local Ollama
    pub api_key: Option<EnvField<String>>,

    #[serde(default)]
    pub model: EnvField<EmbeddingModel>,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Entries held by the in-process embedding cache
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
}

impl EmbeddingProviderConfig {
    pub fn service_config(&self) -> EmbeddingServiceConfig {
        EmbeddingServiceConfig {
            provider: self.provider.as_str().to_string(),
            endpoint: self.endpoint.as_str().to_string(),
            api_key: self.api_key.as_ref().map(|key| key.as_str().to_string()),
            model: self.model.as_str().to_string(),
            timeout_seconds: self.timeout_seconds,
            cache_capacity: self.cache_capacity,
        }
    }
}

impl Default for EmbeddingProviderConfig {
    fn default() -> Self {
        Self {
            provider: Default::default(),
            endpoint: Default::default(),
            api_key: None,
            model: Default::default(),
            timeout_seconds: default_timeout_seconds(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    512
}

fn default_cache_capacity() -> u64 {
    10_000
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub file: EnvField<ScenarioPath>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default)]
    pub snapshot_dir: EnvField<SnapshotDirectory>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProviderName(String);

impl ProviderName {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for ProviderName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl Default for ProviderName {
    fn default() -> Self {
        Self(String::from("ollama"))
    }
}

impl std::fmt::Display for ProviderName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceEndpoint(String);

impl ServiceEndpoint {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for ServiceEndpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim_end_matches('/').to_string()))
    }
}

impl Default for ServiceEndpoint {
    fn default() -> Self {
        Self(String::from("http://localhost:11434"))
    }
}

impl std::fmt::Display for ServiceEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TextModel(String);

impl TextModel {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for TextModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl Default for TextModel {
    fn default() -> Self {
        Self(String::from("llama3.2"))
    }
}

impl std::fmt::Display for TextModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EmbeddingModel(String);

impl EmbeddingModel {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for EmbeddingModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl Default for EmbeddingModel {
    fn default() -> Self {
        Self(String::from("nomic-embed-text"))
    }
}

impl std::fmt::Display for EmbeddingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScenarioPath(String);

impl ScenarioPath {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
    pub fn to_path(&self) -> &Path {
        Path::new(&self.0)
    }
}

impl FromStr for ScenarioPath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl Default for ScenarioPath {
    fn default() -> Self {
        Self(String::from("scenarios/manor.yaml"))
    }
}

impl std::fmt::Display for ScenarioPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotDirectory(String);

impl SnapshotDirectory {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
    pub fn to_path(&self) -> &Path {
        Path::new(&self.0)
    }
}

impl FromStr for SnapshotDirectory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl Default for SnapshotDirectory {
    fn default() -> Self {
        Self(String::from("snapshots"))
    }
}

impl std::fmt::Display for SnapshotDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
