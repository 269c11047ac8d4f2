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

//! Per-agent memory snapshots on disk
//!
//! When an agent leaves the simulation (escape, shutdown) its full
//! associative and spatial memory is written to one JSON document keyed by
//! character name. Position and node-id keyed maps serialize through their
//! composite string forms ("x,y", "ConceptNode_n") so the documents stay
//! plain JSON objects. No versioning or migration.

use crate::cognition::memory::AssociativeMemory;
use crate::cognition::spatial::SpatialMemory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Everything a cognitive agent remembers, in serializable form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub agent: String,
    pub saved_at: DateTime<Utc>,
    pub associative: AssociativeMemory,
    pub spatial: SpatialMemory,
}

/// Writes snapshots into one directory, one file per agent
pub struct SnapshotWriter {
    directory: PathBuf,
}

impl SnapshotWriter {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The file a given agent's memory lands in
    pub fn path_for(&self, agent: &str) -> PathBuf {
        self.directory
            .join(format!("associative_memory_{agent}.json"))
    }

    /// Write a snapshot, creating the directory if needed. Overwrites any
    /// previous snapshot for the same agent.
    pub async fn write(&self, snapshot: &AgentSnapshot) -> Result<PathBuf, PersistenceError> {
        tokio::fs::create_dir_all(&self.directory).await?;
        let path = self.path_for(&snapshot.agent);
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        tokio::fs::write(&path, bytes).await?;
        info!(agent = %snapshot.agent, path = %path.display(), "wrote memory snapshot");
        Ok(path)
    }

    pub async fn read(&self, agent: &str) -> Result<AgentSnapshot, PersistenceError> {
        let bytes = tokio::fs::read(self.path_for(agent)).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
