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

//! Chat transcripts

use serde::{Deserialize, Serialize};

/// One line of dialogue in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub speaker: String,
    pub content: String,
}

impl ChatEntry {
    /// Create a new chat entry
    pub fn new(speaker: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            content: content.into(),
        }
    }
}

/// Render a transcript as "Speaker: line" rows, one per entry
pub fn transcript(entries: &[ChatEntry]) -> String {
    entries
        .iter()
        .map(|entry| format!("{}: {}", entry.speaker, entry.content))
        .collect::<Vec<_>>()
        .join("\n")
}
