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

//! Deterministic service doubles for integration tests and benches
//!
//! Unit tests inside the crate mock the service traits directly; code in
//! `tests/` and `benches/` compiles against the library without those mocks,
//! so the offline doubles live here instead.

use crate::cognition::npc::NpcAgent;
use crate::cognition::persona::Persona;
use crate::services::embedding::Embeddings;
use crate::services::text::TextGeneration;
use crate::services::types::{ServiceError, ServiceResult, TemplateInput};
use crate::world::scenario::SimulationSettings;
use async_trait::async_trait;
use duskmoor_common::item::Inventory;
use duskmoor_common::position::Position;
use duskmoor_common::stats::{CombatProfile, StatBlock};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

/// Text generation double. Scripted answers are served first; anything
/// unscripted falls back to a canned answer good enough to drive a whole
/// turn pipeline offline.
pub struct ScriptedText {
    queues: Mutex<BTreeMap<String, VecDeque<String>>>,
}

impl ScriptedText {
    pub fn new() -> Self {
        Self {
            queues: Mutex::new(BTreeMap::new()),
        }
    }

    /// Queue the next response for `template`; queued entries are consumed
    /// in order before any canned answer
    pub fn enqueue(&self, template: &str, response: impl Into<String>) {
        self.queues
            .lock()
            .unwrap()
            .entry(template.to_string())
            .or_default()
            .push_back(response.into());
    }

    fn canned(template: &str, input: &TemplateInput) -> ServiceResult<String> {
        let response = match template {
            "event_poignancy" | "thought_poignancy" | "chat_poignancy" => "3".to_string(),
            "wake_up_hour" => "6".to_string(),
            "generate_planning" => {
                r#"{"duration_minutes": 30, "activity": "keeping watch"}"#.to_string()
            }
            "reaction_schedule" | "interrupting_reaction_schedule" => "none".to_string(),
            "action_triple" => format!(
                "{}||is||{}",
                input.get("agent").unwrap_or("somebody"),
                input.get("activity").unwrap_or("passing the time"),
            ),
            "action_sector" => first_listed(input.get("sectors")),
            "action_object" => "none, false".to_string(),
            "action_character" => "None".to_string(),
            "action_mode_object" | "action_mode_character" => "Wait".to_string(),
            "generate_chat_start" => {
                r#"{"message": "A word with you.", "end": false}"#.to_string()
            }
            "generate_chat" => r#"{"message": "That is all for now.", "end": true}"#.to_string(),
            "chat_summary" => "A brief word in passing.".to_string(),
            "relationship_summary" => "They know each other from the manor.".to_string(),
            "plan_note" => "Keep to the usual rounds.".to_string(),
            "thought_note" => "Nothing out of the ordinary.".to_string(),
            "chat_planning_thought" | "chat_memo_thought" | "generate_currently" => {
                "None".to_string()
            }
            "focal_points" => focal_points_for(input.get("count")),
            "insights" => {
                r#"[{"thought": "The manor is restless tonight", "evidence": [1]}]"#.to_string()
            }
            "trade_item" => {
                r#"{"name": "coin", "quantity": 1, "message": "Take this."}"#.to_string()
            }
            other => {
                return Err(ServiceError::Template(format!(
                    "no canned response for '{other}'"
                )));
            }
        };
        Ok(response)
    }
}

impl Default for ScriptedText {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextGeneration for ScriptedText {
    async fn complete(&self, template: &str, input: &TemplateInput) -> ServiceResult<String> {
        if let Some(next) = self
            .queues
            .lock()
            .unwrap()
            .get_mut(template)
            .and_then(VecDeque::pop_front)
        {
            return Ok(next);
        }
        Self::canned(template, input)
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn first_listed(listed: Option<&str>) -> String {
    listed
        .and_then(|text| text.split(',').next())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or("Grounds")
        .to_string()
}

fn focal_points_for(count: Option<&str>) -> String {
    let count: usize = count.and_then(|text| text.parse().ok()).unwrap_or(3);
    (1..=count)
        .map(|index| format!("What stood out about recent event {index}?"))
        .collect::<Vec<_>>()
        .join(" || ")
}

/// Embedding double: stable vectors folded from the text bytes, so equal
/// strings always embed identically and relevance ranking is reproducible.
pub struct HashEmbeddings {
    dimensions: usize,
}

impl HashEmbeddings {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }
}

impl Default for HashEmbeddings {
    fn default() -> Self {
        Self::new(8)
    }
}

#[async_trait]
impl Embeddings for HashEmbeddings {
    async fn embed(&self, text: &str) -> ServiceResult<Vec<f32>> {
        let mut vector = vec![0f32; self.dimensions];
        for (index, byte) in text.bytes().enumerate() {
            vector[index % self.dimensions] += f32::from(byte) / 255.0;
        }
        let norm = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        Ok(vector)
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "hashed"
    }
}

/// A persona for test characters; `NpcAgent::new` fills in the name
pub fn persona() -> Persona {
    Persona {
        name: String::new(),
        age: 52,
        innate_traits: "dutiful, wary".to_string(),
        learned_traits: "head butler".to_string(),
        currently: "locking up the manor".to_string(),
        lifestyle: "sleeps early, rises at dawn".to_string(),
        daily_plan_requirement: "keep the manor in order".to_string(),
    }
}

/// An NPC with default stats at `position`
pub fn npc(name: &str, position: Position) -> NpcAgent {
    NpcAgent::new(
        name,
        persona(),
        StatBlock::default(),
        CombatProfile::default(),
        Inventory::default(),
        position,
        &SimulationSettings::default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_responses_come_before_canned_ones() {
        let text = ScriptedText::new();
        text.enqueue("event_poignancy", "9");
        text.enqueue("event_poignancy", "7");

        let input = TemplateInput::new();
        assert_eq!(text.complete("event_poignancy", &input).await.unwrap(), "9");
        assert_eq!(text.complete("event_poignancy", &input).await.unwrap(), "7");
        // Queue exhausted: the canned rating takes over.
        assert_eq!(text.complete("event_poignancy", &input).await.unwrap(), "3");
    }

    #[tokio::test]
    async fn test_canned_triple_echoes_the_activity() {
        let text = ScriptedText::new();
        let input = TemplateInput::new()
            .with("agent", "Aldric")
            .with("activity", "keeping watch");
        assert_eq!(
            text.complete("action_triple", &input).await.unwrap(),
            "Aldric||is||keeping watch"
        );
    }

    #[tokio::test]
    async fn test_canned_focal_points_honor_the_count() {
        let text = ScriptedText::new();
        let input = TemplateInput::new().with("count", 2usize);
        let raw = text.complete("focal_points", &input).await.unwrap();
        assert_eq!(raw.split("||").count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_template_is_an_error() {
        let text = ScriptedText::new();
        let result = text.complete("no_such_template", &TemplateInput::new()).await;
        assert!(matches!(result, Err(ServiceError::Template(_))));
    }

    #[tokio::test]
    async fn test_hashed_embeddings_are_stable_and_normalized() {
        let embeddings = HashEmbeddings::default();
        let first = embeddings.embed("the relic chest").await.unwrap();
        let second = embeddings.embed("the relic chest").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 8);

        let norm: f32 = first.iter().map(|value| value * value).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);

        let other = embeddings.embed("a different text").await.unwrap();
        assert_ne!(first, other);
    }
}
