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

//! The simulated character
//!
//! An [`NpcAgent`] owns everything one character knows: its persona, its
//! associative and spatial memory, its in-progress action, and the
//! accumulators that trigger reflection. The turn pipeline itself lives in
//! the sibling modules (`perceive`, `retrieve`, `plan`, `reflect`, `act`,
//! `chat`); this type wires them together behind the [`Agent`] trait.

use crate::cognition::action::ActionState;
use crate::cognition::agent::{Agent, AgentKind, TurnError};
use crate::cognition::chat::ChatContext;
use crate::cognition::memory::{AssociativeMemory, NodeId};
use crate::cognition::persona::Persona;
use crate::cognition::spatial::SpatialMemory;
use crate::cognition::{act, chat, perceive, plan, reflect, retrieve};
use crate::context::WorldContext;
use crate::persistence::AgentSnapshot;
use crate::world::grid::{RELIC_ITEM, TileGrid};
use crate::world::scenario::SimulationSettings;
use async_trait::async_trait;
use chrono::Utc;
use duskmoor_common::chat::ChatEntry;
use duskmoor_common::item::Inventory;
use duskmoor_common::position::Position;
use duskmoor_common::stats::{CombatProfile, StatBlock};
use duskmoor_common::triple::EventTriple;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, instrument};

/// A character driven by the cognition pipeline
pub struct NpcAgent {
    pub(crate) persona: Persona,
    pub(crate) stats: StatBlock,
    pub(crate) combat: CombatProfile,
    pub(crate) hit_points: i32,
    pub(crate) inventory: Inventory,
    pub(crate) position: Position,
    pub(crate) vision_radius: f32,
    pub(crate) recency_decay: f32,
    pub(crate) importance_trigger: u32,
    pub(crate) importance_accumulator: u32,
    pub(crate) reflection_count: usize,
    pub(crate) perceived_missing_relic: bool,
    pub(crate) memory: AssociativeMemory,
    pub(crate) spatial: SpatialMemory,
    pub(crate) action: ActionState,
    pub(crate) chat_context: Option<ChatContext>,
    pub(crate) cleaning_up: Arc<AtomicBool>,
    pub(crate) escaping: bool,
}

impl NpcAgent {
    pub fn new(
        name: impl Into<String>,
        mut persona: Persona,
        stats: StatBlock,
        combat: CombatProfile,
        inventory: Inventory,
        position: Position,
        settings: &SimulationSettings,
    ) -> Self {
        let name = name.into();
        // The persona file never repeats the character name; it comes from
        // the scenario entry.
        persona.name = name.clone();
        let action = ActionState::idle(&name);
        Self {
            persona,
            stats,
            hit_points: combat.max_hit_points,
            combat,
            inventory,
            position,
            vision_radius: settings.vision_radius,
            recency_decay: settings.recency_decay,
            importance_trigger: settings.importance_trigger,
            importance_accumulator: 0,
            reflection_count: 0,
            perceived_missing_relic: false,
            memory: AssociativeMemory::new(),
            spatial: SpatialMemory::new(),
            action,
            chat_context: None,
            cleaning_up: Arc::new(AtomicBool::new(false)),
            escaping: false,
        }
    }

    /// Give the agent its initial picture of the world
    pub fn seed_spatial(&mut self, grid: &TileGrid) {
        self.spatial = SpatialMemory::seed_from_grid(grid);
    }

    /// The flag other parties poll before touching this agent while a chat
    /// digest may be in flight
    pub fn cleaning_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cleaning_up)
    }

    pub fn memory(&self) -> &AssociativeMemory {
        &self.memory
    }

    pub fn spatial(&self) -> &SpatialMemory {
        &self.spatial
    }

    pub(crate) fn carrying_relic(&self) -> bool {
        self.inventory.contains(RELIC_ITEM)
    }

    /// Reuse a stored embedding for `text` or fetch a fresh one
    pub(crate) async fn embedding_for(
        &self,
        ctx: &WorldContext,
        text: &str,
    ) -> Result<Vec<f32>, TurnError> {
        match self.memory.embedding(text) {
            Some(vector) => Ok(vector.to_vec()),
            None => Ok(ctx.embeddings.embed(text).await?),
        }
    }

    /// Turn a free-text realization into a full Thought node: derive its
    /// triple, score it, embed it, commit it with `citations`.
    pub(crate) async fn commit_thought(
        &mut self,
        ctx: &WorldContext,
        text: &str,
        citations: Vec<NodeId>,
    ) -> Result<NodeId, TurnError> {
        let triple = ctx.oracle.action_triple(&self.persona.name, text).await?;
        let poignancy = ctx.oracle.thought_poignancy(&self.persona, text).await?;
        let embedding = self.embedding_for(ctx, text).await?;
        let keywords = triple_keywords(&triple);
        let now = ctx.now().await;
        Ok(self
            .memory
            .add_thought(now, None, triple, text, text, embedding, poignancy, keywords, citations))
    }

    /// Walk toward the action address if it is out of reach, then act once
    /// within reach (on or adjacent to the address)
    async fn advance(&mut self, ctx: &WorldContext) -> Result<(), TurnError> {
        let Some(address) = self.action.address else {
            return Ok(());
        };
        if !self.within_reach(address) {
            let now = ctx.now().await;
            let carrying = self.carrying_relic();
            let steps = self.combat.speed.max(1) as usize;
            let mut grid = ctx.grid.write().await;
            let next = grid.find_path_to_adjacent(self.position, address, steps);
            if next == self.position {
                grid.remain_in_place(&self.persona.name, self.position, now);
            } else {
                grid.register_movement(&self.persona.name, self.position, next, now, carrying);
                self.position = next;
            }
        }
        if self.within_reach(address) {
            act::act(self, ctx).await?;
        }
        Ok(())
    }

    fn within_reach(&self, address: Position) -> bool {
        self.position == address || self.position.is_adjacent(&address)
    }
}

fn triple_keywords(triple: &EventTriple) -> BTreeSet<String> {
    let mut keywords = BTreeSet::new();
    keywords.insert(triple.subject.clone());
    keywords.insert(triple.predicate.clone());
    if let Some(object) = &triple.object {
        keywords.insert(object.clone());
    }
    keywords
}

#[async_trait]
impl Agent for NpcAgent {
    fn name(&self) -> &str {
        &self.persona.name
    }

    fn kind(&self) -> AgentKind {
        AgentKind::Npc
    }

    fn position(&self) -> Position {
        self.position
    }

    fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    fn dexterity(&self) -> u32 {
        self.stats.dexterity
    }

    fn is_dead(&self) -> bool {
        self.hit_points <= 0
    }

    fn is_escaping(&self) -> bool {
        self.escaping
    }

    fn armor_class(&self) -> i32 {
        self.combat.armor_class
    }

    fn apply_damage(&mut self, damage: i32) -> i32 {
        self.hit_points -= damage;
        self.hit_points
    }

    fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    fn inventory_mut(&mut self) -> &mut Inventory {
        &mut self.inventory
    }

    #[instrument(skip_all, fields(agent = %self.persona.name))]
    async fn take_turn(&mut self, ctx: &WorldContext) -> Result<(), TurnError> {
        if self.is_dead() {
            return Ok(());
        }
        if self.importance_accumulator >= self.importance_trigger {
            reflect::reflect(self, ctx).await?;
        }
        let perceived = perceive::perceive(self, ctx).await?;
        let bundles = retrieve::retrieve(self, &perceived);
        plan::plan(self, ctx, &bundles).await?;
        self.advance(ctx).await
    }

    async fn receive_message(
        &mut self,
        message: &str,
        from: &str,
        history: &[ChatEntry],
        sequence: u32,
        ctx: &WorldContext,
    ) -> Result<(String, bool), TurnError> {
        chat::reply(self, ctx, message, from, history, sequence).await
    }

    async fn end_chat(
        &mut self,
        reason: &str,
        transcript: &[ChatEntry],
        ctx: &WorldContext,
    ) -> Result<(), TurnError> {
        // Guard the digest so a scheduled turn or a new incoming chat
        // cannot observe half-committed chat memory.
        self.cleaning_up.store(true, Ordering::SeqCst);
        let outcome = chat::digest(self, ctx, reason, transcript).await;
        self.chat_context = None;
        self.cleaning_up.store(false, Ordering::SeqCst);
        outcome
    }

    async fn receive_item(
        &mut self,
        item: &str,
        quantity: u32,
        sender: &str,
        message: &str,
        ctx: &WorldContext,
    ) -> Result<(), TurnError> {
        self.inventory.add(item, quantity);
        debug!(agent = %self.persona.name, item, quantity, sender, "received item");
        let memo =
            format!("I have received {item}*{quantity} from {sender} and message: {message}");
        self.commit_thought(ctx, &memo, Vec::new()).await?;
        Ok(())
    }

    fn snapshot(&self) -> Option<AgentSnapshot> {
        Some(AgentSnapshot {
            agent: self.persona.name.clone(),
            saved_at: Utc::now(),
            associative: self.memory.clone(),
            spatial: self.spatial.clone(),
        })
    }
}

/// Builders shared by the pipeline modules' unit tests
#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub(crate) fn persona() -> Persona {
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

    pub(crate) fn npc(name: &str, position: Position) -> NpcAgent {
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
}
