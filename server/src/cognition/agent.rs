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

//! The agent contract shared by simulated and player-driven characters
//!
//! The scheduler and the chat protocol only ever see this trait, so a turn
//! plays out identically whether the character behind it is a cognitive
//! simulation or a person at a terminal.

use crate::context::WorldContext;
use crate::persistence::AgentSnapshot;
use crate::services::types::ServiceError;
use async_trait::async_trait;
use duskmoor_common::chat::ChatEntry;
use duskmoor_common::item::Inventory;
use duskmoor_common::position::Position;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

/// What drives a character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentKind {
    Npc,
    Human,
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentKind::Npc => write!(f, "npc"),
            AgentKind::Human => write!(f, "human"),
        }
    }
}

/// Why a turn could not complete
#[derive(Debug, Error)]
pub enum TurnError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    /// The player's input channel went away mid-interaction
    #[error("human input unavailable: {0}")]
    HumanInput(String),
}

/// A character that takes turns in the simulation.
///
/// Mutating calls are made under the agent's own lock; implementations must
/// not call back into another agent directly. Cross-agent interaction goes
/// through [`WorldContext`] so lock order stays consistent.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Agent: Send {
    fn name(&self) -> &str;

    fn kind(&self) -> AgentKind;

    fn position(&self) -> Position;

    fn set_position(&mut self, position: Position);

    /// Turn order within a round is highest dexterity first
    fn dexterity(&self) -> u32;

    fn is_dead(&self) -> bool;

    /// Whether this agent has taken the relic out through an escape point
    fn is_escaping(&self) -> bool;

    fn armor_class(&self) -> i32;

    /// Apply damage and return remaining hit points
    fn apply_damage(&mut self, damage: i32) -> i32;

    fn inventory(&self) -> &Inventory;

    fn inventory_mut(&mut self) -> &mut Inventory;

    /// Run one full turn: perceive, decide, move, act
    async fn take_turn(&mut self, ctx: &WorldContext) -> Result<(), TurnError>;

    /// Produce a reply to an incoming chat message. `sequence` is the
    /// 1-based number this reply will carry in the conversation; the bool
    /// is true when the speaker wants the conversation to stop here.
    async fn receive_message(
        &mut self,
        message: &str,
        from: &str,
        history: &[ChatEntry],
        sequence: u32,
        ctx: &WorldContext,
    ) -> Result<(String, bool), TurnError>;

    /// Digest a conversation this agent took part in after it ends
    async fn end_chat(
        &mut self,
        reason: &str,
        transcript: &[ChatEntry],
        ctx: &WorldContext,
    ) -> Result<(), TurnError>;

    /// Accept an item handed over by another character
    async fn receive_item(
        &mut self,
        item: &str,
        quantity: u32,
        sender: &str,
        message: &str,
        ctx: &WorldContext,
    ) -> Result<(), TurnError>;

    /// Serializable memory state, for agents that carry one
    fn snapshot(&self) -> Option<AgentSnapshot>;
}
