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

//! Shared world state handed to every pipeline stage
//!
//! There are no globals; everything an agent may consult during its turn
//! (grid, clock, services, the other agents) travels through a
//! [`WorldContext`]. Lock discipline: the grid lock is never held across an
//! agent lock, and agents are only ever locked through their roster handle.
//! Position lookups go through the grid occupancy so asking where another
//! agent stands never takes that agent's lock.

use crate::cognition::agent::{Agent, AgentKind};
use crate::cognition::oracle::Oracle;
use crate::services::embedding::Embeddings;
use crate::world::clock::GameClock;
use crate::world::events::EventBus;
use crate::world::grid::TileGrid;
use duskmoor_common::position::Position;
use duskmoor_common::time::GameTime;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, RwLock};

/// A roster entry: everything the scheduler and other agents may need
/// without taking the agent's lock
#[derive(Clone)]
pub struct AgentHandle {
    pub name: String,
    pub kind: AgentKind,
    /// Fixed at creation; determines turn order
    pub dexterity: u32,
    /// Set while the agent digests a finished chat. Poll this before
    /// locking the agent for a turn or an incoming message.
    pub cleaning: Arc<AtomicBool>,
    pub agent: Arc<Mutex<dyn Agent>>,
}

impl AgentHandle {
    pub fn new(
        name: impl Into<String>,
        kind: AgentKind,
        dexterity: u32,
        cleaning: Arc<AtomicBool>,
        agent: Arc<Mutex<dyn Agent>>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            dexterity,
            cleaning,
            agent,
        }
    }

    /// Park until the agent's post-chat cleanup has finished. Must be
    /// awaited before locking the agent for a new turn or an incoming
    /// message.
    pub async fn wait_until_clean(&self) {
        while self.cleaning.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
    }
}

/// The world as one agent's turn sees it
pub struct WorldContext {
    pub grid: RwLock<TileGrid>,
    pub clock: RwLock<GameClock>,
    pub oracle: Oracle,
    pub embeddings: Arc<dyn Embeddings>,
    pub bus: EventBus,
    roster: RwLock<Vec<AgentHandle>>,
}

impl WorldContext {
    pub fn new(
        grid: TileGrid,
        clock: GameClock,
        oracle: Oracle,
        embeddings: Arc<dyn Embeddings>,
        bus: EventBus,
    ) -> Self {
        Self {
            grid: RwLock::new(grid),
            clock: RwLock::new(clock),
            oracle,
            embeddings,
            bus,
            roster: RwLock::new(Vec::new()),
        }
    }

    pub async fn now(&self) -> GameTime {
        self.clock.read().await.now()
    }

    pub async fn minutes_per_turn(&self) -> u32 {
        self.clock.read().await.minutes_per_turn()
    }

    pub async fn is_day_start(&self) -> bool {
        self.clock.read().await.is_day_start()
    }

    pub async fn clock_label(&self) -> String {
        self.clock.read().await.clock_label()
    }

    /// Install the turn order: highest dexterity first, ties broken by
    /// name so the order is stable run to run
    pub async fn seed_roster(&self, mut handles: Vec<AgentHandle>) {
        handles.sort_by(|a, b| b.dexterity.cmp(&a.dexterity).then(a.name.cmp(&b.name)));
        *self.roster.write().await = handles;
    }

    pub async fn roster_handles(&self) -> Vec<AgentHandle> {
        self.roster.read().await.clone()
    }

    pub async fn find_agent(&self, name: &str) -> Option<AgentHandle> {
        self.roster
            .read()
            .await
            .iter()
            .find(|handle| handle.name == name)
            .cloned()
    }

    /// Every roster name except `exclude`
    pub async fn agent_names(&self, exclude: &str) -> Vec<String> {
        self.roster
            .read()
            .await
            .iter()
            .filter(|handle| handle.name != exclude)
            .map(|handle| handle.name.clone())
            .collect()
    }

    /// Where a named character currently stands, from grid occupancy
    pub async fn agent_position(&self, name: &str) -> Option<Position> {
        self.grid.read().await.character_position(name)
    }

    pub async fn remove_agent(&self, name: &str) {
        self.roster.write().await.retain(|handle| handle.name != name);
    }
}
