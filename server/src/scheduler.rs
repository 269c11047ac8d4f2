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

//! Round-robin turn scheduler driving the simulation clock
//!
//! One agent completes its whole turn before the next one starts. The clock's
//! sequence counter tracks whose slot is active so every event raised during
//! a slot carries that agent's (turn, sequence) stamp. Escaped agents leave
//! the roster at the end of their own slot, and every remaining cognitive
//! agent's memory is written to disk when the run ends.

use crate::context::{AgentHandle, WorldContext};
use crate::persistence::SnapshotWriter;
use crate::world::events::WorldEvent;
use metrics::counter;
use std::sync::Arc;
use tracing::{debug, error, info};

pub struct TurnScheduler {
    ctx: Arc<WorldContext>,
    snapshots: SnapshotWriter,
    /// Stop after this many full turns; `None` runs until the roster empties
    max_turns: Option<u32>,
}

impl TurnScheduler {
    pub fn new(ctx: Arc<WorldContext>, snapshots: SnapshotWriter, max_turns: Option<u32>) -> Self {
        Self {
            ctx,
            snapshots,
            max_turns,
        }
    }

    /// Run the simulation until the turn budget runs out or nobody is left,
    /// then snapshot every remaining agent
    pub async fn run(&self) {
        loop {
            let turn = self.ctx.clock.read().await.turn();
            if let Some(limit) = self.max_turns {
                if turn > limit {
                    info!(turn, "turn budget reached");
                    break;
                }
            }
            let roster = self.ctx.roster_handles().await;
            if roster.is_empty() {
                info!(turn, "roster is empty, simulation over");
                break;
            }

            debug!(
                turn,
                clock = %self.ctx.clock_label().await,
                agents = roster.len(),
                "turn begins"
            );
            for (slot, handle) in roster.iter().enumerate() {
                self.ctx.clock.write().await.set_sequence(slot as u32);
                self.take_slot(handle).await;
                self.ctx.bus.process_events();
            }

            self.ctx.clock.write().await.next_turn();
            counter!("scheduler.turns.completed").increment(1);
        }
        self.finalize().await;
    }

    /// One agent's slot: wait out any post-chat cleanup, run the turn, and
    /// retire the agent if it walked out of the manor
    async fn take_slot(&self, handle: &AgentHandle) {
        handle.wait_until_clean().await;
        let escaped = {
            let mut agent = handle.agent.lock().await;
            if agent.is_dead() {
                debug!(agent = %handle.name, "skipping dead agent");
                return;
            }
            if let Err(error) = agent.take_turn(&self.ctx).await {
                error!(agent = %handle.name, %error, "turn failed");
                counter!("scheduler.turn.failures").increment(1);
            }
            agent.is_escaping()
        };
        if escaped {
            self.retire(handle).await;
        }
    }

    /// Remove an escaped agent from play, preserving its memory first
    async fn retire(&self, handle: &AgentHandle) {
        info!(agent = %handle.name, "escaped the manor");
        let snapshot = handle.agent.lock().await.snapshot();
        if let Some(snapshot) = snapshot {
            if let Err(error) = self.snapshots.write(&snapshot).await {
                error!(agent = %handle.name, %error, "failed to write memory snapshot");
            }
        }
        self.ctx.bus.publish(WorldEvent::Escaped {
            name: handle.name.clone(),
        });
        self.ctx.remove_agent(&handle.name).await;
        self.ctx.grid.write().await.remove_character(&handle.name);
    }

    /// Write every remaining cognitive agent's memory to disk. Safe to call
    /// more than once; later writes overwrite earlier ones.
    pub async fn finalize(&self) {
        for handle in self.ctx.roster_handles().await {
            handle.wait_until_clean().await;
            let snapshot = handle.agent.lock().await.snapshot();
            if let Some(snapshot) = snapshot {
                if let Err(error) = self.snapshots.write(&snapshot).await {
                    error!(agent = %handle.name, %error, "failed to write memory snapshot");
                }
            }
        }
        self.ctx.bus.process_events();
    }
}
