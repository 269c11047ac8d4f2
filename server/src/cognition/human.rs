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

//! The player-driven agent
//!
//! A human character takes the same turns as the simulated ones but its
//! decisions come over a command channel instead of the cognition
//! pipeline. The agent blocks its turn until the terminal supplies a
//! command, and incoming chat messages are forwarded as prompts that wait
//! for a typed reply. Humans keep no memory stream, so a finished chat
//! only needs its end reason surfaced, not digested.

use crate::cognition::act;
use crate::cognition::agent::{Agent, AgentKind, TurnError};
use crate::context::WorldContext;
use crate::persistence::AgentSnapshot;
use crate::world::events::WorldEvent;
use crate::world::grid::RELIC_ITEM;
use crate::world::tile::TileEvent;
use async_trait::async_trait;
use duskmoor_common::chat::{ChatEntry, transcript};
use duskmoor_common::item::Inventory;
use duskmoor_common::position::Position;
use duskmoor_common::stats::{CombatProfile, StatBlock};
use duskmoor_common::triple::EventTriple;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument, warn};

/// Hard cap on messages in one conversation, shared with the simulated
/// chat protocol
const SEQUENCE_CAP: u32 = 10;

const CHANNEL_CAPACITY: usize = 16;

/// One instruction from the terminal.
///
/// `Move` keeps the turn open so a step can be followed by an engagement,
/// the way a turn is structured for simulated characters. Every other
/// command ends the turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HumanCommand {
    /// Walk toward a tile, clamped to movement speed along the path
    Move(Position),
    /// Strike an adjacent character
    Attack(String),
    /// Open a conversation with an adjacent character
    ChatWith { target: String, opening: String },
    /// Hand items to an adjacent character
    Give {
        target: String,
        item: String,
        quantity: u32,
        message: String,
    },
    /// End the turn; holds position if the player has not moved
    Wait,
}

/// An incoming chat message waiting on the player's reply. Send the typed
/// line through `reply`, with `true` to stop the conversation.
#[derive(Debug)]
pub struct ChatPrompt {
    pub from: String,
    pub message: String,
    pub history: Vec<ChatEntry>,
    pub sequence: u32,
    pub reply: oneshot::Sender<(String, bool)>,
}

/// The terminal side of a human agent's channels
pub struct HumanHandles {
    pub commands: mpsc::Sender<HumanCommand>,
    pub prompts: mpsc::Receiver<ChatPrompt>,
}

pub struct HumanAgent {
    name: String,
    stats: StatBlock,
    combat: CombatProfile,
    hit_points: i32,
    inventory: Inventory,
    position: Position,
    escaping: bool,
    commands: mpsc::Receiver<HumanCommand>,
    prompts: mpsc::Sender<ChatPrompt>,
    cleaning_up: Arc<AtomicBool>,
}

impl HumanAgent {
    pub fn new(
        name: impl Into<String>,
        stats: StatBlock,
        combat: CombatProfile,
        inventory: Inventory,
        position: Position,
    ) -> (Self, HumanHandles) {
        let (command_tx, command_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (prompt_tx, prompt_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let agent = Self {
            name: name.into(),
            stats,
            combat,
            hit_points: combat.max_hit_points,
            inventory,
            position,
            escaping: false,
            commands: command_rx,
            prompts: prompt_tx,
            cleaning_up: Arc::new(AtomicBool::new(false)),
        };
        let handles = HumanHandles {
            commands: command_tx,
            prompts: prompt_rx,
        };
        (agent, handles)
    }

    /// The flag this agent's roster handle should carry. Humans never set
    /// it, but waiters poll it uniformly across agent kinds.
    pub fn cleaning_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cleaning_up)
    }

    fn within_reach(&self, address: Position) -> bool {
        self.position == address || self.position.is_adjacent(&address)
    }

    fn carrying_relic(&self) -> bool {
        self.inventory.contains(RELIC_ITEM)
    }

    /// Step along the shortest path toward `target`, as far as speed
    /// allows. Returns whether the player actually walked.
    async fn step_toward(&mut self, ctx: &WorldContext, target: Position) -> bool {
        let now = ctx.now().await;
        let carrying = self.carrying_relic();
        let steps = self.combat.speed.max(1) as usize;
        let mut grid = ctx.grid.write().await;
        match grid.find_path(self.position, target, steps) {
            Some(next) if next != self.position => {
                grid.register_movement(&self.name, self.position, next, now, carrying);
                self.position = next;
                true
            }
            Some(_) => {
                grid.remain_in_place(&self.name, self.position, now);
                true
            }
            None => {
                warn!(agent = %self.name, %target, "no path to the requested tile");
                false
            }
        }
    }

    async fn attack(&mut self, ctx: &WorldContext, target_name: &str) {
        let Some(target_position) = ctx.agent_position(target_name).await else {
            warn!(agent = %self.name, target = %target_name, "no such character to attack");
            return;
        };
        if !self.within_reach(target_position) {
            warn!(agent = %self.name, target = %target_name, "attack target is out of reach");
            return;
        }
        let now = ctx.now().await;
        act::strike(&self.name, self.position, &self.combat, target_name, ctx, now).await;
    }

    /// Run a player-initiated conversation. The player speaks the odd
    /// sequences; further lines are prompted from the terminal as the
    /// conversation unfolds.
    async fn start_chat(
        &mut self,
        ctx: &WorldContext,
        target_name: &str,
        opening: String,
    ) -> Result<(), TurnError> {
        let Some(target_position) = ctx.agent_position(target_name).await else {
            warn!(agent = %self.name, target = %target_name, "no such character to chat with");
            return Ok(());
        };
        if !self.within_reach(target_position) {
            warn!(agent = %self.name, target = %target_name, "chat target is out of reach");
            return Ok(());
        }
        let Some(handle) = ctx.find_agent(target_name).await else {
            warn!(agent = %self.name, target = %target_name, "chat target is no longer in the simulation");
            return Ok(());
        };
        {
            let target = handle.agent.lock().await;
            if target.is_dead() {
                warn!(agent = %self.name, target = %target_name, "cannot chat with a dead character");
                return Ok(());
            }
        }

        let mut history = vec![ChatEntry::new(&self.name, &opening)];
        let mut last_message = opening;
        let mut sequence: u32 = 2;
        let reason;
        loop {
            handle.wait_until_clean().await;
            let (response, end) = {
                let mut target = handle.agent.lock().await;
                target
                    .receive_message(&last_message, &self.name, &history, sequence, ctx)
                    .await?
            };
            history.push(ChatEntry::new(target_name, &response));
            if end {
                reason = format!("{target_name} ends the chat");
                break;
            }
            sequence += 1;
            if sequence > SEQUENCE_CAP {
                reason = "The chat ends due to the message limitation in one chat.".to_string();
                break;
            }

            let (line, player_ends) = self
                .prompt(target_name, &response, &history, sequence)
                .await?;
            if player_ends {
                reason = format!("{} ends the chat", self.name);
                break;
            }
            history.push(ChatEntry::new(&self.name, &line));
            last_message = line;
            sequence += 1;
            if sequence > SEQUENCE_CAP {
                reason = "The chat ends due to the message limitation in one chat.".to_string();
                break;
            }
        }
        info!(agent = %self.name, partner = %target_name, reason = %reason, "chat over");

        let now = ctx.now().await;
        {
            let mut grid = ctx.grid.write().await;
            grid.add_event(TileEvent::new(
                EventTriple::new(&self.name, "is talking to", target_name),
                format!("{} is talking to {target_name}", self.name),
                now,
                self.position,
            ));
        }
        {
            handle.wait_until_clean().await;
            let mut target = handle.agent.lock().await;
            target.end_chat(&reason, &history, ctx).await?;
        }
        ctx.bus.publish(WorldEvent::ChatEnded {
            initiator: self.name.clone(),
            partner: target_name.to_string(),
            messages: history.len(),
        });
        Ok(())
    }

    async fn give(
        &mut self,
        ctx: &WorldContext,
        target_name: &str,
        item: &str,
        quantity: u32,
        message: &str,
    ) -> Result<(), TurnError> {
        if quantity == 0 || self.inventory.quantity_of(item) < quantity {
            warn!(agent = %self.name, item, quantity, "the inventory does not hold that");
            return Ok(());
        }
        let Some(target_position) = ctx.agent_position(target_name).await else {
            warn!(agent = %self.name, target = %target_name, "no such character to give to");
            return Ok(());
        };
        if !self.within_reach(target_position) {
            warn!(agent = %self.name, target = %target_name, "give target is out of reach");
            return Ok(());
        }
        let Some(handle) = ctx.find_agent(target_name).await else {
            warn!(agent = %self.name, target = %target_name, "give target is no longer in the simulation");
            return Ok(());
        };
        {
            let mut target = handle.agent.lock().await;
            if target.is_dead() {
                warn!(agent = %self.name, target = %target_name, "cannot give to a dead character");
                return Ok(());
            }
            target
                .receive_item(item, quantity, &self.name, message, ctx)
                .await?;
        }
        self.inventory.remove(item, quantity);

        let now = ctx.now().await;
        {
            let mut grid = ctx.grid.write().await;
            grid.add_event(TileEvent::new(
                EventTriple::new(&self.name, "gives", item),
                format!("{} is giving {item} to {target_name}", self.name),
                now,
                self.position,
            ));
        }
        ctx.bus.publish(WorldEvent::ItemGiven {
            giver: self.name.clone(),
            receiver: target_name.to_string(),
            item: item.to_string(),
            quantity,
        });
        Ok(())
    }

    /// Forward an incoming message to the terminal and wait for the typed
    /// reply
    async fn prompt(
        &mut self,
        from: &str,
        message: &str,
        history: &[ChatEntry],
        sequence: u32,
    ) -> Result<(String, bool), TurnError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.prompts
            .send(ChatPrompt {
                from: from.to_string(),
                message: message.to_string(),
                history: history.to_vec(),
                sequence,
                reply: reply_tx,
            })
            .await
            .map_err(|_| TurnError::HumanInput("chat prompt channel closed".to_string()))?;
        reply_rx
            .await
            .map_err(|_| TurnError::HumanInput("no reply from the terminal".to_string()))
    }

    /// End-of-turn automatics: slipping out with the relic, and scooping
    /// up a relic within reach. The escape check runs first, so looting
    /// and escaping take separate turns.
    async fn end_of_turn(&mut self, ctx: &WorldContext) {
        let now = ctx.now().await;
        let mut grid = ctx.grid.write().await;
        if let Some(escape) = grid.escape_tile() {
            if self.carrying_relic() && self.within_reach(escape) {
                self.escaping = true;
                info!(agent = %self.name, "slipping out through the escape point");
            }
        }
        if let Some(relic) = grid.relic_tile() {
            if self.within_reach(relic) {
                self.inventory.add(RELIC_ITEM, 1);
                grid.add_event(TileEvent::new(
                    EventTriple::new(&self.name, "loots", RELIC_ITEM),
                    format!("{} loots the relic", self.name),
                    now,
                    self.position,
                ));
                grid.add_event(TileEvent::new(
                    EventTriple::without_object(RELIC_ITEM, "is taken"),
                    "The relic is taken",
                    now,
                    relic,
                ));
                grid.register_relic_looted(&self.name, relic, now);
            }
        }
    }
}

#[async_trait]
impl Agent for HumanAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> AgentKind {
        AgentKind::Human
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

    #[instrument(skip_all, fields(agent = %self.name))]
    async fn take_turn(&mut self, ctx: &WorldContext) -> Result<(), TurnError> {
        if self.is_dead() {
            return Ok(());
        }
        let mut moved = false;
        loop {
            let Some(command) = self.commands.recv().await else {
                // No terminal attached; the character holds its ground.
                if !moved {
                    let now = ctx.now().await;
                    let mut grid = ctx.grid.write().await;
                    grid.remain_in_place(&self.name, self.position, now);
                }
                break;
            };
            debug!(agent = %self.name, ?command, "player command");
            match command {
                HumanCommand::Move(_) if moved => {
                    warn!(agent = %self.name, "already moved this turn");
                }
                HumanCommand::Move(target) => {
                    moved = self.step_toward(ctx, target).await;
                }
                HumanCommand::Wait => {
                    if !moved {
                        let now = ctx.now().await;
                        let mut grid = ctx.grid.write().await;
                        grid.remain_in_place(&self.name, self.position, now);
                    }
                    break;
                }
                HumanCommand::Attack(target) => {
                    self.attack(ctx, &target).await;
                    break;
                }
                HumanCommand::ChatWith { target, opening } => {
                    self.start_chat(ctx, &target, opening).await?;
                    break;
                }
                HumanCommand::Give {
                    target,
                    item,
                    quantity,
                    message,
                } => {
                    self.give(ctx, &target, &item, quantity, &message).await?;
                    break;
                }
            }
        }
        self.end_of_turn(ctx).await;
        Ok(())
    }

    async fn receive_message(
        &mut self,
        message: &str,
        from: &str,
        history: &[ChatEntry],
        sequence: u32,
        _ctx: &WorldContext,
    ) -> Result<(String, bool), TurnError> {
        self.prompt(from, message, history, sequence).await
    }

    async fn end_chat(
        &mut self,
        reason: &str,
        transcript_entries: &[ChatEntry],
        _ctx: &WorldContext,
    ) -> Result<(), TurnError> {
        // Nothing to digest; the reason is surfaced so the player knows
        // the conversation is closed.
        info!(agent = %self.name, reason, "conversation closed");
        debug!(agent = %self.name, transcript = %transcript(transcript_entries), "final transcript");
        Ok(())
    }

    async fn receive_item(
        &mut self,
        item: &str,
        quantity: u32,
        sender: &str,
        message: &str,
        _ctx: &WorldContext,
    ) -> Result<(), TurnError> {
        self.inventory.add(item, quantity);
        info!(agent = %self.name, item, quantity, sender, message, "received item");
        Ok(())
    }

    fn snapshot(&self) -> Option<AgentSnapshot> {
        None
    }
}
