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

//! Act stage: carry out the current action at its address
//!
//! Runs once the agent is within reach of its action address. The first act
//! of an action stamps the start time, announces the action on the agent's
//! own tile, and asks the service for an engagement mode, which is cached
//! for the rest of the action. Interact, Chat, and Give fire once at the
//! start; Attack strikes again every acting turn until the action runs out.

use crate::cognition::action::ActionMode;
use crate::cognition::agent::TurnError;
use crate::cognition::chat;
use crate::cognition::memory::summary_statements;
use crate::cognition::npc::NpcAgent;
use crate::cognition::retrieval;
use crate::context::WorldContext;
use crate::world::events::WorldEvent;
use crate::world::grid::{ESCAPE_POINT, RELIC_ITEM};
use crate::world::tile::TileEvent;
use duskmoor_common::position::Position;
use duskmoor_common::stats::{attack_check, check_hits, CombatProfile};
use duskmoor_common::time::GameTime;
use duskmoor_common::triple::EventTriple;
use tracing::{debug, info, warn};

/// Memories consulted when sizing up a character target
const MODE_CONTEXT_NODES: usize = 30;

pub(crate) async fn act(agent: &mut NpcAgent, ctx: &WorldContext) -> Result<(), TurnError> {
    let now = ctx.now().await;
    let starting = agent.action.started.is_none();
    let mode = match agent.action.mode {
        Some(mode) => mode,
        None => {
            let mode = determine_mode(agent, ctx).await?;
            agent.action.mode = Some(mode);
            mode
        }
    };
    if starting {
        agent.action.start(now);
        let mut grid = ctx.grid.write().await;
        grid.add_event(TileEvent::new(
            agent.action.triple.clone(),
            agent.action.description.clone(),
            now,
            agent.position,
        ));
    }
    debug!(agent = %agent.persona.name, ?mode, action = %agent.action.description, "acting");

    match mode {
        ActionMode::Interact if starting => interact(agent, ctx, now).await,
        ActionMode::Attack => attack(agent, ctx, now).await,
        ActionMode::Chat if starting => chat::run_chat(agent, ctx).await,
        ActionMode::Give if starting => give(agent, ctx, now).await,
        _ => Ok(()),
    }
}

/// Pick the engagement mode for the action's target. Object modes need no
/// memory; character modes are grounded in what the agent remembers about
/// the target.
async fn determine_mode(agent: &mut NpcAgent, ctx: &WorldContext) -> Result<ActionMode, TurnError> {
    if let Some(object) = agent.action.target_object.clone() {
        let mode = ctx
            .oracle
            .action_mode_object(&agent.persona, &agent.action.description, &object)
            .await?;
        return Ok(mode);
    }
    if let Some(target) = agent.action.target_character.clone() {
        let now = ctx.now().await;
        let nodes = retrieval::retrieve_nodes(
            &mut agent.memory,
            ctx.embeddings.as_ref(),
            &target,
            MODE_CONTEXT_NODES,
            agent.recency_decay,
            now,
        )
        .await?;
        let mode = ctx
            .oracle
            .action_mode_character(
                &agent.persona,
                &agent.action.description,
                &target,
                &summary_statements(&nodes),
            )
            .await?;
        return Ok(mode);
    }
    Ok(ActionMode::Wait)
}

/// Use the object at the action address. Looting and escaping are both
/// interactions: the relic moves into the inventory, the escape point
/// flags the agent for removal at the end of the turn.
async fn interact(agent: &mut NpcAgent, ctx: &WorldContext, now: GameTime) -> Result<(), TurnError> {
    let Some(address) = agent.action.address else {
        return Ok(());
    };
    let name = agent.persona.name.clone();
    let mut grid = ctx.grid.write().await;

    if agent.action.should_loot && grid.relic_tile() == Some(address) {
        grid.add_event(TileEvent::new(
            EventTriple::new(&name, "loots", RELIC_ITEM),
            format!("{name} loots the relic"),
            now,
            agent.position,
        ));
        grid.add_event(TileEvent::new(
            EventTriple::without_object(RELIC_ITEM, "is looted"),
            format!("{RELIC_ITEM} is looted"),
            now,
            address,
        ));
        agent.inventory.add(RELIC_ITEM, 1);
        grid.register_relic_looted(&name, address, now);
    }

    if let Some(object) = agent.action.target_object.clone() {
        grid.add_event(TileEvent::new(
            EventTriple::new(&name, "is using", &object),
            format!("{name} is using {object}"),
            now,
            address,
        ));
        if object == ESCAPE_POINT {
            agent.escaping = true;
            info!(agent = %name, "heading out through the escape point");
        }
    }
    Ok(())
}

/// One attack roll against the action's character target
async fn attack(agent: &mut NpcAgent, ctx: &WorldContext, now: GameTime) -> Result<(), TurnError> {
    let name = agent.persona.name.clone();
    let Some(target_name) = agent.action.target_character.clone() else {
        warn!(agent = %name, "attack without a character target");
        return Ok(());
    };
    strike(&name, agent.position, &agent.combat, &target_name, ctx, now).await;
    Ok(())
}

/// Resolve one attack roll by `name` against `target_name`. Shared by
/// simulated and player-driven attackers. A dead or absent target makes
/// the strike a logged no-op.
pub(crate) async fn strike(
    name: &str,
    position: Position,
    combat: &CombatProfile,
    target_name: &str,
    ctx: &WorldContext,
    now: GameTime,
) {
    let Some(handle) = ctx.find_agent(target_name).await else {
        warn!(agent = %name, target = %target_name, "attack target is no longer in the simulation");
        return;
    };
    let mut target = handle.agent.lock().await;
    if target.is_dead() {
        warn!(agent = %name, target = %target_name, "attack on a dead target skipped");
        return;
    }

    let roll = rand::random_range(1..=20);
    let hit = check_hits(attack_check(roll, combat.attack_bonus), target.armor_class());
    let mut damage = 0;
    let mut slain = false;
    if hit {
        damage = rand::random_range(1..=combat.damage_die.max(1)) as i32 + combat.damage_bonus;
        let remaining = target.apply_damage(damage);
        slain = remaining <= 0;
        info!(attacker = %name, target = %target_name, roll, damage, remaining, "attack hit");
    } else {
        debug!(attacker = %name, target = %target_name, roll, "attack missed");
    }
    let target_position = target.position();

    let mut grid = ctx.grid.write().await;
    grid.add_event(TileEvent::new(
        EventTriple::new(name, "is attacking", target_name),
        format!("{name} is attacking {target_name}"),
        now,
        position,
    ));
    if slain {
        grid.add_event(TileEvent::new(
            EventTriple::without_object(target_name, "is killed"),
            format!("{target_name} is killed"),
            now,
            target_position,
        ));
        grid.register_death(target_name, target_position, target.inventory_mut());
    } else {
        grid.add_event(TileEvent::new(
            EventTriple::without_object(target_name, "is under attack"),
            format!("{target_name} is under attack"),
            now,
            target_position,
        ));
    }
    drop(grid);

    metrics::counter!("world.attacks").increment(1);
    ctx.bus.publish(WorldEvent::Attacked {
        attacker: name.to_string(),
        target: target_name.to_string(),
        hit,
        damage,
    });
}

/// Hand something over to the action's character target. What to give and
/// what to say come from the service, constrained to the giver's inventory.
async fn give(agent: &mut NpcAgent, ctx: &WorldContext, now: GameTime) -> Result<(), TurnError> {
    let name = agent.persona.name.clone();
    let Some(target_name) = agent.action.target_character.clone() else {
        warn!(agent = %name, "give without a character target");
        return Ok(());
    };
    let Some(handle) = ctx.find_agent(&target_name).await else {
        warn!(agent = %name, target = %target_name, "give target is no longer in the simulation");
        return Ok(());
    };
    {
        let target = handle.agent.lock().await;
        if target.is_dead() {
            warn!(agent = %name, target = %target_name, "cannot give to a dead character");
            return Ok(());
        }
    }
    if agent.inventory.is_empty() {
        warn!(agent = %name, "nothing to give");
        return Ok(());
    }

    let statements = chat::relationship_statements(agent, ctx, &target_name).await?;
    let decision = ctx
        .oracle
        .trade_item(
            &agent.persona,
            &target_name,
            &statements,
            &agent.inventory.describe(),
        )
        .await?;
    if decision.quantity == 0 || agent.inventory.quantity_of(&decision.name) < decision.quantity {
        warn!(
            agent = %name,
            item = %decision.name,
            quantity = decision.quantity,
            "offered something the inventory does not hold"
        );
        return Ok(());
    }

    {
        let mut target = handle.agent.lock().await;
        target
            .receive_item(&decision.name, decision.quantity, &name, &decision.message, ctx)
            .await?;
    }
    agent.inventory.remove(&decision.name, decision.quantity);

    {
        let mut grid = ctx.grid.write().await;
        grid.add_event(TileEvent::new(
            EventTriple::new(&name, "gives", &decision.name),
            format!("{name} is giving {} to {target_name}", decision.name),
            now,
            agent.position,
        ));
    }
    ctx.bus.publish(WorldEvent::ItemGiven {
        giver: name.clone(),
        receiver: target_name.clone(),
        item: decision.name.clone(),
        quantity: decision.quantity,
    });
    info!(
        giver = %name,
        receiver = %target_name,
        item = %decision.name,
        quantity = decision.quantity,
        "item handed over"
    );

    let memo = format!(
        "I have given {}*{} to {} and said: {}",
        decision.name, decision.quantity, target_name, decision.message
    );
    agent.commit_thought(ctx, &memo, Vec::new()).await?;
    Ok(())
}
