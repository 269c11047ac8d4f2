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

//! Plan stage: decide what the agent does next
//!
//! Per turn, in order: long-term planning at the first moment of a new day,
//! then a possible reaction to freshly retrieved external events, then a
//! fresh schedule entry when the current action has run out, and finally
//! resolution of any new entry into a concrete addressed action. Agents
//! already engaged keep chasing moving character targets.

use crate::cognition::agent::TurnError;
use crate::cognition::memory::summary_statements;
use crate::cognition::npc::NpcAgent;
use crate::cognition::reflect;
use crate::cognition::retrieve::RetrievedBundle;
use crate::context::WorldContext;
use duskmoor_common::schedule::ScheduleEntry;
use duskmoor_common::triple::EventTriple;
use tracing::{debug, warn};

/// Context handed to the scheduling prompt when the agent has no thoughts
/// to draw on yet
const EMPTY_SCHEDULE_CONTEXT: &str = "Nothing really important yet.";

pub(crate) async fn plan(
    agent: &mut NpcAgent,
    ctx: &WorldContext,
    bundles: &[RetrievedBundle],
) -> Result<(), TurnError> {
    if ctx.is_day_start().await {
        long_term_planning(agent, ctx).await?;
    }

    let now = ctx.now().await;
    let minutes_per_turn = ctx.minutes_per_turn().await;
    let finished = agent.action.is_finished(now, minutes_per_turn);

    let externals: Vec<&RetrievedBundle> = bundles
        .iter()
        .filter(|bundle| bundle.original.triple.subject != agent.persona.name)
        .collect();

    let mut new_entry: Option<ScheduleEntry> = None;
    let mut reacted = false;
    if !externals.is_empty() {
        let events = externals
            .iter()
            .map(|bundle| bundle.describe())
            .collect::<Vec<_>>()
            .join("\n\n");
        let reaction = if finished {
            ctx.oracle.reaction_schedule(&agent.persona, &events).await?
        } else {
            ctx.oracle
                .interrupting_reaction_schedule(&agent.persona, &agent.action.description, &events)
                .await?
        };
        if let Some(entry) = reaction {
            debug!(agent = %agent.persona.name, activity = %entry.activity, "reacting");
            new_entry = Some(entry);
            reacted = true;
        }
    }

    if !reacted && finished {
        let thoughts = agent.memory.recent_thoughts(30);
        let statements = if thoughts.is_empty() {
            EMPTY_SCHEDULE_CONTEXT.to_string()
        } else {
            summary_statements(&thoughts)
        };
        new_entry = Some(ctx.oracle.next_schedule(&agent.persona, &statements).await?);
    }

    if let Some(entry) = new_entry {
        determine_action(agent, ctx, entry).await?;
    } else if let Some(target) = agent.action.target_character.clone() {
        // Character targets move; follow them.
        match ctx.agent_position(&target).await {
            Some(position) => agent.action.address = Some(position),
            None => {
                warn!(agent = %agent.persona.name, target = %target, "action target not on the grid")
            }
        }
    }
    Ok(())
}

/// Decide a wake hour and sleep through the small hours at the agent's own
/// position. Identity revision happens here too, so the new day starts
/// from a current self-image.
async fn long_term_planning(agent: &mut NpcAgent, ctx: &WorldContext) -> Result<(), TurnError> {
    reflect::revise_identity(agent, ctx).await?;
    let wake_hour = ctx.oracle.wake_up_hour(&agent.persona).await?;
    let name = agent.persona.name.clone();
    debug!(agent = %name, wake_hour, "long-term planning");
    agent.action.begin(
        Some(agent.position),
        wake_hour * 60,
        format!("{name} is sleeping"),
        EventTriple::without_object(&name, "is sleeping"),
        None,
        None,
        false,
    );
    Ok(())
}

/// Resolve a schedule entry into a concrete addressed action.
///
/// Character targets win over objects. Unknown characters, unknown objects
/// and unreachable addresses all degrade to the agent's own position.
async fn determine_action(
    agent: &mut NpcAgent,
    ctx: &WorldContext,
    entry: ScheduleEntry,
) -> Result<(), TurnError> {
    let name = agent.persona.name.clone();
    let activity = entry.activity.clone();
    let triple = ctx.oracle.action_triple(&name, &activity).await?;
    let description = format!("{name} is {activity}");

    let others = ctx.agent_names(&name).await;
    let mut target_character: Option<String> = None;
    if !others.is_empty() {
        let roster = others.join(", ");
        if let Some(candidate) = ctx
            .oracle
            .action_character(&agent.persona, &activity, &roster)
            .await?
        {
            if others.contains(&candidate) {
                target_character = Some(candidate);
            } else {
                warn!(agent = %name, candidate = %candidate, "unknown character target dropped");
            }
        }
    }

    if let Some(target) = target_character {
        let address = ctx.agent_position(&target).await.unwrap_or(agent.position);
        agent.action.begin(
            Some(address),
            entry.duration_minutes,
            description,
            triple,
            Some(target),
            None,
            false,
        );
        return Ok(());
    }

    let mut address = agent.position;
    let mut target_object: Option<String> = None;
    let mut should_loot = false;
    let sectors = agent.spatial.known_sectors();
    if !sectors.is_empty() {
        let sector = ctx
            .oracle
            .action_sector(&agent.persona, &activity, &sectors.join(", "))
            .await?;
        let objects = agent.spatial.objects_in_sector(&sector);
        if !objects.is_empty() {
            if let Some((object, loot)) = ctx
                .oracle
                .action_object(&agent.persona, &activity, &objects.join(", "))
                .await?
            {
                match agent
                    .spatial
                    .find_closest_object_by_path(agent.position, &sector, &object)
                {
                    Some(found) => {
                        address = found;
                        target_object = Some(object);
                        should_loot = loot;
                    }
                    None => {
                        warn!(agent = %name, object = %object, "object has no known reachable tile")
                    }
                }
            }
        }
    }
    agent.action.begin(
        Some(address),
        entry.duration_minutes,
        description,
        triple,
        None,
        target_object,
        should_loot,
    );
    Ok(())
}
