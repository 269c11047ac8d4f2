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

//! Reflect stage: distill accumulated memories into higher-level thoughts
//!
//! Runs when an agent's importance accumulator crosses its trigger. The
//! most recently touched memories seed a handful of focal questions, each
//! question pulls its own slice of memory, and the service condenses each
//! slice into cited Thought nodes. Identity revision lives here too but
//! runs on its own cadence, at the start of each day.

use crate::cognition::agent::TurnError;
use crate::cognition::memory::summary_statements;
use crate::cognition::npc::NpcAgent;
use crate::cognition::retrieval;
use crate::context::WorldContext;
use tracing::debug;

/// Focal questions generated per reflection
const FOCAL_POINT_COUNT: usize = 3;

/// Insights requested per focal question
const INSIGHTS_PER_FOCAL: usize = 2;

/// Memories retrieved per focal question
const NODES_PER_FOCAL: usize = 30;

/// Memories retrieved per identity-revision query
const IDENTITY_RETRIEVAL_COUNT: usize = 15;

pub(crate) async fn reflect(agent: &mut NpcAgent, ctx: &WorldContext) -> Result<(), TurnError> {
    let anchors = agent.memory.recently_accessed(agent.reflection_count.max(1));
    if anchors.is_empty() {
        agent.importance_accumulator = 0;
        agent.reflection_count = 0;
        return Ok(());
    }

    let focal_points = ctx
        .oracle
        .focal_points(&summary_statements(&anchors), FOCAL_POINT_COUNT)
        .await?;
    let now = ctx.now().await;
    for focal in focal_points {
        let nodes = retrieval::retrieve_nodes(
            &mut agent.memory,
            ctx.embeddings.as_ref(),
            &focal,
            NODES_PER_FOCAL,
            agent.recency_decay,
            now,
        )
        .await?;
        if nodes.is_empty() {
            continue;
        }
        let statements = summary_statements(&nodes);
        let insights = ctx.oracle.insights(&statements, INSIGHTS_PER_FOCAL).await?;
        for insight in insights {
            // Evidence indices are 1-based statement numbers; out-of-range
            // entries are dropped rather than failing the reflection.
            let citations = insight
                .evidence
                .iter()
                .filter_map(|&index| index.checked_sub(1).and_then(|i| nodes.get(i)))
                .map(|node| node.id)
                .collect();
            agent.commit_thought(ctx, &insight.thought, citations).await?;
        }
    }

    debug!(agent = %agent.persona.name, "reflection complete");
    metrics::counter!("cognition.reflections").increment(1);
    agent.importance_accumulator = 0;
    agent.reflection_count = 0;
    Ok(())
}

/// Refresh the persona's "currently" line from what memory says about the
/// agent's plans and recent life. A sentinel response leaves it untouched.
pub(crate) async fn revise_identity(
    agent: &mut NpcAgent,
    ctx: &WorldContext,
) -> Result<(), TurnError> {
    let name = agent.persona.name.clone();
    let now = ctx.now().await;
    let plan_nodes = retrieval::retrieve_nodes(
        &mut agent.memory,
        ctx.embeddings.as_ref(),
        &format!("{name}'s plan for the day"),
        IDENTITY_RETRIEVAL_COUNT,
        agent.recency_decay,
        now,
    )
    .await?;
    let event_nodes = retrieval::retrieve_nodes(
        &mut agent.memory,
        ctx.embeddings.as_ref(),
        &format!("Important recent events for {name}'s life"),
        IDENTITY_RETRIEVAL_COUNT,
        agent.recency_decay,
        now,
    )
    .await?;

    let plan_note = ctx
        .oracle
        .plan_note(&agent.persona, &summary_statements(&plan_nodes))
        .await?;
    let thought_note = ctx
        .oracle
        .thought_note(&agent.persona, &summary_statements(&event_nodes))
        .await?;
    if let Some(currently) = ctx
        .oracle
        .currently(&agent.persona, &plan_note, &thought_note)
        .await?
    {
        debug!(agent = %name, %currently, "identity revised");
        agent.persona.currently = currently;
    }
    Ok(())
}
