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

//! The multi-round chat protocol between two agents
//!
//! The initiator opens with a line grounded in its remembered relationship
//! with the partner, then the two sides alternate replies until one wants
//! to stop or the message cap is hit. Both participants then digest the
//! conversation into memory; the digest runs under the cleaning-up flag so
//! no new turn or message can observe it half-committed.

use crate::cognition::agent::{Agent, TurnError};
use crate::cognition::memory::summary_statements;
use crate::cognition::npc::NpcAgent;
use crate::cognition::retrieval;
use crate::context::WorldContext;
use crate::world::events::WorldEvent;
use crate::world::tile::TileEvent;
use duskmoor_common::chat::{transcript, ChatEntry};
use duskmoor_common::triple::EventTriple;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Hard cap on messages in one conversation
const SEQUENCE_CAP: u32 = 10;

/// End reason when the cap cuts the conversation short
const MESSAGE_LIMIT_REASON: &str = "The chat ends due to the message limitation in one chat.";

/// Memories consulted about the partner before the relationship summary
const PARTNER_NODES: usize = 25;

/// Memories consulted per reply, and for the relationship statements
const CONTEXT_NODES: usize = 15;

/// Transient state an agent keeps for the conversation it is in
#[derive(Debug, Clone)]
pub(crate) struct ChatContext {
    pub(crate) partner: String,
    /// Statements retrieved around the relationship summary, reused as
    /// grounding for every line of this conversation
    pub(crate) relationship: String,
}

/// What the agent remembers about its relationship with `target`, rendered
/// as numbered statements for the chat prompts
pub(crate) async fn relationship_statements(
    agent: &mut NpcAgent,
    ctx: &WorldContext,
    target: &str,
) -> Result<String, TurnError> {
    let now = ctx.now().await;
    let about_target = retrieval::retrieve_nodes(
        &mut agent.memory,
        ctx.embeddings.as_ref(),
        target,
        PARTNER_NODES,
        agent.recency_decay,
        now,
    )
    .await?;
    let summary = ctx
        .oracle
        .relationship_summary(&agent.persona, target, &summary_statements(&about_target))
        .await?;
    let related = retrieval::retrieve_nodes(
        &mut agent.memory,
        ctx.embeddings.as_ref(),
        &summary,
        CONTEXT_NODES,
        agent.recency_decay,
        now,
    )
    .await?;
    Ok(summary_statements(&related))
}

/// Drive a whole conversation with the action's character target.
///
/// The caller holds the initiator's lock; the partner is locked only for
/// the duration of each of its replies and for its final digest.
pub(crate) async fn run_chat(agent: &mut NpcAgent, ctx: &WorldContext) -> Result<(), TurnError> {
    let name = agent.persona.name.clone();
    let Some(partner_name) = agent.action.target_character.clone() else {
        warn!(agent = %name, "chat without a character target");
        return Ok(());
    };
    let Some(handle) = ctx.find_agent(&partner_name).await else {
        warn!(agent = %name, partner = %partner_name, "chat partner is no longer in the simulation");
        return Ok(());
    };
    {
        let partner = handle.agent.lock().await;
        if partner.is_dead() {
            warn!(agent = %name, partner = %partner_name, "cannot chat with a dead character");
            return Ok(());
        }
    }

    let relationship = relationship_statements(agent, ctx, &partner_name).await?;
    agent.chat_context = Some(ChatContext {
        partner: partner_name.clone(),
        relationship: relationship.clone(),
    });

    // The opening line's own end flag is ignored: a conversation is at
    // least one exchange long.
    let opening = ctx
        .oracle
        .chat_line(&agent.persona, &partner_name, &relationship, "", 1, true)
        .await?;
    debug!(agent = %name, partner = %partner_name, line = %opening.message, "chat opened");
    let mut history = vec![ChatEntry::new(&name, &opening.message)];
    let mut last_message = opening.message;
    let mut sequence: u32 = 2;
    let mut ender: Option<String> = None;

    while sequence <= SEQUENCE_CAP {
        let partners_turn = sequence % 2 == 0;
        let (message, end) = if partners_turn {
            handle.wait_until_clean().await;
            let mut partner = handle.agent.lock().await;
            partner
                .receive_message(&last_message, &name, &history, sequence, ctx)
                .await?
        } else {
            reply(agent, ctx, &last_message, &partner_name, &history, sequence).await?
        };
        let speaker = if partners_turn { &partner_name } else { &name };
        history.push(ChatEntry::new(speaker, &message));
        last_message = message;
        if end {
            ender = Some(speaker.clone());
            break;
        }
        sequence += 1;
    }

    let reason = match ender {
        None => MESSAGE_LIMIT_REASON.to_string(),
        Some(ender) => format!("{ender} is not going to talk further"),
    };
    info!(
        agent = %name,
        partner = %partner_name,
        messages = history.len(),
        reason = %reason,
        "chat over"
    );

    let now = ctx.now().await;
    {
        let mut grid = ctx.grid.write().await;
        grid.add_event(TileEvent::new(
            EventTriple::new(&name, "is talking to", &partner_name),
            format!("{name} is talking to {partner_name}"),
            now,
            agent.position,
        ));
    }

    {
        handle.wait_until_clean().await;
        let mut partner = handle.agent.lock().await;
        partner.end_chat(&reason, &history, ctx).await?;
    }
    agent.end_chat(&reason, &history, ctx).await?;

    ctx.bus.publish(WorldEvent::ChatEnded {
        initiator: name,
        partner: partner_name,
        messages: history.len(),
    });
    Ok(())
}

/// Produce one reply in a running conversation.
///
/// The first message an agent receives from a new partner initializes its
/// relationship context; after that the cached statements are reused and
/// only the running history is retrieved fresh.
pub(crate) async fn reply(
    agent: &mut NpcAgent,
    ctx: &WorldContext,
    message: &str,
    from: &str,
    history: &[ChatEntry],
    sequence: u32,
) -> Result<(String, bool), TurnError> {
    debug!(agent = %agent.persona.name, from, sequence, message, "replying");
    if !agent
        .chat_context
        .as_ref()
        .is_some_and(|context| context.partner == from)
    {
        let relationship = relationship_statements(agent, ctx, from).await?;
        agent.chat_context = Some(ChatContext {
            partner: from.to_string(),
            relationship,
        });
    }
    let relationship = agent
        .chat_context
        .as_ref()
        .map(|context| context.relationship.clone())
        .unwrap_or_default();

    let rendered = transcript(history);
    let now = ctx.now().await;
    let history_nodes = retrieval::retrieve_nodes(
        &mut agent.memory,
        ctx.embeddings.as_ref(),
        &rendered,
        CONTEXT_NODES,
        agent.recency_decay,
        now,
    )
    .await?;
    let context = format!("{relationship}\n{}", summary_statements(&history_nodes));
    let turn = ctx
        .oracle
        .chat_line(&agent.persona, from, &context, &rendered, sequence, false)
        .await?;
    Ok((turn.message, turn.end))
}

/// Fold a finished conversation into memory: a Chat node holding the whole
/// transcript, plus optional planning and memo thoughts citing it.
pub(crate) async fn digest(
    agent: &mut NpcAgent,
    ctx: &WorldContext,
    reason: &str,
    transcript_entries: &[ChatEntry],
) -> Result<(), TurnError> {
    let Some(context) = agent.chat_context.clone() else {
        debug!(agent = %agent.persona.name, "chat ended with no context to digest");
        return Ok(());
    };
    let partner = context.partner;
    let name = agent.persona.name.clone();
    let rendered = transcript(transcript_entries);

    let summary = ctx.oracle.chat_summary(&rendered).await?;
    let poignancy = ctx.oracle.chat_poignancy(&agent.persona, &rendered).await?;
    let embedding = agent.embedding_for(ctx, &summary).await?;
    let now = ctx.now().await;
    let chat_id = agent.memory.add_chat(
        now,
        None,
        EventTriple::new(&name, "is chatting with", &partner),
        summary.clone(),
        summary.clone(),
        embedding,
        poignancy,
        BTreeSet::from([name.clone(), partner.clone()]),
        transcript_entries.to_vec(),
        reason,
    );
    agent.importance_accumulator += poignancy as u32;
    agent.reflection_count += 2;
    metrics::counter!("cognition.chats").increment(1);

    if let Some(thought) = ctx.oracle.chat_planning_thought(&agent.persona, &summary).await? {
        agent.commit_thought(ctx, &thought, vec![chat_id]).await?;
    }
    if let Some(thought) = ctx.oracle.chat_memo_thought(&agent.persona, &summary).await? {
        agent.commit_thought(ctx, &thought, vec![chat_id]).await?;
    }
    debug!(agent = %name, partner = %partner, poignancy, "chat digested");
    Ok(())
}
