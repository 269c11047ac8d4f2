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

//! Perceive stage: scan nearby tiles into memory
//!
//! Everything within the agent's vision radius refreshes its spatial
//! snapshot. Tile events are candidates when they happened since the
//! agent's previous look at the world, or when they are standing facts the
//! agent has not ingested yet. Nearest events win the bandwidth cut.

use crate::cognition::agent::TurnError;
use crate::cognition::memory::ConceptNode;
use crate::cognition::npc::NpcAgent;
use crate::cognition::spatial::TileKnowledge;
use crate::context::WorldContext;
use crate::world::tile::TileEvent;
use duskmoor_common::time::GameTime;
use std::collections::BTreeSet;
use tracing::debug;

/// Poignancy assigned to idle chatter without asking the service
const IDLE_POIGNANCY: u8 = 1;

/// Scan the world around the agent and commit what it notices as Event
/// nodes. Returns the committed nodes in perception order.
pub(crate) async fn perceive(
    agent: &mut NpcAgent,
    ctx: &WorldContext,
) -> Result<Vec<ConceptNode>, TurnError> {
    let now = ctx.now().await;
    // An event is fresh if it postdates (turn - 1, sequence): everything
    // since this agent's slot in the previous round.
    let horizon = GameTime::new(now.turn.saturating_sub(1), now.sequence);

    let mut candidates: Vec<TileEvent> = Vec::new();
    {
        let grid = ctx.grid.read().await;
        // nearby_tiles is sorted nearest-first, so candidate order is
        // already the truncation order.
        for position in grid.nearby_tiles(agent.position, agent.vision_radius) {
            let Some(tile) = grid.tile(position) else {
                continue;
            };
            agent.spatial.update(
                position,
                TileKnowledge {
                    walkable: tile.walkable,
                    sector: grid.sector_name(position).to_string(),
                    object: tile.object.as_ref().map(|object| object.name.clone()),
                    has_relic: tile.has_relic,
                },
            );
            for event in &tile.events {
                let fresh = event.time.is_newer_than(&horizon);
                let standing_fact = event.persistent && !agent.perceived_missing_relic;
                if fresh || standing_fact {
                    candidates.push(event.clone());
                }
            }
        }
    }
    candidates.truncate(agent.stats.perceive_bandwidth());

    let mut committed = Vec::with_capacity(candidates.len());
    for event in candidates {
        let poignancy = if event.triple.is_idle() {
            IDLE_POIGNANCY
        } else {
            ctx.oracle
                .event_poignancy(&agent.persona, &event.description)
                .await?
        };
        let embedding = agent.embedding_for(ctx, &event.description).await?;
        let mut keywords = BTreeSet::new();
        keywords.insert(event.triple.subject.clone());
        if let Some(object) = &event.triple.object {
            keywords.insert(object.clone());
        }
        let id = agent.memory.add_event(
            now,
            None,
            event.triple.clone(),
            event.description.clone(),
            event.description.clone(),
            embedding,
            poignancy,
            keywords,
        );
        agent.importance_accumulator += poignancy as u32;
        agent.reflection_count += 1;
        if event.persistent {
            agent.perceived_missing_relic = true;
        }
        if let Some(node) = agent.memory.node(id) {
            committed.push(node.clone());
        }
    }
    metrics::counter!("cognition.perceived").increment(committed.len() as u64);
    debug!(agent = %agent.persona.name, committed = committed.len(), "perceive complete");
    Ok(committed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cognition::npc::fixtures;
    use crate::cognition::oracle::Oracle;
    use crate::services::embedding::MockEmbeddings;
    use crate::services::text::MockTextGeneration;
    use crate::world::clock::GameClock;
    use crate::world::events::EventBus;
    use crate::world::grid::{SectorBand, TileGrid};
    use duskmoor_common::position::Position;
    use duskmoor_common::triple::EventTriple;
    use std::sync::Arc;

    fn context(text: MockTextGeneration, embeddings: MockEmbeddings) -> WorldContext {
        let bus = EventBus::new();
        let grid = TileGrid::new(8, 8, vec![SectorBand::new("Grounds", 0, 7)], bus.clone());
        WorldContext::new(
            grid,
            GameClock::new(10, 3),
            Oracle::new(Arc::new(text)),
            Arc::new(embeddings),
            bus,
        )
    }

    fn embeddings_returning_unit() -> MockEmbeddings {
        let mut embeddings = MockEmbeddings::new();
        embeddings
            .expect_embed()
            .returning(|_| Ok(vec![1.0, 0.0]));
        embeddings
    }

    #[tokio::test]
    async fn test_commits_fresh_event_and_updates_spatial() {
        let mut text = MockTextGeneration::new();
        text.expect_complete()
            .withf(|template, _| template == "event_poignancy")
            .times(1)
            .returning(|_, _| Ok("5".to_string()));
        let ctx = context(text, embeddings_returning_unit());
        {
            let mut grid = ctx.grid.write().await;
            grid.add_event(TileEvent::new(
                EventTriple::new("Vesper", "enters", "the Grounds"),
                "Vesper enters the Grounds",
                GameTime::new(1, 0),
                Position::new(3, 2),
            ));
        }

        let mut agent = fixtures::npc("Aldric", Position::new(2, 2));
        let committed = perceive(&mut agent, &ctx).await.unwrap();

        assert_eq!(committed.len(), 1);
        assert_eq!(committed[0].poignancy, 5);
        assert_eq!(agent.importance_accumulator, 5);
        assert_eq!(agent.reflection_count, 1);
        assert_eq!(agent.memory.event_count(), 1);
        // Every scanned tile is now known, including empty ones.
        assert!(agent.spatial.knowledge(Position::new(2, 2)).is_some());
        assert_eq!(
            agent.spatial.knowledge(Position::new(3, 2)).unwrap().sector,
            "Grounds"
        );
    }

    #[tokio::test]
    async fn test_idle_events_skip_the_service() {
        // No complete() expectation: a text service call would panic.
        let text = MockTextGeneration::new();
        let ctx = context(text, embeddings_returning_unit());
        {
            let mut grid = ctx.grid.write().await;
            grid.add_event(TileEvent::new(
                EventTriple::new("Maera", "is", "idle"),
                "Maera is idle",
                GameTime::new(1, 0),
                Position::new(2, 3),
            ));
        }

        let mut agent = fixtures::npc("Aldric", Position::new(2, 2));
        let committed = perceive(&mut agent, &ctx).await.unwrap();

        assert_eq!(committed.len(), 1);
        assert_eq!(committed[0].poignancy, IDLE_POIGNANCY);
        // Idle predicates index keywords but never strengthen them.
        assert_eq!(agent.memory.event_keyword_strength("maera"), 0);
    }

    #[tokio::test]
    async fn test_stale_events_are_ignored() {
        let text = MockTextGeneration::new();
        let ctx = context(text, embeddings_returning_unit());
        {
            let mut clock = ctx.clock.write().await;
            clock.next_turn();
            clock.next_turn();
            clock.next_turn();
        }
        {
            // Turn 1 event seen from turn 4 is outside the freshness window.
            let mut grid = ctx.grid.write().await;
            grid.add_event(TileEvent::new(
                EventTriple::new("Vesper", "enters", "the Grounds"),
                "Vesper enters the Grounds",
                GameTime::new(1, 0),
                Position::new(3, 2),
            ));
        }

        let mut agent = fixtures::npc("Aldric", Position::new(2, 2));
        let committed = perceive(&mut agent, &ctx).await.unwrap();
        assert!(committed.is_empty());
        assert_eq!(agent.importance_accumulator, 0);
    }

    #[tokio::test]
    async fn test_persistent_fact_ingested_exactly_once() {
        let mut text = MockTextGeneration::new();
        text.expect_complete()
            .withf(|template, _| template == "event_poignancy")
            .times(1)
            .returning(|_, _| Ok("9".to_string()));
        let ctx = context(text, embeddings_returning_unit());
        {
            let mut clock = ctx.clock.write().await;
            for _ in 0..5 {
                clock.next_turn();
            }
        }
        {
            // Old but persistent: still perceived the first time.
            let mut grid = ctx.grid.write().await;
            grid.add_event(
                TileEvent::new(
                    EventTriple::new("relic", "is not in", "the manor house"),
                    "The relic is not in the manor house. It is missing.",
                    GameTime::new(1, 0),
                    Position::new(2, 3),
                )
                .persistent(),
            );
        }

        let mut agent = fixtures::npc("Aldric", Position::new(2, 2));
        let first = perceive(&mut agent, &ctx).await.unwrap();
        assert_eq!(first.len(), 1);
        assert!(agent.perceived_missing_relic);

        let second = perceive(&mut agent, &ctx).await.unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn test_bandwidth_truncates_to_nearest() {
        let mut text = MockTextGeneration::new();
        text.expect_complete()
            .returning(|_, _| Ok("2".to_string()));
        let ctx = context(text, embeddings_returning_unit());
        {
            let mut grid = ctx.grid.write().await;
            for x in 0..8 {
                grid.add_event(TileEvent::new(
                    EventTriple::new(format!("walker {x}"), "enters", "the Grounds"),
                    format!("walker {x} enters the Grounds"),
                    GameTime::new(1, 0),
                    Position::new(x, 2),
                ));
            }
        }

        // Wisdom 10 gives a bandwidth of 5.
        let mut agent = fixtures::npc("Aldric", Position::new(2, 2));
        let committed = perceive(&mut agent, &ctx).await.unwrap();
        assert_eq!(committed.len(), 5);
        // The nearest event is the one on the agent's own tile.
        assert_eq!(committed[0].description, "walker 2 enters the Grounds");
    }
}
