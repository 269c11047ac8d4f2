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

//! Associative memory integration tests
//!
//! These tests verify the memory stack end to end, including:
//! - Scored retrieval over real (hashed) embeddings
//! - Access-time reinforcement feeding back into later retrievals
//! - Accumulated importance triggering a reflection pass mid-simulation
//! - Snapshots surviving the round trip through their on-disk JSON form

use chrono::Utc;
use duskmoor_common::item::Inventory;
use duskmoor_common::position::Position;
use duskmoor_common::stats::{CombatProfile, StatBlock};
use duskmoor_common::time::GameTime;
use duskmoor_common::triple::EventTriple;
use duskmoor_server::cognition::agent::Agent;
use duskmoor_server::cognition::memory::{AssociativeMemory, Filling, NodeKind};
use duskmoor_server::cognition::npc::NpcAgent;
use duskmoor_server::cognition::oracle::Oracle;
use duskmoor_server::cognition::retrieval::{retrieve_nodes, DEFAULT_RECENCY_DECAY};
use duskmoor_server::cognition::spatial::SpatialMemory;
use duskmoor_server::context::WorldContext;
use duskmoor_server::persistence::{AgentSnapshot, SnapshotWriter};
use duskmoor_server::services::embedding::Embeddings;
use duskmoor_server::test_utils::{persona, HashEmbeddings, ScriptedText};
use duskmoor_server::world::clock::GameClock;
use duskmoor_server::world::events::EventBus;
use duskmoor_server::world::grid::{SectorBand, TileGrid};
use duskmoor_server::world::scenario::SimulationSettings;
use duskmoor_server::world::tile::TileEvent;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Embed `description` and store it as an Event node created at `turn`
async fn remember(
    memory: &mut AssociativeMemory,
    embeddings: &HashEmbeddings,
    turn: u32,
    triple: EventTriple,
    description: &str,
    poignancy: u8,
) {
    let vector = embeddings.embed(description).await.unwrap();
    memory.add_event(
        GameTime::new(turn, 0),
        None,
        triple.clone(),
        description,
        description,
        vector,
        poignancy,
        BTreeSet::from([triple.subject.clone()]),
    );
}

/// An open single-sector world running entirely on scripted services
fn scripted_world() -> WorldContext {
    let bus = EventBus::new();
    let grid = TileGrid::new(6, 6, vec![SectorBand::new("Grounds", 0, 5)], bus.clone());
    WorldContext::new(
        grid,
        GameClock::new(10, 3),
        Oracle::new(Arc::new(ScriptedText::new())),
        Arc::new(HashEmbeddings::default()),
        bus,
    )
}

#[tokio::test]
async fn test_scored_retrieval_prefers_the_matching_memory() {
    let embeddings = HashEmbeddings::default();
    let mut memory = AssociativeMemory::new();
    remember(
        &mut memory,
        &embeddings,
        1,
        EventTriple::new("Maera", "is polishing", "the silver"),
        "Maera is polishing the silver in the parlor",
        4,
    )
    .await;
    remember(
        &mut memory,
        &embeddings,
        2,
        EventTriple::new("Vesper", "enters", "the Great Hall"),
        "Vesper enters the Great Hall",
        4,
    )
    .await;
    remember(
        &mut memory,
        &embeddings,
        3,
        EventTriple::new("the cellar door", "stands", "open"),
        "The cellar door stands open",
        4,
    )
    .await;

    // Relevance carries the heaviest weight, so the node whose stored
    // embedding matches the focal text outranks fresher memories.
    let nodes = retrieve_nodes(
        &mut memory,
        &embeddings,
        "Vesper enters the Great Hall",
        2,
        DEFAULT_RECENCY_DECAY,
        GameTime::new(6, 0),
    )
    .await
    .unwrap();
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].description, "Vesper enters the Great Hall");
}

#[tokio::test]
async fn test_retrieval_touches_what_it_returns() {
    let embeddings = HashEmbeddings::default();
    let mut memory = AssociativeMemory::new();
    let wanted = "Aldric locks the study door";
    let wanted_vector = embeddings.embed(wanted).await.unwrap();
    let wanted_id = memory.add_event(
        GameTime::new(1, 0),
        None,
        EventTriple::new("Aldric", "locks", "the study door"),
        wanted,
        wanted,
        wanted_vector,
        5,
        BTreeSet::from(["Aldric".to_string()]),
    );
    remember(
        &mut memory,
        &embeddings,
        2,
        EventTriple::new("rain", "drums on", "the conservatory glass"),
        "Rain drums on the conservatory glass",
        5,
    )
    .await;

    let now = GameTime::new(9, 0);
    let nodes = retrieve_nodes(&mut memory, &embeddings, wanted, 1, DEFAULT_RECENCY_DECAY, now)
        .await
        .unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].id, wanted_id);

    // Winning a retrieval refreshes the access stamp, so the node now leads
    // the access-ordered view despite being the older memory.
    assert_eq!(memory.node(wanted_id).unwrap().last_accessed, now);
    let recent = memory.recently_accessed(1);
    assert_eq!(recent[0].id, wanted_id);
}

#[tokio::test]
async fn test_accumulated_importance_triggers_reflection() {
    let ctx = scripted_world();
    {
        let mut grid = ctx.grid.write().await;
        grid.add_event(TileEvent::new(
            EventTriple::new("Vesper", "enters", "the Grounds"),
            "Vesper enters the Grounds",
            GameTime::new(1, 0),
            Position::new(3, 2),
        ));
        grid.add_event(TileEvent::new(
            EventTriple::new("Maera", "drops", "a tray"),
            "Maera drops a tray",
            GameTime::new(1, 0),
            Position::new(2, 3),
        ));
    }

    // Two poignancy-3 sightings clear a trigger of 4 in a single turn.
    let settings = SimulationSettings {
        importance_trigger: 4,
        ..SimulationSettings::default()
    };
    let mut agent = NpcAgent::new(
        "Aldric",
        persona(),
        StatBlock::default(),
        CombatProfile::default(),
        Inventory::default(),
        Position::new(2, 2),
        &settings,
    );

    agent.take_turn(&ctx).await.unwrap();
    assert_eq!(agent.memory().event_count(), 2);
    assert_eq!(agent.memory().thought_count(), 0);

    // The next turn opens with a reflection pass: three focal points, one
    // scripted insight each, every insight citing its evidence.
    ctx.clock.write().await.next_turn();
    agent.take_turn(&ctx).await.unwrap();
    assert_eq!(agent.memory().thought_count(), 3);
    for thought in agent.memory().recent_thoughts(3) {
        assert!(matches!(thought.kind, NodeKind::Thought));
        assert_eq!(thought.description, "The manor is restless tonight");
        match &thought.filling {
            Filling::Citations(cited) => assert!(!cited.is_empty()),
            other => panic!("expected citations, got {other:?}"),
        }
    }

    // Reflection resets the accumulator; a quiet turn must not reflect again.
    ctx.clock.write().await.next_turn();
    agent.take_turn(&ctx).await.unwrap();
    assert_eq!(agent.memory().thought_count(), 3);
}

#[tokio::test]
async fn test_snapshots_survive_a_disk_round_trip() {
    let embeddings = HashEmbeddings::default();
    let mut associative = AssociativeMemory::new();
    let seen = "Vesper slips through the scullery window";
    let seen_vector = embeddings.embed(seen).await.unwrap();
    let event_id = associative.add_event(
        GameTime::new(4, 1),
        None,
        EventTriple::new("Vesper", "slips through", "the scullery window"),
        seen,
        seen,
        seen_vector.clone(),
        6,
        BTreeSet::from(["Vesper".to_string()]),
    );
    let noted = "Vesper is after something in the manor";
    let noted_vector = embeddings.embed(noted).await.unwrap();
    associative.add_thought(
        GameTime::new(5, 0),
        None,
        EventTriple::new("Vesper", "is after", "something"),
        noted,
        noted,
        noted_vector,
        7,
        BTreeSet::from(["Vesper".to_string()]),
        vec![event_id],
    );

    let bus = EventBus::new();
    let grid = TileGrid::new(4, 3, vec![SectorBand::new("Manor", 0, 2)], bus);
    let spatial = SpatialMemory::seed_from_grid(&grid);

    let snapshot = AgentSnapshot {
        agent: "Vesper".to_string(),
        saved_at: Utc::now(),
        associative,
        spatial,
    };
    let dir = tempfile::tempdir().unwrap();
    let writer = SnapshotWriter::new(dir.path());
    let path = writer.write(&snapshot).await.unwrap();
    assert!(path.ends_with("associative_memory_Vesper.json"));

    let restored = writer.read("Vesper").await.unwrap();
    assert_eq!(restored.agent, "Vesper");
    assert_eq!(restored.associative.event_count(), 1);
    assert_eq!(restored.associative.thought_count(), 1);
    assert_eq!(restored.associative.embedding(seen), Some(seen_vector.as_slice()));
    assert_eq!(restored.associative.thought_keyword_strength("vesper"), 1);
    assert_eq!(restored.spatial.known_tile_count(), 12);

    let thought = restored
        .associative
        .recent_thoughts(1)
        .into_iter()
        .next()
        .unwrap();
    assert_eq!(thought.description, noted);
    match &thought.filling {
        Filling::Citations(cited) => assert_eq!(cited, &vec![event_id]),
        other => panic!("expected citations, got {other:?}"),
    }
}
