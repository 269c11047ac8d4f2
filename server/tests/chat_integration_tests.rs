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

//! Conversation integration tests
//!
//! These tests drive whole conversations through an initiator's turn,
//! covering:
//! - Two simulated agents talking, with both sides digesting the transcript
//! - The per-chat message cap ending a conversation that will not stop
//! - A simulated agent chatting with the player over the prompt channel

use duskmoor_common::item::Inventory;
use duskmoor_common::position::Position;
use duskmoor_common::stats::{CombatProfile, StatBlock};
use duskmoor_common::time::GameTime;
use duskmoor_common::triple::EventTriple;
use duskmoor_server::cognition::agent::{Agent, AgentKind};
use duskmoor_server::cognition::human::HumanAgent;
use duskmoor_server::cognition::memory::Filling;
use duskmoor_server::cognition::npc::NpcAgent;
use duskmoor_server::cognition::oracle::Oracle;
use duskmoor_server::context::{AgentHandle, WorldContext};
use duskmoor_server::test_utils::{npc, HashEmbeddings, ScriptedText};
use duskmoor_server::world::clock::GameClock;
use duskmoor_server::world::events::{EventBus, WorldEvent};
use duskmoor_server::world::grid::{SectorBand, TileGrid};
use duskmoor_server::world::tile::TileEvent;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A small open hall on scripted services
fn world(text: ScriptedText) -> WorldContext {
    let bus = EventBus::new();
    let grid = TileGrid::new(6, 4, vec![SectorBand::new("Hall", 0, 3)], bus.clone());
    WorldContext::new(
        grid,
        GameClock::new(10, 3),
        Oracle::new(Arc::new(text)),
        Arc::new(HashEmbeddings::default()),
        bus,
    )
}

/// Wrap a simulated agent in a roster handle the way the server seeds its cast
fn npc_handle(agent: NpcAgent) -> AgentHandle {
    let name = agent.name().to_string();
    let dexterity = agent.dexterity();
    let cleaning = agent.cleaning_handle();
    AgentHandle::new(name, AgentKind::Npc, dexterity, cleaning, Arc::new(Mutex::new(agent)))
}

/// Collector for events drained off the bus
fn collect_events(bus: &EventBus) -> Arc<std::sync::Mutex<Vec<WorldEvent>>> {
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    bus.subscribe(move |event| {
        if let Ok(mut log) = sink.lock() {
            log.push(event.clone());
        }
    });
    seen
}

/// Seed the tile event that makes `initiator` react on its next turn
async fn announce(ctx: &WorldContext, triple: EventTriple, description: &str, position: Position) {
    let mut grid = ctx.grid.write().await;
    grid.add_event(TileEvent::new(
        triple,
        description,
        GameTime::new(1, 0),
        position,
    ));
}

#[tokio::test]
async fn test_npcs_talk_and_both_remember_the_conversation() {
    let text = ScriptedText::new();
    text.enqueue(
        "reaction_schedule",
        r#"{"duration_minutes": 15, "activity": "having a word with Maera"}"#,
    );
    text.enqueue("action_triple", "Aldric||is having a word with||Maera");
    text.enqueue("action_character", "Maera");
    text.enqueue("action_mode_character", "Chat");
    text.enqueue(
        "generate_chat_start",
        r#"{"message": "A quiet word, Maera.", "end": false}"#,
    );
    text.enqueue(
        "generate_chat",
        r#"{"message": "Of course. What troubles you?", "end": false}"#,
    );
    text.enqueue(
        "generate_chat",
        r#"{"message": "Keep an eye on the east corridor tonight.", "end": false}"#,
    );
    text.enqueue(
        "generate_chat",
        r#"{"message": "I will. Good night, Aldric.", "end": true}"#,
    );
    // The partner digests first, then the initiator.
    text.enqueue("chat_summary", "Maera agreed to watch the east corridor for Aldric.");
    text.enqueue("chat_planning_thought", "I should pass the east corridor on every round");
    text.enqueue("chat_summary", "Aldric asked Maera to watch the east corridor.");

    let ctx = world(text);
    let seen = collect_events(&ctx.bus);
    let mut aldric = npc("Aldric", Position::new(2, 2));
    let maera = npc("Maera", Position::new(3, 2));
    {
        let mut grid = ctx.grid.write().await;
        grid.place_character("Aldric", Position::new(2, 2));
        grid.place_character("Maera", Position::new(3, 2));
    }
    announce(
        &ctx,
        EventTriple::new("Maera", "is tidying", "the front hall"),
        "Maera is tidying the front hall",
        Position::new(3, 2),
    )
    .await;
    ctx.seed_roster(vec![npc_handle(maera)]).await;

    aldric.take_turn(&ctx).await.unwrap();

    // The initiator holds the whole conversation as one Chat node.
    assert_eq!(aldric.memory().chat_count(), 1);
    let chat = aldric.memory().recent_chats(1).into_iter().next().unwrap();
    assert_eq!(chat.description, "Aldric asked Maera to watch the east corridor.");
    match &chat.filling {
        Filling::Dialogue {
            transcript,
            end_reason,
        } => {
            assert_eq!(transcript.len(), 4);
            assert_eq!(transcript[0].speaker, "Aldric");
            assert_eq!(transcript[0].content, "A quiet word, Maera.");
            assert_eq!(transcript[3].speaker, "Maera");
            assert_eq!(end_reason, "Maera is not going to talk further");
        }
        other => panic!("expected a dialogue filling, got {other:?}"),
    }

    // The partner digested the same transcript under her own summary, plus
    // the planning thought it prompted, citing the chat node.
    let handle = ctx.find_agent("Maera").await.unwrap();
    handle.wait_until_clean().await;
    let snapshot = handle.agent.lock().await.snapshot().unwrap();
    assert_eq!(snapshot.associative.chat_count(), 1);
    let her_chat = snapshot
        .associative
        .recent_chats(1)
        .into_iter()
        .next()
        .unwrap();
    assert_eq!(
        her_chat.description,
        "Maera agreed to watch the east corridor for Aldric."
    );
    assert_eq!(snapshot.associative.thought_count(), 1);
    let thought = snapshot
        .associative
        .recent_thoughts(1)
        .into_iter()
        .next()
        .unwrap();
    assert_eq!(thought.description, "I should pass the east corridor on every round");
    match &thought.filling {
        Filling::Citations(cited) => assert_eq!(cited.len(), 1),
        other => panic!("expected citations, got {other:?}"),
    }

    // The conversation leaves a trace on the initiator's tile and the bus.
    {
        let grid = ctx.grid.read().await;
        assert!(grid
            .tile(Position::new(2, 2))
            .unwrap()
            .events
            .iter()
            .any(|event| event.description == "Aldric is talking to Maera"));
    }
    ctx.bus.process_events();
    let log = seen.lock().unwrap();
    assert!(log.iter().any(|event| matches!(
        event,
        WorldEvent::ChatEnded { initiator, partner, messages }
            if initiator == "Aldric" && partner == "Maera" && *messages == 4
    )));
}

#[tokio::test]
async fn test_message_cap_cuts_a_chat_short() {
    let text = ScriptedText::new();
    text.enqueue(
        "reaction_schedule",
        r#"{"duration_minutes": 15, "activity": "checking in with Maera"}"#,
    );
    text.enqueue("action_triple", "Aldric||is checking in with||Maera");
    text.enqueue("action_character", "Maera");
    text.enqueue("action_mode_character", "Chat");
    text.enqueue(
        "generate_chat_start",
        r#"{"message": "Before you go, one more thing.", "end": false}"#,
    );
    // Neither side ever offers to stop; the cap has to step in.
    for _ in 0..9 {
        text.enqueue(
            "generate_chat",
            r#"{"message": "And another thing.", "end": false}"#,
        );
    }

    let ctx = world(text);
    let mut aldric = npc("Aldric", Position::new(2, 2));
    let maera = npc("Maera", Position::new(3, 2));
    {
        let mut grid = ctx.grid.write().await;
        grid.place_character("Aldric", Position::new(2, 2));
        grid.place_character("Maera", Position::new(3, 2));
    }
    announce(
        &ctx,
        EventTriple::new("Maera", "is heading for", "the back stairs"),
        "Maera is heading for the back stairs",
        Position::new(3, 2),
    )
    .await;
    ctx.seed_roster(vec![npc_handle(maera)]).await;

    aldric.take_turn(&ctx).await.unwrap();

    assert_eq!(aldric.memory().chat_count(), 1);
    let chat = aldric.memory().recent_chats(1).into_iter().next().unwrap();
    match &chat.filling {
        Filling::Dialogue {
            transcript,
            end_reason,
        } => {
            assert_eq!(transcript.len(), 10);
            assert_eq!(
                end_reason,
                "The chat ends due to the message limitation in one chat."
            );
        }
        other => panic!("expected a dialogue filling, got {other:?}"),
    }

    // The partner's digest carries the identical transcript length.
    let handle = ctx.find_agent("Maera").await.unwrap();
    handle.wait_until_clean().await;
    let snapshot = handle.agent.lock().await.snapshot().unwrap();
    let her_chat = snapshot
        .associative
        .recent_chats(1)
        .into_iter()
        .next()
        .unwrap();
    match &her_chat.filling {
        Filling::Dialogue { transcript, .. } => assert_eq!(transcript.len(), 10),
        other => panic!("expected a dialogue filling, got {other:?}"),
    }
}

#[tokio::test]
async fn test_npc_chats_with_the_player_over_the_prompt_channel() {
    let text = ScriptedText::new();
    text.enqueue(
        "reaction_schedule",
        r#"{"duration_minutes": 10, "activity": "confronting the stranger"}"#,
    );
    text.enqueue("action_triple", "Aldric||is confronting||Wren");
    text.enqueue("action_character", "Wren");
    text.enqueue("action_mode_character", "Chat");
    text.enqueue(
        "generate_chat_start",
        r#"{"message": "The manor is closed to visitors. Who are you?", "end": false}"#,
    );
    text.enqueue("chat_summary", "Aldric challenged Wren and got no real answer.");

    let ctx = world(text);
    let seen = collect_events(&ctx.bus);
    let (wren, mut handles) = HumanAgent::new(
        "Wren",
        StatBlock::default(),
        CombatProfile::default(),
        Inventory::default(),
        Position::new(3, 2),
    );
    let cleaning = wren.cleaning_handle();
    ctx.seed_roster(vec![AgentHandle::new(
        "Wren",
        AgentKind::Human,
        14,
        cleaning,
        Arc::new(Mutex::new(wren)),
    )])
    .await;
    {
        let mut grid = ctx.grid.write().await;
        grid.place_character("Wren", Position::new(3, 2));
    }
    announce(
        &ctx,
        EventTriple::new("Wren", "enters", "the hall"),
        "Wren enters the hall",
        Position::new(3, 2),
    )
    .await;

    // Play the terminal side of the conversation.
    let player = tokio::spawn(async move {
        let prompt = handles.prompts.recv().await.expect("prompt reaches the terminal");
        assert_eq!(prompt.from, "Aldric");
        assert_eq!(prompt.sequence, 2);
        assert_eq!(prompt.history.len(), 1);
        prompt
            .reply
            .send(("Just a lost traveler. I was leaving.".to_string(), true))
            .unwrap();
    });

    let mut aldric = npc("Aldric", Position::new(2, 2));
    aldric.take_turn(&ctx).await.unwrap();
    player.await.unwrap();

    assert_eq!(aldric.memory().chat_count(), 1);
    let chat = aldric.memory().recent_chats(1).into_iter().next().unwrap();
    assert_eq!(chat.description, "Aldric challenged Wren and got no real answer.");
    match &chat.filling {
        Filling::Dialogue {
            transcript,
            end_reason,
        } => {
            assert_eq!(transcript.len(), 2);
            assert_eq!(transcript[1].speaker, "Wren");
            assert_eq!(transcript[1].content, "Just a lost traveler. I was leaving.");
            assert_eq!(end_reason, "Wren is not going to talk further");
        }
        other => panic!("expected a dialogue filling, got {other:?}"),
    }

    // Players keep no associative memory, so nothing to snapshot.
    let handle = ctx.find_agent("Wren").await.unwrap();
    assert!(handle.agent.lock().await.snapshot().is_none());

    ctx.bus.process_events();
    let log = seen.lock().unwrap();
    assert!(log.iter().any(|event| matches!(
        event,
        WorldEvent::ChatEnded { initiator, partner, messages }
            if initiator == "Aldric" && partner == "Wren" && *messages == 2
    )));
}
