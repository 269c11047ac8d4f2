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

use clap::Parser;
use duskmoor_common::position::Position;
use duskmoor_server::cognition::agent::AgentKind;
use duskmoor_server::cognition::human::{ChatPrompt, HumanAgent, HumanCommand, HumanHandles};
use duskmoor_server::cognition::npc::NpcAgent;
use duskmoor_server::cognition::oracle::Oracle;
use duskmoor_server::config::{Arguments, Configuration};
use duskmoor_server::context::{AgentHandle, WorldContext};
use duskmoor_server::persistence::SnapshotWriter;
use duskmoor_server::scheduler::TurnScheduler;
use duskmoor_server::services::embedding::build_embeddings;
use duskmoor_server::services::templates::TemplateRegistry;
use duskmoor_server::services::text::build_text_generation;
use duskmoor_server::world::clock::GameClock;
use duskmoor_server::world::events::EventBus;
use duskmoor_server::world::scenario::{CharacterKind, ScenarioFile};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load arguments from the command line
    let arguments: Arguments = Parser::parse();

    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .with_ansi(true)
        .init();

    // Load environment variables from .env file if specified
    if let Some(ref env_file) = arguments.env_file {
        if std::path::Path::new(env_file).exists() {
            tracing::debug!("Loading environment variables from file: {}", env_file);
            dotenv::from_filename(env_file).ok();
        }
    } else {
        // Try default .env file
        tracing::debug!("Loading environment variables from default file");
        dotenv::dotenv().ok();
    }

    // Load configuration from a file with environment variable substitution
    let config: Configuration =
        Configuration::load(&arguments.config_file)
            .expect("Unable to load configuration file");

    tracing::debug!("Configuration loaded: {:?}", config);
    tracing::info!("Starting Duskmoor World Server...");

    // Assemble the prompt templates, applying overrides if a directory is configured
    let mut templates = TemplateRegistry::builtin();
    if let Some(dir) = config.services.templates_dir.as_ref() {
        tracing::info!("Loading prompt template overrides from {}", dir.as_str());
        templates = templates.with_overrides_from_dir(dir.as_str())?;
    }

    // Connect the cognitive services
    let text = build_text_generation(config.services.text.service_config(), templates)?;
    let embeddings = build_embeddings(config.services.embedding.service_config())?;
    tracing::info!(
        "Cognitive services initialized: text={}, embeddings={}",
        text.name(),
        embeddings.name()
    );
    if !text.is_available().await {
        tracing::warn!("Text generation service is not reachable; turns will fail until it is");
    }

    // Load the scenario and build the world from it
    let bus = EventBus::new();
    tracing::info!("Loading scenario from {}", config.scenario.file.as_str());
    let scenario = match ScenarioFile::load(config.scenario.file.to_path()) {
        Ok(file) => file.build(bus.clone())?,
        Err(e) => {
            tracing::error!("Failed to load scenario: {}", e);
            return Err(format!("Failed to load scenario: {}", e).into());
        }
    };
    tracing::info!(
        "Scenario '{}' loaded: {} characters, {} turn clock starting at {:02}:00",
        scenario.name,
        scenario.characters.len(),
        scenario.simulation.minutes_per_turn,
        scenario.simulation.start_hour
    );

    let simulation = scenario.simulation.clone();

    // Build the cast. The scenario has already validated and placed every
    // character, so construction here cannot fail.
    let mut handles: Vec<AgentHandle> = Vec::new();
    let mut terminal: Option<HumanHandles> = None;
    for character in &scenario.characters {
        match character.kind {
            CharacterKind::Npc => {
                let persona = character
                    .persona
                    .clone()
                    .expect("scenario validation guarantees NPC personas");
                let mut agent = NpcAgent::new(
                    &character.name,
                    persona,
                    character.stats,
                    character.combat,
                    character.inventory.clone(),
                    character.position,
                    &simulation,
                );
                agent.seed_spatial(&scenario.grid);
                let cleaning = agent.cleaning_handle();
                handles.push(AgentHandle::new(
                    &character.name,
                    AgentKind::Npc,
                    character.stats.dexterity,
                    cleaning,
                    Arc::new(Mutex::new(agent)),
                ));
                tracing::info!("Cast NPC '{}' at {}", character.name, character.position);
            }
            CharacterKind::Human => {
                let (agent, human_handles) = HumanAgent::new(
                    &character.name,
                    character.stats,
                    character.combat,
                    character.inventory.clone(),
                    character.position,
                );
                let cleaning = agent.cleaning_handle();
                handles.push(AgentHandle::new(
                    &character.name,
                    AgentKind::Human,
                    character.stats.dexterity,
                    cleaning,
                    Arc::new(Mutex::new(agent)),
                ));
                if terminal.is_none() {
                    terminal = Some(human_handles);
                    tracing::info!(
                        "Cast human '{}' at {}, driven from this terminal",
                        character.name,
                        character.position
                    );
                } else {
                    // Dropping the handles closes the command channel, so the
                    // extra character holds position every turn.
                    tracing::warn!(
                        "Human '{}' has no terminal and will hold position",
                        character.name
                    );
                }
            }
        }
    }

    // Assemble the shared world context
    let clock = GameClock::new(simulation.minutes_per_turn, simulation.start_hour);
    let ctx = Arc::new(WorldContext::new(
        scenario.grid,
        clock,
        Oracle::new(text),
        embeddings,
        bus.clone(),
    ));
    ctx.seed_roster(handles).await;
    tracing::info!("World context initialized");

    // Narrate world effects to the log
    bus.subscribe(|event| tracing::info!("{:?}", event));

    // Bridge stdin to the human character, if the cast has one
    if let Some(human_handles) = terminal {
        tokio::spawn(terminal_bridge(human_handles));
    }

    let snapshots = SnapshotWriter::new(config.persistence.snapshot_dir.to_path());
    let scheduler = TurnScheduler::new(Arc::clone(&ctx), snapshots, simulation.max_turns);

    // Run until the simulation ends on its own or the operator interrupts it
    tokio::select! {
        _ = scheduler.run() => {
            tracing::info!("Simulation finished");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupt received, saving memory snapshots...");
            scheduler.finalize().await;
        }
    }

    Ok(())
}

/// Bridge between stdin and the human character's channels.
///
/// Outside a conversation each line is a command for the next turn. When a
/// chat prompt arrives the terminal switches to replies until the exchange
/// ends: `say <message>` answers, `end` answers and closes the chat.
async fn terminal_bridge(mut handles: HumanHandles) {
    print_help();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            prompt = handles.prompts.recv() => {
                match prompt {
                    Some(prompt) => answer_prompt(prompt, &mut lines).await,
                    None => break,
                }
            }
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        match parse_command(line) {
                            Some(command) => {
                                if handles.commands.send(command).await.is_err() {
                                    break;
                                }
                            }
                            None => print_help(),
                        }
                    }
                    Ok(None) | Err(_) => break,
                }
            }
        }
    }
    tracing::info!("Terminal bridge closed");
}

/// Collect one chat reply from the terminal. Dropping the prompt without
/// replying would fail the speaker's turn, so keep asking until the line
/// parses or stdin closes.
async fn answer_prompt(prompt: ChatPrompt, lines: &mut Lines<BufReader<Stdin>>) {
    println!();
    println!("{} says: \"{}\"", prompt.from, prompt.message);
    println!("Reply with `say <message>` or `end`.");
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if let Some(message) = line.strip_prefix("say ") {
                    let _ = prompt.reply.send((message.trim().to_string(), false));
                    return;
                }
                if line == "end" {
                    let _ = prompt.reply.send((String::new(), true));
                    return;
                }
                println!("Reply with `say <message>` or `end`.");
            }
            Ok(None) | Err(_) => return,
        }
    }
}

fn parse_command(line: &str) -> Option<HumanCommand> {
    let mut parts = line.split_whitespace();
    match parts.next()? {
        "move" => {
            let x = parts.next()?.parse().ok()?;
            let y = parts.next()?.parse().ok()?;
            Some(HumanCommand::Move(Position::new(x, y)))
        }
        "attack" => Some(HumanCommand::Attack(parts.next()?.to_string())),
        "chat" => {
            let target = parts.next()?.to_string();
            let opening = parts.collect::<Vec<_>>().join(" ");
            if opening.is_empty() {
                return None;
            }
            Some(HumanCommand::ChatWith { target, opening })
        }
        "give" => {
            let target = parts.next()?.to_string();
            let item = parts.next()?.to_string();
            let quantity = parts.next()?.parse().ok()?;
            let message = parts.collect::<Vec<_>>().join(" ");
            Some(HumanCommand::Give {
                target,
                item,
                quantity,
                message,
            })
        }
        "wait" => Some(HumanCommand::Wait),
        _ => None,
    }
}

fn print_help() {
    println!("Commands for your character's next turn:");
    println!("  move <x> <y>                     walk toward a tile");
    println!("  attack <name>                    strike an adjacent character");
    println!("  chat <name> <message>            open a conversation");
    println!("  give <name> <item> <qty> [msg]   hand over items");
    println!("  wait                             do nothing this turn");
}
