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

//! Scenario files: the YAML description of a world and its cast

use crate::cognition::persona::Persona;
use crate::world::events::EventBus;
use crate::world::grid::{ESCAPE_POINT, SectorBand, TileGrid};
use crate::world::tile::{Tile, TileObject};
use duskmoor_common::item::Inventory;
use duskmoor_common::position::Position;
use duskmoor_common::stats::{CombatProfile, StatBlock};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Errors raised while loading or validating a scenario
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read scenario: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse scenario: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("row {row} is {found} tiles wide, expected {expected}")]
    RaggedRow {
        row: usize,
        found: usize,
        expected: usize,
    },
    #[error("legend has no entry for glyph '{0}'")]
    UnknownGlyph(char),
    #[error("duplicate character name '{0}'")]
    DuplicateName(String),
    #[error("character '{name}' starts out of bounds at {position}")]
    StartOutOfBounds { name: String, position: Position },
    #[error("character '{name}' starts on a blocked tile at {position}")]
    StartBlocked { name: String, position: Position },
    #[error("non-player character '{0}' has no persona")]
    MissingPersona(String),
}

/// Tunable simulation knobs, all defaulted for the manor heist setup
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationSettings {
    #[serde(default = "default_minutes_per_turn")]
    pub minutes_per_turn: u32,
    #[serde(default = "default_start_hour")]
    pub start_hour: u32,
    #[serde(default)]
    pub max_turns: Option<u32>,
    #[serde(default = "default_vision_radius")]
    pub vision_radius: f32,
    #[serde(default = "default_importance_trigger")]
    pub importance_trigger: u32,
    #[serde(default = "default_recency_decay")]
    pub recency_decay: f32,
}

fn default_minutes_per_turn() -> u32 {
    10
}

fn default_start_hour() -> u32 {
    3
}

fn default_vision_radius() -> f32 {
    5.0
}

fn default_importance_trigger() -> u32 {
    20
}

fn default_recency_decay() -> f32 {
    0.99
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            minutes_per_turn: default_minutes_per_turn(),
            start_hour: default_start_hour(),
            max_turns: None,
            vision_radius: default_vision_radius(),
            importance_trigger: default_importance_trigger(),
            recency_decay: default_recency_decay(),
        }
    }
}

/// Built-in tile kinds a legend entry may name directly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileKind {
    Open,
    Wall,
    Fence,
    RelicChest,
    EscapePoint,
}

/// A legend entry describing a custom object tile
#[derive(Debug, Clone, Deserialize)]
pub struct CustomTile {
    pub object: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_walkable")]
    pub walkable: bool,
    #[serde(default)]
    pub has_relic: bool,
}

fn default_walkable() -> bool {
    true
}

/// One glyph's meaning: either a built-in kind or a custom object
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LegendEntry {
    Kind(TileKind),
    Custom(CustomTile),
}

impl LegendEntry {
    fn to_tile(&self) -> Tile {
        match self {
            LegendEntry::Kind(TileKind::Open) => Tile::open(),
            LegendEntry::Kind(TileKind::Wall) => Tile::blocked(None),
            LegendEntry::Kind(TileKind::Fence) => {
                Tile::blocked(Some(TileObject::new("fence", "A wrought iron fence.")))
            }
            LegendEntry::Kind(TileKind::RelicChest) => Tile {
                walkable: false,
                object: Some(TileObject::new(
                    "relic chest",
                    "A heavy iron chest holding the relic.",
                )),
                has_relic: true,
                ..Default::default()
            },
            LegendEntry::Kind(TileKind::EscapePoint) => Tile {
                walkable: true,
                object: Some(TileObject::new(
                    ESCAPE_POINT,
                    "A gap in the perimeter, out of sight of the manor.",
                )),
                ..Default::default()
            },
            LegendEntry::Custom(custom) => Tile {
                walkable: custom.walkable,
                object: Some(TileObject::new(
                    custom.object.clone(),
                    custom
                        .description
                        .clone()
                        .unwrap_or_else(|| format!("A {}.", custom.object)),
                )),
                has_relic: custom.has_relic,
                ..Default::default()
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SectorSpec {
    pub name: String,
    pub from_row: i32,
    pub to_row: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GridSpec {
    pub sectors: Vec<SectorSpec>,
    pub legend: HashMap<String, LegendEntry>,
    pub rows: Vec<String>,
}

/// Whether a cast member is simulation-driven or player-driven
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterKind {
    Npc,
    Human,
}

/// One cast member as declared in the scenario file
#[derive(Debug, Clone, Deserialize)]
pub struct CharacterSpec {
    pub name: String,
    pub kind: CharacterKind,
    pub position: Position,
    pub stats: StatBlock,
    pub combat: CombatProfile,
    #[serde(default)]
    pub persona: Option<Persona>,
    #[serde(default)]
    pub inventory: Inventory,
}

/// The raw deserialized scenario file
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioFile {
    pub name: String,
    pub grid: GridSpec,
    #[serde(default)]
    pub simulation: SimulationSettings,
    pub characters: Vec<CharacterSpec>,
}

/// A validated scenario with its grid built and characters placed
pub struct Scenario {
    pub name: String,
    pub simulation: SimulationSettings,
    pub grid: TileGrid,
    pub characters: Vec<CharacterSpec>,
}

impl ScenarioFile {
    /// Read and parse a scenario file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Parse a scenario from YAML text
    pub fn from_yaml(text: &str) -> Result<Self, ScenarioError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Build the grid, validate the cast, and place every character
    pub fn build(self, bus: EventBus) -> Result<Scenario, ScenarioError> {
        let height = self.grid.rows.len() as i32;
        let width = self
            .grid
            .rows
            .first()
            .map(|row| row.chars().count())
            .unwrap_or(0);
        for (index, row) in self.grid.rows.iter().enumerate() {
            let found = row.chars().count();
            if found != width {
                return Err(ScenarioError::RaggedRow {
                    row: index,
                    found,
                    expected: width,
                });
            }
        }

        let bands = self
            .grid
            .sectors
            .iter()
            .map(|sector| SectorBand::new(sector.name.clone(), sector.from_row, sector.to_row))
            .collect();
        let mut grid = TileGrid::new(width as i32, height, bands, bus);
        for (y, row) in self.grid.rows.iter().enumerate() {
            for (x, glyph) in row.chars().enumerate() {
                let entry = self
                    .grid
                    .legend
                    .get(&glyph.to_string())
                    .ok_or(ScenarioError::UnknownGlyph(glyph))?;
                grid.set_tile(Position::new(x as i32, y as i32), entry.to_tile());
            }
        }
        if grid.relic_tile().is_none() {
            warn!(scenario = %self.name, "scenario has no relic tile");
        }

        let mut names: HashSet<&str> = HashSet::new();
        for character in &self.characters {
            if !names.insert(character.name.as_str()) {
                return Err(ScenarioError::DuplicateName(character.name.clone()));
            }
            if !grid.in_bounds(character.position) {
                return Err(ScenarioError::StartOutOfBounds {
                    name: character.name.clone(),
                    position: character.position,
                });
            }
            if !grid.tile(character.position).is_some_and(|tile| tile.walkable) {
                return Err(ScenarioError::StartBlocked {
                    name: character.name.clone(),
                    position: character.position,
                });
            }
            if character.kind == CharacterKind::Npc && character.persona.is_none() {
                return Err(ScenarioError::MissingPersona(character.name.clone()));
            }
            grid.place_character(&character.name, character.position);
        }

        Ok(Scenario {
            name: self.name,
            simulation: self.simulation,
            grid,
            characters: self.characters,
        })
    }
}
