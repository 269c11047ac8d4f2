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

//! Per-agent spatial memory
//!
//! Each agent carries its own map of the world, refreshed only for tiles
//! inside its vision radius. Stale knowledge is a feature: an agent plans
//! against the world as it last saw it, not as it is.

use crate::world::grid::TileGrid;
use duskmoor_common::position::Position;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Suffix appended to sector names the agent believes hold the relic
const RELIC_NOTE: &str = " (The relic is here)";

/// What an agent knows about one tile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileKnowledge {
    pub walkable: bool,
    pub sector: String,
    pub object: Option<String>,
    pub has_relic: bool,
}

/// An agent's private map of the world
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpatialMemory {
    tiles: BTreeMap<Position, TileKnowledge>,
}

impl SpatialMemory {
    /// Create an empty spatial memory
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed knowledge of every tile from the world as it currently stands.
    /// Agents start with full knowledge of the static layout; it drifts out
    /// of date as the world changes outside their vision.
    pub fn seed_from_grid(grid: &TileGrid) -> Self {
        let mut memory = Self::new();
        for position in grid.positions() {
            if let Some(tile) = grid.tile(position) {
                memory.update(
                    position,
                    TileKnowledge {
                        walkable: tile.walkable,
                        sector: grid.sector_name(position).to_string(),
                        object: tile.object.as_ref().map(|object| object.name.clone()),
                        has_relic: tile.has_relic,
                    },
                );
            }
        }
        memory
    }

    /// Record what a tile looks like now
    pub fn update(&mut self, position: Position, knowledge: TileKnowledge) {
        self.tiles.insert(position, knowledge);
    }

    /// What the agent remembers about a tile
    pub fn knowledge(&self, position: Position) -> Option<&TileKnowledge> {
        self.tiles.get(&position)
    }

    pub fn known_tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Distinct known sector names. Sectors believed to hold the relic are
    /// annotated so planning prompts can steer toward it.
    pub fn known_sectors(&self) -> Vec<String> {
        let mut relic_sectors: BTreeSet<&str> = BTreeSet::new();
        let mut sectors: BTreeSet<&str> = BTreeSet::new();
        for knowledge in self.tiles.values() {
            if knowledge.sector.is_empty() {
                continue;
            }
            sectors.insert(knowledge.sector.as_str());
            if knowledge.has_relic {
                relic_sectors.insert(knowledge.sector.as_str());
            }
        }
        sectors
            .into_iter()
            .map(|sector| {
                if relic_sectors.contains(sector) {
                    format!("{sector}{RELIC_NOTE}")
                } else {
                    sector.to_string()
                }
            })
            .collect()
    }

    /// Distinct object names the agent knows about in a sector
    pub fn objects_in_sector(&self, sector: &str) -> Vec<String> {
        let sector = sector_base(sector);
        let mut objects: BTreeSet<&str> = BTreeSet::new();
        for knowledge in self.tiles.values() {
            if knowledge.sector == sector {
                if let Some(object) = knowledge.object.as_deref() {
                    objects.insert(object);
                }
            }
        }
        objects.into_iter().map(str::to_string).collect()
    }

    /// Breadth-first search over known tiles for the closest tile in
    /// `sector` holding `object`. Matching tiles are returned, not walked
    /// through; unknown and unwalkable tiles are not expanded, except the
    /// start tile the seeker stands on.
    pub fn find_closest_object_by_path(
        &self,
        start: Position,
        sector: &str,
        object: &str,
    ) -> Option<Position> {
        let sector = sector_base(sector);
        let mut visited: BTreeSet<Position> = BTreeSet::new();
        let mut frontier: VecDeque<Position> = VecDeque::new();
        visited.insert(start);
        frontier.push_back(start);
        while let Some(current) = frontier.pop_front() {
            let Some(knowledge) = self.tiles.get(&current) else {
                continue;
            };
            if knowledge.sector == sector && knowledge.object.as_deref() == Some(object) {
                return Some(current);
            }
            if current != start && !knowledge.walkable {
                continue;
            }
            for next in current.neighbors() {
                if visited.insert(next) && self.tiles.contains_key(&next) {
                    frontier.push_back(next);
                }
            }
        }
        None
    }
}

/// Strip the relic annotation a service response may echo back
pub fn sector_base(name: &str) -> &str {
    name.strip_suffix(RELIC_NOTE).unwrap_or(name).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::events::EventBus;
    use crate::world::grid::SectorBand;
    use crate::world::tile::{Tile, TileObject};

    fn seeded() -> SpatialMemory {
        let mut grid = TileGrid::new(
            4,
            4,
            vec![
                SectorBand::new("Street", 0, 1),
                SectorBand::new("Manor", 2, 3),
            ],
            EventBus::new(),
        );
        grid.set_tile(
            Position::new(3, 3),
            Tile {
                walkable: false,
                object: Some(TileObject::new("relic chest", "A heavy iron chest.")),
                has_relic: true,
                ..Default::default()
            },
        );
        grid.set_tile(
            Position::new(0, 2),
            Tile {
                walkable: false,
                object: Some(TileObject::new("desk", "A writing desk.")),
                ..Default::default()
            },
        );
        SpatialMemory::seed_from_grid(&grid)
    }

    #[test]
    fn test_seed_covers_grid() {
        let memory = seeded();
        assert_eq!(memory.known_tile_count(), 16);
        let chest = memory.knowledge(Position::new(3, 3)).unwrap();
        assert!(chest.has_relic);
        assert_eq!(chest.object.as_deref(), Some("relic chest"));
        assert_eq!(chest.sector, "Manor");
    }

    #[test]
    fn test_knowledge_goes_stale_until_updated() {
        let mut memory = seeded();
        // The world changes; the agent has not seen it yet.
        assert!(memory.knowledge(Position::new(1, 1)).unwrap().walkable);
        memory.update(
            Position::new(1, 1),
            TileKnowledge {
                walkable: false,
                sector: "Street".to_string(),
                object: None,
                has_relic: false,
            },
        );
        assert!(!memory.knowledge(Position::new(1, 1)).unwrap().walkable);
    }

    #[test]
    fn test_known_sectors_annotates_relic() {
        let memory = seeded();
        assert_eq!(
            memory.known_sectors(),
            vec!["Manor (The relic is here)".to_string(), "Street".to_string()]
        );
    }

    #[test]
    fn test_sector_base_strips_annotation() {
        assert_eq!(sector_base("Manor (The relic is here)"), "Manor");
        assert_eq!(sector_base("Manor"), "Manor");
    }

    #[test]
    fn test_objects_in_sector() {
        let memory = seeded();
        assert_eq!(
            memory.objects_in_sector("Manor"),
            vec!["desk".to_string(), "relic chest".to_string()]
        );
        assert_eq!(
            memory.objects_in_sector("Manor (The relic is here)"),
            vec!["desk".to_string(), "relic chest".to_string()]
        );
        assert!(memory.objects_in_sector("Street").is_empty());
    }

    #[test]
    fn test_find_closest_object_by_path() {
        let memory = seeded();
        assert_eq!(
            memory.find_closest_object_by_path(Position::new(3, 0), "Manor", "relic chest"),
            Some(Position::new(3, 3))
        );
        assert_eq!(
            memory.find_closest_object_by_path(Position::new(3, 0), "Manor", "fountain"),
            None
        );
    }

    #[test]
    fn test_search_does_not_pass_through_blocked_tiles() {
        let mut memory = SpatialMemory::new();
        // A 1x4 corridor with a wall between the seeker and the desk.
        for x in 0..4 {
            memory.update(
                Position::new(x, 0),
                TileKnowledge {
                    walkable: x != 1,
                    sector: "Hall".to_string(),
                    object: if x == 3 { Some("desk".to_string()) } else { None },
                    has_relic: false,
                },
            );
        }
        assert_eq!(
            memory.find_closest_object_by_path(Position::new(0, 0), "Hall", "desk"),
            None
        );
        // Standing on a blocked tile still allows stepping off it.
        assert_eq!(
            memory.find_closest_object_by_path(Position::new(1, 0), "Hall", "desk"),
            Some(Position::new(3, 0))
        );
    }
}
