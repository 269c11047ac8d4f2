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

//! Tile grid, occupancy, pathfinding, and event registration

use crate::world::events::{EventBus, WorldEvent};
use crate::world::tile::{Tile, TileEvent, TileObject};
use duskmoor_common::item::Inventory;
use duskmoor_common::position::Position;
use duskmoor_common::time::GameTime;
use duskmoor_common::triple::EventTriple;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, info, warn};

/// Name of the relic item as it appears in inventories and object lists
pub const RELIC_ITEM: &str = "relic";

/// Object name marking tiles that remove a character from the simulation
pub const ESCAPE_POINT: &str = "escape point";

/// A horizontal band of rows sharing one sector name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectorBand {
    pub name: String,
    pub from_row: i32,
    pub to_row: i32,
}

impl SectorBand {
    pub fn new(name: impl Into<String>, from_row: i32, to_row: i32) -> Self {
        Self {
            name: name.into(),
            from_row,
            to_row,
        }
    }

    fn contains(&self, row: i32) -> bool {
        row >= self.from_row && row <= self.to_row
    }
}

/// The world grid.
///
/// Owns every tile, the sector partition, and occupancy. All world mutation
/// funnels through the `register_*` methods so that the matching tile events
/// and bus notifications are never skipped.
pub struct TileGrid {
    width: i32,
    height: i32,
    tiles: Vec<Tile>,
    sectors: Vec<SectorBand>,
    bus: EventBus,
}

impl TileGrid {
    /// Create a grid of open tiles
    pub fn new(width: i32, height: i32, sectors: Vec<SectorBand>, bus: EventBus) -> Self {
        let count = (width.max(0) * height.max(0)) as usize;
        Self {
            width: width.max(0),
            height: height.max(0),
            tiles: vec![Tile::open(); count],
            sectors,
            bus,
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, position: Position) -> bool {
        position.x >= 0 && position.x < self.width && position.y >= 0 && position.y < self.height
    }

    fn index(&self, position: Position) -> Option<usize> {
        if self.in_bounds(position) {
            Some((position.y * self.width + position.x) as usize)
        } else {
            None
        }
    }

    pub fn tile(&self, position: Position) -> Option<&Tile> {
        self.index(position).and_then(|i| self.tiles.get(i))
    }

    pub fn tile_mut(&mut self, position: Position) -> Option<&mut Tile> {
        self.index(position).and_then(|i| self.tiles.get_mut(i))
    }

    /// Replace the tile at `position`, used by the scenario builder
    pub fn set_tile(&mut self, position: Position, tile: Tile) {
        if let Some(slot) = self.tile_mut(position) {
            *slot = tile;
        }
    }

    /// Sector name covering `position`, or an empty string outside all bands
    pub fn sector_name(&self, position: Position) -> &str {
        self.sectors
            .iter()
            .find(|band| band.contains(position.y))
            .map(|band| band.name.as_str())
            .unwrap_or("")
    }

    /// Iterate every position on the grid in row-major order
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| Position::new(x, y)))
    }

    /// All in-bounds positions within Euclidean `radius` of `center`,
    /// ordered by distance from the center
    pub fn nearby_tiles(&self, center: Position, radius: f32) -> Vec<Position> {
        let reach = radius.ceil() as i32;
        let mut found: Vec<(f32, Position)> = Vec::new();
        for dy in -reach..=reach {
            for dx in -reach..=reach {
                let candidate = Position::new(center.x + dx, center.y + dy);
                if !self.in_bounds(candidate) {
                    continue;
                }
                let distance = center.distance(&candidate);
                if distance <= radius {
                    found.push((distance, candidate));
                }
            }
        }
        found.sort_by(|a, b| a.0.total_cmp(&b.0));
        found.into_iter().map(|(_, position)| position).collect()
    }

    /// Append a tile event, pruning transient events too old for any future
    /// perception pass to pick up
    pub fn add_event(&mut self, event: TileEvent) {
        let horizon = GameTime::new(event.time.turn.saturating_sub(1), event.time.sequence);
        let position = event.position;
        if let Some(tile) = self.tile_mut(position) {
            tile.events
                .retain(|kept| kept.persistent || kept.time.is_newer_than(&horizon));
            tile.events.push(event);
            metrics::counter!("world.tile.events").increment(1);
        } else {
            warn!(%position, "dropping event for out of bounds tile");
        }
    }

    /// Position of the named character, if they occupy a tile
    pub fn character_position(&self, name: &str) -> Option<Position> {
        self.positions()
            .find(|&position| self.tile(position).is_some_and(|tile| {
                tile.occupant.as_deref() == Some(name)
            }))
    }

    /// Place a character on a tile, claiming it
    pub fn place_character(&mut self, name: &str, position: Position) {
        if let Some(tile) = self.tile_mut(position) {
            tile.occupant = Some(name.to_string());
            tile.walkable = false;
        }
    }

    /// Release a character's tile, used when a character escapes
    pub fn remove_character(&mut self, name: &str) {
        if let Some(position) = self.character_position(name) {
            if let Some(tile) = self.tile_mut(position) {
                tile.occupant = None;
                tile.walkable = true;
            }
        }
    }

    /// Move a character between tiles, emitting the entry event other
    /// agents will perceive
    pub fn register_movement(
        &mut self,
        name: &str,
        from: Position,
        to: Position,
        now: GameTime,
        carrying_relic: bool,
    ) {
        if from == to {
            self.remain_in_place(name, from, now);
            return;
        }
        if let Some(tile) = self.tile_mut(from) {
            tile.occupant = None;
            tile.walkable = true;
        }
        if let Some(tile) = self.tile_mut(to) {
            tile.occupant = Some(name.to_string());
            tile.walkable = false;
        }
        let from_sector = self.sector_name(from).to_string();
        let to_sector = self.sector_name(to).to_string();
        let mut description = format!(
            "{name} moves from {from} in {from_sector} to {to} in {to_sector}."
        );
        if carrying_relic {
            description.push_str(&format!(" {name} is glowing with a faint light."));
        }
        self.add_event(TileEvent::new(
            EventTriple::new(name, "enters", format!("position {to}")),
            description,
            now,
            to,
        ));
        metrics::counter!("world.moves").increment(1);
        self.bus.publish(WorldEvent::Moved {
            name: name.to_string(),
            from,
            to,
        });
    }

    /// Record that a character stayed put this turn
    pub fn remain_in_place(&mut self, name: &str, position: Position, now: GameTime) {
        let sector = self.sector_name(position).to_string();
        self.add_event(TileEvent::new(
            EventTriple::new(name, "stays in", sector.clone()),
            format!("{name} stays in place at {position} in {sector}."),
            now,
            position,
        ));
        self.bus.publish(WorldEvent::Stayed {
            name: name.to_string(),
            position,
        });
    }

    /// Register a character's death. Their tile becomes a permanent obstacle
    /// holding their body; a carried relic is surfaced so it can be found.
    pub fn register_death(&mut self, name: &str, position: Position, inventory: &mut Inventory) {
        let carried_relic = inventory.contains(RELIC_ITEM);
        if carried_relic {
            inventory.remove(RELIC_ITEM, 1);
        }
        if let Some(tile) = self.tile_mut(position) {
            tile.walkable = false;
            if carried_relic {
                tile.has_relic = true;
                tile.object = Some(TileObject::new(
                    RELIC_ITEM,
                    format!("The relic rests beside {name}'s body."),
                ));
            } else {
                tile.object = Some(TileObject::new(
                    format!("{name}'s body"),
                    format!("{name}'s body lies here."),
                ));
            }
        }
        info!(name, %position, carried_relic, "character died");
        metrics::counter!("world.deaths").increment(1);
        self.bus.publish(WorldEvent::Killed {
            name: name.to_string(),
            position,
        });
    }

    /// Register that `name` took the relic from the tile at `position`.
    /// Leaves behind a persistent event announcing the theft to the world.
    pub fn register_relic_looted(&mut self, name: &str, position: Position, now: GameTime) {
        if let Some(tile) = self.tile_mut(position) {
            if !tile.has_relic {
                debug!(%position, "loot registration on tile without relic");
            }
            tile.has_relic = false;
            if let Some(occupant) = tile.occupant.clone() {
                tile.object = Some(TileObject::new(
                    format!("{occupant}'s body"),
                    format!("{occupant}'s body lies here."),
                ));
            } else {
                tile.object = Some(TileObject::new(
                    "empty chest",
                    "An opened chest, stripped of its contents.",
                ));
            }
        }
        self.add_event(
            TileEvent::new(
                EventTriple::new(RELIC_ITEM, "is not in", "the manor house"),
                "The relic is not in the manor house. It is missing.",
                now,
                position,
            )
            .persistent(),
        );
        info!(name, %position, "relic looted");
        self.bus.publish(WorldEvent::RelicLooted {
            name: name.to_string(),
            position,
        });
    }

    /// The tile currently holding the relic, if any
    pub fn relic_tile(&self) -> Option<Position> {
        self.positions()
            .find(|&position| self.tile(position).is_some_and(|tile| tile.has_relic))
    }

    /// The escape point tile, if the scenario defines one
    pub fn escape_tile(&self) -> Option<Position> {
        self.positions().find(|&position| {
            self.tile(position).is_some_and(|tile| {
                tile.object
                    .as_ref()
                    .is_some_and(|object| object.name == ESCAPE_POINT)
            })
        })
    }

    /// Breadth-first shortest path over walkable tiles, four-way movement.
    /// The start tile is exempt from the walkability test since the seeker
    /// stands there. Returns the steps from just after `start` through `end`.
    fn shortest_path(&self, start: Position, end: Position) -> Option<Vec<Position>> {
        if start == end {
            return Some(Vec::new());
        }
        let mut came_from: HashMap<Position, Position> = HashMap::new();
        let mut visited: HashSet<Position> = HashSet::new();
        let mut frontier: VecDeque<Position> = VecDeque::new();
        visited.insert(start);
        frontier.push_back(start);
        while let Some(current) = frontier.pop_front() {
            for next in current.neighbors() {
                if visited.contains(&next) || !self.in_bounds(next) {
                    continue;
                }
                let walkable = self.tile(next).is_some_and(|tile| tile.walkable);
                if !walkable {
                    continue;
                }
                visited.insert(next);
                came_from.insert(next, current);
                if next == end {
                    let mut path = vec![end];
                    let mut cursor = end;
                    while let Some(&previous) = came_from.get(&cursor) {
                        if previous == start {
                            break;
                        }
                        path.push(previous);
                        cursor = previous;
                    }
                    path.reverse();
                    return Some(path);
                }
                frontier.push_back(next);
            }
        }
        None
    }

    /// The tile to move to this turn when walking from `start` toward `end`,
    /// clamped to `max_steps` steps along the shortest path. `None` when no
    /// path exists.
    pub fn find_path(&self, start: Position, end: Position, max_steps: usize) -> Option<Position> {
        let path = self.shortest_path(start, end)?;
        if path.is_empty() {
            return Some(start);
        }
        let reach = max_steps.max(1).min(path.len());
        Some(path[reach - 1])
    }

    /// The tile to move to this turn when approaching `end` without stepping
    /// onto it. Picks the reachable neighbor of `end` with the shortest path
    /// and clamps to `max_steps`. Returns `start` when already adjacent or
    /// when no approach exists.
    pub fn find_path_to_adjacent(
        &self,
        start: Position,
        end: Position,
        max_steps: usize,
    ) -> Position {
        if start == end || start.is_adjacent(&end) {
            return start;
        }
        let mut best: Option<Vec<Position>> = None;
        for approach in end.neighbors() {
            if !self.in_bounds(approach) {
                continue;
            }
            if !self.tile(approach).is_some_and(|tile| tile.walkable) {
                continue;
            }
            if let Some(path) = self.shortest_path(start, approach) {
                let shorter = best
                    .as_ref()
                    .map(|current| path.len() < current.len())
                    .unwrap_or(true);
                if shorter {
                    best = Some(path);
                }
            }
        }
        match best {
            Some(path) if !path.is_empty() => {
                let reach = max_steps.max(1).min(path.len());
                path[reach - 1]
            }
            _ => start,
        }
    }
}
