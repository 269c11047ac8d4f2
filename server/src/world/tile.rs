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

//! World tiles, tile objects, and tile events

use duskmoor_common::position::Position;
use duskmoor_common::time::GameTime;
use duskmoor_common::triple::EventTriple;

/// A named landmark sitting on a tile (desk, bed, relic chest, ...)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileObject {
    pub name: String,
    pub description: String,
}

impl TileObject {
    /// Create a new tile object
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// An immutable fact attached to a tile at the moment it happened.
///
/// Events accumulate on tiles and are consumed, not removed, by perceiving
/// agents. Persistent events represent world facts that stay true ("the relic
/// is missing") and are ingested at most once per agent.
#[derive(Debug, Clone, PartialEq)]
pub struct TileEvent {
    pub triple: EventTriple,
    pub description: String,
    pub time: GameTime,
    pub position: Position,
    pub persistent: bool,
}

impl TileEvent {
    /// Create a transient tile event
    pub fn new(
        triple: EventTriple,
        description: impl Into<String>,
        time: GameTime,
        position: Position,
    ) -> Self {
        Self {
            triple,
            description: description.into(),
            time,
            position,
            persistent: false,
        }
    }

    /// Mark this event as a persistent world fact
    pub fn persistent(mut self) -> Self {
        self.persistent = true;
        self
    }
}

/// One cell of the world grid
#[derive(Debug, Clone, Default)]
pub struct Tile {
    pub walkable: bool,
    pub occupant: Option<String>,
    pub object: Option<TileObject>,
    pub has_relic: bool,
    pub events: Vec<TileEvent>,
}

impl Tile {
    /// An open, walkable tile with nothing on it
    pub fn open() -> Self {
        Self {
            walkable: true,
            ..Default::default()
        }
    }

    /// An impassable tile, optionally holding an object
    pub fn blocked(object: Option<TileObject>) -> Self {
        Self {
            walkable: false,
            object,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistent_builder() {
        let event = TileEvent::new(
            EventTriple::new("relic", "is not in", "the manor house"),
            "The relic is not in the manor house. It is missing.",
            GameTime::new(4, 0),
            Position::new(8, 9),
        )
        .persistent();
        assert!(event.persistent);
    }
}
