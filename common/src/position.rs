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

//! Grid positions and the composite "x,y" wire encoding

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A tile coordinate on the world grid.
///
/// Positions serialize as composite `"x,y"` strings so they remain valid JSON
/// map keys in memory snapshots (spatial memory is a position-keyed map).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    /// Create a new position
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position
    pub fn distance(&self, other: &Position) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }

    /// Orthogonal adjacency: within one step along one axis while aligned on
    /// the other. A position counts as adjacent to itself.
    pub fn is_adjacent(&self, other: &Position) -> bool {
        ((self.x - other.x).abs() <= 1 && self.y == other.y)
            || ((self.y - other.y).abs() <= 1 && self.x == other.x)
    }

    /// The four orthogonal neighbors, in a fixed scan order
    pub fn neighbors(&self) -> [Position; 4] {
        [
            Position::new(self.x, self.y - 1),
            Position::new(self.x - 1, self.y),
            Position::new(self.x + 1, self.y),
            Position::new(self.x, self.y + 1),
        ]
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl FromStr for Position {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once(',')
            .ok_or_else(|| format!("invalid position '{s}': expected 'x,y'"))?;
        let x = x
            .trim()
            .parse::<i32>()
            .map_err(|e| format!("invalid position '{s}': {e}"))?;
        let y = y
            .trim()
            .parse::<i32>()
            .map_err(|e| format!("invalid position '{s}': {e}"))?;
        Ok(Position::new(x, y))
    }
}

impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{},{}", self.x, self.y))
    }
}

impl<'de> Deserialize<'de> for Position {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PositionVisitor;

        impl Visitor<'_> for PositionVisitor {
            type Value = Position;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a composite \"x,y\" position string")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Position, E> {
                value.parse().map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_str(PositionVisitor)
    }
}
