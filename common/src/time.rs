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

//! Turn/sequence game time and day clock math

use serde::{Deserialize, Serialize};
use std::fmt;

/// Minutes in a day, for the wrap-around clock
const MINUTES_PER_DAY: u32 = 24 * 60;

/// A point in simulation time.
///
/// `turn` counts full rounds starting at 1; `sequence` is the acting agent's
/// slot within the round and resets to 0 each turn. Ordering is strictly
/// lexicographic, so two agents acting in the same turn are still ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GameTime {
    pub turn: u32,
    pub sequence: u32,
}

impl GameTime {
    /// Create a new game time
    pub const fn new(turn: u32, sequence: u32) -> Self {
        Self { turn, sequence }
    }

    /// Strict lexicographic "newer than" comparison
    pub fn is_newer_than(&self, other: &GameTime) -> bool {
        self.turn > other.turn || (self.turn == other.turn && self.sequence > other.sequence)
    }
}

impl fmt::Display for GameTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "turn {} seq {}", self.turn, self.sequence)
    }
}

/// Minutes into the day for a given turn, wrapping at midnight.
///
/// Turn 1 falls on the configured start hour; each later turn adds
/// `minutes_per_turn`.
pub fn minutes_of_day(turn: u32, minutes_per_turn: u32, start_hour: u32) -> u32 {
    (start_hour * 60 + turn.saturating_sub(1) * minutes_per_turn) % MINUTES_PER_DAY
}

/// Render the day clock as an HH:MM label
pub fn clock_label(turn: u32, minutes_per_turn: u32, start_hour: u32) -> String {
    let minutes = minutes_of_day(turn, minutes_per_turn, start_hour);
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}
