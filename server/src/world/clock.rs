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

//! Simulation clock tracking turns, in-turn sequence, and wall-clock labels

use duskmoor_common::time::{self, GameTime};

/// The authoritative simulation clock.
///
/// A turn covers one full pass over the roster; within a turn the sequence
/// counter identifies whose slot is active. Turns start at 1 so that elapsed
/// game minutes are zero at the opening bell.
#[derive(Debug, Clone)]
pub struct GameClock {
    turn: u32,
    sequence: u32,
    minutes_per_turn: u32,
    start_hour: u32,
}

impl GameClock {
    /// Create a clock at turn 1, sequence 0
    pub fn new(minutes_per_turn: u32, start_hour: u32) -> Self {
        Self {
            turn: 1,
            sequence: 0,
            minutes_per_turn: minutes_per_turn.max(1),
            start_hour: start_hour % 24,
        }
    }

    /// The current game time
    pub fn now(&self) -> GameTime {
        GameTime::new(self.turn, self.sequence)
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn minutes_per_turn(&self) -> u32 {
        self.minutes_per_turn
    }

    /// Set the active roster slot within the current turn
    pub fn set_sequence(&mut self, sequence: u32) {
        self.sequence = sequence;
    }

    /// Advance to the next turn, resetting the sequence counter
    pub fn next_turn(&mut self) {
        self.turn += 1;
        self.sequence = 0;
    }

    /// Whether the current turn falls on the first minute of a calendar day
    pub fn is_day_start(&self) -> bool {
        time::minutes_of_day(self.turn, self.minutes_per_turn, self.start_hour) == 0
    }

    /// Wall-clock label for the current turn, e.g. `03:40`
    pub fn clock_label(&self) -> String {
        time::clock_label(self.turn, self.minutes_per_turn, self.start_hour)
    }
}
