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

//! Character stat blocks and attack resolution rules
//!
//! The dice are rolled by the engine; everything in here is deterministic so
//! the natural 1 / natural 20 rules can be pinned down in tests.

use serde::{Deserialize, Serialize};

/// The six ability scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatBlock {
    pub strength: u32,
    pub dexterity: u32,
    pub constitution: u32,
    pub intelligence: u32,
    pub wisdom: u32,
    pub charisma: u32,
}

impl StatBlock {
    /// How many perceived events an agent can commit to memory per turn
    pub fn perceive_bandwidth(&self) -> usize {
        (self.wisdom / 2) as usize
    }
}

/// The commoner baseline: 10 in every score
impl Default for StatBlock {
    fn default() -> Self {
        Self {
            strength: 10,
            dexterity: 10,
            constitution: 10,
            intelligence: 10,
            wisdom: 10,
            charisma: 10,
        }
    }
}

/// The derived combat sheet. Current hit points live on the agent, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatProfile {
    pub armor_class: i32,
    pub max_hit_points: i32,
    /// Tiles of movement per turn
    pub speed: u32,
    pub attack_bonus: i32,
    /// Damage die size, i.e. the 6 of a d6
    pub damage_die: u32,
    pub damage_bonus: i32,
}

/// An unarmored commoner swinging bare fists
impl Default for CombatProfile {
    fn default() -> Self {
        Self {
            armor_class: 10,
            max_hit_points: 10,
            speed: 3,
            attack_bonus: 0,
            damage_die: 4,
            damage_bonus: 0,
        }
    }
}

/// Resolve a raw d20 roll into an attack check value.
///
/// A natural 1 always misses and a natural 20 always hits, regardless of
/// bonus or armor class; any other roll adds the attack bonus.
pub fn attack_check(roll: u32, attack_bonus: i32) -> i64 {
    match roll {
        1 => i64::MIN,
        20 => i64::MAX,
        other => other as i64 + attack_bonus as i64,
    }
}

/// Whether an attack check beats an armor class (strictly greater)
pub fn check_hits(check: i64, armor_class: i32) -> bool {
    check > armor_class as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_one_always_misses() {
        assert!(!check_hits(attack_check(1, 100), 0));
        assert!(!check_hits(attack_check(1, 100), -50));
    }

    #[test]
    fn test_natural_twenty_always_hits() {
        assert!(check_hits(attack_check(20, -100), i32::MAX));
    }

    #[test]
    fn test_ordinary_roll_adds_bonus() {
        // 10 + 4 vs AC 13 hits, vs AC 14 misses (strictly greater)
        assert!(check_hits(attack_check(10, 4), 13));
        assert!(!check_hits(attack_check(10, 4), 14));
    }

    #[test]
    fn test_perceive_bandwidth() {
        let stats = StatBlock {
            strength: 10,
            dexterity: 10,
            constitution: 10,
            intelligence: 10,
            wisdom: 15,
            charisma: 10,
        };
        assert_eq!(stats.perceive_bandwidth(), 7);
    }
}
