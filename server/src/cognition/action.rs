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

//! The current action an agent is carrying out

use duskmoor_common::position::Position;
use duskmoor_common::time::GameTime;
use duskmoor_common::triple::EventTriple;
use std::str::FromStr;

/// How an agent engages once it reaches its action target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionMode {
    Chat,
    Interact,
    Attack,
    Give,
    Wait,
}

impl FromStr for ActionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chat" => Ok(ActionMode::Chat),
            "interact" => Ok(ActionMode::Interact),
            "attack" => Ok(ActionMode::Attack),
            "give" => Ok(ActionMode::Give),
            "wait" => Ok(ActionMode::Wait),
            other => Err(format!("unknown action mode '{other}'")),
        }
    }
}

/// One planned action and its progress.
///
/// The action is placed when planning assigns an address, started the first
/// time the agent acts at that address, and finished once the scheduled
/// duration has elapsed in whole turns. An action with no address counts as
/// finished so planning immediately replaces it.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionState {
    pub address: Option<Position>,
    pub started: Option<GameTime>,
    pub duration_minutes: u32,
    pub description: String,
    pub triple: EventTriple,
    pub target_character: Option<String>,
    pub target_object: Option<String>,
    pub should_loot: bool,
    pub mode: Option<ActionMode>,
}

impl ActionState {
    /// The initial do-nothing action every agent starts with
    pub fn idle(name: &str) -> Self {
        Self {
            address: None,
            started: None,
            duration_minutes: 0,
            description: format!("{name} is idle"),
            triple: EventTriple::new(name, "is", "idle"),
            target_character: None,
            target_object: None,
            should_loot: false,
            mode: None,
        }
    }

    /// Replace the current action. Clears progress: the new action has not
    /// started and its engagement mode is undetermined.
    #[allow(clippy::too_many_arguments)]
    pub fn begin(
        &mut self,
        address: Option<Position>,
        duration_minutes: u32,
        description: impl Into<String>,
        triple: EventTriple,
        target_character: Option<String>,
        target_object: Option<String>,
        should_loot: bool,
    ) {
        self.address = address;
        self.started = None;
        self.duration_minutes = duration_minutes;
        self.description = description.into();
        self.triple = triple;
        self.target_character = target_character;
        self.target_object = target_object;
        self.should_loot = should_loot;
        self.mode = None;
    }

    /// Mark the action as started, the first time the agent acts at its
    /// address
    pub fn start(&mut self, now: GameTime) {
        if self.started.is_none() {
            self.started = Some(now);
        }
    }

    /// Whether the action has run its course.
    ///
    /// No address means nothing to do: finished. An address the agent has
    /// not yet acted at means the action is still pending: not finished.
    /// Otherwise the action ends once `duration_minutes` worth of turns
    /// have elapsed since it started.
    pub fn is_finished(&self, now: GameTime, minutes_per_turn: u32) -> bool {
        if self.address.is_none() {
            return true;
        }
        let Some(started) = self.started else {
            return false;
        };
        let turns = self.duration_minutes / minutes_per_turn.max(1);
        let ends = GameTime::new(started.turn + turns, started.sequence);
        !ends.is_newer_than(&now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("Interact".parse::<ActionMode>(), Ok(ActionMode::Interact));
        assert_eq!(" attack ".parse::<ActionMode>(), Ok(ActionMode::Attack));
        assert_eq!("CHAT".parse::<ActionMode>(), Ok(ActionMode::Chat));
        assert!("ponder".parse::<ActionMode>().is_err());
    }

    #[test]
    fn test_idle_is_finished() {
        let action = ActionState::idle("Aldric");
        assert!(action.is_finished(GameTime::new(1, 0), 10));
        assert!(action.triple.is_idle());
    }

    #[test]
    fn test_unstarted_action_is_not_finished() {
        let mut action = ActionState::idle("Aldric");
        action.begin(
            Some(Position::new(2, 2)),
            30,
            "Aldric is polishing the silver",
            EventTriple::new("Aldric", "is polishing", "the silver"),
            None,
            Some("silver cabinet".to_string()),
            false,
        );
        assert!(!action.is_finished(GameTime::new(50, 3), 10));
    }

    #[test]
    fn test_duration_boundary() {
        let mut action = ActionState::idle("Aldric");
        action.begin(
            Some(Position::new(2, 2)),
            30,
            "Aldric is polishing the silver",
            EventTriple::new("Aldric", "is polishing", "the silver"),
            None,
            None,
            false,
        );
        action.start(GameTime::new(5, 2));
        // 30 minutes at 10 minutes per turn ends at turn 8, same sequence.
        assert!(!action.is_finished(GameTime::new(8, 1), 10));
        assert!(action.is_finished(GameTime::new(8, 2), 10));
        assert!(action.is_finished(GameTime::new(9, 0), 10));
    }

    #[test]
    fn test_begin_clears_progress() {
        let mut action = ActionState::idle("Aldric");
        action.begin(
            Some(Position::new(2, 2)),
            10,
            "Aldric is pacing",
            EventTriple::without_object("Aldric", "is pacing"),
            None,
            None,
            false,
        );
        action.start(GameTime::new(1, 0));
        action.mode = Some(ActionMode::Wait);
        action.begin(
            Some(Position::new(3, 3)),
            20,
            "Aldric is investigating a noise",
            EventTriple::new("Aldric", "is investigating", "a noise"),
            None,
            None,
            false,
        );
        assert_eq!(action.started, None);
        assert_eq!(action.mode, None);
        assert!(!action.is_finished(GameTime::new(1, 0), 10));
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut action = ActionState::idle("Aldric");
        action.begin(
            Some(Position::new(2, 2)),
            10,
            "Aldric is pacing",
            EventTriple::without_object("Aldric", "is pacing"),
            None,
            None,
            false,
        );
        action.start(GameTime::new(4, 0));
        action.start(GameTime::new(9, 0));
        assert_eq!(action.started, Some(GameTime::new(4, 0)));
    }
}
