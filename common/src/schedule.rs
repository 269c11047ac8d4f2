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

//! Planned activities

use serde::{Deserialize, Serialize};

/// A planned activity and how long it should run.
///
/// This struct doubles as the JSON contract for schedule-producing cognitive
/// service operations, so the field names are part of the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub duration_minutes: u32,
    pub activity: String,
}

impl ScheduleEntry {
    /// Create a new schedule entry
    pub fn new(duration_minutes: u32, activity: impl Into<String>) -> Self {
        Self {
            duration_minutes,
            activity: activity.into(),
        }
    }
}
