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

//! Character personas fed into cognitive service prompts

use serde::{Deserialize, Serialize};

/// Who a character is. Everything except `currently` is fixed at scenario
/// load; `currently` is revised by the agent at the start of each day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    #[serde(default)]
    pub name: String,
    pub age: u32,
    pub innate_traits: String,
    pub learned_traits: String,
    pub currently: String,
    pub lifestyle: String,
    pub daily_plan_requirement: String,
}

impl Persona {
    /// The identity block prefixed to most cognitive prompts
    pub fn summary(&self) -> String {
        format!(
            "Name: {}\nAge: {}\nInnate traits: {}\nLearned traits: {}\nCurrently: {}\nLifestyle: {}\nDaily plan requirement: {}",
            self.name,
            self.age,
            self.innate_traits,
            self.learned_traits,
            self.currently,
            self.lifestyle,
            self.daily_plan_requirement,
        )
    }
}
