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

//! Duskmoor World Server
//!
//! A turn-based heist simulation set in a manor house. Non-player characters
//! are generative agents: each carries an associative memory of concept nodes
//! and runs a perceive / retrieve / plan / reflect / act pipeline over the
//! cognitive services every turn. One human-controlled character can join the
//! roster, driven by a command channel instead of cognition. The scheduler
//! walks the roster in initiative order until somebody escapes with the relic
//! or the turn budget runs out.

pub mod cognition;
pub mod config;
pub mod context;
pub mod persistence;
pub mod scheduler;
pub mod services;
pub mod test_utils;
pub mod world;
