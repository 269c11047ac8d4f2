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

//! Agent cognition: perceive, retrieve, plan, reflect, act
//!
//! Every simulated character runs the same loop each turn: notice what is
//! happening nearby, pull related memories, keep or replace the current
//! action, and carry it out at its address. Accumulated importance
//! periodically triggers reflection, which distills recent memory into
//! higher-level thoughts. The player-driven agent shares the same turn
//! contract but takes its decisions from a terminal instead.

pub mod act;
pub mod action;
pub mod agent;
pub mod chat;
pub mod human;
pub mod memory;
pub mod npc;
pub mod oracle;
pub mod perceive;
pub mod persona;
pub mod plan;
pub mod reflect;
pub mod retrieval;
pub mod retrieve;
pub mod spatial;
