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

//! Duskmoor Common Types
//!
//! This crate defines the shared data model used across Duskmoor:
//! - Grid positions with the composite "x,y" wire encoding
//! - Turn/sequence game time and the day clock math
//! - Subject/predicate/object event triples
//! - Items and inventories
//! - Character stat blocks and the attack resolution rules
//! - Chat transcripts and schedule entries

pub mod chat;
pub mod item;
pub mod position;
pub mod schedule;
pub mod stats;
pub mod time;
pub mod triple;
