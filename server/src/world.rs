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

//! The physical world: grid, tiles, clock, events, and scenario loading
//!
//! Everything agents can see or touch lives here. The grid is the single
//! source of truth for occupancy and tile events; cognition reads from it
//! through the world context and writes back through the `register_*`
//! methods so observers stay consistent.

pub mod clock;
pub mod events;
pub mod grid;
pub mod scenario;
pub mod tile;
