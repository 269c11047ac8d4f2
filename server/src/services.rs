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

//! External cognitive services: text generation and embeddings
//!
//! All judgment calls the simulation cannot make mechanically (poignancy,
//! dialogue, planning) are delegated to a text generation provider; memory
//! relevance is scored against vectors from an embedding provider. Both sit
//! behind traits so tests can script them.

pub mod embedding;
pub mod templates;
pub mod text;
pub mod types;
