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

//! World event bus for decoupled notification of simulation milestones

use duskmoor_common::position::Position;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Notable happenings in the world, published for observers such as the
/// structured log sink and integration tests
#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    /// A character moved to a new tile
    Moved {
        name: String,
        from: Position,
        to: Position,
    },
    /// A character spent the turn without changing tiles
    Stayed { name: String, position: Position },
    /// One character attacked another
    Attacked {
        attacker: String,
        target: String,
        hit: bool,
        damage: i32,
    },
    /// A character died
    Killed { name: String, position: Position },
    /// The relic was taken from its resting place
    RelicLooted { name: String, position: Position },
    /// A character left the simulation through an escape point
    Escaped { name: String },
    /// An item changed hands
    ItemGiven {
        giver: String,
        receiver: String,
        item: String,
        quantity: u32,
    },
    /// A conversation concluded
    ChatEnded {
        initiator: String,
        partner: String,
        messages: usize,
    },
}

type EventHandler = Box<dyn Fn(&WorldEvent) + Send + Sync>;

/// Queueing event bus.
///
/// Handlers are registered up front; published events are buffered until
/// [`EventBus::process_events`] drains the queue. The scheduler drains once
/// per agent turn so observers see events in the order they occurred.
#[derive(Clone)]
pub struct EventBus {
    handlers: Arc<Mutex<Vec<EventHandler>>>,
    queue: Arc<Mutex<VecDeque<WorldEvent>>>,
}

impl EventBus {
    /// Create a new event bus with no subscribers
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Mutex::new(Vec::new())),
            queue: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Register a handler invoked for every processed event
    pub fn subscribe<F>(&self, handler: F)
    where
        F: Fn(&WorldEvent) + Send + Sync + 'static,
    {
        if let Ok(mut handlers) = self.handlers.lock() {
            handlers.push(Box::new(handler));
        }
    }

    /// Queue an event for the next processing pass
    pub fn publish(&self, event: WorldEvent) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(event);
        }
        metrics::counter!("world.events.published").increment(1);
    }

    /// Drain the queue, invoking every handler for every queued event.
    /// Returns the number of events processed.
    pub fn process_events(&self) -> usize {
        let drained: Vec<WorldEvent> = match self.queue.lock() {
            Ok(mut queue) => queue.drain(..).collect(),
            Err(_) => return 0,
        };
        if drained.is_empty() {
            return 0;
        }
        if let Ok(handlers) = self.handlers.lock() {
            for event in &drained {
                for handler in handlers.iter() {
                    handler(event);
                }
            }
        }
        drained.len()
    }

    /// Number of events waiting to be processed
    pub fn queue_len(&self) -> usize {
        self.queue.lock().map(|queue| queue.len()).unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
