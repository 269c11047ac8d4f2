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

//! Subject/predicate/object triples describing events and actions

use serde::{Deserialize, Serialize};
use std::fmt;

/// A subject/predicate/object description of something happening in the
/// world, e.g. ("Aldric", "enters", "position (3, 4)") or
/// ("Maera", "is sleeping", None).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTriple {
    pub subject: String,
    pub predicate: String,
    pub object: Option<String>,
}

impl EventTriple {
    /// Create a triple with all three terms
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: Some(object.into()),
        }
    }

    /// Create a triple with no object term
    pub fn without_object(subject: impl Into<String>, predicate: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: None,
        }
    }

    /// True for the background "X is idle" triple, which is kept out of
    /// keyword-strength accounting and poignancy scoring.
    pub fn is_idle(&self) -> bool {
        self.predicate == "is" && self.object.as_deref() == Some("idle")
    }
}

impl fmt::Display for EventTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.object {
            Some(object) => write!(f, "{} {} {}", self.subject, self.predicate, object),
            None => write!(f, "{} {}", self.subject, self.predicate),
        }
    }
}
