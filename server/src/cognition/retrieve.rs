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

//! Retrieve stage: associate fresh perceptions with stored memory
//!
//! A plain keyword-index lookup per perceived event; the scored retrieval
//! lives in [`crate::cognition::retrieval`] and is used by reflection and
//! chat, not here.

use crate::cognition::memory::ConceptNode;
use crate::cognition::npc::NpcAgent;

/// One perceived event bundled with what the agent already knows about it
#[derive(Debug, Clone)]
pub struct RetrievedBundle {
    pub original: ConceptNode,
    pub relevant_events: Vec<ConceptNode>,
    pub relevant_thoughts: Vec<ConceptNode>,
}

impl RetrievedBundle {
    /// Render the bundle as prompt context
    pub fn describe(&self) -> String {
        let mut lines = vec![format!("Observed: {}", self.original.description)];
        lines.extend(
            self.relevant_events
                .iter()
                .map(|node| format!("Related event: {}", node.description)),
        );
        lines.extend(
            self.relevant_thoughts
                .iter()
                .map(|node| format!("Related thought: {}", node.description)),
        );
        lines.join("\n")
    }
}

/// Look up, per perceived event, the events and thoughts sharing any of its
/// triple terms
pub(crate) fn retrieve(agent: &NpcAgent, perceived: &[ConceptNode]) -> Vec<RetrievedBundle> {
    perceived
        .iter()
        .map(|node| RetrievedBundle {
            original: node.clone(),
            relevant_events: agent.memory.relevant_events(&node.triple),
            relevant_thoughts: agent.memory.relevant_thoughts(&node.triple),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cognition::npc::fixtures;
    use duskmoor_common::position::Position;
    use duskmoor_common::time::GameTime;
    use duskmoor_common::triple::EventTriple;
    use std::collections::BTreeSet;

    fn keywords(terms: &[&str]) -> BTreeSet<String> {
        terms.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_bundles_carry_keyword_matches() {
        let mut agent = fixtures::npc("Aldric", Position::new(2, 2));
        agent.memory.add_event(
            GameTime::new(1, 0),
            None,
            EventTriple::new("Vesper", "enters", "the Great Hall"),
            "Vesper enters the Great Hall",
            "Vesper enters the Great Hall",
            vec![1.0, 0.0],
            4,
            keywords(&["Vesper", "the Great Hall"]),
        );
        agent.memory.add_thought(
            GameTime::new(2, 0),
            None,
            EventTriple::new("Aldric", "distrusts", "Vesper"),
            "Aldric distrusts Vesper",
            "Aldric distrusts Vesper",
            vec![0.0, 1.0],
            6,
            keywords(&["Aldric", "Vesper"]),
            Vec::new(),
        );
        let id = agent.memory.add_event(
            GameTime::new(3, 0),
            None,
            EventTriple::new("Vesper", "opens", "the window"),
            "Vesper opens the window",
            "Vesper opens the window",
            vec![1.0, 1.0],
            5,
            keywords(&["Vesper", "the window"]),
        );
        let perceived = vec![agent.memory.node(id).unwrap().clone()];

        let bundles = retrieve(&agent, &perceived);
        assert_eq!(bundles.len(), 1);
        let bundle = &bundles[0];
        assert_eq!(bundle.original.description, "Vesper opens the window");
        // Two events under "vesper" plus the perceived event again under
        // "the window"; bucket concatenation keeps the duplicate.
        assert_eq!(bundle.relevant_events.len(), 3);
        assert_eq!(bundle.relevant_thoughts.len(), 1);

        let context = bundle.describe();
        assert!(context.starts_with("Observed: Vesper opens the window"));
        assert!(context.contains("Related thought: Aldric distrusts Vesper"));
    }

    #[test]
    fn test_no_matches_gives_empty_bundle() {
        let mut agent = fixtures::npc("Aldric", Position::new(2, 2));
        let id = agent.memory.add_event(
            GameTime::new(1, 0),
            None,
            EventTriple::new("a fox", "crosses", "the yard"),
            "A fox crosses the yard",
            "A fox crosses the yard",
            vec![1.0, 0.0],
            2,
            keywords(&["a fox", "the yard"]),
        );
        let perceived = vec![agent.memory.node(id).unwrap().clone()];

        let bundles = retrieve(&agent, &perceived);
        // The perceived event matches itself under both of its own keywords.
        assert_eq!(bundles[0].relevant_events.len(), 2);
        assert!(bundles[0].relevant_thoughts.is_empty());
    }
}
