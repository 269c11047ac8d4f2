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

//! Associative memory: the long-term event/thought/chat store behind every
//! non-player character.
//!
//! ## Structure
//!
//! Memories are [`ConceptNode`]s in one of three kinds. Events record things
//! perceived in the world, thoughts record conclusions the agent drew, and
//! chats record whole conversations. Nodes are indexed three ways:
//!
//! - by id, for citation chains and persistence,
//! - per kind in newest-first lists, for "most recent" queries,
//! - by lowercased keyword, for the keyword arm of retrieval.
//!
//! ## Access discipline
//!
//! Every node carries a `last_accessed` time. Retrieval scoring orders
//! candidates by that time, so the scorer calls [`AssociativeMemory::touch`]
//! on everything it hands back. Nothing is ever deleted; the store grows for
//! the lifetime of the agent and is snapshotted wholesale at shutdown.

use duskmoor_common::chat::ChatEntry;
use duskmoor_common::time::GameTime;
use duskmoor_common::triple::EventTriple;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::str::FromStr;

/// Identifier of a concept node, unique within one agent's memory.
///
/// Rendered as `ConceptNode_{n}` wherever it is serialized, which keeps
/// snapshot files self-describing and usable as JSON object keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConceptNode_{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("ConceptNode_")
            .ok_or_else(|| format!("node id '{s}' missing ConceptNode_ prefix"))?;
        let value: u64 = digits
            .parse()
            .map_err(|_| format!("node id '{s}' has a non-numeric suffix"))?;
        Ok(NodeId(value))
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct NodeIdVisitor;

        impl Visitor<'_> for NodeIdVisitor {
            type Value = NodeId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string of the form ConceptNode_{n}")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<NodeId, E> {
                value.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(NodeIdVisitor)
    }
}

/// The three kinds of memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Event,
    Thought,
    Chat,
}

impl NodeKind {
    /// Capitalized label used in summary statements
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Event => "Event",
            NodeKind::Thought => "Thought",
            NodeKind::Chat => "Chat",
        }
    }
}

/// What a node carries beyond its description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filling {
    /// Nodes this one was inferred from (empty for direct perception)
    Citations(Vec<NodeId>),
    /// A complete conversation and why it ended
    Dialogue {
        transcript: Vec<ChatEntry>,
        end_reason: String,
    },
}

/// One memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptNode {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Position within this node's kind, 1-based in insertion order
    pub type_sequence: u64,
    /// Inference depth: 0 for perceived events and chats, cited depth + 1
    /// for thoughts
    pub depth: u32,
    pub created: GameTime,
    pub expires: Option<GameTime>,
    pub last_accessed: GameTime,
    pub triple: EventTriple,
    pub description: String,
    /// Key into the embedding table; usually the description verbatim
    pub embedding_key: String,
    /// Importance on a 1..=10 scale
    pub poignancy: u8,
    pub keywords: BTreeSet<String>,
    pub filling: Filling,
}

/// Render nodes as numbered "N. Kind at time: description" statements for
/// service prompts
pub fn summary_statements(nodes: &[ConceptNode]) -> String {
    nodes
        .iter()
        .enumerate()
        .map(|(index, node)| {
            format!(
                "{}. {} at {}: {}",
                index + 1,
                node.kind.label(),
                node.created,
                node.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The complete long-term memory of one agent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssociativeMemory {
    nodes: BTreeMap<NodeId, ConceptNode>,
    /// Newest-first id lists per kind
    events: VecDeque<NodeId>,
    thoughts: VecDeque<NodeId>,
    chats: VecDeque<NodeId>,
    /// Lowercased keyword buckets, newest-first
    keyword_to_events: BTreeMap<String, VecDeque<NodeId>>,
    keyword_to_thoughts: BTreeMap<String, VecDeque<NodeId>>,
    keyword_to_chats: BTreeMap<String, VecDeque<NodeId>>,
    event_keyword_strength: BTreeMap<String, u32>,
    thought_keyword_strength: BTreeMap<String, u32>,
    embeddings: BTreeMap<String, Vec<f32>>,
}

impl AssociativeMemory {
    /// Create an empty memory
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> NodeId {
        NodeId((self.nodes.len() + 1) as u64)
    }

    /// Look up a node by id
    pub fn node(&self, id: NodeId) -> Option<&ConceptNode> {
        self.nodes.get(&id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn thought_count(&self) -> usize {
        self.thoughts.len()
    }

    pub fn chat_count(&self) -> usize {
        self.chats.len()
    }

    /// The stored embedding for a key, if present
    pub fn embedding(&self, key: &str) -> Option<&[f32]> {
        self.embeddings.get(key).map(Vec::as_slice)
    }

    /// Accumulated keyword strength over non-idle events
    pub fn event_keyword_strength(&self, keyword: &str) -> u32 {
        self.event_keyword_strength
            .get(&keyword.to_lowercase())
            .copied()
            .unwrap_or(0)
    }

    /// Accumulated keyword strength over thoughts
    pub fn thought_keyword_strength(&self, keyword: &str) -> u32 {
        self.thought_keyword_strength
            .get(&keyword.to_lowercase())
            .copied()
            .unwrap_or(0)
    }

    /// Record a perceived event.
    ///
    /// # Arguments
    ///
    /// * `created` - When the event was perceived; also its initial access time
    /// * `expires` - Optional expiry, unused by the current pipeline
    /// * `triple` - Subject/predicate/object form of the event
    /// * `description` - Natural language description
    /// * `embedding_key` - Key the embedding is stored under
    /// * `embedding` - Embedding vector; overwrites any previous vector at the key
    /// * `poignancy` - Importance score from the poignancy service
    /// * `keywords` - Terms to index under, lowercased internally
    ///
    /// # Returns
    ///
    /// The id of the stored node.
    #[allow(clippy::too_many_arguments)]
    pub fn add_event(
        &mut self,
        created: GameTime,
        expires: Option<GameTime>,
        triple: EventTriple,
        description: impl Into<String>,
        embedding_key: impl Into<String>,
        embedding: Vec<f32>,
        poignancy: u8,
        keywords: BTreeSet<String>,
    ) -> NodeId {
        let id = self.next_id();
        let keywords = lowercase(keywords);
        let node = ConceptNode {
            id,
            kind: NodeKind::Event,
            type_sequence: (self.events.len() + 1) as u64,
            depth: 0,
            created,
            expires,
            last_accessed: created,
            triple: triple.clone(),
            description: description.into(),
            embedding_key: embedding_key.into(),
            poignancy,
            keywords: keywords.clone(),
            filling: Filling::Citations(Vec::new()),
        };
        self.embeddings.insert(node.embedding_key.clone(), embedding);
        self.events.push_front(id);
        for keyword in &keywords {
            self.keyword_to_events
                .entry(keyword.clone())
                .or_default()
                .push_front(id);
            if !triple.is_idle() {
                *self
                    .event_keyword_strength
                    .entry(keyword.clone())
                    .or_insert(0) += 1;
            }
        }
        self.nodes.insert(id, node);
        metrics::counter!("cognition.nodes.created", "kind" => "event").increment(1);
        id
    }

    /// Record an inferred thought.
    ///
    /// Depth is one more than the deepest cited node, so chains of
    /// reflection stay measurable.
    ///
    /// # Arguments
    ///
    /// * `citations` - Nodes this thought was inferred from; may be empty
    ///
    /// Remaining arguments mirror [`AssociativeMemory::add_event`].
    #[allow(clippy::too_many_arguments)]
    pub fn add_thought(
        &mut self,
        created: GameTime,
        expires: Option<GameTime>,
        triple: EventTriple,
        description: impl Into<String>,
        embedding_key: impl Into<String>,
        embedding: Vec<f32>,
        poignancy: u8,
        keywords: BTreeSet<String>,
        citations: Vec<NodeId>,
    ) -> NodeId {
        let id = self.next_id();
        let keywords = lowercase(keywords);
        let depth = 1 + citations
            .iter()
            .filter_map(|cited| self.nodes.get(cited))
            .map(|node| node.depth)
            .max()
            .unwrap_or(0);
        let node = ConceptNode {
            id,
            kind: NodeKind::Thought,
            type_sequence: (self.thoughts.len() + 1) as u64,
            depth,
            created,
            expires,
            last_accessed: created,
            triple: triple.clone(),
            description: description.into(),
            embedding_key: embedding_key.into(),
            poignancy,
            keywords: keywords.clone(),
            filling: Filling::Citations(citations),
        };
        self.embeddings.insert(node.embedding_key.clone(), embedding);
        self.thoughts.push_front(id);
        for keyword in &keywords {
            self.keyword_to_thoughts
                .entry(keyword.clone())
                .or_default()
                .push_front(id);
            if !triple.is_idle() {
                *self
                    .thought_keyword_strength
                    .entry(keyword.clone())
                    .or_insert(0) += 1;
            }
        }
        self.nodes.insert(id, node);
        metrics::counter!("cognition.nodes.created", "kind" => "thought").increment(1);
        id
    }

    /// Record a finished conversation.
    ///
    /// # Arguments
    ///
    /// * `transcript` - The full dialogue
    /// * `end_reason` - Why the conversation stopped
    ///
    /// Remaining arguments mirror [`AssociativeMemory::add_event`].
    #[allow(clippy::too_many_arguments)]
    pub fn add_chat(
        &mut self,
        created: GameTime,
        expires: Option<GameTime>,
        triple: EventTriple,
        description: impl Into<String>,
        embedding_key: impl Into<String>,
        embedding: Vec<f32>,
        poignancy: u8,
        keywords: BTreeSet<String>,
        transcript: Vec<ChatEntry>,
        end_reason: impl Into<String>,
    ) -> NodeId {
        let id = self.next_id();
        let keywords = lowercase(keywords);
        let node = ConceptNode {
            id,
            kind: NodeKind::Chat,
            type_sequence: (self.chats.len() + 1) as u64,
            depth: 0,
            created,
            expires,
            last_accessed: created,
            triple,
            description: description.into(),
            embedding_key: embedding_key.into(),
            poignancy,
            keywords: keywords.clone(),
            filling: Filling::Dialogue {
                transcript,
                end_reason: end_reason.into(),
            },
        };
        self.embeddings.insert(node.embedding_key.clone(), embedding);
        self.chats.push_front(id);
        for keyword in &keywords {
            self.keyword_to_chats
                .entry(keyword.clone())
                .or_default()
                .push_front(id);
        }
        self.nodes.insert(id, node);
        metrics::counter!("cognition.nodes.created", "kind" => "chat").increment(1);
        id
    }

    /// Events sharing a keyword with any term of `triple`, newest first per
    /// term. Buckets are concatenated, so a node indexed under two matching
    /// terms appears twice.
    pub fn relevant_events(&self, triple: &EventTriple) -> Vec<ConceptNode> {
        self.relevant_from(&self.keyword_to_events, triple)
    }

    /// Thoughts sharing a keyword with any term of `triple`
    pub fn relevant_thoughts(&self, triple: &EventTriple) -> Vec<ConceptNode> {
        self.relevant_from(&self.keyword_to_thoughts, triple)
    }

    fn relevant_from(
        &self,
        index: &BTreeMap<String, VecDeque<NodeId>>,
        triple: &EventTriple,
    ) -> Vec<ConceptNode> {
        let mut terms = vec![triple.subject.as_str(), triple.predicate.as_str()];
        if let Some(object) = triple.object.as_deref() {
            terms.push(object);
        }
        let mut found = Vec::new();
        for term in terms {
            if let Some(bucket) = index.get(&term.to_lowercase()) {
                for id in bucket {
                    if let Some(node) = self.nodes.get(id) {
                        found.push(node.clone());
                    }
                }
            }
        }
        found
    }

    /// Every event and thought node, for retrieval scoring
    pub fn event_and_thought_nodes(&self) -> Vec<&ConceptNode> {
        self.events
            .iter()
            .chain(self.thoughts.iter())
            .filter_map(|id| self.nodes.get(id))
            .collect()
    }

    /// The `count` most recently accessed events and thoughts. Ties on
    /// access time break toward the higher node id.
    pub fn recently_accessed(&self, count: usize) -> Vec<ConceptNode> {
        let mut nodes: Vec<&ConceptNode> = self.event_and_thought_nodes();
        nodes.sort_by(|a, b| {
            b.last_accessed
                .cmp(&a.last_accessed)
                .then(b.id.cmp(&a.id))
        });
        nodes.into_iter().take(count).cloned().collect()
    }

    /// The `count` most recently accessed thoughts
    pub fn recent_thoughts(&self, count: usize) -> Vec<ConceptNode> {
        let mut nodes: Vec<&ConceptNode> = self
            .thoughts
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .collect();
        nodes.sort_by(|a, b| {
            b.last_accessed
                .cmp(&a.last_accessed)
                .then(b.id.cmp(&a.id))
        });
        nodes.into_iter().take(count).cloned().collect()
    }

    /// The `count` most recently accessed chats
    pub fn recent_chats(&self, count: usize) -> Vec<ConceptNode> {
        let mut nodes: Vec<&ConceptNode> = self
            .chats
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .collect();
        nodes.sort_by(|a, b| {
            b.last_accessed
                .cmp(&a.last_accessed)
                .then(b.id.cmp(&a.id))
        });
        nodes.into_iter().take(count).cloned().collect()
    }

    /// Update a node's last access time
    pub fn touch(&mut self, id: NodeId, now: GameTime) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.last_accessed = now;
        }
    }
}

fn lowercase(keywords: BTreeSet<String>) -> BTreeSet<String> {
    keywords
        .into_iter()
        .map(|keyword| keyword.to_lowercase())
        .collect()
}
