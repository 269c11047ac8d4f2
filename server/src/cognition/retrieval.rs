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

//! Focal-point retrieval: scoring memories by recency, relevance, and
//! importance
//!
//! Given a focal text, every event and thought is scored as a weighted blend
//! of three normalized components. Recency decays exponentially down the
//! access-ordered candidate list, relevance is cosine similarity between the
//! focal embedding and the node embedding, and importance is the stored
//! poignancy. The blend weights deliberately favor relevance and importance
//! over recency.

use crate::cognition::memory::{AssociativeMemory, ConceptNode, NodeId};
use crate::services::embedding::Embeddings;
use crate::services::types::ServiceResult;
use duskmoor_common::time::GameTime;
use tracing::trace;

/// Exponential decay applied per step down the access-ordered list
pub const DEFAULT_RECENCY_DECAY: f32 = 0.99;

/// Blend weights for the three scoring components
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalWeights {
    pub recency: f32,
    pub relevance: f32,
    pub importance: f32,
}

impl Default for RetrievalWeights {
    fn default() -> Self {
        Self {
            recency: 0.5,
            relevance: 3.0,
            importance: 2.0,
        }
    }
}

/// Cosine similarity between two vectors. Mismatched lengths and zero
/// magnitudes score 0.0 rather than erroring.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Min-max normalize into [0, 1]. When every value is equal the data carries
/// no signal, so everything maps to 0.5.
pub fn normalize(values: &[f32]) -> Vec<f32> {
    let Some(first) = values.first() else {
        return Vec::new();
    };
    let mut min = *first;
    let mut max = *first;
    for &value in values {
        min = min.min(value);
        max = max.max(value);
    }
    let range = max - min;
    if range <= f32::EPSILON {
        return vec![0.5; values.len()];
    }
    values.iter().map(|&value| (value - min) / range).collect()
}

/// Blend per-node component scores into final scores. Each component list is
/// normalized independently before weighting.
pub fn blended_scores(
    recency: &[f32],
    relevance: &[f32],
    importance: &[f32],
    weights: &RetrievalWeights,
) -> Vec<f32> {
    let recency = normalize(recency);
    let relevance = normalize(relevance);
    let importance = normalize(importance);
    recency
        .iter()
        .zip(relevance.iter())
        .zip(importance.iter())
        .map(|((r, v), i)| weights.recency * r + weights.relevance * v + weights.importance * i)
        .collect()
}

/// Retrieve the `count` memories most pertinent to `focal`.
///
/// Candidates are every event and thought, ordered by last access (newest
/// first, ties toward the higher id) so the recency decay has a defined
/// shape. Returned nodes are marked accessed at `now`, newly reinforcing
/// them for future retrievals.
pub async fn retrieve_nodes(
    memory: &mut AssociativeMemory,
    embeddings: &dyn Embeddings,
    focal: &str,
    count: usize,
    decay: f32,
    now: GameTime,
) -> ServiceResult<Vec<ConceptNode>> {
    let focal_vector = match memory.embedding(focal) {
        Some(vector) => vector.to_vec(),
        None => embeddings.embed(focal).await?,
    };

    struct Candidate {
        id: NodeId,
        last_accessed: GameTime,
        poignancy: u8,
        similarity: f32,
    }

    let mut candidates: Vec<Candidate> = memory
        .event_and_thought_nodes()
        .into_iter()
        .map(|node| Candidate {
            id: node.id,
            last_accessed: node.last_accessed,
            poignancy: node.poignancy,
            similarity: memory
                .embedding(&node.embedding_key)
                .map(|vector| cosine_similarity(&focal_vector, vector))
                .unwrap_or(0.0),
        })
        .collect();
    if candidates.is_empty() {
        return Ok(Vec::new());
    }
    candidates.sort_by(|a, b| {
        b.last_accessed
            .cmp(&a.last_accessed)
            .then(b.id.cmp(&a.id))
    });

    let recency: Vec<f32> = (0..candidates.len())
        .map(|index| decay.powi(index as i32))
        .collect();
    let relevance: Vec<f32> = candidates.iter().map(|c| c.similarity).collect();
    let importance: Vec<f32> = candidates.iter().map(|c| c.poignancy as f32).collect();
    let scores = blended_scores(&recency, &relevance, &importance, &RetrievalWeights::default());

    let mut ranked: Vec<(f32, NodeId)> = scores
        .into_iter()
        .zip(candidates.iter().map(|c| c.id))
        .collect();
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut retrieved = Vec::with_capacity(count.min(ranked.len()));
    for (score, id) in ranked.into_iter().take(count) {
        memory.touch(id, now);
        if let Some(node) = memory.node(id) {
            trace!(%id, score, "retrieved node");
            retrieved.push(node.clone());
        }
    }
    metrics::counter!("cognition.retrievals").increment(1);
    Ok(retrieved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::embedding::MockEmbeddings;
    use duskmoor_common::triple::EventTriple;
    use std::collections::BTreeSet;

    fn keywords(terms: &[&str]) -> BTreeSet<String> {
        terms.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_cosine_similarity_edges() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]), 1.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_normalize_properties() {
        assert_eq!(normalize(&[]), Vec::<f32>::new());
        assert_eq!(normalize(&[3.0, 3.0, 3.0]), vec![0.5, 0.5, 0.5]);
        let scaled = normalize(&[2.0, 4.0, 6.0]);
        assert_eq!(scaled, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_blended_scores_weighting() {
        // One node wins on relevance, one on importance. With default
        // weights relevance (3.0) outweighs importance (2.0).
        let scores = blended_scores(
            &[1.0, 1.0],
            &[1.0, 0.0],
            &[0.0, 1.0],
            &RetrievalWeights::default(),
        );
        assert!(scores[0] > scores[1]);
    }

    fn seeded_memory() -> AssociativeMemory {
        let mut memory = AssociativeMemory::new();
        memory.add_event(
            GameTime::new(1, 0),
            None,
            EventTriple::new("Vesper", "enters", "the manor"),
            "Vesper enters the manor",
            "Vesper enters the manor",
            vec![1.0, 0.0],
            8,
            keywords(&["Vesper", "the manor"]),
        );
        memory.add_event(
            GameTime::new(2, 0),
            None,
            EventTriple::without_object("Maera", "is sweeping"),
            "Maera is sweeping",
            "Maera is sweeping",
            vec![0.0, 1.0],
            1,
            keywords(&["Maera"]),
        );
        memory
    }

    #[tokio::test]
    async fn test_retrieve_prefers_relevant_and_important() {
        let mut memory = seeded_memory();
        let mut embeddings = MockEmbeddings::new();
        embeddings
            .expect_embed()
            .returning(|_| Ok(vec![1.0, 0.0]));

        let retrieved = retrieve_nodes(
            &mut memory,
            &embeddings,
            "where is the intruder",
            1,
            DEFAULT_RECENCY_DECAY,
            GameTime::new(3, 0),
        )
        .await
        .unwrap();
        assert_eq!(retrieved.len(), 1);
        assert_eq!(retrieved[0].description, "Vesper enters the manor");
        // Retrieval refreshed the winner's access time.
        let node = memory.node(retrieved[0].id).unwrap();
        assert_eq!(node.last_accessed, GameTime::new(3, 0));
    }

    #[tokio::test]
    async fn test_retrieve_reuses_stored_focal_embedding() {
        let mut memory = seeded_memory();
        // The focal text matches a stored embedding key, so the provider
        // must not be called: the mock has no expectations.
        let embeddings = MockEmbeddings::new();
        let retrieved = retrieve_nodes(
            &mut memory,
            &embeddings,
            "Vesper enters the manor",
            2,
            DEFAULT_RECENCY_DECAY,
            GameTime::new(3, 0),
        )
        .await
        .unwrap();
        assert_eq!(retrieved.len(), 2);
        assert_eq!(retrieved[0].description, "Vesper enters the manor");
    }

    #[tokio::test]
    async fn test_retrieve_empty_memory() {
        let mut memory = AssociativeMemory::new();
        let mut embeddings = MockEmbeddings::new();
        embeddings.expect_embed().returning(|_| Ok(vec![1.0]));
        let retrieved = retrieve_nodes(
            &mut memory,
            &embeddings,
            "anything",
            5,
            DEFAULT_RECENCY_DECAY,
            GameTime::new(1, 0),
        )
        .await
        .unwrap();
        assert!(retrieved.is_empty());
    }

    #[tokio::test]
    async fn test_retrieve_is_deterministic() {
        let build = || async {
            let mut memory = seeded_memory();
            let mut embeddings = MockEmbeddings::new();
            embeddings.expect_embed().returning(|_| Ok(vec![0.7, 0.7]));
            retrieve_nodes(
                &mut memory,
                &embeddings,
                "the night's events",
                2,
                DEFAULT_RECENCY_DECAY,
                GameTime::new(4, 0),
            )
            .await
            .unwrap()
            .into_iter()
            .map(|node| node.id)
            .collect::<Vec<_>>()
        };
        assert_eq!(build().await, build().await);
    }
}
