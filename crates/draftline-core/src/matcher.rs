//! Embedding-based template matching with a rerank confidence gate
//!
//! Matching runs in three stages:
//! 1. Embed the free-text query (embedding failure aborts the attempt).
//! 2. Rank every stored template by cosine similarity against the query
//!    embedding and shortlist the top K.
//! 3. Ask the rerank oracle to pick the best shortlist entry; gate its
//!    confidence against a threshold. A failed or out-of-range rerank
//!    degrades to the top-similarity candidate with its similarity standing
//!    in for confidence. Degraded, not fatal.
//!
//! An empty template library is a distinct terminal outcome, not an error;
//! a below-threshold confidence is a signal for the caller to fall back to
//! an external search or ask the user to disambiguate. This module only
//! raises the signal.

use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::MatchError;
use crate::oracle::{EmbeddingOracle, RerankCandidate, RerankOracle};
use shared_types::Template;

/// Shortlist size handed to the rerank oracle
pub const DEFAULT_TOP_K: usize = 5;

/// Confidence below which a match is reported as low-confidence
pub const MIN_CONFIDENCE_THRESHOLD: f32 = 0.7;

/// Matching parameters; static per process, overridable once at construction
#[derive(Debug, Clone, Copy)]
pub struct MatcherConfig {
    pub top_k: usize,
    pub min_confidence: f32,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            min_confidence: MIN_CONFIDENCE_THRESHOLD,
        }
    }
}

/// Ephemeral ranking record: one template scored against one query
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MatchCandidate {
    pub template_id: String,
    pub similarity: f32,
}

/// Terminal result of one match attempt
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// Confidence cleared the gate; use this template
    Matched { template_id: String, confidence: f32 },
    /// Best candidate found but below the gate; caller decides the fallback
    LowConfidence { template_id: String, confidence: f32 },
    /// The library is empty; nothing to rank
    NoTemplates,
}

/// Cosine similarity between two vectors; 0 for zero magnitude or
/// mismatched dimensions
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Rank all templates by similarity to a query embedding, descending.
///
/// The sort is stable, so equal scores keep template insertion order.
pub fn rank(query_embedding: &[f32], templates: &[Template]) -> Vec<MatchCandidate> {
    let mut candidates: Vec<MatchCandidate> = templates
        .iter()
        .map(|t| MatchCandidate {
            template_id: t.template_id.clone(),
            similarity: cosine_similarity(query_embedding, &t.embedding),
        })
        .collect();
    candidates.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap_or(Ordering::Equal));
    candidates
}

/// Resolves a free-text query to the best stored template
pub struct TemplateMatcher {
    embeddings: Arc<dyn EmbeddingOracle>,
    reranker: Arc<dyn RerankOracle>,
    config: MatcherConfig,
}

impl TemplateMatcher {
    pub fn new(
        embeddings: Arc<dyn EmbeddingOracle>,
        reranker: Arc<dyn RerankOracle>,
        config: MatcherConfig,
    ) -> Self {
        Self {
            embeddings,
            reranker,
            config,
        }
    }

    /// Run the full match protocol for `query` against `templates`.
    ///
    /// Only an embedding failure is an error; every downstream oracle
    /// problem degrades per the module rules.
    pub async fn resolve(
        &self,
        query: &str,
        templates: &[Template],
    ) -> Result<MatchOutcome, MatchError> {
        Ok(self.resolve_ranked(query, templates).await?.0)
    }

    /// Like [`resolve`](Self::resolve), but also returns the full similarity
    /// ranking so callers can present alternatives.
    pub async fn resolve_ranked(
        &self,
        query: &str,
        templates: &[Template],
    ) -> Result<(MatchOutcome, Vec<MatchCandidate>), MatchError> {
        let query_embedding = self.embeddings.embed(query).await?;

        let mut scored: Vec<(usize, f32)> = templates
            .iter()
            .enumerate()
            .map(|(i, t)| (i, cosine_similarity(&query_embedding, &t.embedding)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        let ranked: Vec<MatchCandidate> = scored
            .iter()
            .map(|&(i, similarity)| MatchCandidate {
                template_id: templates[i].template_id.clone(),
                similarity,
            })
            .collect();

        scored.truncate(self.config.top_k.max(1));

        if scored.is_empty() {
            return Ok((MatchOutcome::NoTemplates, ranked));
        }

        let shortlist: Vec<RerankCandidate> = scored
            .iter()
            .map(|&(i, _)| {
                let t = &templates[i];
                RerankCandidate {
                    template_id: t.template_id.clone(),
                    title: t.title.clone(),
                    doc_type: t.doc_type.clone(),
                    description: t.description.clone(),
                }
            })
            .collect();

        let (winner_index, confidence) = match self.reranker.rerank(query, &shortlist).await {
            Ok(decision) if decision.selected_index < scored.len() => {
                debug!(
                    selected = decision.selected_index,
                    confidence = decision.confidence,
                    "rerank decision accepted"
                );
                (scored[decision.selected_index].0, decision.confidence)
            }
            Ok(decision) => {
                warn!(
                    index = decision.selected_index,
                    shortlist = scored.len(),
                    "rerank index out of range, falling back to top similarity"
                );
                (scored[0].0, scored[0].1)
            }
            Err(e) => {
                warn!(error = %e, "rerank failed, falling back to top similarity");
                (scored[0].0, scored[0].1)
            }
        };

        let template_id = templates[winner_index].template_id.clone();
        let outcome = if confidence >= self.config.min_confidence {
            MatchOutcome::Matched {
                template_id,
                confidence,
            }
        } else {
            MatchOutcome::LowConfidence {
                template_id,
                confidence,
            }
        };
        Ok((outcome, ranked))
    }
}
