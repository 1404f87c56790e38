//! Oracle capability traits
//!
//! The extraction, embedding, and rerank services are external black boxes.
//! The core consumes them through these traits so the consolidator and the
//! matcher can be driven by deterministic stand-ins in tests and by real
//! HTTP clients in production. Retry policy, if any, belongs to the
//! implementations; the core never retries.

use crate::error::OracleError;
use shared_types::{DataType, DocumentProfile, VariableDescriptor};

/// Raw variable candidate as produced by the extraction oracle for one chunk
///
/// Candidates are pre-normalization and scoped to a single chunk invocation;
/// the consolidator canonicalizes the key and discards duplicates. Oracle
/// implementations are expected to drop structurally unusable output and
/// default the cosmetic fields (empty `label` is derived from the key,
/// missing `data_type` is text, missing `required` is true).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExtractionCandidate {
    pub key: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub example: String,
    #[serde(default)]
    pub data_type: DataType,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl ExtractionCandidate {
    /// Finalize this candidate under its canonical key.
    pub fn into_descriptor(self, canonical_key: String) -> VariableDescriptor {
        let label = if self.label.trim().is_empty() {
            label_from_key(&canonical_key)
        } else {
            self.label
        };
        VariableDescriptor {
            key: canonical_key,
            label,
            description: self.description,
            example: self.example,
            data_type: self.data_type,
            required: self.required,
        }
    }
}

/// Title-case a canonical key for display: `policy_number` -> `Policy Number`
fn label_from_key(key: &str) -> String {
    key.split('_')
        .filter(|seg| !seg.is_empty())
        .map(|seg| {
            let mut chars = seg.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extraction service: finds fill-in variables in one chunk of document text
///
/// The oracle is told which keys are already known so it is biased toward
/// reusing them, but it is not trusted to avoid duplicates; the
/// consolidator is the enforcement point.
#[async_trait::async_trait]
pub trait ExtractionOracle: Send + Sync {
    async fn extract(
        &self,
        chunk_text: &str,
        known_keys: &[String],
    ) -> Result<Vec<ExtractionCandidate>, OracleError>;

    /// Classify the document as a whole (type, jurisdiction, tags).
    ///
    /// Called once per ingestion run, not per chunk. Stand-ins that only
    /// care about extraction can rely on the default.
    async fn classify(&self, _text: &str) -> Result<DocumentProfile, OracleError> {
        Ok(DocumentProfile::unknown())
    }
}

/// Embedding service: maps text to a fixed-length real vector
#[async_trait::async_trait]
pub trait EmbeddingOracle: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, OracleError>;
}

/// What the rerank oracle sees of each shortlisted template
#[derive(Debug, Clone, serde::Serialize)]
pub struct RerankCandidate {
    pub template_id: String,
    pub title: String,
    pub doc_type: String,
    pub description: String,
}

/// Rerank verdict: which shortlist entry won, and how sure the oracle is
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize)]
pub struct RerankDecision {
    pub selected_index: usize,
    pub confidence: f32,
}

/// Rerank service: picks the best candidate for a query from a shortlist
#[async_trait::async_trait]
pub trait RerankOracle: Send + Sync {
    async fn rerank(
        &self,
        query: &str,
        candidates: &[RerankCandidate],
    ) -> Result<RerankDecision, OracleError>;
}
