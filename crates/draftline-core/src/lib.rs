//! Draftline Core - Variable extraction, template matching, and draft assembly
//!
//! This crate provides:
//! - Canonical key normalization for extracted variables
//! - Overlapping-window document chunking
//! - Chunk-by-chunk extraction consolidation with duplicate suppression
//! - Embedding-based template matching with a rerank confidence gate
//! - The draft instance state machine gating generation on completeness
//! - Template verification (placeholder and key invariants)
//! - Oracle capability traits for the external extraction/embedding/rerank
//!   services, so tests can inject deterministic stand-ins

pub mod chunk;
pub mod consolidate;
pub mod draft;
pub mod error;
pub mod matcher;
pub mod normalize;
pub mod oracle;
pub mod verify;

// Re-export commonly used types
pub use chunk::{Chunk, ChunkConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
pub use consolidate::VariableConsolidator;
pub use draft::{AnswerReport, DraftInstance};
pub use error::{ChunkConfigError, DraftError, MatchError, OracleError};
pub use matcher::{cosine_similarity, rank, MatchCandidate, MatchOutcome, MatcherConfig, TemplateMatcher};
pub use normalize::{is_canonical_key, normalize_key};
pub use oracle::{
    EmbeddingOracle, ExtractionCandidate, ExtractionOracle, RerankCandidate, RerankDecision,
    RerankOracle,
};
pub use verify::{
    CompositeVerifier, Finding, KeyVerifier, PlaceholderVerifier, VerificationResult, Verifier,
};
