use thiserror::Error;

/// Errors surfaced by oracle calls (extraction, embedding, rerank)
///
/// Every variant is recoverable at the call site: extraction failures yield
/// zero candidates for the failing chunk, rerank failures degrade to the
/// top-similarity candidate, and embedding failures abort only the current
/// match attempt.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OracleError {
    /// The service call itself failed (network, auth, timeout)
    #[error("oracle service error: {0}")]
    Service(String),

    /// The service answered, but the payload could not be understood
    #[error("malformed oracle response: {0}")]
    Malformed(String),
}

/// Invalid chunking parameters, fatal at construction time
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChunkConfigError {
    #[error("chunk size must be greater than zero")]
    ZeroSize,

    #[error("chunk overlap {overlap} must be smaller than chunk size {size}")]
    OverlapTooLarge { size: usize, overlap: usize },

    #[error("chunk overlap must be greater than zero")]
    ZeroOverlap,
}

/// A match attempt that could not produce any outcome
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MatchError {
    /// The query embedding could not be obtained; nothing to rank against
    #[error("query embedding failed: {0}")]
    Embedding(#[from] OracleError),
}

/// Errors raised by the draft instance state machine
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DraftError {
    /// Completed drafts are terminal; a new instance must be created instead
    #[error("draft {0} is completed and can no longer change")]
    AlreadyCompleted(String),

    /// Generation requires every required variable to carry a non-empty answer
    #[error("missing required answers: {}", .missing.join(", "))]
    Incomplete { missing: Vec<String> },
}
