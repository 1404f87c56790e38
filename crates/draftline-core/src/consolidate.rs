//! Chunk-by-chunk extraction consolidation
//!
//! Drives the extraction oracle over a document's windows, in order, and
//! merges the per-chunk candidates into a single ordered, duplicate-free
//! variable set.
//!
//! # Protocol
//!
//! The loop is strictly sequential: the oracle call for window `i + 1` does
//! not start until window `i`'s candidates have been merged, because the
//! `known_keys` hint must reflect every prior discovery. Parallelizing the
//! windows would relax the first-seen-wins guarantee, so the ordering here
//! is a correctness dependency, not an incidental bottleneck.
//!
//! # Merge policy
//!
//! First-seen-wins on canonical keys: the earliest window to introduce a
//! canonical key fixes its descriptor permanently; later candidates for the
//! same key are discarded even if better described. Only literal canonical
//! collisions deduplicate; two differently-worded keys for the same
//! real-world field both survive.
//!
//! # Failure handling
//!
//! A failed oracle call contributes zero candidates for that window and the
//! run continues; consolidation itself never fails.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::chunk::ChunkConfig;
use crate::normalize::normalize_key;
use crate::oracle::ExtractionOracle;
use shared_types::VariableDescriptor;

/// Runs the sequential extract-and-merge protocol over one document
pub struct VariableConsolidator {
    oracle: Arc<dyn ExtractionOracle>,
    chunking: ChunkConfig,
}

impl VariableConsolidator {
    pub fn new(oracle: Arc<dyn ExtractionOracle>, chunking: ChunkConfig) -> Self {
        Self { oracle, chunking }
    }

    /// Produce the final ordered variable set for `text`.
    ///
    /// The returned order is first-discovery order across windows.
    pub async fn run(&self, text: &str) -> Vec<VariableDescriptor> {
        let chunks = self.chunking.split(text);
        let total = chunks.len();
        info!(chars = text.chars().count(), windows = total, "starting extraction run");

        let mut merged: Vec<VariableDescriptor> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for (index, chunk) in chunks.iter().enumerate() {
            let known_keys: Vec<String> = merged.iter().map(|v| v.key.clone()).collect();

            let candidates = match self.oracle.extract(&chunk.text, &known_keys).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    warn!(window = index + 1, total, error = %e, "extraction failed for window, continuing");
                    Vec::new()
                }
            };

            let mut added = 0;
            for candidate in candidates {
                let canonical = normalize_key(&candidate.key);
                if canonical.is_empty() {
                    debug!(raw_key = %candidate.key, "discarding candidate with unusable key");
                    continue;
                }
                if !seen.insert(canonical.clone()) {
                    debug!(key = %canonical, "discarding duplicate candidate");
                    continue;
                }
                merged.push(candidate.into_descriptor(canonical));
                added += 1;
            }

            info!(
                window = index + 1,
                total,
                added,
                known = merged.len(),
                "window merged"
            );
        }

        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OracleError;
    use crate::oracle::ExtractionCandidate;
    use pretty_assertions::assert_eq;
    use shared_types::DataType;
    use std::sync::Mutex;

    /// Scripted oracle: one canned response (or failure) per window, in order
    struct ScriptedOracle {
        responses: Mutex<Vec<Result<Vec<ExtractionCandidate>, OracleError>>>,
        observed_known_keys: Mutex<Vec<Vec<String>>>,
    }

    impl ScriptedOracle {
        fn new(responses: Vec<Result<Vec<ExtractionCandidate>, OracleError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                observed_known_keys: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl ExtractionOracle for ScriptedOracle {
        async fn extract(
            &self,
            _chunk_text: &str,
            known_keys: &[String],
        ) -> Result<Vec<ExtractionCandidate>, OracleError> {
            self.observed_known_keys
                .lock()
                .unwrap()
                .push(known_keys.to_vec());
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                Ok(Vec::new())
            } else {
                responses.remove(0)
            }
        }
    }

    fn candidate(key: &str, description: &str) -> ExtractionCandidate {
        ExtractionCandidate {
            key: key.to_string(),
            label: String::new(),
            description: description.to_string(),
            example: String::new(),
            data_type: DataType::Text,
            required: true,
        }
    }

    fn consolidator(oracle: ScriptedOracle, size: usize, overlap: usize) -> VariableConsolidator {
        VariableConsolidator::new(Arc::new(oracle), ChunkConfig::new(size, overlap).unwrap())
    }

    #[tokio::test]
    async fn test_first_seen_wins_across_windows() {
        let text = "x".repeat(100);
        let oracle = ScriptedOracle::new(vec![
            Ok(vec![candidate("PolicyNumber", "from window one")]),
            Ok(vec![
                candidate("policy-number", "from window two"),
                candidate("incident_date", "when it happened"),
            ]),
        ]);
        let merged = consolidator(oracle, 60, 20).run(&text).await;

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].key, "policy_number");
        assert_eq!(merged[0].description, "from window one");
        assert_eq!(merged[1].key, "incident_date");
    }

    #[tokio::test]
    async fn test_known_keys_grow_monotonically() {
        let text = "x".repeat(120);
        let oracle = Arc::new(ScriptedOracle::new(vec![
            Ok(vec![candidate("claimant_name", "")]),
            Ok(vec![candidate("incident_date", "")]),
            Ok(vec![]),
        ]));
        let consolidator = VariableConsolidator::new(
            Arc::clone(&oracle) as Arc<dyn ExtractionOracle>,
            ChunkConfig::new(50, 10).unwrap(),
        );
        let _ = consolidator.run(&text).await;

        // windows start at 0, 40, 80 -> three oracle calls
        let observed = oracle.observed_known_keys.lock().unwrap().clone();
        assert_eq!(observed.len(), 3);
        assert_eq!(observed[0], Vec::<String>::new());
        assert_eq!(observed[1], vec!["claimant_name".to_string()]);
        assert_eq!(
            observed[2],
            vec!["claimant_name".to_string(), "incident_date".to_string()]
        );
    }

    #[tokio::test]
    async fn test_oracle_failure_skips_window_and_continues() {
        let text = "x".repeat(120);
        let oracle = ScriptedOracle::new(vec![
            Ok(vec![candidate("claimant_name", "")]),
            Err(OracleError::Service("boom".to_string())),
            Ok(vec![candidate("incident_date", "")]),
        ]);
        let merged = consolidator(oracle, 50, 10).run(&text).await;

        let keys: Vec<&str> = merged.iter().map(|v| v.key.as_str()).collect();
        assert_eq!(keys, vec!["claimant_name", "incident_date"]);
    }

    #[tokio::test]
    async fn test_unusable_keys_discarded() {
        let text = "x".repeat(10);
        let oracle = ScriptedOracle::new(vec![Ok(vec![
            candidate("---", "separator junk"),
            candidate("", "empty"),
            candidate("Claim Amount", "keeps this one"),
        ])]);
        let merged = consolidator(oracle, 60, 20).run(&text).await;

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].key, "claim_amount");
        assert_eq!(merged[0].label, "Claim Amount");
    }

    #[tokio::test]
    async fn test_duplicate_within_single_window() {
        let text = "x".repeat(10);
        let oracle = ScriptedOracle::new(vec![Ok(vec![
            candidate("Claimant Name", "first"),
            candidate("claimantName", "second spelling, same key"),
        ])]);
        let merged = consolidator(oracle, 60, 20).run(&text).await;

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].description, "first");
    }
}
