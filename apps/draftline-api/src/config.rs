//! Environment-driven configuration for the Draftline API
//!
//! Expected variables:
//! - GEMINI_API_KEY: API key for the Gemini service (required)
//! - GEMINI_MODEL: generative model name (default: "gemini-1.5-flash")
//! - GEMINI_EMBEDDING_MODEL: embedding model (default: "models/text-embedding-004")
//! - GEMINI_TIMEOUT_SECONDS: per-call timeout (default: 600)
//! - EXA_API_KEY: key for the web-search fallback (optional; fallback off without it)
//! - CHUNK_SIZE / CHUNK_OVERLAP: extraction window parameters (defaults: 8000 / 500)
//! - MIN_CONFIDENCE_THRESHOLD: match confidence gate (default: 0.7)
//! - MATCH_TOP_K: rerank shortlist size (default: 5)
//! - PORT: bind port (default: 3000)

use anyhow::{anyhow, Result};
use draftline_core::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, MatcherConfig};

/// Gemini service connection settings
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub embedding_model: String,
    pub timeout_seconds: u64,
}

/// Full API configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub port: u16,
    pub gemini: GeminiConfig,
    pub exa_api_key: Option<String>,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub matcher: MatcherConfig,
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| anyhow!("invalid value for {}: {}", name, raw)),
        Err(_) => Ok(default),
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self> {
        let api_key =
            std::env::var("GEMINI_API_KEY").map_err(|_| anyhow!("GEMINI_API_KEY is required"))?;

        let gemini = GeminiConfig {
            api_key,
            model: std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-1.5-flash".to_string()),
            embedding_model: std::env::var("GEMINI_EMBEDDING_MODEL")
                .unwrap_or_else(|_| "models/text-embedding-004".to_string()),
            timeout_seconds: env_parse("GEMINI_TIMEOUT_SECONDS", 600)?,
        };

        let matcher = MatcherConfig {
            top_k: env_parse("MATCH_TOP_K", MatcherConfig::default().top_k)?,
            min_confidence: env_parse(
                "MIN_CONFIDENCE_THRESHOLD",
                MatcherConfig::default().min_confidence,
            )?,
        };

        Ok(Self {
            port: env_parse("PORT", 3000)?,
            gemini,
            exa_api_key: std::env::var("EXA_API_KEY").ok().filter(|k| !k.is_empty()),
            chunk_size: env_parse("CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?,
            chunk_overlap: env_parse("CHUNK_OVERLAP", DEFAULT_CHUNK_OVERLAP)?,
            matcher,
        })
    }
}
