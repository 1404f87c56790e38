//! Gemini API client
//!
//! Implements the core's oracle capabilities (extraction, classification,
//! embedding, rerank) against the Gemini REST API, plus the two draft-side
//! helpers: answer prefill from the user's query and question generation.
//!
//! The model is asked for bare JSON but routinely wraps it in markdown code
//! fences anyway; every response goes through the fence stripper before
//! parsing. Structurally unusable candidates are dropped here so the core
//! only ever sees well-formed ones.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::GeminiConfig;
use draftline_core::{
    ExtractionCandidate, ExtractionOracle, EmbeddingOracle, OracleError, RerankCandidate,
    RerankDecision, RerankOracle,
};
use shared_types::{DocumentProfile, VariableDescriptor};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini-backed oracle client
#[derive(Debug, Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    client: Client,
    base_url: String,
}

/// A user-facing question derived from one template variable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub variable_key: String,
    pub question: String,
    #[serde(default)]
    pub placeholder: String,
    #[serde(default)]
    pub help_text: String,
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: String,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    content: Content,
    #[serde(rename = "taskType")]
    task_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

// ============================================================================
// Response parsing
// ============================================================================

/// Strip the markdown code fences the model wraps around JSON output
fn strip_code_fences(text: &str) -> &str {
    let mut trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("```json") {
        trimmed = rest;
    } else if let Some(rest) = trimmed.strip_prefix("```") {
        trimmed = rest;
    }
    if let Some(rest) = trimmed.strip_suffix("```") {
        trimmed = rest;
    }
    trimmed.trim()
}

fn parse_variables(value: &Value) -> Vec<ExtractionCandidate> {
    let Some(items) = value.get("variables").and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match serde_json::from_value(item.clone()) {
            Ok(candidate) => Some(candidate),
            Err(e) => {
                debug!(error = %e, "dropping malformed variable candidate");
                None
            }
        })
        .collect()
}

fn parse_profile(value: &Value) -> DocumentProfile {
    DocumentProfile {
        doc_type: value
            .get("doc_type")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string(),
        jurisdiction: value
            .get("jurisdiction")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        similarity_tags: value
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
    }
}

fn parse_rerank(value: &Value) -> Result<RerankDecision, OracleError> {
    let selected_index = value
        .get("best_match_index")
        .and_then(Value::as_u64)
        .ok_or_else(|| OracleError::Malformed("missing best_match_index".to_string()))?;
    let confidence = value
        .get("confidence")
        .and_then(Value::as_f64)
        .unwrap_or(0.5) as f32;
    Ok(RerankDecision {
        selected_index: selected_index as usize,
        confidence,
    })
}

fn parse_answers(value: &Value) -> HashMap<String, String> {
    let Some(object) = value.as_object() else {
        return HashMap::new();
    };
    object
        .iter()
        .map(|(key, answer)| {
            let text = match answer {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), text)
        })
        .collect()
}

fn fallback_questions(variables: &[VariableDescriptor]) -> Vec<Question> {
    variables
        .iter()
        .map(|v| Question {
            variable_key: v.key.clone(),
            question: format!("{}?", v.label),
            placeholder: v.example.clone(),
            help_text: v.description.clone(),
        })
        .collect()
}

// ============================================================================
// Client
// ============================================================================

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, OracleError> {
        if config.api_key.is_empty() {
            return Err(OracleError::Service("empty Gemini API key".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| OracleError::Service(e.to_string()))?;

        Ok(Self {
            config,
            client,
            base_url: BASE_URL.to_string(),
        })
    }

    /// Send one prompt and return the raw model text.
    async fn generate_content(&self, prompt: &str) -> Result<String, OracleError> {
        let request_body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.config.model, self.config.api_key
        );

        let response = self
            .client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| OracleError::Service(e.to_string()))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| OracleError::Service(e.to_string()))?;

        if !status.is_success() {
            return Err(OracleError::Service(format!(
                "HTTP {}: {}",
                status, response_text
            )));
        }

        let parsed: GenerateResponse = serde_json::from_str(&response_text)
            .map_err(|e| OracleError::Malformed(e.to_string()))?;

        parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|part| part.text.clone())
            .ok_or_else(|| OracleError::Malformed("no candidates in response".to_string()))
    }

    /// Send one prompt and parse the (possibly fence-wrapped) JSON reply.
    async fn generate_json(&self, prompt: &str) -> Result<Value, OracleError> {
        let raw = self.generate_content(prompt).await?;
        serde_json::from_str(strip_code_fences(&raw))
            .map_err(|e| OracleError::Malformed(format!("invalid JSON from model: {}", e)))
    }

    /// Extract values for known variables mentioned in the user's query.
    ///
    /// Best-effort: any failure yields an empty map and the draft starts
    /// without prefilled answers.
    pub async fn prefill_answers(
        &self,
        query: &str,
        variables: &[VariableDescriptor],
    ) -> HashMap<String, String> {
        let vars_json = serde_json::to_string_pretty(variables).unwrap_or_default();
        let prompt = format!(
            "Extract any variable values mentioned in the user query.\n\n\
             Query: \"{query}\"\n\n\
             Variables:\n{vars_json}\n\n\
             Return a JSON object mapping variable keys to the extracted values, \
             for example {{\"variable_key\": \"extracted value\"}}.\n\
             If no values can be extracted, return an empty object {{}}.\n\
             Return ONLY valid JSON."
        );

        match self.generate_json(&prompt).await {
            Ok(value) => parse_answers(&value),
            Err(e) => {
                warn!(error = %e, "answer prefill failed, starting with no answers");
                HashMap::new()
            }
        }
    }

    /// Turn template variables into user-friendly questions.
    ///
    /// Best-effort: on failure the questions are derived mechanically from
    /// the variable labels and descriptions.
    pub async fn generate_questions(&self, variables: &[VariableDescriptor]) -> Vec<Question> {
        let vars_json = serde_json::to_string_pretty(variables).unwrap_or_default();
        let prompt = format!(
            "Convert these technical variables into user-friendly questions.\n\n\
             Variables:\n{vars_json}\n\n\
             Rules:\n\
             - NO technical jargon like \"what is policy_number?\"\n\
             - YES human-readable like \"What is the insurance policy number on the schedule?\"\n\
             - Use the description and example to create clear questions\n\n\
             Return a JSON array of objects with fields variable_key, question, \
             placeholder (from the example), and help_text (from the description).\n\
             Return ONLY a valid JSON array."
        );

        match self.generate_json(&prompt).await {
            Ok(value) => match serde_json::from_value::<Vec<Question>>(value) {
                Ok(questions) => questions,
                Err(e) => {
                    warn!(error = %e, "question payload malformed, using fallback questions");
                    fallback_questions(variables)
                }
            },
            Err(e) => {
                warn!(error = %e, "question generation failed, using fallback questions");
                fallback_questions(variables)
            }
        }
    }
}

#[async_trait::async_trait]
impl ExtractionOracle for GeminiClient {
    async fn extract(
        &self,
        chunk_text: &str,
        known_keys: &[String],
    ) -> Result<Vec<ExtractionCandidate>, OracleError> {
        let known_context = if known_keys.is_empty() {
            String::new()
        } else {
            format!(
                "\nAlready-known variable keys (reuse these exact keys when the same \
                 field appears again, do not invent new spellings):\n{}\n",
                serde_json::to_string(known_keys).unwrap_or_default()
            )
        };

        let prompt = format!(
            "You are a legal document templating assistant. Extract variables that \
             should be filled in (names, dates, amounts, addresses, etc.) from the \
             following legal document text.\n\n\
             Do NOT variable-ize:\n\
             - Statutory text or legal citations\n\
             - Standard legal language\n\
             - Section headings\n\
             {known_context}\n\
             Document text:\n{chunk_text}\n\n\
             Return a JSON object with this structure:\n\
             {{\"variables\": [{{\"key\": \"snake_case_key\", \"label\": \"Human-friendly label\", \
             \"description\": \"What this variable represents\", \"example\": \"Sample value\", \
             \"data_type\": \"text|number|date|email\", \"required\": true}}]}}\n\n\
             IMPORTANT: Variable keys MUST be snake_case (lowercase with underscores).\n\
             Return ONLY valid JSON, no other text."
        );

        let value = self.generate_json(&prompt).await?;
        Ok(parse_variables(&value))
    }

    async fn classify(&self, text: &str) -> Result<DocumentProfile, OracleError> {
        let prompt = format!(
            "Classify the following legal document text.\n\n\
             Document text:\n{text}\n\n\
             Return a JSON object:\n\
             {{\"doc_type\": \"type of document\", \"jurisdiction\": \"jurisdiction if mentioned\", \
             \"tags\": [\"tag1\", \"tag2\"]}}\n\n\
             Return ONLY valid JSON."
        );

        let value = self.generate_json(&prompt).await?;
        Ok(parse_profile(&value))
    }
}

#[async_trait::async_trait]
impl EmbeddingOracle for GeminiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, OracleError> {
        let request_body = EmbedRequest {
            model: &self.config.embedding_model,
            content: Content {
                parts: vec![Part {
                    text: text.to_string(),
                }],
            },
            task_type: "RETRIEVAL_DOCUMENT",
        };

        let url = format!(
            "{}/{}:embedContent?key={}",
            self.base_url, self.config.embedding_model, self.config.api_key
        );

        let response = self
            .client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| OracleError::Service(e.to_string()))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| OracleError::Service(e.to_string()))?;

        if !status.is_success() {
            return Err(OracleError::Service(format!(
                "HTTP {}: {}",
                status, response_text
            )));
        }

        let parsed: EmbedResponse = serde_json::from_str(&response_text)
            .map_err(|e| OracleError::Malformed(e.to_string()))?;
        Ok(parsed.embedding.values)
    }
}

#[async_trait::async_trait]
impl RerankOracle for GeminiClient {
    async fn rerank(
        &self,
        query: &str,
        candidates: &[RerankCandidate],
    ) -> Result<RerankDecision, OracleError> {
        let candidates_text = candidates
            .iter()
            .enumerate()
            .map(|(index, c)| {
                format!(
                    "Template {}:\n  Title: {}\n  Type: {}\n  Description: {}",
                    index, c.title, c.doc_type, c.description
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = format!(
            "Given a user query and template candidates, identify the best matching template.\n\n\
             User query: \"{query}\"\n\n\
             Candidates:\n{candidates_text}\n\n\
             Return JSON:\n\
             {{\"best_match_index\": 0, \"confidence\": 0.95, \"reasoning\": \"Why this template matches\"}}\n\n\
             best_match_index is the zero-based template number above.\n\
             Return ONLY valid JSON."
        );

        let value = self.generate_json(&prompt).await?;
        parse_rerank(&value)
    }
}
