//! Exa web-search fallback
//!
//! When matching comes back low-confidence (or the library is empty), the
//! API augments its answer with public template candidates from the web.
//! Search failures never fail the request; they just mean no web results.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

const SEARCH_URL: &str = "https://api.exa.ai/search";
const RESULT_LIMIT: usize = 5;
const SNIPPET_CHARS: usize = 300;

/// One web search hit, trimmed for the API response
#[derive(Debug, Clone, Serialize)]
pub struct WebResult {
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub score: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    query: &'a str,
    num_results: usize,
    use_autoprompt: bool,
    contents: ContentsSpec,
}

#[derive(Debug, Serialize)]
struct ContentsSpec {
    text: TextSpec,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TextSpec {
    max_characters: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<RawResult>,
}

#[derive(Debug, Deserialize)]
struct RawResult {
    url: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    score: Option<f32>,
}

/// Exa search client for the low-confidence fallback path
#[derive(Debug, Clone)]
pub struct ExaClient {
    api_key: String,
    client: Client,
}

impl ExaClient {
    pub fn new(api_key: String) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { api_key, client })
    }

    /// Search the web for fillable legal templates relevant to `query`.
    pub async fn search_templates(&self, query: &str, doc_type: Option<&str>) -> Vec<WebResult> {
        let search_query = build_search_query(query, doc_type);
        info!(query = %search_query, "searching web for template candidates");

        let request = SearchRequest {
            query: &search_query,
            num_results: RESULT_LIMIT,
            use_autoprompt: true,
            contents: ContentsSpec {
                text: TextSpec {
                    max_characters: 1000,
                },
            },
        };

        let response = match self
            .client
            .post(SEARCH_URL)
            .header("x-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "web search request failed");
                return Vec::new();
            }
        };

        if !response.status().is_success() {
            warn!(status = %response.status(), "web search returned an error status");
            return Vec::new();
        }

        let parsed: SearchResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "web search response malformed");
                return Vec::new();
            }
        };

        parsed
            .results
            .into_iter()
            .map(|raw| {
                let text = raw.text.unwrap_or_default();
                let snippet = text.chars().take(SNIPPET_CHARS).collect();
                WebResult {
                    url: raw.url,
                    title: raw.title.unwrap_or_default(),
                    snippet,
                    score: raw.score.unwrap_or(0.0),
                }
            })
            .collect()
    }
}

fn build_search_query(query: &str, doc_type: Option<&str>) -> String {
    let mut parts = vec![query, "legal template", "document template"];
    if let Some(doc_type) = doc_type {
        if !doc_type.is_empty() && doc_type != "unknown" {
            parts.push(doc_type);
        }
    }
    parts.push("fillable OR variable OR customizable");
    parts.join(" ")
}
