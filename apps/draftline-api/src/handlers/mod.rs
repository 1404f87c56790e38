//! HTTP request handlers for the Draftline API
//!
//! Provides handlers for:
//! - Health checks
//! - Template ingestion from raw document text
//! - Template listing and retrieval
//! - Query-to-template matching with the web-search fallback
//! - Draft lifecycle: create, collect answers, generate

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::gemini::Question;
use crate::state::AppState;
use crate::websearch::WebResult;
use draftline_core::{
    CompositeVerifier, DraftError, DraftInstance, EmbeddingOracle, ExtractionOracle, MatchCandidate,
    MatchOutcome, RerankOracle, TemplateMatcher, VariableConsolidator,
};
use shared_types::{DocumentProfile, DraftStatus, Template, VariableDescriptor};

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub templates: usize,
    pub drafts: usize,
}

#[derive(Debug, Deserialize)]
pub struct CreateTemplateRequest {
    /// Raw document text; file parsing happens upstream of this API
    pub text: String,
    pub filename: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TemplateSummary {
    pub template_id: String,
    pub title: String,
    pub description: String,
    pub doc_type: String,
    pub jurisdiction: String,
    pub similarity_tags: Vec<String>,
    pub variable_count: usize,
    pub created_at: i64,
}

impl From<&Template> for TemplateSummary {
    fn from(template: &Template) -> Self {
        Self {
            template_id: template.template_id.clone(),
            title: template.title.clone(),
            description: template.description.clone(),
            doc_type: template.doc_type.clone(),
            jurisdiction: template.jurisdiction.clone(),
            similarity_tags: template.similarity_tags.clone(),
            variable_count: template.variables.len(),
            created_at: template.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TemplateDetail {
    pub template_id: String,
    pub title: String,
    pub description: String,
    pub doc_type: String,
    pub jurisdiction: String,
    pub similarity_tags: Vec<String>,
    pub variables: Vec<VariableDescriptor>,
    pub body: String,
    pub created_at: i64,
}

impl From<&Template> for TemplateDetail {
    fn from(template: &Template) -> Self {
        Self {
            template_id: template.template_id.clone(),
            title: template.title.clone(),
            description: template.description.clone(),
            doc_type: template.doc_type.clone(),
            jurisdiction: template.jurisdiction.clone(),
            similarity_tags: template.similarity_tags.clone(),
            variables: template.variables.clone(),
            body: template.body.clone(),
            created_at: template.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Matched,
    LowConfidence,
    NoTemplates,
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub status: MatchStatus,
    pub best_match: Option<TemplateSummary>,
    pub confidence: Option<f32>,
    pub alternatives: Vec<MatchCandidate>,
    pub web_results: Vec<WebResult>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateDraftRequest {
    pub template_id: String,
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct CreateDraftResponse {
    pub instance_id: String,
    pub template: TemplateSummary,
    pub status: DraftStatus,
    pub prefilled_answers: HashMap<String, String>,
    pub questions: Vec<Question>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAnswersRequest {
    pub answers: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct UpdateAnswersResponse {
    pub instance_id: String,
    pub status: DraftStatus,
    pub accepted: Vec<String>,
    pub rejected: Vec<String>,
    pub answers: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateDraftResponse {
    pub instance_id: String,
    pub status: DraftStatus,
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct DraftDetail {
    pub instance_id: String,
    pub template_id: String,
    pub query: String,
    pub status: DraftStatus,
    pub answers: HashMap<String, String>,
    pub missing_required: Vec<String>,
    pub body: Option<String>,
}

impl From<&DraftInstance> for DraftDetail {
    fn from(draft: &DraftInstance) -> Self {
        Self {
            instance_id: draft.instance_id().to_string(),
            template_id: draft.template().template_id.clone(),
            query: draft.query().to_string(),
            status: draft.status(),
            answers: draft.answers().clone(),
            missing_required: draft.missing_required(),
            body: draft.body().map(str::to_string),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// First `n` characters of `text`, character-measured
fn char_prefix(text: &str, n: usize) -> String {
    text.chars().take(n).collect()
}

/// "motor_claim_form.docx" -> "Motor Claim Form"
fn title_from_filename(filename: &str) -> String {
    let stem = filename
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(filename);
    stem.replace(['_', '-'], " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let store = state.store.read().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        templates: store.template_count(),
        drafts: store.draft_count(),
    })
}

/// Ingest raw document text into a new template
pub async fn create_template(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateTemplateRequest>,
) -> Result<Json<TemplateSummary>, (StatusCode, String)> {
    if request.text.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "document text is empty".to_string()));
    }
    info!(chars = request.text.chars().count(), "ingesting document");

    let consolidator = VariableConsolidator::new(
        Arc::clone(&state.gemini) as Arc<dyn ExtractionOracle>,
        state.chunking,
    );
    let variables = consolidator.run(&request.text).await;
    info!(variables = variables.len(), "extraction run finished");

    // Profile from the opening window, like the variables' first discovery
    let profile_text = char_prefix(&request.text, state.chunking.size());
    let profile = match state.gemini.classify(&profile_text).await {
        Ok(profile) => profile,
        Err(e) => {
            warn!(error = %e, "classification failed, using unknown profile");
            DocumentProfile::unknown()
        }
    };

    let embedding = state
        .gemini
        .embed(&char_prefix(&request.text, 1000))
        .await
        .map_err(|e| {
            error!(error = %e, "template embedding failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("embedding failed: {}", e),
            )
        })?;

    let title = request
        .title
        .clone()
        .or_else(|| request.filename.as_deref().map(title_from_filename))
        .unwrap_or_else(|| "Untitled Template".to_string());
    let source = request.filename.clone().unwrap_or_else(|| title.clone());

    let template = Template {
        template_id: uuid::Uuid::new_v4().to_string(),
        title,
        description: format!("Template generated from {}", source),
        doc_type: profile.doc_type,
        jurisdiction: profile.jurisdiction,
        similarity_tags: profile.similarity_tags,
        embedding,
        variables,
        body: request.text,
        created_at: chrono::Utc::now().timestamp(),
    };

    for result in CompositeVerifier::standard().verify_all(&template) {
        for finding in &result.findings {
            warn!(template = %template.template_id, %finding, "verification finding");
        }
        for warning in &result.warnings {
            debug!(template = %template.template_id, %warning, "verification warning");
        }
    }

    let summary = TemplateSummary::from(&template);
    state.store.write().await.insert_template(template);
    Ok(Json(summary))
}

/// List stored templates
pub async fn list_templates(State(state): State<Arc<AppState>>) -> Json<Vec<TemplateSummary>> {
    let store = state.store.read().await;
    Json(store.templates().iter().map(TemplateSummary::from).collect())
}

/// Get one template with its full variable set and body
pub async fn get_template(
    State(state): State<Arc<AppState>>,
    Path(template_id): Path<String>,
) -> Result<Json<TemplateDetail>, (StatusCode, String)> {
    let store = state.store.read().await;
    store
        .template(&template_id)
        .map(|t| Json(TemplateDetail::from(t)))
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                format!("template not found: {}", template_id),
            )
        })
}

/// Match a free-text request against the template library
pub async fn match_template(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MatchRequest>,
) -> Result<Json<MatchResponse>, (StatusCode, String)> {
    info!(query = %request.query, "matching query");

    let templates: Vec<Template> = {
        let store = state.store.read().await;
        store.templates().to_vec()
    };

    let matcher = TemplateMatcher::new(
        Arc::clone(&state.gemini) as Arc<dyn EmbeddingOracle>,
        Arc::clone(&state.gemini) as Arc<dyn RerankOracle>,
        state.matcher,
    );
    let (outcome, ranked) = matcher
        .resolve_ranked(&request.query, &templates)
        .await
        .map_err(|e| {
            error!(error = %e, "match attempt failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("match failed: {}", e),
            )
        })?;

    let alternatives: Vec<MatchCandidate> = ranked.iter().skip(1).take(3).cloned().collect();
    let summary_for = |template_id: &str| {
        templates
            .iter()
            .find(|t| t.template_id == template_id)
            .map(TemplateSummary::from)
    };

    let response = match outcome {
        MatchOutcome::Matched {
            template_id,
            confidence,
        } => MatchResponse {
            status: MatchStatus::Matched,
            best_match: summary_for(&template_id),
            confidence: Some(confidence),
            alternatives,
            web_results: Vec::new(),
            message: String::new(),
        },
        MatchOutcome::LowConfidence {
            template_id,
            confidence,
        } => {
            let best_match = summary_for(&template_id);
            let doc_type = best_match.as_ref().map(|s| s.doc_type.clone());
            let web_results = match &state.websearch {
                Some(exa) => {
                    info!(confidence, "low confidence, falling back to web search");
                    exa.search_templates(&request.query, doc_type.as_deref())
                        .await
                }
                None => Vec::new(),
            };
            let message = if web_results.is_empty() {
                format!("Low confidence match ({:.0}%).", confidence * 100.0)
            } else {
                format!(
                    "Low confidence match ({:.0}%). Also showing web search results.",
                    confidence * 100.0
                )
            };
            MatchResponse {
                status: MatchStatus::LowConfidence,
                best_match,
                confidence: Some(confidence),
                alternatives,
                web_results,
                message,
            }
        }
        MatchOutcome::NoTemplates => {
            let web_results = match &state.websearch {
                Some(exa) => exa.search_templates(&request.query, None).await,
                None => Vec::new(),
            };
            let message = if web_results.is_empty() {
                "No templates available in library".to_string()
            } else {
                "No local templates found. Showing web search results.".to_string()
            };
            MatchResponse {
                status: MatchStatus::NoTemplates,
                best_match: None,
                confidence: None,
                alternatives: Vec::new(),
                web_results,
                message,
            }
        }
    };

    Ok(Json(response))
}

/// Create a draft instance for a template, prefilled from the query
pub async fn create_draft(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateDraftRequest>,
) -> Result<Json<CreateDraftResponse>, (StatusCode, String)> {
    let template = {
        let store = state.store.read().await;
        store.template(&request.template_id).cloned()
    }
    .ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            format!("template not found: {}", request.template_id),
        )
    })?;

    let template = Arc::new(template);
    let mut draft = DraftInstance::new(Arc::clone(&template), request.query.clone());

    let prefilled = state
        .gemini
        .prefill_answers(&request.query, &template.variables)
        .await;
    if !prefilled.is_empty() {
        // a fresh draft is never completed, so this cannot be refused
        if let Ok(report) = draft.update_answers(prefilled) {
            info!(
                accepted = report.accepted.len(),
                rejected = report.rejected.len(),
                "prefilled answers from query"
            );
        }
    }

    let questions = state.gemini.generate_questions(&template.variables).await;

    let response = CreateDraftResponse {
        instance_id: draft.instance_id().to_string(),
        template: TemplateSummary::from(template.as_ref()),
        status: draft.status(),
        prefilled_answers: draft.answers().clone(),
        questions,
    };
    state.store.write().await.insert_draft(draft);
    Ok(Json(response))
}

/// Merge a batch of answers into a draft
pub async fn update_answers(
    State(state): State<Arc<AppState>>,
    Path(instance_id): Path<String>,
    Json(request): Json<UpdateAnswersRequest>,
) -> Result<Json<UpdateAnswersResponse>, (StatusCode, String)> {
    let mut store = state.store.write().await;
    let draft = store.draft_mut(&instance_id).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            format!("draft not found: {}", instance_id),
        )
    })?;

    match draft.update_answers(request.answers) {
        Ok(report) => Ok(Json(UpdateAnswersResponse {
            instance_id,
            status: report.status,
            accepted: report.accepted,
            rejected: report.rejected,
            answers: draft.answers().clone(),
        })),
        Err(e @ DraftError::AlreadyCompleted(_)) => Err((StatusCode::CONFLICT, e.to_string())),
        Err(e) => Err((StatusCode::BAD_REQUEST, e.to_string())),
    }
}

/// Render the draft body, gated on completeness
pub async fn generate_draft(
    State(state): State<Arc<AppState>>,
    Path(instance_id): Path<String>,
) -> Result<Json<GenerateDraftResponse>, (StatusCode, String)> {
    let mut store = state.store.write().await;
    let draft = store.draft_mut(&instance_id).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            format!("draft not found: {}", instance_id),
        )
    })?;

    let body = match draft.generate() {
        Ok(body) => body.to_string(),
        Err(e @ DraftError::Incomplete { .. }) => {
            return Err((StatusCode::UNPROCESSABLE_ENTITY, e.to_string()));
        }
        Err(e @ DraftError::AlreadyCompleted(_)) => {
            return Err((StatusCode::CONFLICT, e.to_string()));
        }
    };

    Ok(Json(GenerateDraftResponse {
        instance_id,
        status: draft.status(),
        body,
    }))
}

/// Get one draft with its current answers and status
pub async fn get_draft(
    State(state): State<Arc<AppState>>,
    Path(instance_id): Path<String>,
) -> Result<Json<DraftDetail>, (StatusCode, String)> {
    let store = state.store.read().await;
    store
        .draft(&instance_id)
        .map(|d| Json(DraftDetail::from(d)))
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                format!("draft not found: {}", instance_id),
            )
        })
}
