//! Application state for the Draftline API
//!
//! Holds the oracle clients and the in-memory template/draft store. The
//! store is session-scoped working state, not durable persistence; each
//! request takes the lock for the duration of its own read or write only.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::config::ApiConfig;
use crate::gemini::GeminiClient;
use crate::websearch::ExaClient;
use draftline_core::{ChunkConfig, DraftInstance, MatcherConfig};
use shared_types::Template;

/// In-memory store; template insertion order is the matcher's tie-break
/// order, so templates live in a Vec, not a map
#[derive(Default)]
pub struct Store {
    templates: Vec<Template>,
    drafts: HashMap<String, DraftInstance>,
}

impl Store {
    pub fn insert_template(&mut self, template: Template) {
        self.templates.push(template);
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn template(&self, template_id: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.template_id == template_id)
    }

    pub fn insert_draft(&mut self, draft: DraftInstance) {
        self.drafts.insert(draft.instance_id().to_string(), draft);
    }

    pub fn draft(&self, instance_id: &str) -> Option<&DraftInstance> {
        self.drafts.get(instance_id)
    }

    pub fn draft_mut(&mut self, instance_id: &str) -> Option<&mut DraftInstance> {
        self.drafts.get_mut(instance_id)
    }

    pub fn template_count(&self) -> usize {
        self.templates.len()
    }

    pub fn draft_count(&self) -> usize {
        self.drafts.len()
    }
}

/// Shared application state
pub struct AppState {
    pub store: RwLock<Store>,
    pub gemini: Arc<GeminiClient>,
    pub websearch: Option<ExaClient>,
    pub chunking: ChunkConfig,
    pub matcher: MatcherConfig,
}

impl AppState {
    pub fn new(config: &ApiConfig) -> anyhow::Result<Self> {
        // Invalid chunk parameters are fatal here, before any request runs
        let chunking = ChunkConfig::new(config.chunk_size, config.chunk_overlap)?;

        let gemini = Arc::new(GeminiClient::new(config.gemini.clone())?);

        let websearch = match &config.exa_api_key {
            Some(key) => {
                info!("web-search fallback enabled");
                Some(ExaClient::new(key.clone())?)
            }
            None => {
                info!("EXA_API_KEY not set, web-search fallback disabled");
                None
            }
        };

        Ok(Self {
            store: RwLock::new(Store::default()),
            gemini,
            websearch,
            chunking,
            matcher: config.matcher,
        })
    }
}
