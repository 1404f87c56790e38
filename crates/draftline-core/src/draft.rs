//! Draft instance state machine
//!
//! A draft is one user's attempt to fill a matched template:
//! `pending` (created, no answers) -> `in_progress` (some answers) ->
//! `completed` (every required variable answered and the body rendered).
//! `completed` is terminal; redoing a draft means creating a new instance.
//!
//! Each instance is exclusively owned by the session that created it, so the
//! machine holds plain owned state and needs no locking. The referenced
//! template is shared and read-only from the instance's perspective.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::DraftError;
use shared_types::{DraftStatus, Template};

/// Per-item outcome of one `update_answers` call
///
/// Unknown keys are rejected individually; they never abort the batch.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AnswerReport {
    pub accepted: Vec<String>,
    pub rejected: Vec<String>,
    pub status: DraftStatus,
}

/// A single draft: template reference, collected answers, lifecycle state
#[derive(Debug, Clone)]
pub struct DraftInstance {
    instance_id: String,
    template: Arc<Template>,
    query: String,
    answers: HashMap<String, String>,
    status: DraftStatus,
    body: Option<String>,
}

impl DraftInstance {
    /// Create a fresh instance in `pending` with no answers.
    pub fn new(template: Arc<Template>, query: impl Into<String>) -> Self {
        Self {
            instance_id: uuid::Uuid::new_v4().to_string(),
            template,
            query: query.into(),
            answers: HashMap::new(),
            status: DraftStatus::Pending,
            body: None,
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn template(&self) -> &Arc<Template> {
        &self.template
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn answers(&self) -> &HashMap<String, String> {
        &self.answers
    }

    pub fn status(&self) -> DraftStatus {
        self.status
    }

    /// Rendered body; present only once the instance is completed.
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Required variable keys that still lack a non-blank answer.
    pub fn missing_required(&self) -> Vec<String> {
        self.template
            .variables
            .iter()
            .filter(|v| v.required)
            .filter(|v| {
                self.answers
                    .get(&v.key)
                    .map(|value| value.trim().is_empty())
                    .unwrap_or(true)
            })
            .map(|v| v.key.clone())
            .collect()
    }

    /// Merge a batch of answers.
    ///
    /// Keys not declared by the template are rejected individually and
    /// reported; valid keys merge, with later values overwriting earlier
    /// ones. Refused entirely once the instance is completed.
    pub fn update_answers(
        &mut self,
        partial: HashMap<String, String>,
    ) -> Result<AnswerReport, DraftError> {
        if self.status == DraftStatus::Completed {
            return Err(DraftError::AlreadyCompleted(self.instance_id.clone()));
        }

        let mut accepted = Vec::new();
        let mut rejected = Vec::new();
        for (key, value) in partial {
            if self.template.has_variable(&key) {
                self.answers.insert(key.clone(), value);
                accepted.push(key);
            } else {
                debug!(key = %key, instance = %self.instance_id, "rejecting unknown answer key");
                rejected.push(key);
            }
        }
        accepted.sort();
        rejected.sort();

        self.status = if self.answers.is_empty() {
            DraftStatus::Pending
        } else {
            DraftStatus::InProgress
        };

        Ok(AnswerReport {
            accepted,
            rejected,
            status: self.status,
        })
    }

    /// Render the template body and complete the draft.
    ///
    /// Fails while any required variable lacks a non-blank answer. On
    /// success every `{{key}}` placeholder is substituted with its stored
    /// answer (unanswered optional keys render as the empty string) and
    /// the instance transitions to its terminal state.
    pub fn generate(&mut self) -> Result<&str, DraftError> {
        if self.status == DraftStatus::Completed {
            return Err(DraftError::AlreadyCompleted(self.instance_id.clone()));
        }

        let missing = self.missing_required();
        if !missing.is_empty() {
            return Err(DraftError::Incomplete { missing });
        }

        let mut rendered = self.template.body.clone();
        for var in &self.template.variables {
            let placeholder = format!("{{{{{}}}}}", var.key);
            let value = self.answers.get(&var.key).map(String::as_str).unwrap_or("");
            rendered = rendered.replace(&placeholder, value);
        }

        self.status = DraftStatus::Completed;
        Ok(&*self.body.insert(rendered))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shared_types::{DataType, VariableDescriptor};

    fn variable(key: &str, required: bool) -> VariableDescriptor {
        VariableDescriptor {
            key: key.to_string(),
            label: key.to_string(),
            description: String::new(),
            example: String::new(),
            data_type: DataType::Text,
            required,
        }
    }

    fn claim_template() -> Arc<Template> {
        Arc::new(Template {
            template_id: "tpl-claim".to_string(),
            title: "Motor Insurance Claim".to_string(),
            description: String::new(),
            doc_type: "insurance_claim".to_string(),
            jurisdiction: String::new(),
            similarity_tags: vec![],
            embedding: vec![],
            variables: vec![
                variable("claimant_name", true),
                variable("incident_date", true),
                variable("witness_name", false),
            ],
            body: "Claim by {{claimant_name}} on {{incident_date}}. Witness: {{witness_name}}."
                .to_string(),
            created_at: 0,
        })
    }

    fn answers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_new_instance_is_pending_and_empty() {
        let draft = DraftInstance::new(claim_template(), "file a claim");
        assert_eq!(draft.status(), DraftStatus::Pending);
        assert!(draft.answers().is_empty());
        assert_eq!(draft.body(), None);
    }

    #[test]
    fn test_update_moves_to_in_progress() {
        let mut draft = DraftInstance::new(claim_template(), "file a claim");
        let report = draft
            .update_answers(answers(&[("claimant_name", "Ada Lovelace")]))
            .unwrap();
        assert_eq!(report.accepted, vec!["claimant_name"]);
        assert_eq!(report.status, DraftStatus::InProgress);
    }

    #[test]
    fn test_empty_update_stays_pending() {
        let mut draft = DraftInstance::new(claim_template(), "file a claim");
        let report = draft.update_answers(HashMap::new()).unwrap();
        assert_eq!(report.status, DraftStatus::Pending);
    }

    #[test]
    fn test_unknown_keys_rejected_individually() {
        let mut draft = DraftInstance::new(claim_template(), "file a claim");
        let report = draft
            .update_answers(answers(&[
                ("claimant_name", "Ada Lovelace"),
                ("favourite_colour", "green"),
            ]))
            .unwrap();
        assert_eq!(report.accepted, vec!["claimant_name"]);
        assert_eq!(report.rejected, vec!["favourite_colour"]);
        assert_eq!(draft.answers().len(), 1);
    }

    #[test]
    fn test_later_values_overwrite() {
        let mut draft = DraftInstance::new(claim_template(), "file a claim");
        draft
            .update_answers(answers(&[("claimant_name", "Ada")]))
            .unwrap();
        draft
            .update_answers(answers(&[("claimant_name", "Ada Lovelace")]))
            .unwrap();
        assert_eq!(draft.answers()["claimant_name"], "Ada Lovelace");
    }

    #[test]
    fn test_generate_blocks_on_missing_required() {
        let mut draft = DraftInstance::new(claim_template(), "file a claim");
        draft
            .update_answers(answers(&[("claimant_name", "Ada Lovelace")]))
            .unwrap();
        let err = draft.generate().unwrap_err();
        assert_eq!(
            err,
            DraftError::Incomplete {
                missing: vec!["incident_date".to_string()]
            }
        );
        assert_eq!(draft.status(), DraftStatus::InProgress);
        assert_eq!(draft.body(), None);
    }

    #[test]
    fn test_blank_answer_does_not_satisfy_required() {
        let mut draft = DraftInstance::new(claim_template(), "file a claim");
        draft
            .update_answers(answers(&[
                ("claimant_name", "Ada Lovelace"),
                ("incident_date", "   "),
            ]))
            .unwrap();
        assert_eq!(draft.missing_required(), vec!["incident_date"]);
    }

    #[test]
    fn test_generate_renders_and_completes() {
        let mut draft = DraftInstance::new(claim_template(), "file a claim");
        draft
            .update_answers(answers(&[
                ("claimant_name", "Ada Lovelace"),
                ("incident_date", "2026-01-15"),
            ]))
            .unwrap();
        let rendered = draft.generate().unwrap().to_string();
        assert_eq!(
            rendered,
            "Claim by Ada Lovelace on 2026-01-15. Witness: ."
        );
        assert_eq!(draft.status(), DraftStatus::Completed);
        assert_eq!(draft.body(), Some(rendered.as_str()));
    }

    #[test]
    fn test_generate_with_no_required_variables() {
        let template = Arc::new(Template {
            variables: vec![variable("note", false)],
            body: "Memo: {{note}}".to_string(),
            ..(*claim_template()).clone()
        });
        let mut draft = DraftInstance::new(template, "quick memo");
        let rendered = draft.generate().unwrap();
        assert_eq!(rendered, "Memo: ");
    }

    #[test]
    fn test_completed_is_terminal() {
        let mut draft = DraftInstance::new(claim_template(), "file a claim");
        draft
            .update_answers(answers(&[
                ("claimant_name", "Ada Lovelace"),
                ("incident_date", "2026-01-15"),
            ]))
            .unwrap();
        draft.generate().unwrap();

        let update_err = draft
            .update_answers(answers(&[("witness_name", "Grace Hopper")]))
            .unwrap_err();
        assert!(matches!(update_err, DraftError::AlreadyCompleted(_)));

        let generate_err = draft.generate().unwrap_err();
        assert!(matches!(generate_err, DraftError::AlreadyCompleted(_)));
    }

    #[test]
    fn test_placeholders_are_case_sensitive() {
        let template = Arc::new(Template {
            variables: vec![variable("party_name", true)],
            body: "By {{party_name}}, not {{Party_Name}}.".to_string(),
            ..(*claim_template()).clone()
        });
        let mut draft = DraftInstance::new(template, "agreement");
        draft
            .update_answers(answers(&[("party_name", "Acme Ltd")]))
            .unwrap();
        let rendered = draft.generate().unwrap();
        assert_eq!(rendered, "By Acme Ltd, not {{Party_Name}}.");
    }
}
