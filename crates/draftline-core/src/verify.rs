//! Template verification
//!
//! A well-formed template only references declared variables from its body
//! and only declares canonical, collision-free keys. Verification reports
//! violations without fixing them; ingestion logs the findings and proceeds.

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use crate::normalize::is_canonical_key;
use shared_types::Template;

lazy_static! {
    /// `{{token}}` placeholders, case-sensitive, no whitespace inside braces
    static ref PLACEHOLDER: Regex = Regex::new(r"\{\{([^{}]*)\}\}").expect("placeholder pattern");
}

/// A single verification violation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Finding {
    /// Body references a key the template never declared
    #[error("placeholder references undeclared variable: {0}")]
    UndeclaredPlaceholder(String),

    /// Placeholder token is not a canonical key (wrong case, spaces, ...)
    #[error("malformed placeholder token: {0:?}")]
    MalformedPlaceholder(String),

    /// Declared key violates the canonical snake_case form
    #[error("declared key violates canonical form: {0:?}")]
    NonCanonicalKey(String),

    /// Two declared variables share a key
    #[error("duplicate declared key: {0}")]
    DuplicateKey(String),
}

/// Outcome of verifying one template with one verifier
#[derive(Debug, Clone)]
pub struct VerificationResult {
    pub template_id: String,
    pub is_valid: bool,
    pub findings: Vec<Finding>,
    /// Non-fatal observations (e.g. declared but never-referenced variables)
    pub warnings: Vec<String>,
}

/// Trait for template verifiers
pub trait Verifier: Send + Sync {
    fn verify(&self, template: &Template) -> VerificationResult;

    fn name(&self) -> &str;
}

/// Checks that every `{{key}}` in the body resolves to a declared variable
#[derive(Debug, Default)]
pub struct PlaceholderVerifier;

impl Verifier for PlaceholderVerifier {
    fn verify(&self, template: &Template) -> VerificationResult {
        let mut findings = Vec::new();
        let mut warnings = Vec::new();
        let mut referenced: Vec<&str> = Vec::new();

        for captures in PLACEHOLDER.captures_iter(&template.body) {
            let token = &captures[1];
            if !is_canonical_key(token) {
                findings.push(Finding::MalformedPlaceholder(token.to_string()));
            } else if !template.has_variable(token) {
                findings.push(Finding::UndeclaredPlaceholder(token.to_string()));
            } else if !referenced.contains(&token) {
                if let Some(var) = template.variables.iter().find(|v| v.key == token) {
                    referenced.push(var.key.as_str());
                }
            }
        }

        for var in &template.variables {
            if !referenced.contains(&var.key.as_str()) {
                warnings.push(format!("variable never referenced by body: {}", var.key));
            }
        }

        VerificationResult {
            template_id: template.template_id.clone(),
            is_valid: findings.is_empty(),
            findings,
            warnings,
        }
    }

    fn name(&self) -> &str {
        "placeholders"
    }
}

/// Checks declared keys for canonical form and uniqueness
#[derive(Debug, Default)]
pub struct KeyVerifier;

impl Verifier for KeyVerifier {
    fn verify(&self, template: &Template) -> VerificationResult {
        let mut findings = Vec::new();
        let mut seen: Vec<&str> = Vec::new();

        for var in &template.variables {
            if !is_canonical_key(&var.key) {
                findings.push(Finding::NonCanonicalKey(var.key.clone()));
            }
            if seen.contains(&var.key.as_str()) {
                findings.push(Finding::DuplicateKey(var.key.clone()));
            } else {
                seen.push(var.key.as_str());
            }
        }

        VerificationResult {
            template_id: template.template_id.clone(),
            is_valid: findings.is_empty(),
            findings,
            warnings: Vec::new(),
        }
    }

    fn name(&self) -> &str {
        "keys"
    }
}

/// Runs several verifiers over one template
#[derive(Default)]
pub struct CompositeVerifier {
    verifiers: Vec<Box<dyn Verifier>>,
}

impl CompositeVerifier {
    pub fn new() -> Self {
        Self {
            verifiers: Vec::new(),
        }
    }

    /// The standard pair every ingestion run uses.
    pub fn standard() -> Self {
        Self::new()
            .add_verifier(Box::new(KeyVerifier))
            .add_verifier(Box::new(PlaceholderVerifier))
    }

    pub fn add_verifier(mut self, verifier: Box<dyn Verifier>) -> Self {
        self.verifiers.push(verifier);
        self
    }

    pub fn verify_all(&self, template: &Template) -> Vec<VerificationResult> {
        self.verifiers
            .iter()
            .map(|verifier| verifier.verify(template))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{DataType, VariableDescriptor};

    fn variable(key: &str) -> VariableDescriptor {
        VariableDescriptor {
            key: key.to_string(),
            label: key.to_string(),
            description: String::new(),
            example: String::new(),
            data_type: DataType::Text,
            required: true,
        }
    }

    fn template_with(body: &str, keys: &[&str]) -> Template {
        Template {
            template_id: "tpl-1".to_string(),
            title: "Test".to_string(),
            description: String::new(),
            doc_type: "contract".to_string(),
            jurisdiction: String::new(),
            similarity_tags: vec![],
            embedding: vec![],
            variables: keys.iter().map(|k| variable(k)).collect(),
            body: body.to_string(),
            created_at: 0,
        }
    }

    #[test]
    fn test_well_formed_template_passes() {
        let template = template_with("Hello {{party_name}} on {{start_date}}", &[
            "party_name",
            "start_date",
        ]);
        let result = PlaceholderVerifier.verify(&template);
        assert!(result.is_valid);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_undeclared_placeholder_flagged() {
        let template = template_with("Hello {{party_name}}", &[]);
        let result = PlaceholderVerifier.verify(&template);
        assert!(!result.is_valid);
        assert_eq!(
            result.findings,
            vec![Finding::UndeclaredPlaceholder("party_name".to_string())]
        );
    }

    #[test]
    fn test_malformed_placeholder_flagged() {
        let template = template_with("Hello {{Party Name}}", &["party_name"]);
        let result = PlaceholderVerifier.verify(&template);
        assert!(result
            .findings
            .contains(&Finding::MalformedPlaceholder("Party Name".to_string())));
    }

    #[test]
    fn test_unreferenced_variable_is_warning_only() {
        let template = template_with("No placeholders here", &["party_name"]);
        let result = PlaceholderVerifier.verify(&template);
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_key_verifier_catches_bad_keys() {
        let mut template = template_with("", &["party_name", "party_name"]);
        template.variables.push(variable("Bad-Key"));
        let result = KeyVerifier.verify(&template);
        assert!(!result.is_valid);
        assert!(result
            .findings
            .contains(&Finding::DuplicateKey("party_name".to_string())));
        assert!(result
            .findings
            .contains(&Finding::NonCanonicalKey("Bad-Key".to_string())));
    }

    #[test]
    fn test_composite_runs_all() {
        let template = template_with("{{party_name}}", &["party_name"]);
        let results = CompositeVerifier::standard().verify_all(&template);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.is_valid));
    }
}
