use thiserror::Error;

/// Value type expected for a template variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    Text,
    Number,
    Date,
    Email,
}

/// A fill-in variable declared by a template
///
/// `key` is the canonical snake_case identifier referenced by `{{key}}`
/// placeholders in the template body. Keys are unique within a template and
/// their order is the order in which extraction first discovered them.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VariableDescriptor {
    pub key: String,
    pub label: String,
    pub description: String,
    pub example: String,
    pub data_type: DataType,
    pub required: bool,
}

/// Document-level classification produced once per extraction run
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct DocumentProfile {
    pub doc_type: String,
    pub jurisdiction: String,
    pub similarity_tags: Vec<String>,
}

impl DocumentProfile {
    pub fn unknown() -> Self {
        Self {
            doc_type: "unknown".to_string(),
            jurisdiction: String::new(),
            similarity_tags: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("variable key already declared: {0}")]
pub struct DuplicateVariable(pub String);

/// A reusable document template with typed fill-in variables
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Template {
    pub template_id: String,
    pub title: String,
    pub description: String,
    pub doc_type: String,
    pub jurisdiction: String,
    pub similarity_tags: Vec<String>,
    pub embedding: Vec<f32>,
    pub variables: Vec<VariableDescriptor>,
    /// Raw body text with `{{key}}` placeholders
    pub body: String,
    pub created_at: i64,
}

impl Template {
    pub fn variable_keys(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(|v| v.key.as_str())
    }

    pub fn has_variable(&self, key: &str) -> bool {
        self.variables.iter().any(|v| v.key == key)
    }

    /// Append a variable discovered after creation.
    ///
    /// A key that is already declared is never overwritten; the append is
    /// refused instead.
    pub fn append_variable(&mut self, var: VariableDescriptor) -> Result<(), DuplicateVariable> {
        if self.has_variable(&var.key) {
            return Err(DuplicateVariable(var.key));
        }
        self.variables.push(var);
        Ok(())
    }
}

/// Lifecycle state of a draft instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    Pending,
    InProgress,
    Completed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn make_variable(key: &str) -> VariableDescriptor {
        VariableDescriptor {
            key: key.to_string(),
            label: key.to_string(),
            description: String::new(),
            example: String::new(),
            data_type: DataType::Text,
            required: true,
        }
    }

    fn make_template() -> Template {
        Template {
            template_id: "tpl-1".to_string(),
            title: "Test Template".to_string(),
            description: String::new(),
            doc_type: "contract".to_string(),
            jurisdiction: String::new(),
            similarity_tags: vec![],
            embedding: vec![],
            variables: vec![make_variable("party_name")],
            body: "This agreement is made by {{party_name}}.".to_string(),
            created_at: 0,
        }
    }

    #[test]
    fn test_append_variable_rejects_duplicate() {
        let mut template = make_template();
        let err = template.append_variable(make_variable("party_name"));
        assert_eq!(err, Err(DuplicateVariable("party_name".to_string())));
        assert_eq!(template.variables.len(), 1);
    }

    #[test]
    fn test_append_variable_preserves_order() {
        let mut template = make_template();
        template.append_variable(make_variable("effective_date")).unwrap();
        let keys: Vec<&str> = template.variable_keys().collect();
        assert_eq!(keys, vec!["party_name", "effective_date"]);
    }

    #[test]
    fn test_data_type_serde_lowercase() {
        let json = serde_json::to_string(&DataType::Email).unwrap();
        assert_eq!(json, "\"email\"");
        let parsed: DataType = serde_json::from_str("\"date\"").unwrap();
        assert_eq!(parsed, DataType::Date);
    }

    #[test]
    fn test_draft_status_serde_snake_case() {
        let json = serde_json::to_string(&DraftStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }
}
