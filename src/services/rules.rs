use std::collections::HashSet;

use serde_json::Value;
use thiserror::Error;

use crate::db::types::QuestionKind;

/// Section names recognized by the ordering rule. Only the exact sequence
/// `["objective", "essay"]` activates the ordering constraint; any other
/// section list is stored but not enforced.
pub(crate) const SECTION_OBJECTIVE: &str = "objective";
pub(crate) const SECTION_ESSAY: &str = "essay";

#[derive(Debug, Error)]
pub(crate) enum RuleSchemaError {
    #[error("rule schema must be a JSON object")]
    NotAnObject,
    #[error("allowed_kinds must be an array of question kinds, got: {0}")]
    InvalidAllowedKinds(String),
    #[error("sections must be an array of strings")]
    InvalidSections,
    #[error("glossary_required must be a boolean")]
    InvalidGlossaryFlag,
}

/// Declarative constraints a template imposes on the provas built from it.
///
/// Parsed from the template's `rules` JSON once at template-save time.
/// Unknown keys are allowed and ignored so templates can carry layout hints
/// (header text, shuffling, choice counts) the engine does not interpret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RuleSchema {
    pub(crate) allowed_kinds: Option<HashSet<QuestionKind>>,
    pub(crate) sections: Option<Vec<String>>,
    pub(crate) glossary_required: bool,
}

impl RuleSchema {
    pub(crate) fn parse(value: &Value) -> Result<Self, RuleSchemaError> {
        let Some(map) = value.as_object() else {
            return Err(RuleSchemaError::NotAnObject);
        };

        let allowed_kinds = match map.get("allowed_kinds") {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) => {
                let mut kinds = HashSet::new();
                for item in items {
                    let kind = item
                        .as_str()
                        .and_then(parse_kind)
                        .ok_or_else(|| RuleSchemaError::InvalidAllowedKinds(item.to_string()))?;
                    kinds.insert(kind);
                }
                Some(kinds)
            }
            Some(other) => return Err(RuleSchemaError::InvalidAllowedKinds(other.to_string())),
        };

        let sections = match map.get("sections") {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) => {
                let mut names = Vec::with_capacity(items.len());
                for item in items {
                    let name = item.as_str().ok_or(RuleSchemaError::InvalidSections)?;
                    names.push(name.to_string());
                }
                Some(names)
            }
            Some(_) => return Err(RuleSchemaError::InvalidSections),
        };

        let glossary_required = match map.get("glossary_required") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(flag)) => *flag,
            Some(_) => return Err(RuleSchemaError::InvalidGlossaryFlag),
        };

        Ok(Self { allowed_kinds, sections, glossary_required })
    }

    /// True when the template pins the two-section layout that forces every
    /// objective question before the first essay question.
    pub(crate) fn enforces_objective_first(&self) -> bool {
        matches!(
            self.sections.as_deref(),
            Some([first, second]) if first == SECTION_OBJECTIVE && second == SECTION_ESSAY
        )
    }

    pub(crate) fn permits_kind(&self, kind: QuestionKind) -> bool {
        match &self.allowed_kinds {
            Some(kinds) => kinds.contains(&kind),
            None => true,
        }
    }
}

fn parse_kind(value: &str) -> Option<QuestionKind> {
    match value {
        "objective" => Some(QuestionKind::Objective),
        "essay" => Some(QuestionKind::Essay),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_object_is_unrestricted() {
        let schema = RuleSchema::parse(&json!({})).expect("schema");
        assert!(schema.allowed_kinds.is_none());
        assert!(schema.sections.is_none());
        assert!(!schema.glossary_required);
        assert!(schema.permits_kind(QuestionKind::Objective));
        assert!(schema.permits_kind(QuestionKind::Essay));
    }

    #[test]
    fn parses_all_known_fields() {
        let schema = RuleSchema::parse(&json!({
            "allowed_kinds": ["objective"],
            "sections": ["objective", "essay"],
            "glossary_required": true
        }))
        .expect("schema");

        assert!(schema.permits_kind(QuestionKind::Objective));
        assert!(!schema.permits_kind(QuestionKind::Essay));
        assert!(schema.enforces_objective_first());
        assert!(schema.glossary_required);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let schema = RuleSchema::parse(&json!({
            "allowed_kinds": ["objective"],
            "choice_count": 4,
            "shuffle": true,
            "header": "institutional"
        }))
        .expect("schema");

        assert!(schema.allowed_kinds.is_some());
        assert!(!schema.glossary_required);
    }

    #[test]
    fn non_object_input_is_rejected() {
        assert!(matches!(
            RuleSchema::parse(&json!([1, 2, 3])),
            Err(RuleSchemaError::NotAnObject)
        ));
        assert!(matches!(RuleSchema::parse(&json!("x")), Err(RuleSchemaError::NotAnObject)));
    }

    #[test]
    fn invalid_kind_name_is_rejected() {
        let err = RuleSchema::parse(&json!({"allowed_kinds": ["multiple_choice"]}))
            .expect_err("invalid kind");
        assert!(matches!(err, RuleSchemaError::InvalidAllowedKinds(_)));
    }

    #[test]
    fn ordering_applies_only_to_exact_two_section_layout() {
        let exact = RuleSchema::parse(&json!({"sections": ["objective", "essay"]})).unwrap();
        assert!(exact.enforces_objective_first());

        let reversed = RuleSchema::parse(&json!({"sections": ["essay", "objective"]})).unwrap();
        assert!(!reversed.enforces_objective_first());

        let longer =
            RuleSchema::parse(&json!({"sections": ["objective", "essay", "bonus"]})).unwrap();
        assert!(!longer.enforces_objective_first());

        let single = RuleSchema::parse(&json!({"sections": ["objective"]})).unwrap();
        assert!(!single.enforces_objective_first());
    }

    #[test]
    fn null_fields_behave_like_absent_fields() {
        let schema = RuleSchema::parse(&json!({
            "allowed_kinds": null,
            "sections": null,
            "glossary_required": null
        }))
        .expect("schema");

        assert!(schema.allowed_kinds.is_none());
        assert!(schema.sections.is_none());
        assert!(!schema.glossary_required);
    }
}
