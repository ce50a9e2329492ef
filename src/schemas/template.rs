use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Template;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct TemplateCreate {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub(crate) name: String,
    #[serde(default = "default_rules")]
    pub(crate) rules: serde_json::Value,
    #[serde(default = "default_version")]
    pub(crate) version: String,
    /// Admins may create global templates by sending `school_id: null`.
    #[serde(default)]
    pub(crate) school_id: Option<String>,
}

fn default_rules() -> serde_json::Value {
    serde_json::json!({})
}

fn default_version() -> String {
    "1".to_string()
}

#[derive(Debug, Serialize)]
pub(crate) struct TemplateResponse {
    pub(crate) id: String,
    pub(crate) school_id: Option<String>,
    pub(crate) name: String,
    pub(crate) rules: serde_json::Value,
    pub(crate) version: String,
    pub(crate) is_active: bool,
    pub(crate) created_at: String,
}

impl TemplateResponse {
    pub(crate) fn from_db(template: Template) -> Self {
        Self {
            id: template.id,
            school_id: template.school_id,
            name: template.name,
            rules: template.rules.0,
            version: template.version,
            is_active: template.is_active,
            created_at: format_primitive(template.created_at),
        }
    }
}
