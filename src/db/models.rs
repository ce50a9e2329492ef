use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::{Date, PrimitiveDateTime};

use crate::db::types::{
    ImageMode, JobStatus, JobType, ProvaStatus, QuestionKind, ReviewVerdict, UserRole,
};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct School {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) slug: Option<String>,
    pub(crate) logo_url: Option<String>,
    pub(crate) address: Option<String>,
    pub(crate) contact_name: Option<String>,
    pub(crate) contact_email: Option<String>,
    pub(crate) contact_phone: Option<String>,
    pub(crate) contract_start: Option<Date>,
    pub(crate) contract_end: Option<Date>,
    pub(crate) notes: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    // NULL for platform-wide admins, set for everyone scoped to a school.
    pub(crate) school_id: Option<String>,
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) hashed_password: String,
    pub(crate) role: UserRole,
    pub(crate) is_active: bool,
    pub(crate) must_change_password: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ClassGroup {
    pub(crate) id: String,
    pub(crate) school_id: String,
    pub(crate) display_name: String,
    pub(crate) school_year: i32,
    pub(crate) shift: String,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Subject {
    pub(crate) id: String,
    pub(crate) school_id: String,
    pub(crate) name: String,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct TeacherClass {
    pub(crate) id: String,
    pub(crate) teacher_id: String,
    pub(crate) class_group_id: String,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct TeacherClassSubject {
    pub(crate) id: String,
    pub(crate) teacher_class_id: String,
    pub(crate) subject_id: String,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Template {
    pub(crate) id: String,
    // NULL school_id marks a platform-provided template visible to every school.
    pub(crate) school_id: Option<String>,
    pub(crate) name: String,
    pub(crate) rules: Json<serde_json::Value>,
    pub(crate) version: String,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Prova {
    pub(crate) id: String,
    pub(crate) school_id: String,
    pub(crate) author_id: String,
    pub(crate) internal_title: String,
    pub(crate) class_group_id: String,
    pub(crate) subject_id: String,
    pub(crate) template_id: String,
    pub(crate) status: ProvaStatus,
    pub(crate) render_opts: Option<Json<serde_json::Value>>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) prova_id: String,
    pub(crate) position: i32,
    pub(crate) kind: QuestionKind,
    pub(crate) statement: String,
    pub(crate) choices: Option<Json<Vec<String>>>,
    pub(crate) correct_choice_index: Option<i32>,
    pub(crate) image_references: Json<Vec<String>>,
    pub(crate) inline_image_ids: Json<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ProvaImage {
    pub(crate) id: String,
    pub(crate) school_id: String,
    pub(crate) prova_id: String,
    pub(crate) filename: String,
    pub(crate) storage_url: String,
    pub(crate) storage_key: String,
    pub(crate) alt_text: String,
    pub(crate) caption: Option<String>,
    pub(crate) prefer_glossary: Option<bool>,
    pub(crate) reference_code: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct AiAnalysis {
    pub(crate) id: String,
    pub(crate) prova_id: String,
    pub(crate) summary_scores: Json<serde_json::Value>,
    pub(crate) per_question: Json<serde_json::Value>,
    pub(crate) usage: Json<serde_json::Value>,
    pub(crate) tokens_in: i32,
    pub(crate) tokens_out: i32,
    pub(crate) cost_cents: i32,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct CoordinationReview {
    pub(crate) id: String,
    pub(crate) prova_id: String,
    pub(crate) coordinator_id: String,
    pub(crate) verdict: ReviewVerdict,
    pub(crate) comment: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct SchoolPolicy {
    pub(crate) id: String,
    pub(crate) school_id: String,
    pub(crate) min_adherence: Option<f64>,
    pub(crate) min_coherence: Option<f64>,
    pub(crate) image_mode: Option<ImageMode>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Job {
    pub(crate) id: String,
    pub(crate) school_id: String,
    pub(crate) job_type: JobType,
    pub(crate) status: JobStatus,
    pub(crate) payload: Json<serde_json::Value>,
    pub(crate) result: Option<Json<serde_json::Value>>,
    pub(crate) error: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}
