use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Prova, ProvaImage, Question};
use crate::db::types::{ProvaStatus, QuestionKind};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionPayload {
    #[validate(range(min = 1, message = "position must be positive"))]
    pub(crate) position: i32,
    pub(crate) kind: QuestionKind,
    #[validate(length(min = 1, message = "statement must not be empty"))]
    pub(crate) statement: String,
    #[serde(default)]
    pub(crate) choices: Option<Vec<String>>,
    #[serde(default)]
    pub(crate) correct_choice_index: Option<i32>,
    #[serde(default)]
    pub(crate) image_references: Vec<String>,
    #[serde(default)]
    pub(crate) inline_image_ids: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ProvaCreate {
    #[validate(length(min = 1, message = "internal_title must not be empty"))]
    pub(crate) internal_title: String,
    pub(crate) class_group_id: String,
    pub(crate) subject_id: String,
    pub(crate) template_id: String,
    #[serde(default)]
    #[validate(nested)]
    pub(crate) questions: Vec<QuestionPayload>,
    #[serde(default)]
    pub(crate) render_opts: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ProvaUpdate {
    #[serde(default)]
    pub(crate) internal_title: Option<String>,
    /// `None` leaves the question list alone; `Some` replaces it wholesale.
    #[serde(default)]
    #[validate(nested)]
    pub(crate) questions: Option<Vec<QuestionPayload>>,
    #[serde(default)]
    pub(crate) render_opts: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    pub(crate) position: i32,
    pub(crate) kind: QuestionKind,
    pub(crate) statement: String,
    pub(crate) choices: Option<Vec<String>>,
    pub(crate) correct_choice_index: Option<i32>,
    pub(crate) image_references: Vec<String>,
    pub(crate) inline_image_ids: Vec<String>,
}

impl QuestionResponse {
    pub(crate) fn from_db(question: Question) -> Self {
        Self {
            id: question.id,
            position: question.position,
            kind: question.kind,
            statement: question.statement,
            choices: question.choices.map(|choices| choices.0),
            correct_choice_index: question.correct_choice_index,
            image_references: question.image_references.0,
            inline_image_ids: question.inline_image_ids.0,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ProvaResponse {
    pub(crate) id: String,
    pub(crate) school_id: String,
    pub(crate) author_id: String,
    pub(crate) internal_title: String,
    pub(crate) class_group_id: String,
    pub(crate) subject_id: String,
    pub(crate) template_id: String,
    pub(crate) status: ProvaStatus,
    pub(crate) render_opts: Option<serde_json::Value>,
    pub(crate) questions: Vec<QuestionResponse>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl ProvaResponse {
    pub(crate) fn from_db(prova: Prova, questions: Vec<Question>) -> Self {
        Self {
            id: prova.id,
            school_id: prova.school_id,
            author_id: prova.author_id,
            internal_title: prova.internal_title,
            class_group_id: prova.class_group_id,
            subject_id: prova.subject_id,
            template_id: prova.template_id,
            status: prova.status,
            render_opts: prova.render_opts.map(|opts| opts.0),
            questions: questions.into_iter().map(QuestionResponse::from_db).collect(),
            created_at: format_primitive(prova.created_at),
            updated_at: format_primitive(prova.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ProvaSummaryResponse {
    pub(crate) id: String,
    pub(crate) internal_title: String,
    pub(crate) class_group_id: String,
    pub(crate) subject_id: String,
    pub(crate) template_id: String,
    pub(crate) status: ProvaStatus,
    pub(crate) updated_at: String,
}

impl ProvaSummaryResponse {
    pub(crate) fn from_db(prova: Prova) -> Self {
        Self {
            id: prova.id,
            internal_title: prova.internal_title,
            class_group_id: prova.class_group_id,
            subject_id: prova.subject_id,
            template_id: prova.template_id,
            status: prova.status,
            updated_at: format_primitive(prova.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ProvaImageResponse {
    pub(crate) id: String,
    pub(crate) filename: String,
    pub(crate) storage_url: String,
    pub(crate) alt_text: String,
    pub(crate) caption: Option<String>,
    pub(crate) prefer_glossary: Option<bool>,
    pub(crate) reference_code: Option<String>,
}

impl ProvaImageResponse {
    pub(crate) fn from_db(image: ProvaImage) -> Self {
        Self {
            id: image.id,
            filename: image.filename,
            storage_url: image.storage_url,
            alt_text: image.alt_text,
            caption: image.caption,
            prefer_glossary: image.prefer_glossary,
            reference_code: image.reference_code,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AnalysisResponse {
    pub(crate) id: String,
    pub(crate) prova_id: String,
    pub(crate) summary_scores: serde_json::Value,
    pub(crate) per_question: serde_json::Value,
    pub(crate) created_at: String,
}

impl AnalysisResponse {
    pub(crate) fn from_db(analysis: crate::db::models::AiAnalysis) -> Self {
        Self {
            id: analysis.id,
            prova_id: analysis.prova_id,
            summary_scores: analysis.summary_scores.0,
            per_question: analysis.per_question.0,
            created_at: format_primitive(analysis.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PreviewResponse {
    pub(crate) preview_url: String,
    pub(crate) expires_in_seconds: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct RenderResponse {
    pub(crate) job_id: String,
    pub(crate) status: crate::db::types::JobStatus,
}

#[derive(Debug, Serialize)]
pub(crate) struct JobResponse {
    pub(crate) id: String,
    pub(crate) status: crate::db::types::JobStatus,
    pub(crate) result: Option<serde_json::Value>,
    pub(crate) error: Option<String>,
}

impl JobResponse {
    pub(crate) fn from_db(job: crate::db::models::Job) -> Self {
        Self {
            id: job.id,
            status: job.status,
            result: job.result.map(|result| result.0),
            error: job.error,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitResponse {
    pub(crate) id: String,
    pub(crate) status: ProvaStatus,
}
