use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "userrole", rename_all = "lowercase")]
pub(crate) enum UserRole {
    Admin,
    Coordinator,
    Teacher,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "provastatus", rename_all = "snake_case")]
pub(crate) enum ProvaStatus {
    Draft,
    Submitted,
    ChangesRequested,
    Approved,
}

impl ProvaStatus {
    /// The submission gate only accepts provas that are still editable.
    pub(crate) fn can_submit(self) -> bool {
        matches!(self, Self::Draft | Self::ChangesRequested)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "questionkind", rename_all = "lowercase")]
pub(crate) enum QuestionKind {
    Objective,
    Essay,
}

impl QuestionKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Objective => "objective",
            Self::Essay => "essay",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "imagemode", rename_all = "lowercase")]
pub(crate) enum ImageMode {
    Inline,
    Glossary,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "reviewverdict", rename_all = "snake_case")]
pub(crate) enum ReviewVerdict {
    Approved,
    ChangesRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "jobstatus", rename_all = "lowercase")]
pub(crate) enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "jobtype", rename_all = "snake_case")]
pub(crate) enum JobType {
    PdfRender,
}
