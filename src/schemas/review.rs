use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::CoordinationReview;
use crate::db::types::ReviewVerdict;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct RequestChangesPayload {
    #[validate(length(min = 1, message = "comment must not be empty"))]
    pub(crate) comment: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApprovePayload {
    #[serde(default)]
    pub(crate) comment: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ReviewResponse {
    pub(crate) id: String,
    pub(crate) prova_id: String,
    pub(crate) coordinator_id: String,
    pub(crate) verdict: ReviewVerdict,
    pub(crate) comment: Option<String>,
    pub(crate) created_at: String,
}

impl ReviewResponse {
    pub(crate) fn from_db(review: CoordinationReview) -> Self {
        Self {
            id: review.id,
            prova_id: review.prova_id,
            coordinator_id: review.coordinator_id,
            verdict: review.verdict,
            comment: review.comment,
            created_at: format_primitive(review.created_at),
        }
    }
}
