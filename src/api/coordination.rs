use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{require_school, CurrentCoordinator};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Prova, User};
use crate::db::types::{ProvaStatus, QuestionKind, ReviewVerdict};
use crate::repositories;
use crate::schemas::prova::ProvaSummaryResponse;
use crate::schemas::review::{ApprovePayload, RequestChangesPayload, ReviewResponse};
use crate::services::audit;
use crate::services::rules::RuleSchema;
use crate::services::submission_policy::{validate_submission, SubmissionSnapshot};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/provas", get(list_provas))
        .route("/provas/:prova_id/approve", post(approve))
        .route("/provas/:prova_id/request-changes", post(request_changes))
        .route("/provas/:prova_id/report", get(report))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default = "default_status")]
    status: ProvaStatus,
}

fn default_status() -> ProvaStatus {
    ProvaStatus::Submitted
}

async fn list_provas(
    State(state): State<AppState>,
    CurrentCoordinator(coordinator): CurrentCoordinator,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ProvaSummaryResponse>>, ApiError> {
    let school_id = require_school(&coordinator)?;
    let provas = repositories::provas::list_by_status(state.db(), school_id, query.status)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list provas"))?;

    Ok(Json(provas.into_iter().map(ProvaSummaryResponse::from_db).collect()))
}

async fn approve(
    State(state): State<AppState>,
    CurrentCoordinator(coordinator): CurrentCoordinator,
    Path(prova_id): Path<String>,
    payload: Option<Json<ApprovePayload>>,
) -> Result<Json<ReviewResponse>, ApiError> {
    let prova = fetch_submitted_prova(&state, &coordinator, &prova_id).await?;
    let comment = payload.and_then(|Json(payload)| payload.comment);

    record_verdict(&state, &coordinator, &prova, ReviewVerdict::Approved, comment.as_deref())
        .await
        .map(Json)
}

async fn request_changes(
    State(state): State<AppState>,
    CurrentCoordinator(coordinator): CurrentCoordinator,
    Path(prova_id): Path<String>,
    Json(payload): Json<RequestChangesPayload>,
) -> Result<Json<ReviewResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let prova = fetch_submitted_prova(&state, &coordinator, &prova_id).await?;

    record_verdict(
        &state,
        &coordinator,
        &prova,
        ReviewVerdict::ChangesRequested,
        Some(&payload.comment),
    )
    .await
    .map(Json)
}

/// Read-only compliance report: re-runs the submission pipeline over the
/// current snapshot without touching the prova.
async fn report(
    State(state): State<AppState>,
    CurrentCoordinator(coordinator): CurrentCoordinator,
    Path(prova_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let school_id = require_school(&coordinator)?;
    let prova = repositories::provas::find_by_id(state.db(), school_id, &prova_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load prova"))?
        .ok_or_else(|| ApiError::NotFound("Prova not found".to_string()))?;

    let template = repositories::templates::find_by_id(state.db(), &prova.template_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load template"))?
        .ok_or_else(|| ApiError::Internal("Prova references a missing template".to_string()))?;
    let rules = RuleSchema::parse(&template.rules.0)
        .map_err(|e| ApiError::internal(e, "Stored rule schema is invalid"))?;

    let questions = repositories::questions::list_by_prova(state.db(), &prova.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load questions"))?;
    let images = repositories::images::list_by_prova(state.db(), &prova.school_id, &prova.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load images"))?;
    let policy = repositories::policies::find_by_school(state.db(), &prova.school_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load school policy"))?;
    let latest_analysis = repositories::analyses::latest_for_prova(state.db(), &prova.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load latest analysis"))?;
    let reviews = repositories::reviews::list_by_prova(state.db(), &prova.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load reviews"))?;

    let compliance = match validate_submission(&SubmissionSnapshot {
        questions: &questions,
        images: &images,
        rules: &rules,
        policy: policy.as_ref(),
        latest_analysis: latest_analysis.as_ref(),
    }) {
        Ok(()) => json!({ "compliant": true }),
        Err(rejection) => {
            let mut body = rejection.body();
            body["compliant"] = Value::Bool(false);
            body
        }
    };

    let objective_count =
        questions.iter().filter(|question| question.kind == QuestionKind::Objective).count();

    Ok(Json(json!({
        "prova_id": prova.id,
        "internal_title": prova.internal_title,
        "status": prova.status,
        "template": { "id": template.id, "name": template.name, "rules": template.rules.0 },
        "question_count": questions.len(),
        "objective_count": objective_count,
        "essay_count": questions.len() - objective_count,
        "image_count": images.len(),
        "latest_scores": latest_analysis.map(|analysis| analysis.summary_scores.0),
        "reviews": reviews.into_iter().map(ReviewResponse::from_db).collect::<Vec<_>>(),
        "compliance": compliance,
    })))
}

async fn fetch_submitted_prova(
    state: &AppState,
    coordinator: &User,
    prova_id: &str,
) -> Result<Prova, ApiError> {
    let school_id = require_school(coordinator)?;
    let prova = repositories::provas::find_by_id(state.db(), school_id, prova_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load prova"))?
        .ok_or_else(|| ApiError::NotFound("Prova not found".to_string()))?;

    if prova.status != ProvaStatus::Submitted {
        return Err(ApiError::Conflict("Prova is not awaiting review".to_string()));
    }

    Ok(prova)
}

async fn record_verdict(
    state: &AppState,
    coordinator: &User,
    prova: &Prova,
    verdict: ReviewVerdict,
    comment: Option<&str>,
) -> Result<ReviewResponse, ApiError> {
    let now = primitive_now_utc();
    let next_status = match verdict {
        ReviewVerdict::Approved => ProvaStatus::Approved,
        ReviewVerdict::ChangesRequested => ProvaStatus::ChangesRequested,
    };

    let review = repositories::reviews::insert(
        state.db(),
        &Uuid::new_v4().to_string(),
        &prova.id,
        &coordinator.id,
        verdict,
        comment,
        now,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to record review"))?;

    repositories::provas::set_status(state.db(), &prova.school_id, &prova.id, next_status, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to update prova status"))?;

    audit::record(
        state.db(),
        Some(&prova.school_id),
        Some(&coordinator.id),
        match verdict {
            ReviewVerdict::Approved => "prova.approve",
            ReviewVerdict::ChangesRequested => "prova.request_changes",
        },
        "prova",
        Some(&prova.id),
        comment.map(|comment| json!({ "comment": comment })),
    )
    .await;

    Ok(ReviewResponse::from_db(review))
}
