use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::template::{TemplateCreate, TemplateResponse};
use crate::services::rules::RuleSchema;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_templates).post(create_template))
        .route("/:template_id", get(get_template))
}

async fn list_templates(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<TemplateResponse>>, ApiError> {
    repositories::templates::seed_defaults(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to seed default templates"))?;

    let templates =
        repositories::templates::list_visible(state.db(), user.school_id.as_deref())
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list templates"))?;

    Ok(Json(templates.into_iter().map(TemplateResponse::from_db).collect()))
}

async fn get_template(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(template_id): Path<String>,
) -> Result<Json<TemplateResponse>, ApiError> {
    let template = repositories::templates::find_by_id(state.db(), &template_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load template"))?
        .ok_or_else(|| ApiError::NotFound("Template not found".to_string()))?;

    let visible = template.school_id.is_none() || template.school_id == user.school_id;
    if !visible {
        return Err(ApiError::NotFound("Template not found".to_string()));
    }

    Ok(Json(TemplateResponse::from_db(template)))
}

async fn create_template(
    State(state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
    Json(payload): Json<TemplateCreate>,
) -> Result<(StatusCode, Json<TemplateResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    // Rule schema is validated once here; provas built from this template
    // trust the stored JSON afterwards.
    RuleSchema::parse(&payload.rules)
        .map_err(|e| ApiError::BadRequest(format!("Invalid rule schema: {e}")))?;

    let template = repositories::templates::create(
        state.db(),
        &Uuid::new_v4().to_string(),
        payload.school_id.as_deref(),
        &payload.name,
        &payload.rules,
        &payload.version,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create template"))?;

    crate::services::audit::record(
        state.db(),
        template.school_id.as_deref(),
        Some(&admin.id),
        "template.create",
        "template",
        Some(&template.id),
        None,
    )
    .await;

    Ok((StatusCode::CREATED, Json(TemplateResponse::from_db(template))))
}
