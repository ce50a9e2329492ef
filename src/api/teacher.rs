use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentTeacher;
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::school::{ClassGroupResponse, SubjectResponse};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/my-classes", get(my_classes))
        .route("/my-subjects", get(my_subjects))
}

async fn my_classes(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
) -> Result<Json<Vec<ClassGroupResponse>>, ApiError> {
    let classes = repositories::assignments::classes_for_teacher(state.db(), &teacher.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list classes"))?;

    Ok(Json(classes.into_iter().map(ClassGroupResponse::from_db).collect()))
}

#[derive(Debug, Deserialize)]
struct MySubjectsQuery {
    class_id: String,
}

async fn my_subjects(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Query(query): Query<MySubjectsQuery>,
) -> Result<Json<Vec<SubjectResponse>>, ApiError> {
    let subjects = repositories::assignments::subjects_for_teacher_class(
        state.db(),
        &teacher.id,
        &query.class_id,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list subjects"))?;

    Ok(Json(subjects.into_iter().map(SubjectResponse::from_db).collect()))
}
