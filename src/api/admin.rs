use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentAdmin;
use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::school::{
    ClassGroupCreate, ClassGroupResponse, PolicyResponse, PolicyUpdate, SchoolCreate,
    SchoolResponse, SchoolUpdate, SubjectCreate, SubjectResponse, TeacherClassLink,
    TeacherClassSubjectLink,
};
use crate::schemas::user::{AdminUserCreate, AdminUserUpdate, UserResponse};
use crate::services::audit;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/schools", get(list_schools).post(create_school))
        .route("/schools/:school_id", put(update_school))
        .route("/schools/:school_id/classes", get(list_classes).post(create_class))
        .route("/schools/:school_id/classes/:class_id", delete(delete_class))
        .route("/schools/:school_id/subjects", get(list_subjects).post(create_subject))
        .route("/schools/:school_id/subjects/:subject_id", delete(delete_subject))
        .route("/schools/:school_id/users", get(list_users).post(create_user))
        .route("/schools/:school_id/users/:user_id", put(update_user))
        .route("/schools/:school_id/policy", get(get_policy).put(put_policy))
        .route("/links/teacher-class", post(link_teacher_class))
        .route("/links/teacher-class-subject", post(link_teacher_class_subject))
}

async fn list_schools(
    State(state): State<AppState>,
    CurrentAdmin(_admin): CurrentAdmin,
) -> Result<Json<Vec<SchoolResponse>>, ApiError> {
    let schools = repositories::schools::list_all(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list schools"))?;

    Ok(Json(schools.into_iter().map(SchoolResponse::from_db).collect()))
}

async fn create_school(
    State(state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
    Json(payload): Json<SchoolCreate>,
) -> Result<(StatusCode, Json<SchoolResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let school = repositories::schools::create(
        state.db(),
        repositories::schools::CreateSchool {
            id: &Uuid::new_v4().to_string(),
            name: &payload.name,
            slug: payload.slug.as_deref(),
            address: payload.address.as_deref(),
            contact_name: payload.contact_name.as_deref(),
            contact_email: payload.contact_email.as_deref(),
            contact_phone: payload.contact_phone.as_deref(),
            contract_start: payload.contract_start,
            contract_end: payload.contract_end,
            notes: payload.notes.as_deref(),
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create school"))?;

    audit::record(
        state.db(),
        Some(&school.id),
        Some(&admin.id),
        "school.create",
        "school",
        Some(&school.id),
        None,
    )
    .await;

    Ok((StatusCode::CREATED, Json(SchoolResponse::from_db(school))))
}

async fn update_school(
    State(state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
    Path(school_id): Path<String>,
    Json(payload): Json<SchoolUpdate>,
) -> Result<Json<SchoolResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let school = repositories::schools::update(
        state.db(),
        &school_id,
        repositories::schools::UpdateSchool {
            name: payload.name,
            slug: payload.slug,
            logo_url: payload.logo_url,
            address: payload.address,
            contact_name: payload.contact_name,
            contact_email: payload.contact_email,
            contact_phone: payload.contact_phone,
            notes: payload.notes,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update school"))?
    .ok_or_else(|| ApiError::NotFound("School not found".to_string()))?;

    audit::record(
        state.db(),
        Some(&school.id),
        Some(&admin.id),
        "school.update",
        "school",
        Some(&school.id),
        None,
    )
    .await;

    Ok(Json(SchoolResponse::from_db(school)))
}

async fn list_classes(
    State(state): State<AppState>,
    CurrentAdmin(_admin): CurrentAdmin,
    Path(school_id): Path<String>,
) -> Result<Json<Vec<ClassGroupResponse>>, ApiError> {
    ensure_school_exists(&state, &school_id).await?;

    let classes = repositories::classes::list_by_school(state.db(), &school_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list class groups"))?;

    Ok(Json(classes.into_iter().map(ClassGroupResponse::from_db).collect()))
}

async fn create_class(
    State(state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
    Path(school_id): Path<String>,
    Json(payload): Json<ClassGroupCreate>,
) -> Result<(StatusCode, Json<ClassGroupResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    ensure_school_exists(&state, &school_id).await?;

    let class = repositories::classes::create(
        state.db(),
        &Uuid::new_v4().to_string(),
        &school_id,
        &payload.display_name,
        payload.school_year,
        &payload.shift,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create class group"))?;

    audit::record(
        state.db(),
        Some(&school_id),
        Some(&admin.id),
        "class.create",
        "class_group",
        Some(&class.id),
        None,
    )
    .await;

    Ok((StatusCode::CREATED, Json(ClassGroupResponse::from_db(class))))
}

async fn delete_class(
    State(state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
    Path((school_id, class_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    ensure_school_exists(&state, &school_id).await?;

    let deleted = repositories::classes::delete(state.db(), &school_id, &class_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete class group"))?;
    if !deleted {
        return Err(ApiError::NotFound("Class group not found".to_string()));
    }

    audit::record(
        state.db(),
        Some(&school_id),
        Some(&admin.id),
        "class.delete",
        "class_group",
        Some(&class_id),
        None,
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

async fn list_subjects(
    State(state): State<AppState>,
    CurrentAdmin(_admin): CurrentAdmin,
    Path(school_id): Path<String>,
) -> Result<Json<Vec<SubjectResponse>>, ApiError> {
    ensure_school_exists(&state, &school_id).await?;

    let subjects = repositories::subjects::list_by_school(state.db(), &school_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list subjects"))?;

    Ok(Json(subjects.into_iter().map(SubjectResponse::from_db).collect()))
}

async fn create_subject(
    State(state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
    Path(school_id): Path<String>,
    Json(payload): Json<SubjectCreate>,
) -> Result<(StatusCode, Json<SubjectResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    ensure_school_exists(&state, &school_id).await?;

    let subject = repositories::subjects::create(
        state.db(),
        &Uuid::new_v4().to_string(),
        &school_id,
        &payload.name,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create subject"))?;

    audit::record(
        state.db(),
        Some(&school_id),
        Some(&admin.id),
        "subject.create",
        "subject",
        Some(&subject.id),
        None,
    )
    .await;

    Ok((StatusCode::CREATED, Json(SubjectResponse::from_db(subject))))
}

async fn delete_subject(
    State(state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
    Path((school_id, subject_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    ensure_school_exists(&state, &school_id).await?;

    let deleted = repositories::subjects::delete(state.db(), &school_id, &subject_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete subject"))?;
    if !deleted {
        return Err(ApiError::NotFound("Subject not found".to_string()));
    }

    audit::record(
        state.db(),
        Some(&school_id),
        Some(&admin.id),
        "subject.delete",
        "subject",
        Some(&subject_id),
        None,
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

async fn list_users(
    State(state): State<AppState>,
    CurrentAdmin(_admin): CurrentAdmin,
    Path(school_id): Path<String>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    ensure_school_exists(&state, &school_id).await?;

    let users = repositories::users::list_by_school(state.db(), &school_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list users"))?;

    Ok(Json(users.into_iter().map(UserResponse::from_db).collect()))
}

async fn create_user(
    State(state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
    Path(school_id): Path<String>,
    Json(payload): Json<AdminUserCreate>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    ensure_school_exists(&state, &school_id).await?;

    let email = payload.email.trim().to_ascii_lowercase();
    let existing = repositories::users::find_by_email(state.db(), &email)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check existing user"))?;
    if existing.is_some() {
        return Err(ApiError::Conflict("A user with this email already exists".to_string()));
    }

    let hashed_password = security::hash_password(&payload.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    // School staff must rotate the password handed out by the admin.
    let user = repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            school_id: Some(&school_id),
            name: &payload.name,
            email: &email,
            hashed_password,
            role: payload.role,
            must_change_password: true,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create user"))?;

    audit::record(
        state.db(),
        Some(&school_id),
        Some(&admin.id),
        "user.create",
        "user",
        Some(&user.id),
        Some(json!({ "role": user.role })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(UserResponse::from_db(user))))
}

async fn update_user(
    State(state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
    Path((school_id, user_id)): Path<(String, String)>,
    Json(payload): Json<AdminUserUpdate>,
) -> Result<Json<UserResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let existing = repositories::users::find_by_id(state.db(), &user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    if existing.school_id.as_deref() != Some(school_id.as_str()) {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    let hashed_password = payload
        .password
        .as_deref()
        .map(security::hash_password)
        .transpose()
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let user = repositories::users::update(
        state.db(),
        &user_id,
        repositories::users::UpdateUser {
            name: payload.name,
            role: payload.role,
            is_active: payload.is_active,
            hashed_password,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update user"))?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    audit::record(
        state.db(),
        Some(&school_id),
        Some(&admin.id),
        "user.update",
        "user",
        Some(&user.id),
        None,
    )
    .await;

    Ok(Json(UserResponse::from_db(user)))
}

async fn get_policy(
    State(state): State<AppState>,
    CurrentAdmin(_admin): CurrentAdmin,
    Path(school_id): Path<String>,
) -> Result<Json<PolicyResponse>, ApiError> {
    ensure_school_exists(&state, &school_id).await?;

    let policy = repositories::policies::find_by_school(state.db(), &school_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load school policy"))?
        .ok_or_else(|| ApiError::NotFound("No policy configured for this school".to_string()))?;

    Ok(Json(PolicyResponse::from_db(policy)))
}

async fn put_policy(
    State(state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
    Path(school_id): Path<String>,
    Json(payload): Json<PolicyUpdate>,
) -> Result<Json<PolicyResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    ensure_school_exists(&state, &school_id).await?;

    let policy = repositories::policies::upsert(
        state.db(),
        &school_id,
        payload.min_adherence,
        payload.min_coherence,
        payload.image_mode,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to upsert school policy"))?;

    audit::record(
        state.db(),
        Some(&school_id),
        Some(&admin.id),
        "policy.upsert",
        "school_policy",
        Some(&policy.id),
        Some(json!({
            "min_adherence": policy.min_adherence,
            "min_coherence": policy.min_coherence,
            "image_mode": policy.image_mode,
        })),
    )
    .await;

    Ok(Json(PolicyResponse::from_db(policy)))
}

async fn link_teacher_class(
    State(state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
    Json(payload): Json<TeacherClassLink>,
) -> Result<StatusCode, ApiError> {
    let teacher = fetch_teacher(&state, &payload.teacher_id).await?;
    let school_id = teacher
        .school_id
        .ok_or_else(|| ApiError::BadRequest("Teacher is not attached to a school".to_string()))?;

    let class = repositories::classes::find_by_id(state.db(), &school_id, &payload.class_group_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load class group"))?;
    if class.is_none() {
        return Err(ApiError::BadRequest("Class group belongs to a different school".to_string()));
    }

    repositories::assignments::link_teacher_class(
        state.db(),
        &Uuid::new_v4().to_string(),
        &payload.teacher_id,
        &payload.class_group_id,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to link teacher to class"))?;

    audit::record(
        state.db(),
        Some(&school_id),
        Some(&admin.id),
        "link.teacher_class",
        "teacher_class",
        Some(&payload.teacher_id),
        Some(json!({ "class_group_id": payload.class_group_id })),
    )
    .await;

    Ok(StatusCode::CREATED)
}

async fn link_teacher_class_subject(
    State(state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
    Json(payload): Json<TeacherClassSubjectLink>,
) -> Result<StatusCode, ApiError> {
    let teacher = fetch_teacher(&state, &payload.teacher_id).await?;
    let school_id = teacher
        .school_id
        .ok_or_else(|| ApiError::BadRequest("Teacher is not attached to a school".to_string()))?;

    let link = repositories::assignments::find_teacher_class(
        state.db(),
        &payload.teacher_id,
        &payload.class_group_id,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to load teacher-class link"))?
    .ok_or_else(|| {
        ApiError::BadRequest("Teacher is not linked to this class group".to_string())
    })?;

    let subject = repositories::subjects::find_by_id(state.db(), &school_id, &payload.subject_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load subject"))?;
    if subject.is_none() {
        return Err(ApiError::BadRequest("Subject belongs to a different school".to_string()));
    }

    repositories::assignments::link_class_subject(
        state.db(),
        &Uuid::new_v4().to_string(),
        &link.id,
        &payload.subject_id,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to link subject to teacher class"))?;

    audit::record(
        state.db(),
        Some(&school_id),
        Some(&admin.id),
        "link.teacher_class_subject",
        "teacher_class_subject",
        Some(&link.id),
        Some(json!({ "subject_id": payload.subject_id })),
    )
    .await;

    Ok(StatusCode::CREATED)
}

async fn ensure_school_exists(state: &AppState, school_id: &str) -> Result<(), ApiError> {
    let school = repositories::schools::find_by_id(state.db(), school_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load school"))?;

    if school.is_none() {
        return Err(ApiError::NotFound("School not found".to_string()));
    }

    Ok(())
}

async fn fetch_teacher(
    state: &AppState,
    teacher_id: &str,
) -> Result<crate::db::models::User, ApiError> {
    let user = repositories::users::find_by_id(state.db(), teacher_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load teacher"))?
        .ok_or_else(|| ApiError::NotFound("Teacher not found".to_string()))?;

    if user.role != crate::db::types::UserRole::Teacher {
        return Err(ApiError::BadRequest("User is not a teacher".to_string()));
    }

    Ok(user)
}
