use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{require_school, CurrentTeacher};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Prova, User};
use crate::db::types::{JobType, ProvaStatus, QuestionKind};
use crate::repositories;
use crate::schemas::prova::{
    AnalysisResponse, JobResponse, PreviewResponse, ProvaCreate, ProvaImageResponse,
    ProvaResponse, ProvaSummaryResponse, ProvaUpdate, QuestionPayload, RenderResponse,
    SubmitResponse,
};
use crate::services::ai_review::{self, AiReviewService};
use crate::services::audit;
use crate::services::rules::RuleSchema;
use crate::services::submission_policy::{validate_submission, SubmissionSnapshot};

/// Hard cap on multipart bodies; the configured per-file limit is enforced
/// separately against settings.
const UPLOAD_BODY_LIMIT_BYTES: usize = 64 * 1024 * 1024;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_provas).post(create_prova))
        .route("/:prova_id", get(get_prova).put(update_prova))
        .route(
            "/:prova_id/images",
            get(list_images)
                .post(upload_image)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT_BYTES)),
        )
        .route("/:prova_id/analyze", post(analyze_prova))
        .route("/:prova_id/preview", post(preview_prova))
        .route("/:prova_id/render", post(render_prova))
        .route("/:prova_id/jobs/:job_id", get(job_status))
        .route("/:prova_id/submit", post(submit_prova))
}

async fn list_provas(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
) -> Result<Json<Vec<ProvaSummaryResponse>>, ApiError> {
    let school_id = require_school(&teacher)?;
    let provas = repositories::provas::list_by_author(state.db(), school_id, &teacher.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list provas"))?;

    Ok(Json(provas.into_iter().map(ProvaSummaryResponse::from_db).collect()))
}

async fn create_prova(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Json(payload): Json<ProvaCreate>,
) -> Result<(StatusCode, Json<ProvaResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let school_id = require_school(&teacher)?.to_string();

    let class = repositories::classes::find_by_id(state.db(), &school_id, &payload.class_group_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load class group"))?;
    if class.is_none() {
        return Err(ApiError::BadRequest("Unknown class group".to_string()));
    }

    let subject = repositories::subjects::find_by_id(state.db(), &school_id, &payload.subject_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load subject"))?;
    if subject.is_none() {
        return Err(ApiError::BadRequest("Unknown subject".to_string()));
    }

    let covers = repositories::assignments::teacher_covers_class_subject(
        state.db(),
        &teacher.id,
        &payload.class_group_id,
        &payload.subject_id,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to check teaching assignment"))?;
    if !covers {
        return Err(ApiError::Forbidden("You do not teach this subject in this class"));
    }

    let template = repositories::templates::find_by_id(state.db(), &payload.template_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load template"))?
        .ok_or_else(|| ApiError::BadRequest("Unknown template".to_string()))?;
    let template_visible =
        template.school_id.is_none() || template.school_id.as_deref() == Some(school_id.as_str());
    if !template_visible || !template.is_active {
        return Err(ApiError::BadRequest("Unknown template".to_string()));
    }

    let questions = to_new_questions(payload.questions)?;
    let now = primitive_now_utc();

    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to open transaction"))?;

    let prova = repositories::provas::create_with_executor(
        &mut *tx,
        repositories::provas::CreateProva {
            id: &Uuid::new_v4().to_string(),
            school_id: &school_id,
            author_id: &teacher.id,
            internal_title: &payload.internal_title,
            class_group_id: &payload.class_group_id,
            subject_id: &payload.subject_id,
            template_id: &payload.template_id,
            render_opts: payload.render_opts.as_ref(),
            created_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create prova"))?;

    let inserted = repositories::questions::replace_for_prova(&mut tx, &prova.id, questions)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to insert questions"))?;

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit prova"))?;

    audit::record(
        state.db(),
        Some(&school_id),
        Some(&teacher.id),
        "prova.create",
        "prova",
        Some(&prova.id),
        None,
    )
    .await;

    Ok((StatusCode::CREATED, Json(ProvaResponse::from_db(prova, inserted))))
}

async fn get_prova(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Path(prova_id): Path<String>,
) -> Result<Json<ProvaResponse>, ApiError> {
    let prova = fetch_owned_prova(&state, &teacher, &prova_id).await?;
    let questions = repositories::questions::list_by_prova(state.db(), &prova.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load questions"))?;

    Ok(Json(ProvaResponse::from_db(prova, questions)))
}

async fn update_prova(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Path(prova_id): Path<String>,
    Json(payload): Json<ProvaUpdate>,
) -> Result<Json<ProvaResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let prova = fetch_owned_prova(&state, &teacher, &prova_id).await?;

    if !prova.status.can_submit() {
        return Err(ApiError::Conflict("Prova can no longer be edited".to_string()));
    }

    let replacement = payload.questions.map(to_new_questions).transpose()?;
    let now = primitive_now_utc();

    let mut tx = state
        .db()
        .begin()
        .await
        .map_err(|e| ApiError::internal(e, "Failed to open transaction"))?;

    let updated = repositories::provas::update_with_executor(
        &mut *tx,
        &prova.school_id,
        &prova.id,
        repositories::provas::UpdateProva {
            internal_title: payload.internal_title.as_deref(),
            render_opts: payload.render_opts.as_ref(),
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update prova"))?
    .ok_or_else(|| ApiError::NotFound("Prova not found".to_string()))?;

    let questions = match replacement {
        Some(questions) => repositories::questions::replace_for_prova(&mut tx, &prova.id, questions)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to replace questions"))?,
        None => Vec::new(),
    };

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit prova update"))?;

    let questions = if questions.is_empty() {
        repositories::questions::list_by_prova(state.db(), &prova.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load questions"))?
    } else {
        questions
    };

    Ok(Json(ProvaResponse::from_db(updated, questions)))
}

async fn list_images(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Path(prova_id): Path<String>,
) -> Result<Json<Vec<ProvaImageResponse>>, ApiError> {
    let prova = fetch_owned_prova(&state, &teacher, &prova_id).await?;

    let images = repositories::images::list_by_prova(state.db(), &prova.school_id, &prova.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list images"))?;

    Ok(Json(images.into_iter().map(ProvaImageResponse::from_db).collect()))
}

async fn upload_image(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Path(prova_id): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ProvaImageResponse>), ApiError> {
    let prova = fetch_owned_prova(&state, &teacher, &prova_id).await?;

    let Some(storage) = state.storage() else {
        return Err(ApiError::ServiceUnavailable("Object storage is not configured".to_string()));
    };

    let existing = repositories::images::count_by_prova_with_executor(
        state.db(),
        &prova.school_id,
        &prova.id,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to count prova images"))?;
    if existing as u64 >= state.settings().storage().max_images_per_prova {
        return Err(ApiError::BadRequest("Image limit reached for this prova".to_string()));
    }

    let mut file: Option<(String, Vec<u8>)> = None;
    let mut alt_text = String::new();
    let mut caption: Option<String> = None;
    let mut prefer_glossary: Option<bool> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart payload: {e}")))?
    {
        match field.name().unwrap_or_default() {
            "file" => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| ApiError::BadRequest("file part requires a filename".to_string()))?;
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {e}")))?;
                file = Some((filename, bytes.to_vec()));
            }
            "alt_text" => {
                alt_text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid alt_text: {e}")))?;
            }
            "caption" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid caption: {e}")))?;
                caption = (!text.is_empty()).then_some(text);
            }
            "prefer_glossary" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid prefer_glossary: {e}")))?;
                prefer_glossary = Some(matches!(text.as_str(), "1" | "true" | "True"));
            }
            _ => {}
        }
    }

    let (filename, bytes) =
        file.ok_or_else(|| ApiError::BadRequest("Missing file part".to_string()))?;
    if alt_text.trim().is_empty() {
        return Err(ApiError::BadRequest("alt_text is required".to_string()));
    }

    let extension = filename.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
    let allowed = state
        .settings()
        .storage()
        .allowed_image_extensions
        .iter()
        .any(|candidate| candidate == &extension);
    if !allowed {
        return Err(ApiError::BadRequest(format!("Unsupported file extension: {extension}")));
    }

    let max_bytes = state.settings().storage().max_upload_size_mb * 1024 * 1024;
    if bytes.len() as u64 > max_bytes {
        return Err(ApiError::BadRequest("File exceeds the upload size limit".to_string()));
    }

    let image_id = Uuid::new_v4().to_string();
    let storage_key = format!("provas/{}/{}/{image_id}.{extension}", prova.school_id, prova.id);
    let content_type = content_type_for(&extension);

    storage
        .upload_bytes(&storage_key, content_type, bytes)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to upload image"))?;

    let storage_url =
        format!("{}/{}/{storage_key}", state.settings().s3().endpoint, state.settings().s3().bucket);

    let reference_code =
        repositories::images::next_reference_code(state.db(), &prova.school_id, &prova.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to allocate reference code"))?;

    let image = repositories::images::insert_with_executor(
        state.db(),
        repositories::images::CreateProvaImage {
            id: &image_id,
            school_id: &prova.school_id,
            prova_id: &prova.id,
            filename: &filename,
            storage_url: &storage_url,
            storage_key: &storage_key,
            alt_text: &alt_text,
            caption: caption.as_deref(),
            prefer_glossary,
            reference_code: Some(&reference_code),
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to record image"))?;

    Ok((StatusCode::CREATED, Json(ProvaImageResponse::from_db(image))))
}

async fn analyze_prova(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Path(prova_id): Path<String>,
) -> Result<(StatusCode, Json<AnalysisResponse>), ApiError> {
    let prova = fetch_owned_prova(&state, &teacher, &prova_id).await?;
    let questions = repositories::questions::list_by_prova(state.db(), &prova.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load questions"))?;

    let service = AiReviewService::from_settings(state.settings())
        .map_err(|e| ApiError::internal(e, "Failed to build AI review client"))?;

    let outcome = match service {
        Some(service) => {
            let subject =
                repositories::subjects::find_by_id(state.db(), &prova.school_id, &prova.subject_id)
                    .await
                    .map_err(|e| ApiError::internal(e, "Failed to load subject"))?;
            let class = repositories::classes::find_by_id(
                state.db(),
                &prova.school_id,
                &prova.class_group_id,
            )
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load class group"))?;

            service
                .review_prova(
                    &prova.id,
                    subject.map(|s| s.name).as_deref().unwrap_or("unknown"),
                    class.map(|c| c.display_name).as_deref().unwrap_or("unknown"),
                    &questions,
                )
                .await
                .map_err(|e| ApiError::internal(e, "AI review failed"))?
        }
        None => ai_review::stub_outcome(&questions),
    };

    let analysis = repositories::analyses::insert(
        state.db(),
        &Uuid::new_v4().to_string(),
        &prova.id,
        outcome,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to persist analysis"))?;

    Ok((StatusCode::CREATED, Json(AnalysisResponse::from_db(analysis))))
}

async fn preview_prova(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Path(prova_id): Path<String>,
) -> Result<Json<PreviewResponse>, ApiError> {
    let prova = fetch_owned_prova(&state, &teacher, &prova_id).await?;

    // Rendering is simulated; previews point at the location the worker
    // would publish to.
    let preview_url = match state.storage() {
        Some(storage) => {
            let key = format!("previews/{}/{}.pdf", prova.school_id, prova.id);
            storage
                .presign_get(&key, std::time::Duration::from_secs(300))
                .await
                .map_err(|e| ApiError::internal(e, "Failed to presign preview"))?
        }
        None => format!("{}/provas/{}/preview.pdf", state.settings().api().api_v1_str, prova.id),
    };

    Ok(Json(PreviewResponse { preview_url, expires_in_seconds: 300 }))
}

async fn render_prova(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Path(prova_id): Path<String>,
) -> Result<(StatusCode, Json<RenderResponse>), ApiError> {
    let prova = fetch_owned_prova(&state, &teacher, &prova_id).await?;

    let job = repositories::jobs::enqueue(
        state.db(),
        &Uuid::new_v4().to_string(),
        &prova.school_id,
        JobType::PdfRender,
        json!({ "prova_id": prova.id }),
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to enqueue render job"))?;

    Ok((StatusCode::ACCEPTED, Json(RenderResponse { job_id: job.id, status: job.status })))
}

async fn job_status(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Path((prova_id, job_id)): Path<(String, String)>,
) -> Result<Json<JobResponse>, ApiError> {
    let prova = fetch_owned_prova(&state, &teacher, &prova_id).await?;

    let job = repositories::jobs::find_by_id(state.db(), &prova.school_id, &job_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load job"))?
        .ok_or_else(|| ApiError::NotFound("Job not found".to_string()))?;

    let belongs_to_prova =
        job.payload.0.get("prova_id").and_then(serde_json::Value::as_str) == Some(prova.id.as_str());
    if !belongs_to_prova {
        return Err(ApiError::NotFound("Job not found".to_string()));
    }

    Ok(Json(JobResponse::from_db(job)))
}

async fn submit_prova(
    State(state): State<AppState>,
    CurrentTeacher(teacher): CurrentTeacher,
    Path(prova_id): Path<String>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let prova = fetch_owned_prova(&state, &teacher, &prova_id).await?;

    if !prova.status.can_submit() {
        return Err(ApiError::Conflict("Prova is not in a submittable status".to_string()));
    }

    let template = repositories::templates::find_by_id(state.db(), &prova.template_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load template"))?
        .ok_or_else(|| ApiError::Internal("Prova references a missing template".to_string()))?;

    // The stored rules were validated at template save; a parse failure
    // here is data corruption, not a user mistake.
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

    validate_submission(&SubmissionSnapshot {
        questions: &questions,
        images: &images,
        rules: &rules,
        policy: policy.as_ref(),
        latest_analysis: latest_analysis.as_ref(),
    })
    .map_err(ApiError::Rejected)?;

    let updated = repositories::provas::set_status(
        state.db(),
        &prova.school_id,
        &prova.id,
        ProvaStatus::Submitted,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update prova status"))?
    .ok_or_else(|| ApiError::NotFound("Prova not found".to_string()))?;

    audit::record(
        state.db(),
        Some(&prova.school_id),
        Some(&teacher.id),
        "prova.submit",
        "prova",
        Some(&prova.id),
        None,
    )
    .await;

    Ok(Json(SubmitResponse { id: updated.id, status: updated.status }))
}

async fn fetch_owned_prova(
    state: &AppState,
    teacher: &User,
    prova_id: &str,
) -> Result<Prova, ApiError> {
    let school_id = require_school(teacher)?;
    let prova = repositories::provas::find_by_id(state.db(), school_id, prova_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load prova"))?
        .ok_or_else(|| ApiError::NotFound("Prova not found".to_string()))?;

    if prova.author_id != teacher.id {
        return Err(ApiError::NotFound("Prova not found".to_string()));
    }

    Ok(prova)
}

fn to_new_questions(
    payload: Vec<QuestionPayload>,
) -> Result<Vec<repositories::questions::NewQuestion>, ApiError> {
    let mut positions = std::collections::HashSet::new();
    let mut questions = Vec::with_capacity(payload.len());

    for question in payload {
        if !positions.insert(question.position) {
            return Err(ApiError::BadRequest(format!(
                "Duplicate question position: {}",
                question.position
            )));
        }

        if question.kind == QuestionKind::Objective {
            let choice_count = question.choices.as_ref().map(Vec::len).unwrap_or(0);
            if choice_count < 2 {
                return Err(ApiError::BadRequest(
                    "Objective questions need at least two choices".to_string(),
                ));
            }
            if let Some(index) = question.correct_choice_index {
                if index < 0 || index as usize >= choice_count {
                    return Err(ApiError::BadRequest(
                        "correct_choice_index is out of range".to_string(),
                    ));
                }
            }
        }

        questions.push(repositories::questions::NewQuestion {
            id: Uuid::new_v4().to_string(),
            position: question.position,
            kind: question.kind,
            statement: question.statement,
            choices: question.choices,
            correct_choice_index: question.correct_choice_index,
            image_references: question.image_references,
            inline_image_ids: question.inline_image_ids,
        });
    }

    Ok(questions)
}

fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}
