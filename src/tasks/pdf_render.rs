//! PDF render jobs. Actual typesetting is out of scope; the worker drains
//! the queue, records where the document would live, and keeps job rows in
//! a terminal state so the API can report progress.

use anyhow::Result;
use serde_json::{json, Value};

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Job;
use crate::db::types::JobType;
use crate::repositories;

/// Claims and processes one pending job. Returns `false` when the queue is
/// empty so the caller can back off.
pub(crate) async fn process_next(state: &AppState) -> Result<bool> {
    let Some(job) =
        repositories::jobs::claim_next_pending(state.db(), JobType::PdfRender, primitive_now_utc())
            .await?
    else {
        return Ok(false);
    };

    tracing::info!(job_id = %job.id, school_id = %job.school_id, "Processing render job");

    match render(state, &job).await {
        Ok(result) => {
            repositories::jobs::mark_completed(state.db(), &job.id, result, primitive_now_utc())
                .await?;
            tracing::info!(job_id = %job.id, "Render job completed");
        }
        Err(err) => {
            repositories::jobs::mark_failed(
                state.db(),
                &job.id,
                &err.to_string(),
                primitive_now_utc(),
            )
            .await?;
            tracing::error!(job_id = %job.id, error = %err, "Render job failed");
        }
    }

    Ok(true)
}

async fn render(state: &AppState, job: &Job) -> Result<Value> {
    let prova_id = job
        .payload
        .0
        .get("prova_id")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("job payload is missing prova_id"))?;

    let prova = repositories::provas::find_by_id(state.db(), &job.school_id, prova_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("prova {prova_id} not found"))?;

    let questions = repositories::questions::list_by_prova(state.db(), &prova.id).await?;

    let document_key = format!("previews/{}/{}.pdf", prova.school_id, prova.id);
    Ok(json!({
        "prova_id": prova.id,
        "document_key": document_key,
        "page_hint": questions.len().div_ceil(4).max(1),
        "question_count": questions.len(),
    }))
}
