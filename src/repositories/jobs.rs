use sqlx::types::Json;
use sqlx::PgPool;

use crate::db::models::Job;
use crate::db::types::{JobStatus, JobType};

const COLUMNS: &str = "\
    id, school_id, job_type, status, payload, result, error, created_at, updated_at";

pub(crate) async fn find_by_id(
    pool: &PgPool,
    school_id: &str,
    id: &str,
) -> Result<Option<Job>, sqlx::Error> {
    sqlx::query_as::<_, Job>(&format!(
        "SELECT {COLUMNS} FROM jobs WHERE school_id = $1 AND id = $2"
    ))
    .bind(school_id)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn enqueue(
    pool: &PgPool,
    id: &str,
    school_id: &str,
    job_type: JobType,
    payload: serde_json::Value,
    created_at: time::PrimitiveDateTime,
) -> Result<Job, sqlx::Error> {
    sqlx::query_as::<_, Job>(&format!(
        "INSERT INTO jobs (id, school_id, job_type, status, payload, created_at, updated_at)
         VALUES ($1,$2,$3,'pending',$4,$5,$5)
         RETURNING {COLUMNS}",
    ))
    .bind(id)
    .bind(school_id)
    .bind(job_type)
    .bind(Json(payload))
    .bind(created_at)
    .fetch_one(pool)
    .await
}

/// Atomically claim the oldest pending job. `FOR UPDATE SKIP LOCKED` keeps
/// concurrent workers from grabbing the same row.
pub(crate) async fn claim_next_pending(
    pool: &PgPool,
    job_type: JobType,
    now: time::PrimitiveDateTime,
) -> Result<Option<Job>, sqlx::Error> {
    sqlx::query_as::<_, Job>(&format!(
        "UPDATE jobs SET status = 'processing', updated_at = $1
         WHERE id = (
             SELECT id FROM jobs
             WHERE status = 'pending' AND job_type = $2
             ORDER BY created_at
             LIMIT 1
             FOR UPDATE SKIP LOCKED
         )
         RETURNING {COLUMNS}",
    ))
    .bind(now)
    .bind(job_type)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn mark_completed(
    pool: &PgPool,
    id: &str,
    result: serde_json::Value,
    now: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE jobs SET status = $1, result = $2, error = NULL, updated_at = $3 WHERE id = $4",
    )
    .bind(JobStatus::Completed)
    .bind(Json(result))
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub(crate) async fn mark_failed(
    pool: &PgPool,
    id: &str,
    error: &str,
    now: time::PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE jobs SET status = $1, error = $2, updated_at = $3 WHERE id = $4")
        .bind(JobStatus::Failed)
        .bind(error)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
