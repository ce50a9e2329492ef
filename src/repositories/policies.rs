use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::SchoolPolicy;
use crate::db::types::ImageMode;

const COLUMNS: &str = "\
    id, school_id, min_adherence, min_coherence, image_mode, created_at, updated_at";

pub(crate) async fn find_by_school(
    pool: &PgPool,
    school_id: &str,
) -> Result<Option<SchoolPolicy>, sqlx::Error> {
    sqlx::query_as::<_, SchoolPolicy>(&format!(
        "SELECT {COLUMNS} FROM school_policies WHERE school_id = $1"
    ))
    .bind(school_id)
    .fetch_optional(pool)
    .await
}

/// Zero-or-one policy per school; writes are full upserts.
pub(crate) async fn upsert(
    pool: &PgPool,
    school_id: &str,
    min_adherence: Option<f64>,
    min_coherence: Option<f64>,
    image_mode: Option<ImageMode>,
    now: time::PrimitiveDateTime,
) -> Result<SchoolPolicy, sqlx::Error> {
    sqlx::query_as::<_, SchoolPolicy>(&format!(
        "INSERT INTO school_policies (
            id, school_id, min_adherence, min_coherence, image_mode, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$6)
        ON CONFLICT (school_id) DO UPDATE SET
            min_adherence = EXCLUDED.min_adherence,
            min_coherence = EXCLUDED.min_coherence,
            image_mode = EXCLUDED.image_mode,
            updated_at = EXCLUDED.updated_at
        RETURNING {COLUMNS}",
    ))
    .bind(Uuid::new_v4().to_string())
    .bind(school_id)
    .bind(min_adherence)
    .bind(min_coherence)
    .bind(image_mode)
    .bind(now)
    .fetch_one(pool)
    .await
}
