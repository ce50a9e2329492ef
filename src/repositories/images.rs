use sqlx::PgPool;

use crate::db::models::ProvaImage;

const COLUMNS: &str = "\
    id, school_id, prova_id, filename, storage_url, storage_key, alt_text, \
    caption, prefer_glossary, reference_code, created_at";

pub(crate) async fn list_by_prova(
    pool: &PgPool,
    school_id: &str,
    prova_id: &str,
) -> Result<Vec<ProvaImage>, sqlx::Error> {
    sqlx::query_as::<_, ProvaImage>(&format!(
        "SELECT {COLUMNS}
         FROM prova_images
         WHERE school_id = $1 AND prova_id = $2
         ORDER BY created_at, id"
    ))
    .bind(school_id)
    .bind(prova_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_by_prova_with_executor(
    executor: impl sqlx::PgExecutor<'_>,
    school_id: &str,
    prova_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM prova_images WHERE school_id = $1 AND prova_id = $2",
    )
    .bind(school_id)
    .bind(prova_id)
    .fetch_one(executor)
    .await
}

/// Reference codes are sequential per prova: "IMAGE 1", "IMAGE 2", ...
pub(crate) async fn next_reference_code(
    executor: impl sqlx::PgExecutor<'_>,
    school_id: &str,
    prova_id: &str,
) -> Result<String, sqlx::Error> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*)
         FROM prova_images
         WHERE school_id = $1 AND prova_id = $2 AND reference_code IS NOT NULL",
    )
    .bind(school_id)
    .bind(prova_id)
    .fetch_one(executor)
    .await?;

    Ok(format!("IMAGE {}", count + 1))
}

pub(crate) struct CreateProvaImage<'a> {
    pub id: &'a str,
    pub school_id: &'a str,
    pub prova_id: &'a str,
    pub filename: &'a str,
    pub storage_url: &'a str,
    pub storage_key: &'a str,
    pub alt_text: &'a str,
    pub caption: Option<&'a str>,
    pub prefer_glossary: Option<bool>,
    pub reference_code: Option<&'a str>,
    pub created_at: time::PrimitiveDateTime,
}

pub(crate) async fn insert_with_executor(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateProvaImage<'_>,
) -> Result<ProvaImage, sqlx::Error> {
    sqlx::query_as::<_, ProvaImage>(&format!(
        "INSERT INTO prova_images (
            id, school_id, prova_id, filename, storage_url, storage_key,
            alt_text, caption, prefer_glossary, reference_code, created_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.school_id)
    .bind(params.prova_id)
    .bind(params.filename)
    .bind(params.storage_url)
    .bind(params.storage_key)
    .bind(params.alt_text)
    .bind(params.caption)
    .bind(params.prefer_glossary)
    .bind(params.reference_code)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}
