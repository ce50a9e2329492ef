use serde_json::json;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::time::primitive_now_utc;
use crate::db::models::Template;

const COLUMNS: &str = "id, school_id, name, rules, version, is_active, created_at, updated_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Template>, sqlx::Error> {
    sqlx::query_as::<_, Template>(&format!("SELECT {COLUMNS} FROM templates WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Global templates (school_id IS NULL) plus the caller's school-scoped ones.
pub(crate) async fn list_visible(
    pool: &PgPool,
    school_id: Option<&str>,
) -> Result<Vec<Template>, sqlx::Error> {
    sqlx::query_as::<_, Template>(&format!(
        "SELECT {COLUMNS}
         FROM templates
         WHERE is_active AND (school_id IS NULL OR school_id = $1)
         ORDER BY school_id NULLS FIRST, name"
    ))
    .bind(school_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn create(
    pool: &PgPool,
    id: &str,
    school_id: Option<&str>,
    name: &str,
    rules: &serde_json::Value,
    version: &str,
    created_at: time::PrimitiveDateTime,
) -> Result<Template, sqlx::Error> {
    sqlx::query_as::<_, Template>(&format!(
        "INSERT INTO templates (id, school_id, name, rules, version, is_active, created_at, updated_at)
         VALUES ($1,$2,$3,$4,$5,TRUE,$6,$6)
         RETURNING {COLUMNS}",
    ))
    .bind(id)
    .bind(school_id)
    .bind(name)
    .bind(Json(rules))
    .bind(version)
    .bind(created_at)
    .fetch_one(pool)
    .await
}

/// Seed the built-in global templates once. Racing callers are fine: the
/// second insert batch is skipped because the count is re-checked inside
/// the transaction.
pub(crate) async fn seed_defaults(pool: &PgPool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    let existing = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM templates WHERE school_id IS NULL",
    )
    .fetch_one(&mut *tx)
    .await?;

    if existing > 0 {
        return tx.commit().await;
    }

    let defaults = [
        ("Free form", json!({})),
        ("Objective first", json!({"sections": ["objective", "essay"]})),
        (
            "Image glossary",
            json!({"glossary_required": true, "sections": ["objective", "essay"]}),
        ),
    ];

    let now = primitive_now_utc();
    for (name, rules) in defaults {
        sqlx::query(
            "INSERT INTO templates (id, school_id, name, rules, version, is_active, created_at, updated_at)
             VALUES ($1, NULL, $2, $3, '1', TRUE, $4, $4)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(name)
        .bind(Json(rules))
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await
}
