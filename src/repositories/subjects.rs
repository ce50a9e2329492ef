use sqlx::PgPool;

use crate::db::models::Subject;

const COLUMNS: &str = "id, school_id, name, created_at";

pub(crate) async fn find_by_id(
    pool: &PgPool,
    school_id: &str,
    id: &str,
) -> Result<Option<Subject>, sqlx::Error> {
    sqlx::query_as::<_, Subject>(&format!(
        "SELECT {COLUMNS} FROM subjects WHERE school_id = $1 AND id = $2"
    ))
    .bind(school_id)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_by_school(
    pool: &PgPool,
    school_id: &str,
) -> Result<Vec<Subject>, sqlx::Error> {
    sqlx::query_as::<_, Subject>(&format!(
        "SELECT {COLUMNS} FROM subjects WHERE school_id = $1 ORDER BY name"
    ))
    .bind(school_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn create(
    pool: &PgPool,
    id: &str,
    school_id: &str,
    name: &str,
    created_at: time::PrimitiveDateTime,
) -> Result<Subject, sqlx::Error> {
    sqlx::query_as::<_, Subject>(&format!(
        "INSERT INTO subjects (id, school_id, name, created_at)
         VALUES ($1,$2,$3,$4)
         RETURNING {COLUMNS}",
    ))
    .bind(id)
    .bind(school_id)
    .bind(name)
    .bind(created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn delete(pool: &PgPool, school_id: &str, id: &str) -> Result<bool, sqlx::Error> {
    let deleted = sqlx::query("DELETE FROM subjects WHERE school_id = $1 AND id = $2")
        .bind(school_id)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(deleted.rows_affected() > 0)
}
