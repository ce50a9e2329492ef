use sqlx::PgPool;

use crate::db::models::ClassGroup;

const COLUMNS: &str = "id, school_id, display_name, school_year, shift, created_at";

pub(crate) async fn find_by_id(
    pool: &PgPool,
    school_id: &str,
    id: &str,
) -> Result<Option<ClassGroup>, sqlx::Error> {
    sqlx::query_as::<_, ClassGroup>(&format!(
        "SELECT {COLUMNS} FROM class_groups WHERE school_id = $1 AND id = $2"
    ))
    .bind(school_id)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_by_school(
    pool: &PgPool,
    school_id: &str,
) -> Result<Vec<ClassGroup>, sqlx::Error> {
    sqlx::query_as::<_, ClassGroup>(&format!(
        "SELECT {COLUMNS} FROM class_groups WHERE school_id = $1 ORDER BY school_year, display_name"
    ))
    .bind(school_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn create(
    pool: &PgPool,
    id: &str,
    school_id: &str,
    display_name: &str,
    school_year: i32,
    shift: &str,
    created_at: time::PrimitiveDateTime,
) -> Result<ClassGroup, sqlx::Error> {
    sqlx::query_as::<_, ClassGroup>(&format!(
        "INSERT INTO class_groups (id, school_id, display_name, school_year, shift, created_at)
         VALUES ($1,$2,$3,$4,$5,$6)
         RETURNING {COLUMNS}",
    ))
    .bind(id)
    .bind(school_id)
    .bind(display_name)
    .bind(school_year)
    .bind(shift)
    .bind(created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn delete(pool: &PgPool, school_id: &str, id: &str) -> Result<bool, sqlx::Error> {
    let deleted = sqlx::query("DELETE FROM class_groups WHERE school_id = $1 AND id = $2")
        .bind(school_id)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(deleted.rows_affected() > 0)
}
