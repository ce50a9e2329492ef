use sqlx::PgPool;

use crate::db::models::User;
use crate::db::types::UserRole;

const COLUMNS: &str = "\
    id, school_id, name, email, hashed_password, role, is_active, \
    must_change_password, created_at, updated_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE email = $1"))
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list_by_school(
    pool: &PgPool,
    school_id: &str,
) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "SELECT {COLUMNS} FROM users WHERE school_id = $1 ORDER BY name"
    ))
    .bind(school_id)
    .fetch_all(pool)
    .await
}

pub(crate) struct CreateUser<'a> {
    pub id: &'a str,
    pub school_id: Option<&'a str>,
    pub name: &'a str,
    pub email: &'a str,
    pub hashed_password: String,
    pub role: UserRole,
    pub must_change_password: bool,
    pub created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateUser<'_>) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (
            id, school_id, name, email, hashed_password, role,
            is_active, must_change_password, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,TRUE,$7,$8,$8)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.school_id)
    .bind(params.name)
    .bind(params.email)
    .bind(params.hashed_password)
    .bind(params.role)
    .bind(params.must_change_password)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) struct UpdateUser {
    pub name: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
    pub hashed_password: Option<String>,
    pub updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateUser,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET
            name = COALESCE($1, name),
            role = COALESCE($2, role),
            is_active = COALESCE($3, is_active),
            hashed_password = COALESCE($4, hashed_password),
            must_change_password = CASE WHEN $4 IS NULL THEN must_change_password ELSE TRUE END,
            updated_at = $5
         WHERE id = $6
         RETURNING {COLUMNS}",
    ))
    .bind(params.name)
    .bind(params.role)
    .bind(params.is_active)
    .bind(params.hashed_password)
    .bind(params.updated_at)
    .bind(id)
    .fetch_optional(pool)
    .await
}
