use sqlx::PgPool;
use time::Date;

use crate::db::models::School;

const COLUMNS: &str = "\
    id, name, slug, logo_url, address, contact_name, contact_email, \
    contact_phone, contract_start, contract_end, notes, created_at, updated_at";

pub(crate) async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<School>, sqlx::Error> {
    sqlx::query_as::<_, School>(&format!("SELECT {COLUMNS} FROM schools WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list_all(pool: &PgPool) -> Result<Vec<School>, sqlx::Error> {
    sqlx::query_as::<_, School>(&format!("SELECT {COLUMNS} FROM schools ORDER BY name"))
        .fetch_all(pool)
        .await
}

pub(crate) struct CreateSchool<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub slug: Option<&'a str>,
    pub address: Option<&'a str>,
    pub contact_name: Option<&'a str>,
    pub contact_email: Option<&'a str>,
    pub contact_phone: Option<&'a str>,
    pub contract_start: Option<Date>,
    pub contract_end: Option<Date>,
    pub notes: Option<&'a str>,
    pub created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateSchool<'_>) -> Result<School, sqlx::Error> {
    sqlx::query_as::<_, School>(&format!(
        "INSERT INTO schools (
            id, name, slug, address, contact_name, contact_email, contact_phone,
            contract_start, contract_end, notes, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$11)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.name)
    .bind(params.slug)
    .bind(params.address)
    .bind(params.contact_name)
    .bind(params.contact_email)
    .bind(params.contact_phone)
    .bind(params.contract_start)
    .bind(params.contract_end)
    .bind(params.notes)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) struct UpdateSchool {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub logo_url: Option<String>,
    pub address: Option<String>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub notes: Option<String>,
    pub updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn update(
    pool: &PgPool,
    id: &str,
    params: UpdateSchool,
) -> Result<Option<School>, sqlx::Error> {
    sqlx::query_as::<_, School>(&format!(
        "UPDATE schools SET
            name = COALESCE($1, name),
            slug = COALESCE($2, slug),
            logo_url = COALESCE($3, logo_url),
            address = COALESCE($4, address),
            contact_name = COALESCE($5, contact_name),
            contact_email = COALESCE($6, contact_email),
            contact_phone = COALESCE($7, contact_phone),
            notes = COALESCE($8, notes),
            updated_at = $9
         WHERE id = $10
         RETURNING {COLUMNS}",
    ))
    .bind(params.name)
    .bind(params.slug)
    .bind(params.logo_url)
    .bind(params.address)
    .bind(params.contact_name)
    .bind(params.contact_email)
    .bind(params.contact_phone)
    .bind(params.notes)
    .bind(params.updated_at)
    .bind(id)
    .fetch_optional(pool)
    .await
}
