use sqlx::types::Json;
use sqlx::PgPool;

use crate::db::models::Prova;
use crate::db::types::ProvaStatus;

pub(crate) const COLUMNS: &str = "\
    id, school_id, author_id, internal_title, class_group_id, subject_id, \
    template_id, status, render_opts, created_at, updated_at";

pub(crate) async fn find_by_id(
    pool: &PgPool,
    school_id: &str,
    id: &str,
) -> Result<Option<Prova>, sqlx::Error> {
    sqlx::query_as::<_, Prova>(&format!(
        "SELECT {COLUMNS} FROM provas WHERE school_id = $1 AND id = $2"
    ))
    .bind(school_id)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_by_author(
    pool: &PgPool,
    school_id: &str,
    author_id: &str,
) -> Result<Vec<Prova>, sqlx::Error> {
    sqlx::query_as::<_, Prova>(&format!(
        "SELECT {COLUMNS}
         FROM provas
         WHERE school_id = $1 AND author_id = $2
         ORDER BY updated_at DESC"
    ))
    .bind(school_id)
    .bind(author_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_by_status(
    pool: &PgPool,
    school_id: &str,
    status: ProvaStatus,
) -> Result<Vec<Prova>, sqlx::Error> {
    sqlx::query_as::<_, Prova>(&format!(
        "SELECT {COLUMNS}
         FROM provas
         WHERE school_id = $1 AND status = $2
         ORDER BY updated_at DESC"
    ))
    .bind(school_id)
    .bind(status)
    .fetch_all(pool)
    .await
}

pub(crate) struct CreateProva<'a> {
    pub id: &'a str,
    pub school_id: &'a str,
    pub author_id: &'a str,
    pub internal_title: &'a str,
    pub class_group_id: &'a str,
    pub subject_id: &'a str,
    pub template_id: &'a str,
    pub render_opts: Option<&'a serde_json::Value>,
    pub created_at: time::PrimitiveDateTime,
}

pub(crate) async fn create_with_executor(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateProva<'_>,
) -> Result<Prova, sqlx::Error> {
    sqlx::query_as::<_, Prova>(&format!(
        "INSERT INTO provas (
            id, school_id, author_id, internal_title, class_group_id,
            subject_id, template_id, status, render_opts, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,'draft',$8,$9,$9)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.school_id)
    .bind(params.author_id)
    .bind(params.internal_title)
    .bind(params.class_group_id)
    .bind(params.subject_id)
    .bind(params.template_id)
    .bind(params.render_opts.map(Json))
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

pub(crate) struct UpdateProva<'a> {
    pub internal_title: Option<&'a str>,
    pub render_opts: Option<&'a serde_json::Value>,
    pub updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn update_with_executor(
    executor: impl sqlx::PgExecutor<'_>,
    school_id: &str,
    id: &str,
    params: UpdateProva<'_>,
) -> Result<Option<Prova>, sqlx::Error> {
    sqlx::query_as::<_, Prova>(&format!(
        "UPDATE provas SET
            internal_title = COALESCE($1, internal_title),
            render_opts = COALESCE($2, render_opts),
            updated_at = $3
         WHERE school_id = $4 AND id = $5
         RETURNING {COLUMNS}",
    ))
    .bind(params.internal_title)
    .bind(params.render_opts.map(Json))
    .bind(params.updated_at)
    .bind(school_id)
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn set_status(
    pool: &PgPool,
    school_id: &str,
    id: &str,
    status: ProvaStatus,
    updated_at: time::PrimitiveDateTime,
) -> Result<Option<Prova>, sqlx::Error> {
    sqlx::query_as::<_, Prova>(&format!(
        "UPDATE provas SET status = $1, updated_at = $2
         WHERE school_id = $3 AND id = $4
         RETURNING {COLUMNS}",
    ))
    .bind(status)
    .bind(updated_at)
    .bind(school_id)
    .bind(id)
    .fetch_optional(pool)
    .await
}
