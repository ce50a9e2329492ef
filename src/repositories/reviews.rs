use sqlx::PgPool;

use crate::db::models::CoordinationReview;
use crate::db::types::ReviewVerdict;

const COLUMNS: &str = "id, prova_id, coordinator_id, verdict, comment, created_at";

pub(crate) async fn list_by_prova(
    pool: &PgPool,
    prova_id: &str,
) -> Result<Vec<CoordinationReview>, sqlx::Error> {
    sqlx::query_as::<_, CoordinationReview>(&format!(
        "SELECT {COLUMNS}
         FROM coordination_reviews
         WHERE prova_id = $1
         ORDER BY created_at DESC"
    ))
    .bind(prova_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn insert(
    pool: &PgPool,
    id: &str,
    prova_id: &str,
    coordinator_id: &str,
    verdict: ReviewVerdict,
    comment: Option<&str>,
    created_at: time::PrimitiveDateTime,
) -> Result<CoordinationReview, sqlx::Error> {
    sqlx::query_as::<_, CoordinationReview>(&format!(
        "INSERT INTO coordination_reviews (id, prova_id, coordinator_id, verdict, comment, created_at)
         VALUES ($1,$2,$3,$4,$5,$6)
         RETURNING {COLUMNS}",
    ))
    .bind(id)
    .bind(prova_id)
    .bind(coordinator_id)
    .bind(verdict)
    .bind(comment)
    .bind(created_at)
    .fetch_one(pool)
    .await
}
