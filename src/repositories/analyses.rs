use sqlx::types::Json;
use sqlx::PgPool;

use crate::db::models::AiAnalysis;
use crate::services::ai_review::ReviewOutcome;

const COLUMNS: &str = "\
    id, prova_id, summary_scores, per_question, usage, tokens_in, tokens_out, \
    cost_cents, created_at";

/// The submission gate only ever looks at the newest analysis.
pub(crate) async fn latest_for_prova(
    pool: &PgPool,
    prova_id: &str,
) -> Result<Option<AiAnalysis>, sqlx::Error> {
    sqlx::query_as::<_, AiAnalysis>(&format!(
        "SELECT {COLUMNS}
         FROM ai_analyses
         WHERE prova_id = $1
         ORDER BY created_at DESC, id DESC
         LIMIT 1"
    ))
    .bind(prova_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn insert(
    pool: &PgPool,
    id: &str,
    prova_id: &str,
    outcome: ReviewOutcome,
    created_at: time::PrimitiveDateTime,
) -> Result<AiAnalysis, sqlx::Error> {
    sqlx::query_as::<_, AiAnalysis>(&format!(
        "INSERT INTO ai_analyses (
            id, prova_id, summary_scores, per_question, usage,
            tokens_in, tokens_out, cost_cents, created_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
        RETURNING {COLUMNS}",
    ))
    .bind(id)
    .bind(prova_id)
    .bind(Json(outcome.summary_scores))
    .bind(Json(outcome.per_question))
    .bind(Json(outcome.usage))
    .bind(outcome.tokens_in)
    .bind(outcome.tokens_out)
    .bind(outcome.cost_cents)
    .bind(created_at)
    .fetch_one(pool)
    .await
}
