use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::time::primitive_now_utc;

/// Append one audit trail row. Audit failures are logged and swallowed so
/// they never fail the request that triggered them.
pub(crate) async fn record(
    db: &PgPool,
    school_id: Option<&str>,
    user_id: Option<&str>,
    action: &str,
    entity: &str,
    entity_id: Option<&str>,
    detail: Option<Value>,
) {
    let result = sqlx::query(
        "INSERT INTO audit_log (id, school_id, user_id, action, entity, entity_id, detail, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(school_id)
    .bind(user_id)
    .bind(action)
    .bind(entity)
    .bind(entity_id)
    .bind(detail)
    .bind(primitive_now_utc())
    .execute(db)
    .await;

    if let Err(err) = result {
        tracing::error!(error = %err, action, entity, "Failed to write audit log entry");
    }
}
