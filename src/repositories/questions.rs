use sqlx::types::Json;
use sqlx::PgPool;

use crate::db::models::Question;
use crate::db::types::QuestionKind;

const COLUMNS: &str = "\
    id, prova_id, position, kind, statement, choices, correct_choice_index, \
    image_references, inline_image_ids";

pub(crate) async fn list_by_prova(
    pool: &PgPool,
    prova_id: &str,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM questions WHERE prova_id = $1 ORDER BY position"
    ))
    .bind(prova_id)
    .fetch_all(pool)
    .await
}

pub(crate) struct NewQuestion {
    pub id: String,
    pub position: i32,
    pub kind: QuestionKind,
    pub statement: String,
    pub choices: Option<Vec<String>>,
    pub correct_choice_index: Option<i32>,
    pub image_references: Vec<String>,
    pub inline_image_ids: Vec<String>,
}

/// Updates replace the question list wholesale. Runs inside the caller's
/// transaction so a failed insert never leaves the prova half-rewritten.
pub(crate) async fn replace_for_prova(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    prova_id: &str,
    questions: Vec<NewQuestion>,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query("DELETE FROM questions WHERE prova_id = $1")
        .bind(prova_id)
        .execute(&mut **tx)
        .await?;

    let mut inserted = Vec::with_capacity(questions.len());
    for question in questions {
        let row = sqlx::query_as::<_, Question>(&format!(
            "INSERT INTO questions (
                id, prova_id, position, kind, statement, choices,
                correct_choice_index, image_references, inline_image_ids
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
            RETURNING {COLUMNS}",
        ))
        .bind(question.id)
        .bind(prova_id)
        .bind(question.position)
        .bind(question.kind)
        .bind(question.statement)
        .bind(question.choices.map(Json))
        .bind(question.correct_choice_index)
        .bind(Json(question.image_references))
        .bind(Json(question.inline_image_ids))
        .fetch_one(&mut **tx)
        .await?;
        inserted.push(row);
    }

    Ok(inserted)
}
