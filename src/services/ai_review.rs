use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

use crate::core::config::Settings;
use crate::db::models::Question;
use crate::db::types::QuestionKind;

const REVIEW_SYSTEM_PROMPT: &str = r#"You are an experienced pedagogical reviewer for school exams.
Analyze the exam draft and score it on three axes from 0 to 100:
- grammar: spelling, agreement and clarity of the statements
- coherence: internal consistency between statements, choices and difficulty
- adherence: how well the questions match the declared subject and class level

Respond with strict JSON:
{
  "summary_scores": {"grammar": <number>, "coherence": <number>, "adherence": <number>},
  "per_question": [
    {"position": <number>, "comment": "short actionable comment"}
  ]
}
"#;

/// One persisted analysis run, ready for the `ai_analyses` row.
#[derive(Debug, Clone)]
pub(crate) struct ReviewOutcome {
    pub(crate) summary_scores: Value,
    pub(crate) per_question: Value,
    pub(crate) usage: Value,
    pub(crate) tokens_in: i32,
    pub(crate) tokens_out: i32,
    pub(crate) cost_cents: i32,
}

/// Fixed scores used when no OpenAI key is configured, so the submission
/// flow stays exercisable in development and tests.
pub(crate) fn stub_outcome(questions: &[Question]) -> ReviewOutcome {
    let per_question: Vec<Value> = questions
        .iter()
        .map(|question| {
            json!({
                "position": question.position,
                "comment": "Automated review unavailable; no issues recorded."
            })
        })
        .collect();

    ReviewOutcome {
        summary_scores: json!({"grammar": 86, "coherence": 90, "adherence": 88}),
        per_question: Value::Array(per_question),
        usage: json!({"stub": true}),
        tokens_in: 0,
        tokens_out: 0,
        cost_cents: 0,
    }
}

#[derive(Debug, Clone)]
pub(crate) struct AiReviewService {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl AiReviewService {
    /// `None` when no API key is configured; callers fall back to
    /// [`stub_outcome`].
    pub(crate) fn from_settings(settings: &Settings) -> Result<Option<Self>> {
        if settings.ai().openai_api_key.is_empty() {
            return Ok(None);
        }

        let timeout = Duration::from_secs(settings.ai().ai_request_timeout);
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Some(Self {
            client,
            api_key: settings.ai().openai_api_key.clone(),
            base_url: settings.ai().openai_base_url.trim_end_matches('/').to_string(),
            model: settings.ai().ai_model.clone(),
            max_tokens: settings.ai().ai_max_tokens,
        }))
    }

    pub(crate) async fn review_prova(
        &self,
        prova_id: &str,
        subject_name: &str,
        class_name: &str,
        questions: &[Question],
    ) -> Result<ReviewOutcome> {
        let timer = Instant::now();
        let user_prompt = build_prompt(subject_name, class_name, questions);

        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": REVIEW_SYSTEM_PROMPT},
                {"role": "user", "content": user_prompt}
            ],
            "max_completion_tokens": self.max_tokens,
            "temperature": 0.2,
            "response_format": {"type": "json_object"}
        });

        tracing::info!(prova_id = %prova_id, "Sending AI review request");

        let url = format!("{}/chat/completions", self.base_url);
        let mut last_error = None;
        let mut body = Value::Null;

        for attempt in 0..=3 {
            let response =
                self.client.post(&url).bearer_auth(&self.api_key).json(&payload).send().await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    body = resp.json().await.unwrap_or(Value::Null);
                    if status.is_success() {
                        last_error = None;
                        break;
                    }
                    last_error = Some(anyhow::anyhow!("OpenAI API error: {body}"));
                }
                Err(err) => {
                    last_error = Some(anyhow::anyhow!(err).context("Failed to call OpenAI API"));
                }
            }

            if attempt < 3 {
                tokio::time::sleep(Duration::from_secs(2_u64.pow(attempt as u32))).await;
            }
        }

        if let Some(err) = last_error {
            return Err(err);
        }

        let content = body
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|value| value.as_str())
            .context("Missing OpenAI response content")?;

        let parsed: Value =
            serde_json::from_str(content).context("Failed to parse AI review JSON")?;

        let summary_scores =
            parsed.get("summary_scores").cloned().unwrap_or_else(|| json!({}));
        let per_question = parsed.get("per_question").cloned().unwrap_or_else(|| json!([]));

        let usage = body.get("usage").cloned().unwrap_or_else(|| json!({}));
        let tokens_in = usage_field(&usage, "prompt_tokens");
        let tokens_out = usage_field(&usage, "completion_tokens");

        tracing::info!(
            prova_id = %prova_id,
            duration_seconds = timer.elapsed().as_secs_f64(),
            tokens_in,
            tokens_out,
            "AI review completed"
        );

        Ok(ReviewOutcome {
            summary_scores,
            per_question,
            usage,
            tokens_in,
            tokens_out,
            cost_cents: 0,
        })
    }
}

fn usage_field(usage: &Value, field: &str) -> i32 {
    usage.get(field).and_then(Value::as_i64).unwrap_or(0) as i32
}

fn build_prompt(subject_name: &str, class_name: &str, questions: &[Question]) -> String {
    let mut prompt = format!(
        "Subject: {subject_name}\nClass: {class_name}\nQuestions ({}):\n",
        questions.len()
    );

    for question in questions {
        prompt.push_str(&format!(
            "\n{}. [{}] {}\n",
            question.position,
            question.kind.as_str(),
            question.statement
        ));
        if question.kind == QuestionKind::Objective {
            if let Some(choices) = &question.choices {
                for (index, choice) in choices.0.iter().enumerate() {
                    prompt.push_str(&format!("   {}) {}\n", (b'a' + index as u8) as char, choice));
                }
            }
        }
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::Json;

    fn question(position: i32, kind: QuestionKind) -> Question {
        Question {
            id: format!("q{position}"),
            prova_id: "prova-1".to_string(),
            position,
            kind,
            statement: format!("Statement {position}"),
            choices: (kind == QuestionKind::Objective)
                .then(|| Json(vec!["First".to_string(), "Second".to_string()])),
            correct_choice_index: None,
            image_references: Json(Vec::new()),
            inline_image_ids: Json(Vec::new()),
        }
    }

    #[test]
    fn stub_outcome_scores_every_axis() {
        let outcome = stub_outcome(&[question(1, QuestionKind::Essay)]);
        for axis in ["grammar", "coherence", "adherence"] {
            assert!(outcome.summary_scores.get(axis).and_then(Value::as_f64).is_some());
        }
        assert_eq!(outcome.per_question.as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn prompt_lists_choices_for_objective_questions() {
        let prompt = build_prompt(
            "Mathematics",
            "9A",
            &[question(1, QuestionKind::Objective), question(2, QuestionKind::Essay)],
        );
        assert!(prompt.contains("1. [objective] Statement 1"));
        assert!(prompt.contains("a) First"));
        assert!(prompt.contains("2. [essay] Statement 2"));
        assert!(!prompt.contains("a) Statement 2"));
    }
}
