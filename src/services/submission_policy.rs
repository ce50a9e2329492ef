//! Submission gate for provas.
//!
//! Decides whether a prova may move from draft (or changes-requested) to
//! submitted. Pure and deterministic: the caller fetches one consistent
//! snapshot of the prova's questions, images, template rules, school policy
//! and latest AI analysis, and the engine returns either acceptance or the
//! first blocking rejection. The status mutation itself stays with the
//! caller.

use std::collections::HashSet;

use serde_json::{json, Value};

use crate::db::models::{AiAnalysis, ProvaImage, Question, SchoolPolicy};
use crate::db::types::{ImageMode, QuestionKind};
use crate::services::rules::RuleSchema;

/// A single blocking reason. Every variant is user-correctable by editing
/// the prova, the template or the school policy; none is a system fault.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SubmissionRejection {
    ObjectiveMissingAnswer,
    KindNotAllowed,
    OrderInvalid,
    InlineForbidden,
    ImageMissingReference,
    PolicyGlossaryRequired,
    AnalysisRequired,
    AdherenceBelowThreshold { min: f64, value: f64 },
    CoherenceBelowThreshold { min: f64, value: f64 },
}

impl SubmissionRejection {
    pub(crate) fn code(&self) -> &'static str {
        match self {
            Self::ObjectiveMissingAnswer => "OBJECTIVE_MISSING_ANSWER",
            Self::KindNotAllowed => "KIND_NOT_ALLOWED",
            Self::OrderInvalid => "ORDER_INVALID",
            Self::InlineForbidden => "INLINE_FORBIDDEN",
            Self::ImageMissingReference => "IMAGE_MISSING_REFERENCE",
            Self::PolicyGlossaryRequired => "POLICY_GLOSSARY_REQUIRED",
            Self::AnalysisRequired => "ANALYSIS_REQUIRED",
            Self::AdherenceBelowThreshold { .. } => "ADHERENCE_BELOW_THRESHOLD",
            Self::CoherenceBelowThreshold { .. } => "COHERENCE_BELOW_THRESHOLD",
        }
    }

    /// Wire shape for the HTTP 400 response: `{"error": <code>, ...detail}`.
    pub(crate) fn body(&self) -> Value {
        match self {
            Self::AdherenceBelowThreshold { min, value }
            | Self::CoherenceBelowThreshold { min, value } => {
                json!({ "error": self.code(), "min": min, "value": value })
            }
            _ => json!({ "error": self.code() }),
        }
    }
}

/// Everything the gate looks at, fetched by the caller from one consistent
/// read. `questions` need not be pre-sorted; the ordering check sorts by
/// `position` itself.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SubmissionSnapshot<'a> {
    pub(crate) questions: &'a [Question],
    pub(crate) images: &'a [ProvaImage],
    pub(crate) rules: &'a RuleSchema,
    pub(crate) policy: Option<&'a SchoolPolicy>,
    pub(crate) latest_analysis: Option<&'a AiAnalysis>,
}

/// First blocking failure wins; the check order is part of the contract
/// because each failure maps to a distinct externally-visible error code.
pub(crate) fn validate_submission(
    snapshot: &SubmissionSnapshot<'_>,
) -> Result<(), SubmissionRejection> {
    check_objective_answers(snapshot.questions)?;
    check_allowed_kinds(snapshot.questions, snapshot.rules)?;
    check_section_order(snapshot.questions, snapshot.rules)?;
    check_glossary(snapshot.questions, snapshot.images, snapshot.rules)?;
    check_policy_image_mode(snapshot.questions, snapshot.policy)?;
    check_quality_thresholds(snapshot.policy, snapshot.latest_analysis)?;
    Ok(())
}

fn check_objective_answers(questions: &[Question]) -> Result<(), SubmissionRejection> {
    let incomplete = questions.iter().any(|question| {
        question.kind == QuestionKind::Objective && question.correct_choice_index.is_none()
    });

    if incomplete {
        Err(SubmissionRejection::ObjectiveMissingAnswer)
    } else {
        Ok(())
    }
}

fn check_allowed_kinds(
    questions: &[Question],
    rules: &RuleSchema,
) -> Result<(), SubmissionRejection> {
    if questions.iter().any(|question| !rules.permits_kind(question.kind)) {
        Err(SubmissionRejection::KindNotAllowed)
    } else {
        Ok(())
    }
}

fn check_section_order(
    questions: &[Question],
    rules: &RuleSchema,
) -> Result<(), SubmissionRejection> {
    if !rules.enforces_objective_first() {
        return Ok(());
    }

    let mut ordered: Vec<&Question> = questions.iter().collect();
    ordered.sort_by_key(|question| question.position);

    let mut seen_essay = false;
    for question in ordered {
        if question.kind == QuestionKind::Essay {
            seen_essay = true;
        }
        if question.kind == QuestionKind::Objective && seen_essay {
            return Err(SubmissionRejection::OrderInvalid);
        }
    }

    Ok(())
}

fn check_glossary(
    questions: &[Question],
    images: &[ProvaImage],
    rules: &RuleSchema,
) -> Result<(), SubmissionRejection> {
    if !rules.glossary_required {
        return Ok(());
    }

    if questions.iter().any(|question| !question.inline_image_ids.0.is_empty()) {
        return Err(SubmissionRejection::InlineForbidden);
    }

    let cited: HashSet<&str> = questions
        .iter()
        .flat_map(|question| question.image_references.0.iter())
        .map(String::as_str)
        .collect();

    let unreferenced = images.iter().any(|image| {
        image
            .reference_code
            .as_deref()
            .map(|code| !cited.contains(code))
            .unwrap_or(true)
    });

    if unreferenced {
        Err(SubmissionRejection::ImageMissingReference)
    } else {
        Ok(())
    }
}

fn check_policy_image_mode(
    questions: &[Question],
    policy: Option<&SchoolPolicy>,
) -> Result<(), SubmissionRejection> {
    let glossary_mode =
        policy.and_then(|policy| policy.image_mode) == Some(ImageMode::Glossary);
    if !glossary_mode {
        return Ok(());
    }

    // Coarser than the template glossary check on purpose: the school-wide
    // mode only bans inline images, it does not demand citation.
    if questions.iter().any(|question| !question.inline_image_ids.0.is_empty()) {
        Err(SubmissionRejection::PolicyGlossaryRequired)
    } else {
        Ok(())
    }
}

fn check_quality_thresholds(
    policy: Option<&SchoolPolicy>,
    latest_analysis: Option<&AiAnalysis>,
) -> Result<(), SubmissionRejection> {
    let Some(policy) = policy else {
        return Ok(());
    };

    if policy.min_adherence.is_none() && policy.min_coherence.is_none() {
        return Ok(());
    }

    let Some(analysis) = latest_analysis else {
        return Err(SubmissionRejection::AnalysisRequired);
    };

    let adherence = score(&analysis.summary_scores.0, "adherence");
    let coherence = score(&analysis.summary_scores.0, "coherence");

    if let Some(min) = policy.min_adherence {
        if adherence < min {
            return Err(SubmissionRejection::AdherenceBelowThreshold { min, value: adherence });
        }
    }

    if let Some(min) = policy.min_coherence {
        if coherence < min {
            return Err(SubmissionRejection::CoherenceBelowThreshold { min, value: coherence });
        }
    }

    Ok(())
}

// A score the analyzer did not produce does not block submission.
fn score(scores: &Value, field: &str) -> f64 {
    scores.get(field).and_then(Value::as_f64).unwrap_or(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sqlx::types::Json;

    use crate::core::time::primitive_now_utc;

    fn objective(position: i32, correct: Option<i32>) -> Question {
        Question {
            id: format!("q{position}"),
            prova_id: "prova-1".to_string(),
            position,
            kind: QuestionKind::Objective,
            statement: format!("Objective question {position}"),
            choices: Some(Json(vec![
                "A".to_string(),
                "B".to_string(),
                "C".to_string(),
                "D".to_string(),
            ])),
            correct_choice_index: correct,
            image_references: Json(Vec::new()),
            inline_image_ids: Json(Vec::new()),
        }
    }

    fn essay(position: i32) -> Question {
        Question {
            id: format!("q{position}"),
            prova_id: "prova-1".to_string(),
            position,
            kind: QuestionKind::Essay,
            statement: format!("Essay question {position}"),
            choices: None,
            correct_choice_index: None,
            image_references: Json(Vec::new()),
            inline_image_ids: Json(Vec::new()),
        }
    }

    fn image(reference_code: Option<&str>) -> ProvaImage {
        ProvaImage {
            id: "img-1".to_string(),
            school_id: "school-1".to_string(),
            prova_id: "prova-1".to_string(),
            filename: "diagram.png".to_string(),
            storage_url: "https://storage.local/diagram.png".to_string(),
            storage_key: "school-1/prova-1/diagram.png".to_string(),
            alt_text: "A labelled diagram".to_string(),
            caption: None,
            prefer_glossary: None,
            reference_code: reference_code.map(str::to_string),
            created_at: primitive_now_utc(),
        }
    }

    fn analysis(scores: Value) -> AiAnalysis {
        AiAnalysis {
            id: "analysis-1".to_string(),
            prova_id: "prova-1".to_string(),
            summary_scores: Json(scores),
            per_question: Json(json!([])),
            usage: Json(json!({})),
            tokens_in: 0,
            tokens_out: 0,
            cost_cents: 0,
            created_at: primitive_now_utc(),
        }
    }

    fn policy(
        min_adherence: Option<f64>,
        min_coherence: Option<f64>,
        image_mode: Option<ImageMode>,
    ) -> SchoolPolicy {
        SchoolPolicy {
            id: "policy-1".to_string(),
            school_id: "school-1".to_string(),
            min_adherence,
            min_coherence,
            image_mode,
            created_at: primitive_now_utc(),
            updated_at: primitive_now_utc(),
        }
    }

    fn unrestricted() -> RuleSchema {
        RuleSchema::parse(&json!({})).expect("schema")
    }

    fn validate(
        questions: &[Question],
        images: &[ProvaImage],
        rules: &RuleSchema,
        policy: Option<&SchoolPolicy>,
        latest_analysis: Option<&AiAnalysis>,
    ) -> Result<(), SubmissionRejection> {
        validate_submission(&SubmissionSnapshot {
            questions,
            images,
            rules,
            policy,
            latest_analysis,
        })
    }

    #[test]
    fn clean_prova_is_accepted() {
        let questions = vec![objective(1, Some(0)), essay(2)];
        assert_eq!(validate(&questions, &[], &unrestricted(), None, None), Ok(()));
    }

    #[test]
    fn empty_question_list_is_accepted() {
        assert_eq!(validate(&[], &[], &unrestricted(), None, None), Ok(()));
    }

    #[test]
    fn objective_without_answer_is_rejected() {
        let questions = vec![objective(1, None)];
        assert_eq!(
            validate(&questions, &[], &unrestricted(), None, None),
            Err(SubmissionRejection::ObjectiveMissingAnswer)
        );
    }

    #[test]
    fn essay_never_needs_an_answer_index() {
        let questions = vec![essay(1), essay(2)];
        assert_eq!(validate(&questions, &[], &unrestricted(), None, None), Ok(()));
    }

    #[test]
    fn disallowed_kind_is_rejected() {
        let rules = RuleSchema::parse(&json!({"allowed_kinds": ["objective"]})).unwrap();
        let questions = vec![objective(1, Some(0)), essay(2)];
        assert_eq!(
            validate(&questions, &[], &rules, None, None),
            Err(SubmissionRejection::KindNotAllowed)
        );
    }

    #[test]
    fn objective_then_essay_passes_section_order() {
        let rules = RuleSchema::parse(&json!({"sections": ["objective", "essay"]})).unwrap();
        let questions = vec![objective(1, Some(0)), essay(2)];
        assert_eq!(validate(&questions, &[], &rules, None, None), Ok(()));
    }

    #[test]
    fn essay_before_objective_fails_section_order() {
        let rules = RuleSchema::parse(&json!({"sections": ["objective", "essay"]})).unwrap();
        let questions = vec![essay(1), objective(2, Some(0))];
        assert_eq!(
            validate(&questions, &[], &rules, None, None),
            Err(SubmissionRejection::OrderInvalid)
        );
    }

    #[test]
    fn interleaved_groups_fail_section_order() {
        let rules = RuleSchema::parse(&json!({"sections": ["objective", "essay"]})).unwrap();
        let questions = vec![objective(1, Some(0)), essay(2), essay(3), objective(4, Some(1))];
        assert_eq!(
            validate(&questions, &[], &rules, None, None),
            Err(SubmissionRejection::OrderInvalid)
        );
    }

    #[test]
    fn section_order_scans_by_position_not_input_order() {
        let rules = RuleSchema::parse(&json!({"sections": ["objective", "essay"]})).unwrap();
        // Input arrives out of order; by position the prova is valid.
        let questions = vec![essay(2), objective(1, Some(0))];
        assert_eq!(validate(&questions, &[], &rules, None, None), Ok(()));
    }

    #[test]
    fn other_section_layouts_are_not_enforced() {
        let rules = RuleSchema::parse(&json!({"sections": ["essay", "objective"]})).unwrap();
        let questions = vec![essay(1), objective(2, Some(0))];
        assert_eq!(validate(&questions, &[], &rules, None, None), Ok(()));
    }

    #[test]
    fn glossary_forbids_inline_images() {
        let rules = RuleSchema::parse(&json!({"glossary_required": true})).unwrap();
        let mut question = objective(1, Some(0));
        question.inline_image_ids = Json(vec!["img-9".to_string()]);
        assert_eq!(
            validate(&[question], &[], &rules, None, None),
            Err(SubmissionRejection::InlineForbidden)
        );
    }

    #[test]
    fn glossary_accepts_cited_reference() {
        let rules = RuleSchema::parse(&json!({"glossary_required": true})).unwrap();
        let mut question = objective(1, Some(0));
        question.image_references = Json(vec!["IMAGE 1".to_string()]);
        let images = vec![image(Some("IMAGE 1"))];
        assert_eq!(validate(&[question], &images, &rules, None, None), Ok(()));
    }

    #[test]
    fn glossary_rejects_image_without_reference_code() {
        let rules = RuleSchema::parse(&json!({"glossary_required": true})).unwrap();
        let mut question = objective(1, Some(0));
        question.image_references = Json(vec!["IMAGE 1".to_string()]);
        let images = vec![image(None)];
        assert_eq!(
            validate(&[question], &images, &rules, None, None),
            Err(SubmissionRejection::ImageMissingReference)
        );
    }

    #[test]
    fn glossary_rejects_uncited_image() {
        let rules = RuleSchema::parse(&json!({"glossary_required": true})).unwrap();
        let question = objective(1, Some(0));
        let images = vec![image(Some("IMAGE 1"))];
        assert_eq!(
            validate(&[question], &images, &rules, None, None),
            Err(SubmissionRejection::ImageMissingReference)
        );
    }

    #[test]
    fn policy_glossary_mode_fires_independently_of_template() {
        // Template does not require a glossary, policy does; no reference
        // codes anywhere, one inline image.
        let rules = RuleSchema::parse(&json!({"glossary_required": false})).unwrap();
        let mut question = objective(1, Some(0));
        question.inline_image_ids = Json(vec!["img-3".to_string()]);
        let policy = policy(None, None, Some(ImageMode::Glossary));
        assert_eq!(
            validate(&[question], &[], &rules, Some(&policy), None),
            Err(SubmissionRejection::PolicyGlossaryRequired)
        );
    }

    #[test]
    fn policy_glossary_mode_does_not_demand_citation() {
        let rules = unrestricted();
        let question = objective(1, Some(0));
        // Image without a reference code is fine for the policy check.
        let images = vec![image(None)];
        let policy = policy(None, None, Some(ImageMode::Glossary));
        assert_eq!(validate(&[question], &images, &rules, Some(&policy), None), Ok(()));
    }

    #[test]
    fn inline_and_auto_modes_do_not_restrict() {
        let mut question = objective(1, Some(0));
        question.inline_image_ids = Json(vec!["img-3".to_string()]);
        for mode in [Some(ImageMode::Inline), Some(ImageMode::Auto), None] {
            let policy = policy(None, None, mode);
            assert_eq!(
                validate(
                    std::slice::from_ref(&question),
                    &[],
                    &unrestricted(),
                    Some(&policy),
                    None
                ),
                Ok(())
            );
        }
    }

    #[test]
    fn thresholds_require_an_analysis() {
        let questions = vec![essay(1)];
        let policy = policy(None, Some(70.0), None);
        assert_eq!(
            validate(&questions, &[], &unrestricted(), Some(&policy), None),
            Err(SubmissionRejection::AnalysisRequired)
        );
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        let questions = vec![essay(1)];
        let policy = policy(Some(80.0), None, None);

        let passing = analysis(json!({"adherence": 80, "coherence": 95}));
        assert_eq!(
            validate(&questions, &[], &unrestricted(), Some(&policy), Some(&passing)),
            Ok(())
        );

        let failing = analysis(json!({"adherence": 79, "coherence": 95}));
        assert_eq!(
            validate(&questions, &[], &unrestricted(), Some(&policy), Some(&failing)),
            Err(SubmissionRejection::AdherenceBelowThreshold { min: 80.0, value: 79.0 })
        );
    }

    #[test]
    fn adherence_is_checked_before_coherence() {
        let questions = vec![essay(1)];
        let policy = policy(Some(80.0), Some(80.0), None);
        let failing_both = analysis(json!({"adherence": 10, "coherence": 10}));
        assert_eq!(
            validate(&questions, &[], &unrestricted(), Some(&policy), Some(&failing_both)),
            Err(SubmissionRejection::AdherenceBelowThreshold { min: 80.0, value: 10.0 })
        );
    }

    #[test]
    fn coherence_threshold_is_independently_reachable() {
        let questions = vec![essay(1)];
        let policy = policy(Some(80.0), Some(80.0), None);
        let result = analysis(json!({"adherence": 90, "coherence": 60}));
        assert_eq!(
            validate(&questions, &[], &unrestricted(), Some(&policy), Some(&result)),
            Err(SubmissionRejection::CoherenceBelowThreshold { min: 80.0, value: 60.0 })
        );
    }

    #[test]
    fn missing_score_fields_default_to_passing() {
        let questions = vec![essay(1)];
        let policy = policy(Some(80.0), Some(80.0), None);
        let empty_scores = analysis(json!({}));
        assert_eq!(
            validate(&questions, &[], &unrestricted(), Some(&policy), Some(&empty_scores)),
            Ok(())
        );
    }

    #[test]
    fn policy_without_thresholds_skips_analysis_requirement() {
        let questions = vec![essay(1)];
        let policy = policy(None, None, Some(ImageMode::Inline));
        assert_eq!(validate(&questions, &[], &unrestricted(), Some(&policy), None), Ok(()));
    }

    #[test]
    fn first_failure_wins_over_later_checks() {
        // Violates the completeness check and the section order at once;
        // the completeness code must be reported.
        let rules = RuleSchema::parse(&json!({"sections": ["objective", "essay"]})).unwrap();
        let questions = vec![essay(1), objective(2, None)];
        assert_eq!(
            validate(&questions, &[], &rules, None, None),
            Err(SubmissionRejection::ObjectiveMissingAnswer)
        );
    }

    #[test]
    fn fixing_the_first_failure_surfaces_the_next_one() {
        let rules = RuleSchema::parse(&json!({"sections": ["objective", "essay"]})).unwrap();
        let questions = vec![essay(1), objective(2, Some(0))];
        assert_eq!(
            validate(&questions, &[], &rules, None, None),
            Err(SubmissionRejection::OrderInvalid)
        );
    }

    #[test]
    fn template_glossary_is_checked_before_policy_mode() {
        let rules = RuleSchema::parse(&json!({"glossary_required": true})).unwrap();
        let mut question = objective(1, Some(0));
        question.inline_image_ids = Json(vec!["img-1".to_string()]);
        let policy = policy(None, None, Some(ImageMode::Glossary));
        assert_eq!(
            validate(&[question], &[], &rules, Some(&policy), None),
            Err(SubmissionRejection::InlineForbidden)
        );
    }

    #[test]
    fn validation_is_idempotent_over_an_unchanged_snapshot() {
        let rules = RuleSchema::parse(&json!({"sections": ["objective", "essay"]})).unwrap();
        let questions = vec![essay(1), objective(2, Some(0))];
        let policy = policy(Some(80.0), None, None);
        let result = analysis(json!({"adherence": 50}));

        let first = validate(&questions, &[], &rules, Some(&policy), Some(&result));
        let second = validate(&questions, &[], &rules, Some(&policy), Some(&result));
        assert_eq!(first, second);
    }

    #[test]
    fn threshold_rejection_body_carries_min_and_value() {
        let rejection = SubmissionRejection::AdherenceBelowThreshold { min: 80.0, value: 79.0 };
        assert_eq!(
            rejection.body(),
            json!({"error": "ADHERENCE_BELOW_THRESHOLD", "min": 80.0, "value": 79.0})
        );

        let plain = SubmissionRejection::OrderInvalid;
        assert_eq!(plain.body(), json!({"error": "ORDER_INVALID"}));
    }
}
