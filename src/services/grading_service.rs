use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::question::{ExamQuestion, QuestionType};

#[derive(Debug, Clone)]
pub struct GradedAnswer {
    pub question_id: Uuid,
    pub answer: Option<String>,
    pub is_correct: bool,
    pub points_earned: i32,
}

#[derive(Debug, Clone)]
pub struct GradingOutcome {
    pub earned_points: i32,
    pub max_points: i32,
    pub score: Decimal,
    pub graded: Vec<GradedAnswer>,
}

pub struct GradingService;

impl GradingService {
    /// Grades a full answer map against the exam's questions. Every question
    /// produces a row; anything missing, empty, or non-textual is simply
    /// wrong, never an error. No partial credit.
    pub fn grade(
        questions: &[ExamQuestion],
        answers: &HashMap<Uuid, JsonValue>,
    ) -> GradingOutcome {
        let mut earned_points = 0;
        let mut max_points = 0;
        let mut graded = Vec::with_capacity(questions.len());

        for question in questions {
            max_points += question.points;
            let submitted = answers.get(&question.id).and_then(Self::answer_text);
            let is_correct = Self::is_correct(question, submitted.as_deref());
            let points_earned = if is_correct { question.points } else { 0 };
            earned_points += points_earned;
            graded.push(GradedAnswer {
                question_id: question.id,
                answer: submitted,
                is_correct,
                points_earned,
            });
        }

        GradingOutcome {
            earned_points,
            max_points,
            score: Self::score(earned_points, max_points),
            graded,
        }
    }

    /// Percentage score rounded to two decimals; an exam with no points on
    /// offer scores zero rather than dividing by it.
    pub fn score(earned: i32, max: i32) -> Decimal {
        if max <= 0 {
            return Decimal::ZERO;
        }
        (Decimal::from(earned) * Decimal::from(100) / Decimal::from(max)).round_dp(2)
    }

    /// Coerces a submitted JSON value to comparable text. Arrays and objects
    /// have no textual reading and grade as unanswered.
    pub fn answer_text(value: &JsonValue) -> Option<String> {
        match value {
            JsonValue::String(s) => Some(s.clone()),
            JsonValue::Number(n) => Some(n.to_string()),
            JsonValue::Bool(b) => Some(b.to_string()),
            JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => None,
        }
    }

    fn is_correct(question: &ExamQuestion, submitted: Option<&str>) -> bool {
        let Some(raw) = submitted else {
            return false;
        };
        let given = normalize(raw);
        if given.is_empty() {
            return false;
        }
        match question.question_type {
            QuestionType::MultipleChoice | QuestionType::TrueFalse => {
                given == normalize(&question.correct_answer)
            }
            QuestionType::ShortAnswer => question
                .correct_answer
                .split('|')
                .any(|variant| normalize(variant) == given),
        }
    }
}

fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn question(question_type: QuestionType, correct: &str, points: i32) -> ExamQuestion {
        ExamQuestion {
            id: Uuid::new_v4(),
            exam_id: Uuid::new_v4(),
            question_text: "q".to_string(),
            question_type,
            options: None,
            correct_answer: correct.to_string(),
            explanation: None,
            points,
            order_index: 0,
            difficulty: None,
            tags: None,
        }
    }

    fn answers(pairs: &[(Uuid, JsonValue)]) -> HashMap<Uuid, JsonValue> {
        pairs.iter().cloned().collect()
    }

    #[test]
    fn mcq_matches_case_insensitively() {
        let q = question(QuestionType::MultipleChoice, "A", 1);
        let outcome = GradingService::grade(
            std::slice::from_ref(&q),
            &answers(&[(q.id, json!("  a "))]),
        );
        assert_eq!(outcome.earned_points, 1);
        assert_eq!(outcome.score, Decimal::from(100));
        assert!(outcome.graded[0].is_correct);
    }

    #[test]
    fn mcq_wrong_option_earns_nothing() {
        let q = question(QuestionType::MultipleChoice, "A", 1);
        let outcome =
            GradingService::grade(std::slice::from_ref(&q), &answers(&[(q.id, json!("B"))]));
        assert_eq!(outcome.earned_points, 0);
        assert_eq!(outcome.score, Decimal::ZERO);
        assert!(!outcome.graded[0].is_correct);
    }

    #[test]
    fn true_false_accepts_any_casing() {
        let q = question(QuestionType::TrueFalse, "true", 2);
        let outcome = GradingService::grade(
            std::slice::from_ref(&q),
            &answers(&[(q.id, json!("TRUE"))]),
        );
        assert_eq!(outcome.earned_points, 2);
    }

    #[test]
    fn true_false_coerces_json_booleans() {
        let q = question(QuestionType::TrueFalse, "true", 1);
        let outcome =
            GradingService::grade(std::slice::from_ref(&q), &answers(&[(q.id, json!(true))]));
        assert!(outcome.graded[0].is_correct);
    }

    #[test]
    fn short_answer_accepts_any_listed_variant() {
        let q = question(QuestionType::ShortAnswer, "Kathmandu|KTM| kathmandu valley ", 3);
        for submitted in ["kathmandu", "ktm", "Kathmandu Valley"] {
            let outcome = GradingService::grade(
                std::slice::from_ref(&q),
                &answers(&[(q.id, json!(submitted))]),
            );
            assert_eq!(outcome.earned_points, 3, "variant {submitted} should pass");
        }
    }

    #[test]
    fn short_answer_rejects_unlisted_text() {
        let q = question(QuestionType::ShortAnswer, "Kathmandu|KTM", 3);
        let outcome = GradingService::grade(
            std::slice::from_ref(&q),
            &answers(&[(q.id, json!("Pokhara"))]),
        );
        assert_eq!(outcome.earned_points, 0);
    }

    #[test]
    fn missing_null_and_malformed_answers_grade_as_wrong() {
        let q1 = question(QuestionType::MultipleChoice, "A", 1);
        let q2 = question(QuestionType::ShortAnswer, "yes", 1);
        let q3 = question(QuestionType::TrueFalse, "false", 1);
        let qs = vec![q1.clone(), q2.clone(), q3.clone()];
        let outcome = GradingService::grade(
            &qs,
            &answers(&[(q2.id, json!(null)), (q3.id, json!(["nested"]))]),
        );
        assert_eq!(outcome.earned_points, 0);
        assert_eq!(outcome.max_points, 3);
        assert!(outcome.graded.iter().all(|g| !g.is_correct));
        assert!(outcome.graded.iter().all(|g| g.points_earned == 0));
    }

    #[test]
    fn whitespace_only_answer_is_wrong() {
        let q = question(QuestionType::ShortAnswer, "yes", 1);
        let outcome =
            GradingService::grade(std::slice::from_ref(&q), &answers(&[(q.id, json!("   "))]));
        assert_eq!(outcome.earned_points, 0);
    }

    #[test]
    fn score_rounds_to_two_decimals() {
        assert_eq!(GradingService::score(1, 3).to_string(), "33.33");
        assert_eq!(GradingService::score(2, 3).to_string(), "66.67");
    }

    #[test]
    fn zero_point_exam_scores_zero() {
        assert_eq!(GradingService::score(0, 0), Decimal::ZERO);
    }

    #[test]
    fn grading_is_deterministic() {
        let q1 = question(QuestionType::MultipleChoice, "C", 2);
        let q2 = question(QuestionType::ShortAnswer, "a|b", 3);
        let qs = vec![q1.clone(), q2.clone()];
        let submitted = answers(&[(q1.id, json!("c")), (q2.id, json!("b"))]);
        let first = GradingService::grade(&qs, &submitted);
        let second = GradingService::grade(&qs, &submitted);
        assert_eq!(first.earned_points, second.earned_points);
        assert_eq!(first.score, second.score);
    }
}
