use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

use crate::models::attempt::ExamAttempt;
use crate::models::question::QuestionType;

/// Learner-facing projection of a question. Built without the correct answer
/// or explanation so they cannot leak into a delivery payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDelivery {
    pub id: Uuid,
    pub question_text: String,
    pub question_type: QuestionType,
    pub options: Option<JsonValue>,
    pub points: i32,
    pub difficulty: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartExamResponse {
    pub attempt: ExamAttempt,
    pub questions: Vec<QuestionDelivery>,
    /// Minutes, as configured on the exam.
    pub time_limit: i32,
    /// Seconds left on the running attempt.
    pub remaining_time: i64,
    pub resuming: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitExamRequest {
    pub attempt_id: Uuid,
    #[serde(default)]
    pub answers: HashMap<Uuid, JsonValue>,
    #[validate(range(min = 0))]
    pub time_spent: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerReview {
    pub question_id: Uuid,
    pub question_text: String,
    pub submitted: Option<String>,
    pub correct_answer: String,
    pub explanation: Option<String>,
    pub is_correct: bool,
    pub points_earned: i32,
    pub max_points: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResults {
    pub score: f64,
    pub total_points: i32,
    pub earned_points: i32,
    pub passed: bool,
    pub passing_score: f64,
    pub time_spent: i32,
    pub certificate_id: Option<Uuid>,
    pub show_results: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answers: Option<Vec<AnswerReview>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitExamResponse {
    pub success: bool,
    pub results: ExamResults,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamUserStats {
    pub attempts: i64,
    pub max_attempts: i32,
    pub best_score: Option<f64>,
    pub has_passed: bool,
    pub can_retake: bool,
    pub has_active_attempt: bool,
}
