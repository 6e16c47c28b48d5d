use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ExamQuestion {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub question_text: String,
    pub question_type: QuestionType,
    pub options: Option<JsonValue>,
    pub correct_answer: String,
    pub explanation: Option<String>,
    pub points: i32,
    pub order_index: i32,
    pub difficulty: Option<String>,
    pub tags: Option<JsonValue>,
}
