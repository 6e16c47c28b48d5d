use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Graded,
    Expired,
}

impl AttemptStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, AttemptStatus::Graded | AttemptStatus::Expired)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptEvent {
    Start,
    /// `expired` is true when the submission arrived past the time limit plus
    /// grace; the attempt is still graded, only its terminal state differs.
    Submit { expired: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal attempt transition from {from:?} on {event:?}")]
pub struct IllegalTransition {
    pub from: Option<AttemptStatus>,
    pub event: AttemptEvent,
}

/// The attempt lifecycle: NONE -> IN_PROGRESS -> {GRADED | EXPIRED}.
/// Terminal states accept no further events; a retake is a new attempt row,
/// not a transition of this one.
pub fn transition(
    current: Option<AttemptStatus>,
    event: AttemptEvent,
) -> Result<AttemptStatus, IllegalTransition> {
    match (current, event) {
        (None, AttemptEvent::Start) => Ok(AttemptStatus::InProgress),
        (Some(AttemptStatus::InProgress), AttemptEvent::Submit { expired: false }) => {
            Ok(AttemptStatus::Graded)
        }
        (Some(AttemptStatus::InProgress), AttemptEvent::Submit { expired: true }) => {
            Ok(AttemptStatus::Expired)
        }
        (from, event) => Err(IllegalTransition { from, event }),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ExamAttempt {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub user_id: Uuid,
    pub attempt_number: i32,
    pub status: AttemptStatus,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub score: Option<Decimal>,
    pub earned_points: Option<i32>,
    pub max_points: i32,
    pub passed: Option<bool>,
    pub time_spent_seconds: Option<i32>,
    pub certificate_id: Option<Uuid>,
}
