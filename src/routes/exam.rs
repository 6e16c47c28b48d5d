use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
    Extension,
};
use rust_decimal::prelude::ToPrimitive;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::dto::exam_dto::{ExamResults, StartExamResponse, SubmitExamRequest, SubmitExamResponse};
use crate::error::Error;
use crate::middleware::auth::Claims;
use crate::models::attempt::AttemptStatus;
use crate::services::exam_service::ExamDetail;
use crate::AppState;

fn caller_id(claims: &Claims) -> crate::error::Result<Uuid> {
    claims
        .user_id()
        .ok_or_else(|| Error::Unauthorized("Invalid session subject".to_string()))
}

#[axum::debug_handler]
pub async fn start_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let user_id = caller_id(&claims)?;
    let outcome = state.exam_service.start_attempt(user_id, exam_id).await?;
    let response = StartExamResponse {
        attempt: outcome.attempt,
        questions: outcome.questions,
        time_limit: outcome.time_limit_minutes,
        remaining_time: outcome.remaining_seconds,
        resuming: outcome.resuming,
    };
    Ok(Json(response).into_response())
}

#[axum::debug_handler]
pub async fn submit_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<Uuid>,
    Json(req): Json<SubmitExamRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let user_id = caller_id(&claims)?;
    let outcome = state
        .exam_service
        .submit_attempt(user_id, exam_id, req.attempt_id, &req.answers, req.time_spent)
        .await?;

    let message = if outcome.attempt.status == AttemptStatus::Expired {
        "Time limit exceeded; your answers were still graded."
    } else if outcome.passed {
        "Congratulations, you passed the exam!"
    } else {
        "Exam submitted."
    };

    let results = ExamResults {
        score: outcome.score.to_f64().unwrap_or(0.0),
        total_points: outcome.max_points,
        earned_points: outcome.earned_points,
        passed: outcome.passed,
        passing_score: outcome.passing_score.to_f64().unwrap_or(0.0),
        time_spent: outcome.time_spent_seconds,
        certificate_id: outcome.attempt.certificate_id,
        show_results: outcome.show_results,
        answers: outcome.answers,
    };

    Ok(Json(SubmitExamResponse {
        success: true,
        results,
        message: message.to_string(),
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn get_exam(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let user_id = caller_id(&claims)?;
    let detail = state
        .exam_service
        .exam_detail(user_id, claims.role(), exam_id)
        .await?;
    let body = match detail {
        ExamDetail::Owner { exam, questions } => json!({
            "exam": exam,
            "questions": questions,
        }),
        ExamDetail::Learner {
            exam,
            questions,
            stats,
        } => json!({
            "exam": exam,
            "questions": questions,
            "userStats": stats,
        }),
    };
    Ok(Json(body).into_response())
}
