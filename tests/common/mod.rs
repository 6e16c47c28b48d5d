#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header};
use rust_decimal::Decimal;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use rojgaar_backend::middleware::auth::Claims;
use rojgaar_backend::models::attempt::{AttemptStatus, ExamAttempt};
use rojgaar_backend::models::enrollment::{Enrollment, EnrollmentStatus};
use rojgaar_backend::models::exam::Exam;
use rojgaar_backend::models::premium_request::{PremiumRequest, RequestStatus};
use rojgaar_backend::models::question::{ExamQuestion, QuestionType};
use rojgaar_backend::models::user::User;
use rojgaar_backend::store::MemoryStore;
use rojgaar_backend::utils::time::ManualClock;
use rojgaar_backend::AppState;

pub const JWT_SECRET: &str = "test_secret_key";

pub fn init_config() {
    std::env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
    std::env::set_var("DATABASE_URL", "postgres://localhost/rojgaar_test");
    std::env::set_var("JWT_SECRET", JWT_SECRET);
    std::env::set_var("PUBLIC_URL", "http://localhost:8080");
    std::env::set_var("RATE_LIMIT_PER_MINUTE", "10000");
    let _ = rojgaar_backend::config::init_config();
}

pub struct TestApp {
    pub app: Router,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
}

pub fn test_app() -> TestApp {
    init_config();
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let state = AppState::new(store.clone(), clock.clone());
    let app = rojgaar_backend::routes::router(state);
    TestApp { app, store, clock }
}

pub fn user(role: &str) -> User {
    let id = Uuid::new_v4();
    User {
        id,
        full_name: "Test User".to_string(),
        email: format!("{}@example.com", id),
        role: role.to_string(),
        is_premium: false,
        is_verified: false,
        job_limit: 0,
        talent_limit: 0,
        premium_expires_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn exam(course_id: Uuid, teacher_id: Uuid) -> Exam {
    Exam {
        id: Uuid::new_v4(),
        course_id,
        teacher_id,
        title: "Rust Fundamentals Final".to_string(),
        description: None,
        passing_score: Decimal::from(70),
        time_limit_minutes: 30,
        max_attempts: 3,
        shuffle_questions: false,
        shuffle_options: false,
        show_results: true,
        is_published: true,
        is_active: true,
        available_from: None,
        available_until: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn mcq(exam_id: Uuid, order_index: i32, correct: &str, points: i32) -> ExamQuestion {
    ExamQuestion {
        id: Uuid::new_v4(),
        exam_id,
        question_text: format!("Question {}", order_index),
        question_type: QuestionType::MultipleChoice,
        options: Some(json!(["A", "B", "C", "D"])),
        correct_answer: correct.to_string(),
        explanation: Some("See the course notes.".to_string()),
        points,
        order_index,
        difficulty: None,
        tags: None,
    }
}

pub fn short_answer(exam_id: Uuid, order_index: i32, correct: &str, points: i32) -> ExamQuestion {
    ExamQuestion {
        id: Uuid::new_v4(),
        exam_id,
        question_text: format!("Question {}", order_index),
        question_type: QuestionType::ShortAnswer,
        options: None,
        correct_answer: correct.to_string(),
        explanation: None,
        points,
        order_index,
        difficulty: None,
        tags: None,
    }
}

pub fn enrollment(course_id: Uuid, user_id: Uuid, status: EnrollmentStatus) -> Enrollment {
    Enrollment {
        id: Uuid::new_v4(),
        course_id,
        user_id,
        status,
        final_score: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn graded_attempt(exam_id: Uuid, user_id: Uuid, number: i32, passed: bool) -> ExamAttempt {
    ExamAttempt {
        id: Uuid::new_v4(),
        exam_id,
        user_id,
        attempt_number: number,
        status: AttemptStatus::Graded,
        started_at: Utc::now(),
        submitted_at: Some(Utc::now()),
        score: Some(if passed {
            Decimal::from(100)
        } else {
            Decimal::ZERO
        }),
        earned_points: Some(if passed { 1 } else { 0 }),
        max_points: 1,
        passed: Some(passed),
        time_spent_seconds: Some(60),
        certificate_id: None,
    }
}

pub fn premium_request(user_id: Uuid, plan_type: &str) -> PremiumRequest {
    PremiumRequest {
        id: Uuid::new_v4(),
        user_id,
        plan_type: plan_type.to_string(),
        status: RequestStatus::Pending,
        created_at: Utc::now(),
        decided_at: None,
    }
}

pub fn bearer(user: &User) -> String {
    let claims = Claims {
        sub: user.id.to_string(),
        exp: (Utc::now().timestamp() + 3600) as usize,
        role: Some(user.role.clone()),
    };
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("encode test token")
}

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<JsonValue>,
) -> (StatusCode, JsonValue) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("build request"),
        None => builder.body(Body::empty()).expect("build request"),
    };
    let response = app.clone().oneshot(request).await.expect("send request");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    let json = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null)
    };
    (status, json)
}
