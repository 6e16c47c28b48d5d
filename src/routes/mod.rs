pub mod admin;
pub mod certificate;
pub mod exam;
pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};
use std::time::Duration;

use crate::middleware::{auth, rate_limit};
use crate::AppState;

/// Assembles the HTTP surface. Exam routes require a bearer token and count
/// against a per-user rate budget; certificate validation and health stay
/// open.
pub fn router(state: AppState) -> Router {
    let config = crate::config::get_config();

    let exam_api = Router::new()
        .route("/exam/:exam_id/start", post(exam::start_exam))
        .route("/exam/:exam_id/submit", post(exam::submit_exam))
        .route("/exam/:exam_id", get(exam::get_exam))
        .layer(axum::middleware::from_fn_with_state(
            rate_limit::per_user_state(config.rate_limit_per_minute, Duration::from_secs(60)),
            rate_limit::per_user_middleware,
        ))
        .layer(axum::middleware::from_fn(auth::require_bearer_auth));

    let admin_api = Router::new()
        .route(
            "/admin/premium-requests",
            put(admin::decide_premium_request),
        )
        .layer(axum::middleware::from_fn(auth::require_admin));

    Router::new()
        .route("/health", get(health::health))
        .route(
            "/certificates/validate",
            get(certificate::validate_certificate),
        )
        .merge(exam_api)
        .merge(admin_api)
        .with_state(state)
}
