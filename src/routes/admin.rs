use axum::{
    extract::State,
    response::{IntoResponse, Json, Response},
    Extension,
};
use validator::Validate;

use crate::dto::admin_dto::{DecidePremiumRequest, DecidePremiumResponse};
use crate::middleware::auth::Claims;
use crate::models::premium_request::RequestStatus;
use crate::AppState;

#[axum::debug_handler]
pub async fn decide_premium_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<DecidePremiumRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    tracing::info!(admin = %claims.sub, request_id = %req.id, status = ?req.status, "premium request decision");
    let outcome = state
        .entitlement_service
        .decide(req.id, req.status, req.duration_days)
        .await?;

    let message = match outcome.request.status {
        RequestStatus::Approved => "Premium request approved and plan activated",
        RequestStatus::Rejected => "Premium request rejected",
        RequestStatus::Pending => "Premium request unchanged",
    };

    Ok(Json(DecidePremiumResponse {
        success: true,
        request: outcome.request,
        user: outcome.user,
        message: message.to_string(),
    })
    .into_response())
}
