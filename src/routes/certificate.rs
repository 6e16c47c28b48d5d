use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json, Response},
};

use crate::dto::certificate_dto::{ValidateCertificateQuery, ValidateCertificateResponse};
use crate::AppState;

#[axum::debug_handler]
pub async fn validate_certificate(
    State(state): State<AppState>,
    Query(query): Query<ValidateCertificateQuery>,
) -> crate::error::Result<Response> {
    let outcome = state.certificate_service.validate(&query.id).await?;
    Ok(Json(ValidateCertificateResponse {
        valid: outcome.valid,
        certificate: outcome.certificate,
    })
    .into_response())
}
