use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::premium_request::{PremiumRequest, RequestStatus};
use crate::models::user::User;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DecidePremiumRequest {
    pub id: Uuid,
    pub status: RequestStatus,
    #[validate(range(min = 1, max = 3650))]
    pub duration_days: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecidePremiumResponse {
    pub success: bool,
    pub request: PremiumRequest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    pub message: String,
}
