use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub id: Uuid,
    pub course_id: Uuid,
    pub user_id: Uuid,
    pub score: Decimal,
    pub issued_at: DateTime<Utc>,
    pub certificate_url: String,
}
