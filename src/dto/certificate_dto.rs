use serde::{Deserialize, Serialize};

use crate::models::certificate::Certificate;

#[derive(Debug, Clone, Deserialize)]
pub struct ValidateCertificateQuery {
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCertificateResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<Certificate>,
}
