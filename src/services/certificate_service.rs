use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::models::certificate::Certificate;
use crate::store::RecordStore;

#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub certificate: Option<Certificate>,
}

#[derive(Clone)]
pub struct CertificateService {
    store: Arc<dyn RecordStore>,
}

impl CertificateService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Looks up a certificate by its public id. Unknown or unparseable ids
    /// come back as invalid rather than an error.
    pub async fn validate(&self, raw_id: &str) -> Result<ValidationOutcome> {
        let Some(id) = normalize_certificate_id(raw_id) else {
            return Ok(ValidationOutcome {
                valid: false,
                certificate: None,
            });
        };
        let certificate = self.store.certificate_by_id(id).await?;
        Ok(ValidationOutcome {
            valid: certificate.is_some(),
            certificate,
        })
    }
}

/// Strips the `CERT-` display prefix (any casing) and parses the remainder.
pub fn normalize_certificate_id(raw: &str) -> Option<Uuid> {
    let trimmed = raw.trim();
    let stripped = match trimmed.get(..5) {
        Some(prefix) if prefix.eq_ignore_ascii_case("CERT-") => &trimmed[5..],
        _ => trimmed,
    };
    Uuid::parse_str(stripped).ok()
}
