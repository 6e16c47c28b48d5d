use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::premium_request::{PremiumRequest, RequestStatus};
use crate::models::user::User;
use crate::services::notification_service::NotificationService;
use crate::store::{EntitlementGrant, RecordStore};
use crate::utils::time::Clock;

/// Limits granted by the time-boxed premium plans.
pub const PREMIUM_LIMIT: i32 = 1000;
/// Uploads added per approval of the pay-per-upload plan.
pub const UPLOAD_PACK_SIZE: i32 = 15;
/// Fallback duration for plan types without a fixed one.
pub const DEFAULT_PLAN_DAYS: i64 = 30;

/// Maps an approved plan type to the mutations it applies. A plain lookup
/// table: each application stands alone, and approving the same
/// increment-type plan twice adds twice.
pub fn plan_grant(
    plan_type: &str,
    duration_days: Option<i64>,
    now: DateTime<Utc>,
) -> EntitlementGrant {
    match plan_type {
        "15_UPLOADS" => EntitlementGrant::IncrementLimits {
            job: UPLOAD_PACK_SIZE,
            talent: UPLOAD_PACK_SIZE,
            expires_at: now + Duration::days(30),
        },
        "7_DAYS" => premium(now, 7),
        "30_DAYS" => premium(now, 30),
        "75_DAYS" => premium(now, 75),
        "6_MONTHS" => premium(now, 180),
        _ => EntitlementGrant::ExtendPremium {
            expires_at: now + Duration::days(duration_days.unwrap_or(DEFAULT_PLAN_DAYS)),
        },
    }
}

fn premium(now: DateTime<Utc>, days: i64) -> EntitlementGrant {
    EntitlementGrant::SetPremium {
        job_limit: PREMIUM_LIMIT,
        talent_limit: PREMIUM_LIMIT,
        expires_at: now + Duration::days(days),
    }
}

#[derive(Debug, Clone)]
pub struct DecisionOutcome {
    pub request: PremiumRequest,
    pub user: Option<User>,
}

#[derive(Clone)]
pub struct EntitlementService {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    notifications: NotificationService,
}

impl EntitlementService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        clock: Arc<dyn Clock>,
        notifications: NotificationService,
    ) -> Self {
        Self {
            store,
            clock,
            notifications,
        }
    }

    /// Applies an admin decision to a premium request. Approval activates the
    /// plan table and tells the user; rejection only tells the user.
    pub async fn decide(
        &self,
        request_id: Uuid,
        status: RequestStatus,
        duration_days: Option<i64>,
    ) -> Result<DecisionOutcome> {
        if status == RequestStatus::Pending {
            return Err(Error::BadRequest(
                "status must be APPROVED or REJECTED".to_string(),
            ));
        }

        self.store
            .premium_request_by_id(request_id)
            .await?
            .ok_or_else(|| Error::NotFound("Premium request not found".to_string()))?;

        let now = self.clock.now();
        let request = self
            .store
            .decide_premium_request(request_id, status, now)
            .await?;

        match status {
            RequestStatus::Approved => {
                let grant = plan_grant(&request.plan_type, duration_days, now);
                let user = self
                    .store
                    .grant_entitlement(request.user_id, &grant, now)
                    .await?;
                tracing::info!(
                    user_id = %request.user_id,
                    plan_type = %request.plan_type,
                    "premium plan activated"
                );
                self.notifications
                    .notify(
                        request.user_id,
                        "premium",
                        "Premium request approved",
                        &format!("Your {} plan is now active.", request.plan_type),
                        now,
                    )
                    .await?;
                Ok(DecisionOutcome {
                    request,
                    user: Some(user),
                })
            }
            RequestStatus::Rejected => {
                self.notifications
                    .notify(
                        request.user_id,
                        "premium",
                        "Premium request rejected",
                        &format!("Your {} plan request was not approved.", request.plan_type),
                        now,
                    )
                    .await?;
                Ok(DecisionOutcome {
                    request,
                    user: None,
                })
            }
            RequestStatus::Pending => unreachable!("rejected above"),
        }
    }
}
