use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::models::enrollment::EnrollmentStatus;
use crate::store::RecordStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeniedReason {
    NotEnrolled,
    EnrollmentNotApproved,
}

impl DeniedReason {
    pub fn message(self) -> &'static str {
        match self {
            DeniedReason::NotEnrolled => "not enrolled",
            DeniedReason::EnrollmentNotApproved => "enrollment not approved",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: Option<DeniedReason>,
}

impl AccessDecision {
    fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    fn denied(reason: DeniedReason) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
        }
    }
}

/// Course-access gate the exam engine consults before any attempt work.
/// Read-only: an approved enrollment is the only thing that opens the door.
#[derive(Clone)]
pub struct EnrollmentService {
    store: Arc<dyn RecordStore>,
}

impl EnrollmentService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn can_attempt(&self, user_id: Uuid, course_id: Uuid) -> Result<AccessDecision> {
        let decision = match self.store.enrollment_for(course_id, user_id).await? {
            None => AccessDecision::denied(DeniedReason::NotEnrolled),
            Some(enrollment) => match enrollment.status {
                EnrollmentStatus::Approved => AccessDecision::allowed(),
                EnrollmentStatus::Pending
                | EnrollmentStatus::Rejected
                | EnrollmentStatus::Completed => {
                    AccessDecision::denied(DeniedReason::EnrollmentNotApproved)
                }
            },
        };
        Ok(decision)
    }
}
