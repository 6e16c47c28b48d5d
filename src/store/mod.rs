pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::Result;
use crate::models::attempt::{AttemptStatus, ExamAttempt};
use crate::models::certificate::Certificate;
use crate::models::enrollment::Enrollment;
use crate::models::exam::Exam;
use crate::models::notification::Notification;
use crate::models::premium_request::{PremiumRequest, RequestStatus};
use crate::models::question::ExamQuestion;
use crate::models::user::User;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Clone)]
pub struct NewAttempt {
    pub id: Uuid,
    pub exam_id: Uuid,
    pub user_id: Uuid,
    pub attempt_number: i32,
    pub status: AttemptStatus,
    pub started_at: DateTime<Utc>,
    pub max_points: i32,
}

/// Outcome of `create_attempt`. The store resolves the start/resume race: when
/// a live attempt already exists for the (exam, user) pair, the caller gets it
/// back instead of a second one.
#[derive(Debug, Clone)]
pub enum AttemptCreation {
    Created(ExamAttempt),
    InProgressExists(ExamAttempt),
}

#[derive(Debug, Clone)]
pub struct NewAnswer {
    pub id: Uuid,
    pub question_id: Uuid,
    pub answer: Option<String>,
    pub is_correct: bool,
    pub points_earned: i32,
}

/// Certificate the engine wants issued for a passing grade. The id and URL are
/// chosen up front; when a certificate already exists for the (course, user)
/// pair the stored one wins and this grant is discarded.
#[derive(Debug, Clone)]
pub struct CertificateGrant {
    pub certificate_id: Uuid,
    pub course_id: Uuid,
    pub user_id: Uuid,
    pub score: Decimal,
    pub certificate_url: String,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AttemptFinalization {
    pub attempt_id: Uuid,
    pub status: AttemptStatus,
    pub submitted_at: DateTime<Utc>,
    pub score: Decimal,
    pub earned_points: i32,
    pub passed: bool,
    pub time_spent_seconds: i32,
    pub answers: Vec<NewAnswer>,
    pub certificate: Option<CertificateGrant>,
}

#[derive(Debug, Clone)]
pub struct FinalizedAttempt {
    pub attempt: ExamAttempt,
    pub certificate: Option<Certificate>,
}

/// Mutation set produced by the premium plan table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntitlementGrant {
    /// Adds to the posting limits in place; premium/verified flags untouched.
    IncrementLimits {
        job: i32,
        talent: i32,
        expires_at: DateTime<Utc>,
    },
    /// Premium + verified, limits overwritten.
    SetPremium {
        job_limit: i32,
        talent_limit: i32,
        expires_at: DateTime<Utc>,
    },
    /// Premium + verified, limits left as they are.
    ExtendPremium { expires_at: DateTime<Utc> },
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Persistence seam for the learning core. Implementations own the atomicity
/// guarantees the engines rely on: `create_attempt` collapses concurrent
/// starts onto one live attempt, `finalize_attempt` is all-or-nothing and
/// loses cleanly on double submission, certificate issuance is an upsert on
/// the (course, user) pair, and limit increments happen in place.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>>;

    async fn exam_by_id(&self, id: Uuid) -> Result<Option<Exam>>;

    /// Questions in `order_index` order.
    async fn questions_for_exam(&self, exam_id: Uuid) -> Result<Vec<ExamQuestion>>;

    async fn enrollment_for(&self, course_id: Uuid, user_id: Uuid) -> Result<Option<Enrollment>>;

    /// All attempts for the pair, oldest first.
    async fn attempts_for(&self, exam_id: Uuid, user_id: Uuid) -> Result<Vec<ExamAttempt>>;

    async fn attempt_by_id(&self, id: Uuid) -> Result<Option<ExamAttempt>>;

    async fn create_attempt(&self, new: NewAttempt) -> Result<AttemptCreation>;

    /// Writes the answers, moves the attempt to its terminal state, and (on a
    /// pass) issues the certificate and completes the enrollment, atomically.
    /// Fails with `Conflict` when the attempt is no longer in progress.
    async fn finalize_attempt(&self, finalization: AttemptFinalization)
        -> Result<FinalizedAttempt>;

    async fn certificate_by_id(&self, id: Uuid) -> Result<Option<Certificate>>;

    async fn premium_request_by_id(&self, id: Uuid) -> Result<Option<PremiumRequest>>;

    async fn decide_premium_request(
        &self,
        id: Uuid,
        status: RequestStatus,
        decided_at: DateTime<Utc>,
    ) -> Result<PremiumRequest>;

    async fn grant_entitlement(
        &self,
        user_id: Uuid,
        grant: &EntitlementGrant,
        granted_at: DateTime<Utc>,
    ) -> Result<User>;

    async fn insert_notification(&self, notification: NewNotification) -> Result<Notification>;
}
