use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::attempt::{AttemptStatus, ExamAttempt};
use crate::models::answer::ExamAnswer;
use crate::models::certificate::Certificate;
use crate::models::enrollment::{Enrollment, EnrollmentStatus};
use crate::models::exam::Exam;
use crate::models::notification::Notification;
use crate::models::premium_request::{PremiumRequest, RequestStatus};
use crate::models::question::ExamQuestion;
use crate::models::user::User;

use super::{
    AttemptCreation, AttemptFinalization, EntitlementGrant, FinalizedAttempt, NewAttempt,
    NewNotification, RecordStore,
};

/// Record store held entirely in process memory. Backs the test suite and
/// local experimentation; the single lock gives it the same atomicity
/// guarantees the Postgres schema enforces with constraints.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    exams: HashMap<Uuid, Exam>,
    questions: Vec<ExamQuestion>,
    enrollments: Vec<Enrollment>,
    attempts: HashMap<Uuid, ExamAttempt>,
    answers: Vec<ExamAnswer>,
    certificates: Vec<Certificate>,
    premium_requests: HashMap<Uuid, PremiumRequest>,
    notifications: Vec<Notification>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory store mutex poisoned")
    }

    pub fn seed_user(&self, user: User) {
        self.lock().users.insert(user.id, user);
    }

    pub fn seed_exam(&self, exam: Exam) {
        self.lock().exams.insert(exam.id, exam);
    }

    pub fn seed_question(&self, question: ExamQuestion) {
        self.lock().questions.push(question);
    }

    pub fn seed_enrollment(&self, enrollment: Enrollment) {
        self.lock().enrollments.push(enrollment);
    }

    pub fn seed_attempt(&self, attempt: ExamAttempt) {
        self.lock().attempts.insert(attempt.id, attempt);
    }

    pub fn seed_premium_request(&self, request: PremiumRequest) {
        self.lock().premium_requests.insert(request.id, request);
    }

    pub fn notifications_for(&self, user_id: Uuid) -> Vec<Notification> {
        self.lock()
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn answers_for_attempt(&self, attempt_id: Uuid) -> Vec<ExamAnswer> {
        self.lock()
            .answers
            .iter()
            .filter(|a| a.attempt_id == attempt_id)
            .cloned()
            .collect()
    }

    pub fn certificates_for_pair(&self, course_id: Uuid, user_id: Uuid) -> Vec<Certificate> {
        self.lock()
            .certificates
            .iter()
            .filter(|c| c.course_id == course_id && c.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn exam_by_id(&self, id: Uuid) -> Result<Option<Exam>> {
        Ok(self.lock().exams.get(&id).cloned())
    }

    async fn questions_for_exam(&self, exam_id: Uuid) -> Result<Vec<ExamQuestion>> {
        let mut questions: Vec<ExamQuestion> = self
            .lock()
            .questions
            .iter()
            .filter(|q| q.exam_id == exam_id)
            .cloned()
            .collect();
        questions.sort_by_key(|q| q.order_index);
        Ok(questions)
    }

    async fn enrollment_for(&self, course_id: Uuid, user_id: Uuid) -> Result<Option<Enrollment>> {
        Ok(self
            .lock()
            .enrollments
            .iter()
            .find(|e| e.course_id == course_id && e.user_id == user_id)
            .cloned())
    }

    async fn attempts_for(&self, exam_id: Uuid, user_id: Uuid) -> Result<Vec<ExamAttempt>> {
        let mut attempts: Vec<ExamAttempt> = self
            .lock()
            .attempts
            .values()
            .filter(|a| a.exam_id == exam_id && a.user_id == user_id)
            .cloned()
            .collect();
        attempts.sort_by_key(|a| a.attempt_number);
        Ok(attempts)
    }

    async fn attempt_by_id(&self, id: Uuid) -> Result<Option<ExamAttempt>> {
        Ok(self.lock().attempts.get(&id).cloned())
    }

    async fn create_attempt(&self, new: NewAttempt) -> Result<AttemptCreation> {
        let mut inner = self.lock();
        if let Some(existing) = inner
            .attempts
            .values()
            .find(|a| {
                a.exam_id == new.exam_id
                    && a.user_id == new.user_id
                    && a.status == AttemptStatus::InProgress
            })
            .cloned()
        {
            return Ok(AttemptCreation::InProgressExists(existing));
        }
        let number_taken = inner.attempts.values().any(|a| {
            a.exam_id == new.exam_id
                && a.user_id == new.user_id
                && a.attempt_number == new.attempt_number
        });
        if number_taken {
            return Err(Error::Conflict(
                "Another attempt was created concurrently. Please retry.".to_string(),
            ));
        }
        let attempt = ExamAttempt {
            id: new.id,
            exam_id: new.exam_id,
            user_id: new.user_id,
            attempt_number: new.attempt_number,
            status: new.status,
            started_at: new.started_at,
            submitted_at: None,
            score: None,
            earned_points: None,
            max_points: new.max_points,
            passed: None,
            time_spent_seconds: None,
            certificate_id: None,
        };
        inner.attempts.insert(attempt.id, attempt.clone());
        Ok(AttemptCreation::Created(attempt))
    }

    async fn finalize_attempt(
        &self,
        finalization: AttemptFinalization,
    ) -> Result<FinalizedAttempt> {
        let mut inner = self.lock();

        {
            let attempt = inner
                .attempts
                .get(&finalization.attempt_id)
                .ok_or_else(|| Error::NotFound("Exam attempt not found".to_string()))?;
            if attempt.status.is_terminal() {
                return Err(Error::Conflict(
                    "Exam attempt has already been submitted".to_string(),
                ));
            }
        }

        for answer in &finalization.answers {
            inner.answers.push(ExamAnswer {
                id: answer.id,
                attempt_id: finalization.attempt_id,
                question_id: answer.question_id,
                answer: answer.answer.clone(),
                is_correct: answer.is_correct,
                points_earned: answer.points_earned,
            });
        }

        let mut certificate = None;
        if let Some(grant) = &finalization.certificate {
            let existing = inner
                .certificates
                .iter()
                .find(|c| c.course_id == grant.course_id && c.user_id == grant.user_id)
                .cloned();
            let issued = match existing {
                Some(cert) => cert,
                None => {
                    let cert = Certificate {
                        id: grant.certificate_id,
                        course_id: grant.course_id,
                        user_id: grant.user_id,
                        score: grant.score,
                        issued_at: grant.issued_at,
                        certificate_url: grant.certificate_url.clone(),
                    };
                    inner.certificates.push(cert.clone());
                    if let Some(enrollment) = inner
                        .enrollments
                        .iter_mut()
                        .find(|e| e.course_id == grant.course_id && e.user_id == grant.user_id)
                    {
                        enrollment.status = EnrollmentStatus::Completed;
                        enrollment.final_score = Some(grant.score);
                        enrollment.updated_at = finalization.submitted_at;
                    }
                    cert
                }
            };
            certificate = Some(issued);
        }

        let attempt = inner
            .attempts
            .get_mut(&finalization.attempt_id)
            .expect("attempt checked above");
        attempt.status = finalization.status;
        attempt.submitted_at = Some(finalization.submitted_at);
        attempt.score = Some(finalization.score);
        attempt.earned_points = Some(finalization.earned_points);
        attempt.passed = Some(finalization.passed);
        attempt.time_spent_seconds = Some(finalization.time_spent_seconds);
        attempt.certificate_id = certificate.as_ref().map(|c| c.id);
        let attempt = attempt.clone();

        Ok(FinalizedAttempt {
            attempt,
            certificate,
        })
    }

    async fn certificate_by_id(&self, id: Uuid) -> Result<Option<Certificate>> {
        Ok(self
            .lock()
            .certificates
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn premium_request_by_id(&self, id: Uuid) -> Result<Option<PremiumRequest>> {
        Ok(self.lock().premium_requests.get(&id).cloned())
    }

    async fn decide_premium_request(
        &self,
        id: Uuid,
        status: RequestStatus,
        decided_at: DateTime<Utc>,
    ) -> Result<PremiumRequest> {
        let mut inner = self.lock();
        let request = inner
            .premium_requests
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound("Premium request not found".to_string()))?;
        request.status = status;
        request.decided_at = Some(decided_at);
        Ok(request.clone())
    }

    async fn grant_entitlement(
        &self,
        user_id: Uuid,
        grant: &EntitlementGrant,
        granted_at: DateTime<Utc>,
    ) -> Result<User> {
        let mut inner = self.lock();
        let user = inner
            .users
            .get_mut(&user_id)
            .ok_or_else(|| Error::NotFound("User not found".to_string()))?;
        match grant {
            EntitlementGrant::IncrementLimits {
                job,
                talent,
                expires_at,
            } => {
                user.job_limit += job;
                user.talent_limit += talent;
                user.premium_expires_at = Some(*expires_at);
            }
            EntitlementGrant::SetPremium {
                job_limit,
                talent_limit,
                expires_at,
            } => {
                user.is_premium = true;
                user.is_verified = true;
                user.job_limit = *job_limit;
                user.talent_limit = *talent_limit;
                user.premium_expires_at = Some(*expires_at);
            }
            EntitlementGrant::ExtendPremium { expires_at } => {
                user.is_premium = true;
                user.is_verified = true;
                user.premium_expires_at = Some(*expires_at);
            }
        }
        user.updated_at = granted_at;
        Ok(user.clone())
    }

    async fn insert_notification(&self, notification: NewNotification) -> Result<Notification> {
        let row = Notification {
            id: notification.id,
            user_id: notification.user_id,
            kind: notification.kind,
            title: notification.title,
            body: notification.body,
            is_read: false,
            created_at: notification.created_at,
        };
        self.lock().notifications.push(row.clone());
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn new_attempt(exam_id: Uuid, user_id: Uuid, number: i32) -> NewAttempt {
        NewAttempt {
            id: Uuid::new_v4(),
            exam_id,
            user_id,
            attempt_number: number,
            status: AttemptStatus::InProgress,
            started_at: Utc::now(),
            max_points: 10,
        }
    }

    fn finalization(attempt_id: Uuid, certificate: Option<super::super::CertificateGrant>) -> AttemptFinalization {
        AttemptFinalization {
            attempt_id,
            status: AttemptStatus::Graded,
            submitted_at: Utc::now(),
            score: Decimal::from(100),
            earned_points: 10,
            passed: true,
            time_spent_seconds: 30,
            answers: vec![],
            certificate,
        }
    }

    fn grant(course_id: Uuid, user_id: Uuid) -> super::super::CertificateGrant {
        let id = Uuid::new_v4();
        super::super::CertificateGrant {
            certificate_id: id,
            course_id,
            user_id,
            score: Decimal::from(100),
            certificate_url: format!("http://localhost/certificates/validate?id=CERT-{}", id),
            issued_at: Utc::now(),
        }
    }

    #[test]
    fn second_start_returns_existing_live_attempt() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            let exam_id = Uuid::new_v4();
            let user_id = Uuid::new_v4();

            let first = store.create_attempt(new_attempt(exam_id, user_id, 1)).await.unwrap();
            let AttemptCreation::Created(created) = first else {
                panic!("expected a fresh attempt");
            };

            let second = store.create_attempt(new_attempt(exam_id, user_id, 2)).await.unwrap();
            match second {
                AttemptCreation::InProgressExists(existing) => {
                    assert_eq!(existing.id, created.id)
                }
                AttemptCreation::Created(_) => panic!("second live attempt must not be created"),
            }
        });
    }

    #[test]
    fn finalize_is_single_shot() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            let exam_id = Uuid::new_v4();
            let user_id = Uuid::new_v4();
            let AttemptCreation::Created(attempt) = store
                .create_attempt(new_attempt(exam_id, user_id, 1))
                .await
                .unwrap()
            else {
                panic!("expected a fresh attempt");
            };

            store.finalize_attempt(finalization(attempt.id, None)).await.unwrap();
            let err = store
                .finalize_attempt(finalization(attempt.id, None))
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Conflict(_)));
        });
    }

    #[test]
    fn certificate_issuance_reuses_existing_row() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            let course_id = Uuid::new_v4();
            let user_id = Uuid::new_v4();
            let exam_a = Uuid::new_v4();
            let exam_b = Uuid::new_v4();

            let AttemptCreation::Created(first) = store
                .create_attempt(new_attempt(exam_a, user_id, 1))
                .await
                .unwrap()
            else {
                panic!("expected a fresh attempt");
            };
            let AttemptCreation::Created(second) = store
                .create_attempt(new_attempt(exam_b, user_id, 1))
                .await
                .unwrap()
            else {
                panic!("expected a fresh attempt");
            };

            let one = store
                .finalize_attempt(finalization(first.id, Some(grant(course_id, user_id))))
                .await
                .unwrap();
            let two = store
                .finalize_attempt(finalization(second.id, Some(grant(course_id, user_id))))
                .await
                .unwrap();

            let issued = store.certificates_for_pair(course_id, user_id);
            assert_eq!(issued.len(), 1);
            assert_eq!(
                one.certificate.unwrap().id,
                two.certificate.unwrap().id
            );
        });
    }
}
