use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::attempt::ExamAttempt;
use crate::models::certificate::Certificate;
use crate::models::enrollment::Enrollment;
use crate::models::exam::Exam;
use crate::models::notification::Notification;
use crate::models::premium_request::{PremiumRequest, RequestStatus};
use crate::models::question::ExamQuestion;
use crate::models::user::User;

use super::{
    AttemptCreation, AttemptFinalization, EntitlementGrant, FinalizedAttempt, NewAttempt,
    NewNotification, RecordStore,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn in_progress_attempt(
        &self,
        exam_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ExamAttempt>> {
        let attempt = sqlx::query_as::<_, ExamAttempt>(
            r#"SELECT id, exam_id, user_id, attempt_number, status, started_at, submitted_at,
                      score, earned_points, max_points, passed, time_spent_seconds, certificate_id
               FROM exam_attempts
               WHERE exam_id = $1 AND user_id = $2 AND status = 'in_progress'"#,
        )
        .bind(exam_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attempt)
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn exam_by_id(&self, id: Uuid) -> Result<Option<Exam>> {
        let exam = sqlx::query_as::<_, Exam>(r#"SELECT * FROM exams WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(exam)
    }

    async fn questions_for_exam(&self, exam_id: Uuid) -> Result<Vec<ExamQuestion>> {
        let questions = sqlx::query_as::<_, ExamQuestion>(
            r#"SELECT * FROM exam_questions WHERE exam_id = $1 ORDER BY order_index, id"#,
        )
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(questions)
    }

    async fn enrollment_for(&self, course_id: Uuid, user_id: Uuid) -> Result<Option<Enrollment>> {
        let enrollment = sqlx::query_as::<_, Enrollment>(
            r#"SELECT * FROM enrollments WHERE course_id = $1 AND user_id = $2"#,
        )
        .bind(course_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(enrollment)
    }

    async fn attempts_for(&self, exam_id: Uuid, user_id: Uuid) -> Result<Vec<ExamAttempt>> {
        let attempts = sqlx::query_as::<_, ExamAttempt>(
            r#"SELECT id, exam_id, user_id, attempt_number, status, started_at, submitted_at,
                      score, earned_points, max_points, passed, time_spent_seconds, certificate_id
               FROM exam_attempts
               WHERE exam_id = $1 AND user_id = $2
               ORDER BY attempt_number"#,
        )
        .bind(exam_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(attempts)
    }

    async fn attempt_by_id(&self, id: Uuid) -> Result<Option<ExamAttempt>> {
        let attempt = sqlx::query_as::<_, ExamAttempt>(
            r#"SELECT id, exam_id, user_id, attempt_number, status, started_at, submitted_at,
                      score, earned_points, max_points, passed, time_spent_seconds, certificate_id
               FROM exam_attempts WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attempt)
    }

    async fn create_attempt(&self, new: NewAttempt) -> Result<AttemptCreation> {
        // The partial unique index on (exam_id, user_id) WHERE in_progress
        // arbitrates concurrent starts; the loser falls through to the
        // existing row. A clash on attempt_number (two racing retakes) lands
        // in the error arm and resolves the same way.
        let inserted = sqlx::query_as::<_, ExamAttempt>(
            r#"
            INSERT INTO exam_attempts (id, exam_id, user_id, attempt_number, status, started_at, max_points)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (exam_id, user_id) WHERE status = 'in_progress' DO NOTHING
            RETURNING id, exam_id, user_id, attempt_number, status, started_at, submitted_at,
                      score, earned_points, max_points, passed, time_spent_seconds, certificate_id
            "#,
        )
        .bind(new.id)
        .bind(new.exam_id)
        .bind(new.user_id)
        .bind(new.attempt_number)
        .bind(new.status)
        .bind(new.started_at)
        .bind(new.max_points)
        .fetch_optional(&self.pool)
        .await;

        match inserted {
            Ok(Some(attempt)) => Ok(AttemptCreation::Created(attempt)),
            Ok(None) => match self.in_progress_attempt(new.exam_id, new.user_id).await? {
                Some(existing) => Ok(AttemptCreation::InProgressExists(existing)),
                None => Err(Error::Conflict(
                    "Another attempt was created concurrently. Please retry.".to_string(),
                )),
            },
            Err(err) => {
                let unique = err
                    .as_database_error()
                    .map(|db| db.is_unique_violation())
                    .unwrap_or(false);
                if unique {
                    match self.in_progress_attempt(new.exam_id, new.user_id).await? {
                        Some(existing) => Ok(AttemptCreation::InProgressExists(existing)),
                        None => Err(Error::Conflict(
                            "Another attempt was created concurrently. Please retry.".to_string(),
                        )),
                    }
                } else {
                    Err(err.into())
                }
            }
        }
    }

    async fn finalize_attempt(
        &self,
        finalization: AttemptFinalization,
    ) -> Result<FinalizedAttempt> {
        let mut tx = self.pool.begin().await?;

        // Compare-and-set on the live status; a concurrent submission that
        // got here first wins and this one surfaces as a conflict.
        let updated = sqlx::query_as::<_, ExamAttempt>(
            r#"
            UPDATE exam_attempts
            SET status = $2, submitted_at = $3, score = $4, earned_points = $5,
                passed = $6, time_spent_seconds = $7
            WHERE id = $1 AND status = 'in_progress'
            RETURNING id, exam_id, user_id, attempt_number, status, started_at, submitted_at,
                      score, earned_points, max_points, passed, time_spent_seconds, certificate_id
            "#,
        )
        .bind(finalization.attempt_id)
        .bind(finalization.status)
        .bind(finalization.submitted_at)
        .bind(finalization.score)
        .bind(finalization.earned_points)
        .bind(finalization.passed)
        .bind(finalization.time_spent_seconds)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(mut attempt) = updated else {
            tx.rollback().await?;
            return Err(Error::Conflict(
                "Exam attempt has already been submitted".to_string(),
            ));
        };

        for answer in &finalization.answers {
            sqlx::query(
                r#"
                INSERT INTO exam_answers (id, attempt_id, question_id, answer, is_correct, points_earned)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(answer.id)
            .bind(finalization.attempt_id)
            .bind(answer.question_id)
            .bind(&answer.answer)
            .bind(answer.is_correct)
            .bind(answer.points_earned)
            .execute(&mut *tx)
            .await?;
        }

        let mut certificate = None;
        if let Some(grant) = &finalization.certificate {
            let fresh = sqlx::query_as::<_, Certificate>(
                r#"
                INSERT INTO certificates (id, course_id, user_id, score, issued_at, certificate_url)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (course_id, user_id) DO NOTHING
                RETURNING *
                "#,
            )
            .bind(grant.certificate_id)
            .bind(grant.course_id)
            .bind(grant.user_id)
            .bind(grant.score)
            .bind(grant.issued_at)
            .bind(&grant.certificate_url)
            .fetch_optional(&mut *tx)
            .await?;

            let issued = match fresh {
                Some(cert) => {
                    // First pass for this course: close out the enrollment.
                    sqlx::query(
                        r#"
                        UPDATE enrollments
                        SET status = 'completed', final_score = $3, updated_at = $4
                        WHERE course_id = $1 AND user_id = $2
                        "#,
                    )
                    .bind(grant.course_id)
                    .bind(grant.user_id)
                    .bind(grant.score)
                    .bind(finalization.submitted_at)
                    .execute(&mut *tx)
                    .await?;
                    cert
                }
                None => {
                    sqlx::query_as::<_, Certificate>(
                        r#"SELECT * FROM certificates WHERE course_id = $1 AND user_id = $2"#,
                    )
                    .bind(grant.course_id)
                    .bind(grant.user_id)
                    .fetch_one(&mut *tx)
                    .await?
                }
            };

            sqlx::query(r#"UPDATE exam_attempts SET certificate_id = $2 WHERE id = $1"#)
                .bind(finalization.attempt_id)
                .bind(issued.id)
                .execute(&mut *tx)
                .await?;
            attempt.certificate_id = Some(issued.id);
            certificate = Some(issued);
        }

        tx.commit().await?;

        Ok(FinalizedAttempt {
            attempt,
            certificate,
        })
    }

    async fn certificate_by_id(&self, id: Uuid) -> Result<Option<Certificate>> {
        let certificate =
            sqlx::query_as::<_, Certificate>(r#"SELECT * FROM certificates WHERE id = $1"#)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(certificate)
    }

    async fn premium_request_by_id(&self, id: Uuid) -> Result<Option<PremiumRequest>> {
        let request =
            sqlx::query_as::<_, PremiumRequest>(r#"SELECT * FROM premium_requests WHERE id = $1"#)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(request)
    }

    async fn decide_premium_request(
        &self,
        id: Uuid,
        status: RequestStatus,
        decided_at: DateTime<Utc>,
    ) -> Result<PremiumRequest> {
        let request = sqlx::query_as::<_, PremiumRequest>(
            r#"
            UPDATE premium_requests
            SET status = $2, decided_at = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(decided_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(request)
    }

    async fn grant_entitlement(
        &self,
        user_id: Uuid,
        grant: &EntitlementGrant,
        granted_at: DateTime<Utc>,
    ) -> Result<User> {
        // Increment-type grants add in place so concurrent approvals cannot
        // lose each other's updates.
        let user = match grant {
            EntitlementGrant::IncrementLimits {
                job,
                talent,
                expires_at,
            } => {
                sqlx::query_as::<_, User>(
                    r#"
                    UPDATE users
                    SET job_limit = job_limit + $2, talent_limit = talent_limit + $3,
                        premium_expires_at = $4, updated_at = $5
                    WHERE id = $1
                    RETURNING *
                    "#,
                )
                .bind(user_id)
                .bind(job)
                .bind(talent)
                .bind(expires_at)
                .bind(granted_at)
                .fetch_one(&self.pool)
                .await?
            }
            EntitlementGrant::SetPremium {
                job_limit,
                talent_limit,
                expires_at,
            } => {
                sqlx::query_as::<_, User>(
                    r#"
                    UPDATE users
                    SET is_premium = TRUE, is_verified = TRUE,
                        job_limit = $2, talent_limit = $3,
                        premium_expires_at = $4, updated_at = $5
                    WHERE id = $1
                    RETURNING *
                    "#,
                )
                .bind(user_id)
                .bind(job_limit)
                .bind(talent_limit)
                .bind(expires_at)
                .bind(granted_at)
                .fetch_one(&self.pool)
                .await?
            }
            EntitlementGrant::ExtendPremium { expires_at } => {
                sqlx::query_as::<_, User>(
                    r#"
                    UPDATE users
                    SET is_premium = TRUE, is_verified = TRUE,
                        premium_expires_at = $2, updated_at = $3
                    WHERE id = $1
                    RETURNING *
                    "#,
                )
                .bind(user_id)
                .bind(expires_at)
                .bind(granted_at)
                .fetch_one(&self.pool)
                .await?
            }
        };
        Ok(user)
    }

    async fn insert_notification(&self, notification: NewNotification) -> Result<Notification> {
        let row = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (id, user_id, kind, title, body, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, FALSE, $6)
            RETURNING *
            "#,
        )
        .bind(notification.id)
        .bind(notification.user_id)
        .bind(&notification.kind)
        .bind(&notification.title)
        .bind(&notification.body)
        .bind(notification.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }
}
