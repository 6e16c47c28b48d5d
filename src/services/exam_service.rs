use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::dto::exam_dto::{AnswerReview, ExamUserStats, QuestionDelivery};
use crate::error::{Error, Result};
use crate::models::attempt::{transition, AttemptEvent, AttemptStatus, ExamAttempt};
use crate::models::certificate::Certificate;
use crate::models::exam::Exam;
use crate::models::question::ExamQuestion;
use crate::services::enrollment_service::EnrollmentService;
use crate::services::grading_service::GradingService;
use crate::store::{
    AttemptCreation, AttemptFinalization, CertificateGrant, NewAnswer, NewAttempt, RecordStore,
};
use crate::utils::shuffle::shuffle;
use crate::utils::time::Clock;

/// Submissions landing this long after the nominal deadline are still graded
/// but the attempt closes as EXPIRED instead of GRADED.
pub const SUBMISSION_GRACE_SECONDS: i64 = 30;

#[derive(Debug, Clone)]
pub struct StartOutcome {
    pub attempt: ExamAttempt,
    pub questions: Vec<QuestionDelivery>,
    pub time_limit_minutes: i32,
    pub remaining_seconds: i64,
    pub resuming: bool,
}

#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub attempt: ExamAttempt,
    pub certificate: Option<Certificate>,
    pub score: Decimal,
    pub earned_points: i32,
    pub max_points: i32,
    pub passed: bool,
    pub passing_score: Decimal,
    pub time_spent_seconds: i32,
    pub show_results: bool,
    pub answers: Option<Vec<AnswerReview>>,
}

#[derive(Debug, Clone)]
pub enum ExamDetail {
    /// The exam's teacher or an admin: questions come back whole.
    Owner {
        exam: Exam,
        questions: Vec<ExamQuestion>,
    },
    /// Everyone else: stripped questions plus the caller's attempt stats.
    Learner {
        exam: Exam,
        questions: Vec<QuestionDelivery>,
        stats: ExamUserStats,
    },
}

#[derive(Clone)]
pub struct ExamService {
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    gate: EnrollmentService,
}

impl ExamService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        clock: Arc<dyn Clock>,
        gate: EnrollmentService,
    ) -> Self {
        Self { store, clock, gate }
    }

    pub async fn start_attempt(&self, user_id: Uuid, exam_id: Uuid) -> Result<StartOutcome> {
        let exam = self
            .store
            .exam_by_id(exam_id)
            .await?
            .ok_or_else(|| Error::NotFound("Exam not found".to_string()))?;

        let decision = self.gate.can_attempt(user_id, exam.course_id).await?;
        if let Some(reason) = decision.reason {
            return Err(Error::Forbidden(reason.message().to_string()));
        }

        if !exam.is_published {
            return Err(Error::NotFound("Exam not found".to_string()));
        }
        if !exam.is_active {
            return Err(Error::Forbidden("Exam is not open for attempts".to_string()));
        }

        let now = self.clock.now();
        if let Some(from) = exam.available_from {
            if now < from {
                return Err(Error::Forbidden("Exam is not yet available".to_string()));
            }
        }
        if let Some(until) = exam.available_until {
            if now > until {
                return Err(Error::Forbidden("Exam is no longer available".to_string()));
            }
        }

        let attempts = self.store.attempts_for(exam_id, user_id).await?;

        if let Some(active) = attempts
            .iter()
            .find(|a| a.status == AttemptStatus::InProgress)
        {
            return self.resume(&exam, active.clone()).await;
        }

        if attempts.iter().any(|a| a.passed == Some(true)) {
            return Err(Error::Conflict(
                "You have already passed this exam".to_string(),
            ));
        }
        if attempts.len() as i32 >= exam.max_attempts {
            return Err(Error::Conflict("Attempt limit reached".to_string()));
        }

        let questions = self.store.questions_for_exam(exam_id).await?;
        let max_points: i32 = questions.iter().map(|q| q.points).sum();
        let status = transition(None, AttemptEvent::Start)
            .map_err(|e| Error::Internal(e.to_string()))?;

        let creation = self
            .store
            .create_attempt(NewAttempt {
                id: Uuid::new_v4(),
                exam_id,
                user_id,
                attempt_number: attempts.len() as i32 + 1,
                status,
                started_at: now,
                max_points,
            })
            .await?;

        match creation {
            AttemptCreation::Created(attempt) => {
                tracing::info!(
                    attempt_id = %attempt.id,
                    exam_id = %exam_id,
                    attempt_number = attempt.attempt_number,
                    "exam attempt started"
                );
                Ok(StartOutcome {
                    attempt,
                    questions: self.deliver(&exam, questions),
                    time_limit_minutes: exam.time_limit_minutes,
                    remaining_seconds: exam.time_limit_minutes as i64 * 60,
                    resuming: false,
                })
            }
            // Lost a concurrent-start race; fall back to the surviving row.
            AttemptCreation::InProgressExists(existing) => self.resume(&exam, existing).await,
        }
    }

    async fn resume(&self, exam: &Exam, attempt: ExamAttempt) -> Result<StartOutcome> {
        let elapsed = (self.clock.now() - attempt.started_at).num_seconds();
        let remaining = (exam.time_limit_minutes as i64 * 60 - elapsed).max(0);
        let questions = self.store.questions_for_exam(exam.id).await?;
        Ok(StartOutcome {
            attempt,
            questions: self.deliver(exam, questions),
            time_limit_minutes: exam.time_limit_minutes,
            remaining_seconds: remaining,
            resuming: true,
        })
    }

    /// Projects questions for delivery. Shuffling happens per call, so a
    /// resumed attempt may see a different order than the first delivery.
    fn deliver(&self, exam: &Exam, mut questions: Vec<ExamQuestion>) -> Vec<QuestionDelivery> {
        questions.sort_by_key(|q| q.order_index);
        if exam.shuffle_questions {
            shuffle(&mut questions);
        }
        questions
            .into_iter()
            .map(|q| {
                let options = match q.options {
                    Some(JsonValue::Array(mut items)) if exam.shuffle_options => {
                        shuffle(&mut items);
                        Some(JsonValue::Array(items))
                    }
                    other => other,
                };
                QuestionDelivery {
                    id: q.id,
                    question_text: q.question_text,
                    question_type: q.question_type,
                    options,
                    points: q.points,
                    difficulty: q.difficulty,
                }
            })
            .collect()
    }

    pub async fn submit_attempt(
        &self,
        user_id: Uuid,
        exam_id: Uuid,
        attempt_id: Uuid,
        answers: &HashMap<Uuid, JsonValue>,
        time_spent: Option<i64>,
    ) -> Result<SubmissionOutcome> {
        let attempt = self
            .store
            .attempt_by_id(attempt_id)
            .await?
            .ok_or_else(|| Error::NotFound("Exam attempt not found".to_string()))?;
        if attempt.user_id != user_id {
            return Err(Error::Forbidden(
                "You do not own this exam attempt".to_string(),
            ));
        }
        if attempt.exam_id != exam_id {
            return Err(Error::NotFound(
                "Attempt does not belong to this exam".to_string(),
            ));
        }

        let exam = self
            .store
            .exam_by_id(attempt.exam_id)
            .await?
            .ok_or_else(|| Error::NotFound("Exam not found".to_string()))?;

        let now = self.clock.now();
        let elapsed = (now - attempt.started_at).num_seconds();
        let expired = elapsed > exam.time_limit_minutes as i64 * 60 + SUBMISSION_GRACE_SECONDS;

        let next_status = transition(Some(attempt.status), AttemptEvent::Submit { expired })
            .map_err(|_| Error::Conflict("Exam attempt has already been submitted".to_string()))?;

        let questions = self.store.questions_for_exam(attempt.exam_id).await?;
        let outcome = GradingService::grade(&questions, answers);
        let passed = outcome.score >= exam.passing_score;
        let time_spent_seconds = time_spent.unwrap_or(elapsed).clamp(0, i32::MAX as i64) as i32;

        let certificate = if passed {
            let certificate_id = Uuid::new_v4();
            Some(CertificateGrant {
                certificate_id,
                course_id: exam.course_id,
                user_id,
                score: outcome.score,
                certificate_url: certificate_url(certificate_id),
                issued_at: now,
            })
        } else {
            None
        };

        let finalized = self
            .store
            .finalize_attempt(AttemptFinalization {
                attempt_id,
                status: next_status,
                submitted_at: now,
                score: outcome.score,
                earned_points: outcome.earned_points,
                passed,
                time_spent_seconds,
                answers: outcome
                    .graded
                    .iter()
                    .map(|g| NewAnswer {
                        id: Uuid::new_v4(),
                        question_id: g.question_id,
                        answer: g.answer.clone(),
                        is_correct: g.is_correct,
                        points_earned: g.points_earned,
                    })
                    .collect(),
                certificate,
            })
            .await?;

        tracing::info!(
            attempt_id = %attempt_id,
            score = %outcome.score,
            passed,
            expired,
            "exam attempt submitted"
        );

        let answers_review = if exam.show_results {
            let submitted: HashMap<Uuid, &crate::services::grading_service::GradedAnswer> =
                outcome.graded.iter().map(|g| (g.question_id, g)).collect();
            Some(
                questions
                    .iter()
                    .map(|q| {
                        let graded = submitted.get(&q.id);
                        AnswerReview {
                            question_id: q.id,
                            question_text: q.question_text.clone(),
                            submitted: graded.and_then(|g| g.answer.clone()),
                            correct_answer: q.correct_answer.clone(),
                            explanation: q.explanation.clone(),
                            is_correct: graded.map(|g| g.is_correct).unwrap_or(false),
                            points_earned: graded.map(|g| g.points_earned).unwrap_or(0),
                            max_points: q.points,
                        }
                    })
                    .collect(),
            )
        } else {
            None
        };

        Ok(SubmissionOutcome {
            attempt: finalized.attempt,
            certificate: finalized.certificate,
            score: outcome.score,
            earned_points: outcome.earned_points,
            max_points: outcome.max_points,
            passed,
            passing_score: exam.passing_score,
            time_spent_seconds,
            show_results: exam.show_results,
            answers: answers_review,
        })
    }

    pub async fn exam_detail(
        &self,
        user_id: Uuid,
        role: &str,
        exam_id: Uuid,
    ) -> Result<ExamDetail> {
        let exam = self
            .store
            .exam_by_id(exam_id)
            .await?
            .ok_or_else(|| Error::NotFound("Exam not found".to_string()))?;
        let questions = self.store.questions_for_exam(exam_id).await?;

        let is_owner = exam.teacher_id == user_id || role.eq_ignore_ascii_case("admin");
        if is_owner {
            return Ok(ExamDetail::Owner { exam, questions });
        }

        if !exam.is_published {
            return Err(Error::NotFound("Exam not found".to_string()));
        }

        let attempts = self.store.attempts_for(exam_id, user_id).await?;
        let stats = user_stats(&exam, &attempts);
        let questions = self.deliver(&exam, questions);
        Ok(ExamDetail::Learner {
            exam,
            questions,
            stats,
        })
    }
}

fn user_stats(exam: &Exam, attempts: &[ExamAttempt]) -> ExamUserStats {
    use rust_decimal::prelude::ToPrimitive;

    let has_passed = attempts.iter().any(|a| a.passed == Some(true));
    let best_score = attempts
        .iter()
        .filter_map(|a| a.score)
        .max()
        .and_then(|s| s.to_f64());
    ExamUserStats {
        attempts: attempts.len() as i64,
        max_attempts: exam.max_attempts,
        best_score,
        has_passed,
        can_retake: !has_passed && (attempts.len() as i32) < exam.max_attempts,
        has_active_attempt: attempts
            .iter()
            .any(|a| a.status == AttemptStatus::InProgress),
    }
}

fn certificate_url(certificate_id: Uuid) -> String {
    format!(
        "{}/certificates/validate?id=CERT-{}",
        crate::config::get_config().public_url,
        certificate_id
    )
}
