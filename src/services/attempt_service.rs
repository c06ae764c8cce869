use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use uuid::Uuid;
use validator::Validate;

use crate::database::{AttemptRepository, OpenAttempt};
use crate::dto::attempt_dto::{AttemptResult, AttemptSession, AttemptSummary, SubmitAttemptRequest};
use crate::error::{Error, Result};
use crate::models::question::{QuestionForTaking, QuizQuestion};
use crate::models::quiz::Quiz;
use crate::models::quiz_attempt::{AttemptCompletion, AttemptStatus, QuizAttempt};
use crate::services::course_directory::CourseDirectory;
use crate::services::grading_service::GradingService;
use crate::services::notification_service::{GradeNotifier, GradePosted};
use crate::services::quiz_service::QuizService;

// Bounds the resume/create loop when concurrent calls keep finalizing the open attempt.
const MAX_OPEN_ROUNDS: usize = 4;

fn question_order(quiz: &Quiz, questions: &[QuizQuestion]) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = questions.iter().map(|q| q.id).collect();
    if quiz.shuffle_questions {
        ids.shuffle(&mut rand::thread_rng());
    }
    ids
}

fn questions_in_order(attempt: &QuizAttempt, questions: &[QuizQuestion]) -> Vec<QuestionForTaking> {
    let by_id: HashMap<Uuid, &QuizQuestion> = questions.iter().map(|q| (q.id, q)).collect();
    attempt
        .question_order
        .iter()
        .filter_map(|id| by_id.get(id).map(|q| QuestionForTaking::from(*q)))
        .collect()
}

fn limit_error(quiz: &Quiz, student_id: Uuid, completed: i64) -> Error {
    tracing::warn!(quiz_id = %quiz.id, %student_id, completed, "attempt limit reached");
    Error::AttemptLimitReached {
        max_attempts: quiz.max_attempts.unwrap_or_default(),
    }
}

#[derive(Clone)]
pub struct AttemptService {
    quiz_service: QuizService,
    attempts: Arc<dyn AttemptRepository>,
    courses: Arc<dyn CourseDirectory>,
    notifier: Arc<dyn GradeNotifier>,
    grading: GradingService,
}

impl AttemptService {
    pub fn new(
        quiz_service: QuizService,
        attempts: Arc<dyn AttemptRepository>,
        courses: Arc<dyn CourseDirectory>,
        notifier: Arc<dyn GradeNotifier>,
        grading: GradingService,
    ) -> Self {
        Self {
            quiz_service,
            attempts,
            courses,
            notifier,
            grading,
        }
    }

    /// Returns the student's open attempt, or opens a new one. An open attempt found past its
    /// deadline is finalized as expired and the call fails with `Expired`.
    pub async fn start_or_resume(
        &self,
        quiz_id: Uuid,
        student_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<AttemptSession> {
        let (quiz, questions) = self.quiz_service.get_quiz_for_taking(quiz_id, now).await?;

        for _ in 0..MAX_OPEN_ROUNDS {
            let completed = self.attempts.count_completed(quiz_id, student_id).await?;
            if quiz.attempt_limit_reached(completed) {
                return Err(limit_error(&quiz, student_id, completed));
            }

            if let Some(open) = self.attempts.find_in_progress(quiz_id, student_id).await? {
                let deadline = quiz.deadline_for(open.started_at);
                if now >= deadline {
                    if self
                        .attempts
                        .complete(open.id, &AttemptCompletion::expired(now), &[])
                        .await?
                    {
                        tracing::info!(attempt_id = %open.id, %deadline, "attempt expired on resume");
                        return Err(Error::Expired { deadline });
                    }
                    // Finalized by a concurrent call; look again.
                    continue;
                }

                tracing::debug!(attempt_id = %open.id, "resuming attempt");
                return Ok(AttemptSession {
                    questions: questions_in_order(&open, &questions),
                    deadline,
                    attempt: open,
                    resumed: true,
                });
            }

            let fresh = QuizAttempt::start(quiz_id, student_id, now, question_order(&quiz, &questions));
            match self
                .attempts
                .insert_if_none_open(fresh, quiz.max_attempts)
                .await?
            {
                OpenAttempt::Created(attempt) => {
                    tracing::info!(
                        attempt_id = %attempt.id,
                        %quiz_id,
                        %student_id,
                        "attempt started"
                    );
                    return Ok(AttemptSession {
                        questions: questions_in_order(&attempt, &questions),
                        deadline: quiz.deadline_for(attempt.started_at),
                        attempt,
                        resumed: false,
                    });
                }
                // Lost the race to a concurrent start; the next round resumes the winner.
                OpenAttempt::Existing(_) => continue,
                // An attempt completed after the count above.
                OpenAttempt::LimitReached { completed } => {
                    return Err(limit_error(&quiz, student_id, completed));
                }
            }
        }

        Err(Error::Internal(format!(
            "could not settle an open attempt for quiz {} and student {}",
            quiz_id, student_id
        )))
    }

    /// Grades and finalizes an attempt. Exactly one submit per attempt succeeds.
    pub async fn submit(
        &self,
        attempt_id: Uuid,
        student_id: Uuid,
        now: DateTime<Utc>,
        request: SubmitAttemptRequest,
    ) -> Result<AttemptResult> {
        let mut attempt = self
            .attempts
            .find_by_id(attempt_id)
            .await?
            .filter(|a| a.student_id == student_id)
            .ok_or_else(|| Error::NotFound(format!("Attempt {} not found", attempt_id)))?;

        if attempt.is_completed {
            tracing::warn!(%attempt_id, status = attempt.status.as_str(), "submit on finalized attempt");
            return Err(Error::AlreadySubmitted);
        }

        let quiz = self.quiz_service.get_quiz(attempt.quiz_id).await?;
        let deadline = quiz.deadline_for(attempt.started_at);
        if now > deadline {
            if self
                .attempts
                .complete(attempt_id, &AttemptCompletion::expired(now), &[])
                .await?
            {
                tracing::info!(%attempt_id, %deadline, "late submit, attempt expired");
            }
            return Err(Error::Expired { deadline });
        }

        request.validate()?;
        let questions = self.quiz_service.get_questions(quiz.id).await?;
        let graded = self
            .grading
            .grade(attempt_id, &questions, quiz.total_marks, &request.answers)?;

        let completion = AttemptCompletion {
            status: AttemptStatus::Completed,
            submitted_at: now,
            score: graded.score,
            percentage: graded.percentage,
        };
        if !self
            .attempts
            .complete(attempt_id, &completion, &graded.answers)
            .await?
        {
            tracing::warn!(%attempt_id, "attempt finalized concurrently");
            return Err(Error::AlreadySubmitted);
        }
        completion.apply_to(&mut attempt);

        tracing::info!(
            %attempt_id,
            quiz_id = %quiz.id,
            %student_id,
            score = %graded.score,
            percentage = %graded.percentage,
            "attempt graded"
        );
        self.announce_grade(&quiz, &attempt).await;

        Ok(self
            .grading
            .result_view(&attempt, &quiz, &questions, &graded.answers))
    }

    async fn announce_grade(&self, quiz: &Quiz, attempt: &QuizAttempt) {
        let course = match self.courses.course(quiz.course_id).await {
            Ok(Some(course)) => course,
            Ok(None) => {
                tracing::warn!(course_id = %quiz.course_id, "unknown course, grade-posted not sent");
                return;
            }
            Err(e) => {
                tracing::error!(error = ?e, course_id = %quiz.course_id, "course lookup failed");
                return;
            }
        };

        self.notifier.notify_grade_posted(GradePosted {
            student_id: attempt.student_id,
            course_id: course.id,
            course_name: course.name,
            item_title: quiz.title.clone(),
            score: attempt.score.unwrap_or_default(),
        });
    }

    /// Every attempt of the quiz, best score first, unscored attempts last.
    pub async fn list_attempts_for_quiz(&self, quiz_id: Uuid) -> Result<Vec<AttemptSummary>> {
        self.quiz_service.get_quiz(quiz_id).await?;
        let attempts = self.attempts.list_for_quiz(quiz_id).await?;
        Ok(attempts.iter().map(AttemptSummary::from).collect())
    }
}
