use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::database::{AttemptRepository, QuizRepository};
use crate::error::Result;
use crate::models::quiz::Quiz;
use crate::models::quiz_attempt::AttemptCompletion;

/// Background sweep that finalizes overdue attempts nobody came back for.
/// Resume and submit detect expiry on their own, so this only tidies up.
#[derive(Clone)]
pub struct ExpiryService {
    quizzes: Arc<dyn QuizRepository>,
    attempts: Arc<dyn AttemptRepository>,
}

impl ExpiryService {
    pub fn new(quizzes: Arc<dyn QuizRepository>, attempts: Arc<dyn AttemptRepository>) -> Self {
        Self { quizzes, attempts }
    }

    /// Returns how many attempts this pass finalized.
    pub async fn expire_overdue(&self, now: DateTime<Utc>) -> Result<usize> {
        let open = self.attempts.list_in_progress().await?;
        let mut quizzes: HashMap<Uuid, Option<Quiz>> = HashMap::new();
        let mut expired = 0;

        for attempt in open {
            if !quizzes.contains_key(&attempt.quiz_id) {
                let quiz = self.quizzes.find_quiz(attempt.quiz_id).await?;
                quizzes.insert(attempt.quiz_id, quiz);
            }
            let Some(Some(quiz)) = quizzes.get(&attempt.quiz_id) else {
                tracing::warn!(attempt_id = %attempt.id, quiz_id = %attempt.quiz_id, "open attempt without quiz");
                continue;
            };

            if now < quiz.deadline_for(attempt.started_at) {
                continue;
            }
            if self
                .attempts
                .complete(attempt.id, &AttemptCompletion::expired(now), &[])
                .await?
            {
                tracing::debug!(attempt_id = %attempt.id, "attempt expired by sweep");
                expired += 1;
            }
        }

        if expired > 0 {
            tracing::info!(expired, "expiry sweep finalized attempts");
        }
        Ok(expired)
    }
}
