use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::answer::QuizAnswer;
use crate::models::question::QuizQuestion;
use crate::models::quiz::Quiz;
use crate::models::quiz_attempt::{AttemptCompletion, QuizAttempt};

#[async_trait]
pub trait QuizRepository: Send + Sync {
    async fn insert_quiz(&self, quiz: &Quiz, questions: &[QuizQuestion]) -> Result<()>;

    async fn find_quiz(&self, quiz_id: Uuid) -> Result<Option<Quiz>>;

    /// Questions in declared `order`.
    async fn find_questions(&self, quiz_id: Uuid) -> Result<Vec<QuizQuestion>>;
}

/// Outcome of the conditional insert behind start/resume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenAttempt {
    Created(QuizAttempt),
    /// Another in-progress attempt already held the (quiz, student) slot.
    Existing(QuizAttempt),
    /// The student had used up `max_attempts` by the time the insert ran.
    LimitReached { completed: i64 },
}

impl OpenAttempt {
    pub fn into_attempt(self) -> Option<QuizAttempt> {
        match self {
            OpenAttempt::Created(a) | OpenAttempt::Existing(a) => Some(a),
            OpenAttempt::LimitReached { .. } => None,
        }
    }
}

#[async_trait]
pub trait AttemptRepository: Send + Sync {
    async fn count_completed(&self, quiz_id: Uuid, student_id: Uuid) -> Result<i64>;

    async fn find_in_progress(&self, quiz_id: Uuid, student_id: Uuid)
        -> Result<Option<QuizAttempt>>;

    /// Inserts `attempt` unless the student has reached `max_attempts` completed attempts or
    /// already has an incomplete one, which is returned instead. The limit check and the insert
    /// must be atomic with respect to `complete` for the same (quiz, student).
    async fn insert_if_none_open(
        &self,
        attempt: QuizAttempt,
        max_attempts: Option<i32>,
    ) -> Result<OpenAttempt>;

    async fn find_by_id(&self, attempt_id: Uuid) -> Result<Option<QuizAttempt>>;

    async fn find_answers(&self, attempt_id: Uuid) -> Result<Vec<QuizAnswer>>;

    /// Compare-and-set on `is_completed`: writes `completion` and `answers` in one
    /// transaction only if the attempt is still open. Returns `false` when it was not.
    async fn complete(
        &self,
        attempt_id: Uuid,
        completion: &AttemptCompletion,
        answers: &[QuizAnswer],
    ) -> Result<bool>;

    /// All attempts on a quiz, highest score first, unscored last.
    async fn list_for_quiz(&self, quiz_id: Uuid) -> Result<Vec<QuizAttempt>>;

    async fn list_in_progress(&self) -> Result<Vec<QuizAttempt>>;
}
