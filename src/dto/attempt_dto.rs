use crate::models::question::QuestionForTaking;
use crate::models::quiz_attempt::{AttemptStatus, QuizAttempt};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

pub const MAX_ANSWER_LENGTH: u64 = 10_000;

/// Returned by start/resume: the attempt, its deadline, and questions in snapshot order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptSession {
    pub attempt: QuizAttempt,
    pub deadline: DateTime<Utc>,
    pub questions: Vec<QuestionForTaking>,
    pub resumed: bool,
}

impl AttemptSession {
    pub fn attempt_id(&self) -> Uuid {
        self.attempt.id
    }

    pub fn time_remaining_seconds(&self, now: DateTime<Utc>) -> i64 {
        (self.deadline - now).num_seconds().max(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitAnswer {
    pub question_id: Uuid,
    #[validate(length(max = MAX_ANSWER_LENGTH, message = "Answer is too long"))]
    pub answer_text: String,
}

impl SubmitAnswer {
    pub fn new(question_id: Uuid, answer_text: impl Into<String>) -> Self {
        Self {
            question_id,
            answer_text: answer_text.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SubmitAttemptRequest {
    #[validate(nested)]
    pub answers: Vec<SubmitAnswer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionResult {
    pub question_id: Uuid,
    pub question_text: String,
    pub submitted_answer: Option<String>,
    pub correct_answer: String,
    pub is_correct: bool,
    pub marks_awarded: Decimal,
    pub marks: i32,
}

/// Shared output of SubmitAttempt and GetAttemptResult.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptResult {
    pub attempt_id: Uuid,
    pub quiz_id: Uuid,
    pub student_id: Uuid,
    pub status: AttemptStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub score: Decimal,
    pub percentage: Decimal,
    pub total_marks: i32,
    pub questions: Vec<QuestionResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptSummary {
    pub attempt_id: Uuid,
    pub student_id: Uuid,
    pub status: AttemptStatus,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub score: Option<Decimal>,
    pub percentage: Option<Decimal>,
}

impl From<&QuizAttempt> for AttemptSummary {
    fn from(a: &QuizAttempt) -> Self {
        Self {
            attempt_id: a.id,
            student_id: a.student_id,
            status: a.status,
            started_at: a.started_at,
            submitted_at: a.submitted_at,
            score: a.score,
            percentage: a.percentage,
        }
    }
}
