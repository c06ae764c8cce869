use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    /// Finalized by an explicit submit.
    Completed,
    /// Finalized by passive deadline detection, scored zero.
    Expired,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::InProgress => "in_progress",
            AttemptStatus::Completed => "completed",
            AttemptStatus::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, AttemptStatus::InProgress)
    }
}

impl std::str::FromStr for AttemptStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(AttemptStatus::InProgress),
            "completed" => Ok(AttemptStatus::Completed),
            "expired" => Ok(AttemptStatus::Expired),
            other => Err(format!("unknown attempt status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub student_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub is_completed: bool,
    pub status: AttemptStatus,
    pub score: Option<Decimal>,
    pub percentage: Option<Decimal>,
    /// Shuffle snapshot, fixed at creation.
    pub question_order: Vec<Uuid>,
}

impl QuizAttempt {
    pub fn start(
        quiz_id: Uuid,
        student_id: Uuid,
        started_at: DateTime<Utc>,
        question_order: Vec<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            quiz_id,
            student_id,
            started_at,
            submitted_at: None,
            is_completed: false,
            status: AttemptStatus::InProgress,
            score: None,
            percentage: None,
            question_order,
        }
    }
}

/// Terminal values written by the submit / expire compare-and-set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptCompletion {
    pub status: AttemptStatus,
    pub submitted_at: DateTime<Utc>,
    pub score: Decimal,
    pub percentage: Decimal,
}

impl AttemptCompletion {
    pub fn expired(at: DateTime<Utc>) -> Self {
        Self {
            status: AttemptStatus::Expired,
            submitted_at: at,
            score: Decimal::ZERO,
            percentage: Decimal::ZERO,
        }
    }

    pub fn apply_to(&self, attempt: &mut QuizAttempt) {
        attempt.is_completed = true;
        attempt.status = self.status;
        attempt.submitted_at = Some(self.submitted_at);
        attempt.score = Some(self.score);
        attempt.percentage = Some(self.percentage);
    }
}
