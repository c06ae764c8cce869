use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Quiz {
    pub id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Sum of question marks at creation time. Never recomputed.
    pub total_marks: i32,
    pub shuffle_questions: bool,
    pub max_attempts: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Quiz {
    pub fn duration(&self) -> Duration {
        Duration::minutes(self.duration_minutes as i64)
    }

    /// Server-authoritative cutoff for an attempt started at `started_at`.
    pub fn deadline_for(&self, started_at: DateTime<Utc>) -> DateTime<Utc> {
        started_at + self.duration()
    }

    /// Rejects `now` outside `[start_time, end_time]`.
    pub fn ensure_open(&self, now: DateTime<Utc>) -> Result<()> {
        if now < self.start_time {
            return Err(Error::NotStarted {
                starts_at: self.start_time,
            });
        }
        if now > self.end_time {
            return Err(Error::Ended {
                ended_at: self.end_time,
            });
        }
        Ok(())
    }

    pub fn attempt_limit_reached(&self, completed_attempts: i64) -> bool {
        limit_reached(self.max_attempts, completed_attempts)
    }
}

/// `true` once `completed` attempts use up `max_attempts`; no limit when unset.
pub fn limit_reached(max_attempts: Option<i32>, completed: i64) -> bool {
    matches!(max_attempts, Some(max) if completed >= max as i64)
}
