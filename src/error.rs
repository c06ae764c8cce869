use chrono::{DateTime, Utc};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Quiz has not started yet (opens at {starts_at})")]
    NotStarted { starts_at: DateTime<Utc> },

    #[error("Quiz has ended (closed at {ended_at})")]
    Ended { ended_at: DateTime<Utc> },

    #[error("Maximum number of attempts reached ({max_attempts})")]
    AttemptLimitReached { max_attempts: i32 },

    #[error("Attempt has already been submitted")]
    AlreadySubmitted,

    #[error("Attempt expired at {deadline}")]
    Expired { deadline: DateTime<Utc> },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable machine-readable code for callers that map failures onto their own transport.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config(_) => "CONFIG_ERROR",
            Error::NotFound(_) => "NOT_FOUND",
            Error::NotStarted { .. } => "NOT_STARTED",
            Error::Ended { .. } => "ENDED",
            Error::AttemptLimitReached { .. } => "ATTEMPT_LIMIT_REACHED",
            Error::AlreadySubmitted => "ALREADY_SUBMITTED",
            Error::Expired { .. } => "EXPIRED",
            Error::Forbidden(_) => "FORBIDDEN",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::Database(_) => "DATABASE_ERROR",
            Error::Migration(_) => "MIGRATION_ERROR",
            Error::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound("Resource not found".to_string()),
            other => Error::Database(other),
        }
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Error::Validation(err.to_string())
    }
}
