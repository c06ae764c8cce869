pub mod memory;
pub mod pool;
pub mod postgres;
pub mod repository;

pub use memory::{InMemoryAttemptRepository, InMemoryQuizRepository};
pub use postgres::{PgAttemptRepository, PgQuizRepository};
pub use repository::{AttemptRepository, OpenAttempt, QuizRepository};
