pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod models;
pub mod services;

use std::sync::Arc;

use crate::config::Config;
use crate::database::{AttemptRepository, PgAttemptRepository, PgQuizRepository, QuizRepository};
use crate::services::{
    attempt_service::AttemptService,
    course_directory::CourseDirectory,
    expiry_service::ExpiryService,
    grading_service::{AnswerMatchPolicy, GradingService},
    notification_service::{notifier_from_config, GradeNotifier},
    quiz_service::QuizService,
    result_service::ResultService,
};
use sqlx::PgPool;

/// Wires the engine's services over one pair of stores.
#[derive(Clone)]
pub struct AppState {
    pub quiz_service: QuizService,
    pub attempt_service: AttemptService,
    pub result_service: ResultService,
    pub expiry_service: ExpiryService,
}

impl AppState {
    pub fn new(
        quizzes: Arc<dyn QuizRepository>,
        attempts: Arc<dyn AttemptRepository>,
        courses: Arc<dyn CourseDirectory>,
        notifier: Arc<dyn GradeNotifier>,
        policy: AnswerMatchPolicy,
    ) -> Self {
        let grading = GradingService::new(policy);
        let quiz_service = QuizService::new(quizzes.clone(), courses.clone(), notifier.clone());
        let attempt_service = AttemptService::new(
            quiz_service.clone(),
            attempts.clone(),
            courses.clone(),
            notifier,
            grading,
        );
        let result_service =
            ResultService::new(quiz_service.clone(), attempts.clone(), courses, grading);
        let expiry_service = ExpiryService::new(quizzes, attempts);

        Self {
            quiz_service,
            attempt_service,
            result_service,
            expiry_service,
        }
    }

    pub fn postgres(pool: PgPool, config: &Config, courses: Arc<dyn CourseDirectory>) -> Self {
        Self::new(
            Arc::new(PgQuizRepository::new(pool.clone())),
            Arc::new(PgAttemptRepository::new(pool)),
            courses,
            notifier_from_config(config),
            config.answer_match_policy,
        )
    }
}
