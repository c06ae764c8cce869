use std::sync::Arc;

use uuid::Uuid;

use crate::database::AttemptRepository;
use crate::dto::attempt_dto::AttemptResult;
use crate::error::{Error, Result};
use crate::models::quiz_attempt::QuizAttempt;
use crate::models::user::Role;
use crate::services::course_directory::CourseDirectory;
use crate::services::grading_service::GradingService;
use crate::services::quiz_service::QuizService;

/// Owner, admin, or the instructor of the quiz's course.
pub fn can_view_result(
    attempt: &QuizAttempt,
    requester_id: Uuid,
    role: Role,
    course_instructor_id: Option<Uuid>,
) -> bool {
    attempt.student_id == requester_id
        || role == Role::Admin
        || course_instructor_id == Some(requester_id)
}

#[derive(Clone)]
pub struct ResultService {
    quiz_service: QuizService,
    attempts: Arc<dyn AttemptRepository>,
    courses: Arc<dyn CourseDirectory>,
    grading: GradingService,
}

impl ResultService {
    pub fn new(
        quiz_service: QuizService,
        attempts: Arc<dyn AttemptRepository>,
        courses: Arc<dyn CourseDirectory>,
        grading: GradingService,
    ) -> Self {
        Self {
            quiz_service,
            attempts,
            courses,
            grading,
        }
    }

    pub async fn get_attempt_result(
        &self,
        attempt_id: Uuid,
        requester_id: Uuid,
        role: Role,
    ) -> Result<AttemptResult> {
        let attempt = self
            .attempts
            .find_by_id(attempt_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Attempt {} not found", attempt_id)))?;
        let quiz = self.quiz_service.get_quiz(attempt.quiz_id).await?;

        let instructor_id = self
            .courses
            .course(quiz.course_id)
            .await?
            .map(|c| c.instructor_id);
        if !can_view_result(&attempt, requester_id, role, instructor_id) {
            tracing::warn!(%attempt_id, %requester_id, ?role, "result access denied");
            return Err(Error::Forbidden(
                "Not allowed to view this attempt".to_string(),
            ));
        }

        if !attempt.is_completed {
            return Err(Error::NotFound(format!(
                "Attempt {} has no result yet",
                attempt_id
            )));
        }

        let questions = self.quiz_service.get_questions(quiz.id).await?;
        let answers = self.attempts.find_answers(attempt_id).await?;
        Ok(self
            .grading
            .result_view(&attempt, &quiz, &questions, &answers))
    }
}
