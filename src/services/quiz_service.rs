use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::database::QuizRepository;
use crate::dto::quiz_dto::CreateQuizPayload;
use crate::error::{Error, Result};
use crate::models::question::QuizQuestion;
use crate::models::quiz::Quiz;
use crate::services::course_directory::CourseDirectory;
use crate::services::notification_service::{GradeNotifier, QuizAvailable};

#[derive(Clone)]
pub struct QuizService {
    quizzes: Arc<dyn QuizRepository>,
    courses: Arc<dyn CourseDirectory>,
    notifier: Arc<dyn GradeNotifier>,
}

impl QuizService {
    pub fn new(
        quizzes: Arc<dyn QuizRepository>,
        courses: Arc<dyn CourseDirectory>,
        notifier: Arc<dyn GradeNotifier>,
    ) -> Self {
        Self {
            quizzes,
            courses,
            notifier,
        }
    }

    pub async fn create_quiz(
        &self,
        payload: CreateQuizPayload,
        now: DateTime<Utc>,
    ) -> Result<(Quiz, Vec<QuizQuestion>)> {
        payload.validate()?;
        if payload.start_time >= payload.end_time {
            return Err(Error::Validation(
                "start_time must be before end_time".to_string(),
            ));
        }

        let quiz_id = Uuid::new_v4();
        let questions: Vec<QuizQuestion> = payload
            .questions
            .into_iter()
            .enumerate()
            .map(|(idx, q)| QuizQuestion {
                id: Uuid::new_v4(),
                quiz_id,
                text: q.text,
                question_type: q.question_type,
                marks: q.marks,
                order: q.order.unwrap_or(idx as i32),
                options: q.options,
                correct_answer: q.correct_answer,
            })
            .collect();

        let quiz = Quiz {
            id: quiz_id,
            course_id: payload.course_id,
            title: payload.title,
            description: payload.description,
            duration_minutes: payload.duration_minutes,
            start_time: payload.start_time,
            end_time: payload.end_time,
            total_marks: questions.iter().map(|q| q.marks).sum(),
            shuffle_questions: payload.shuffle_questions,
            max_attempts: payload.max_attempts,
            is_active: true,
            created_at: now,
        };

        self.quizzes.insert_quiz(&quiz, &questions).await?;
        tracing::info!(
            quiz_id = %quiz.id,
            course_id = %quiz.course_id,
            questions = questions.len(),
            total_marks = quiz.total_marks,
            "quiz created"
        );

        match self.courses.course(quiz.course_id).await {
            Ok(Some(course)) => self.notifier.notify_quiz_available(QuizAvailable {
                course_id: course.id,
                course_name: course.name,
                quiz_id: quiz.id,
                quiz_title: quiz.title.clone(),
                start_time: quiz.start_time,
            }),
            Ok(None) => {
                tracing::warn!(course_id = %quiz.course_id, "unknown course, quiz-available not sent");
            }
            Err(e) => {
                tracing::error!(error = ?e, course_id = %quiz.course_id, "course lookup failed");
            }
        }

        Ok((quiz, questions))
    }

    /// Administrative read, ignores `is_active` and the availability window.
    pub async fn get_quiz(&self, quiz_id: Uuid) -> Result<Quiz> {
        self.quizzes
            .find_quiz(quiz_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Quiz {} not found", quiz_id)))
    }

    pub async fn get_questions(&self, quiz_id: Uuid) -> Result<Vec<QuizQuestion>> {
        self.quizzes.find_questions(quiz_id).await
    }

    pub async fn get_quiz_for_taking(
        &self,
        quiz_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(Quiz, Vec<QuizQuestion>)> {
        let quiz = self
            .quizzes
            .find_quiz(quiz_id)
            .await?
            .filter(|q| q.is_active)
            .ok_or_else(|| Error::NotFound(format!("Quiz {} not found", quiz_id)))?;
        quiz.ensure_open(now)?;

        let questions = self.quizzes.find_questions(quiz_id).await?;
        Ok((quiz, questions))
    }
}
