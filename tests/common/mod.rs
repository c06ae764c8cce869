#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use quiz_engine::database::{AttemptRepository, InMemoryAttemptRepository, InMemoryQuizRepository};
use quiz_engine::dto::quiz_dto::{CreateQuestion, CreateQuizPayload};
use quiz_engine::models::course::CourseInfo;
use quiz_engine::models::question::{QuestionType, QuizQuestion};
use quiz_engine::models::quiz::Quiz;
use quiz_engine::services::course_directory::InMemoryCourseDirectory;
use quiz_engine::services::grading_service::AnswerMatchPolicy;
use quiz_engine::services::notification_service::{GradeNotifier, GradePosted, QuizAvailable};
use quiz_engine::AppState;
use uuid::Uuid;

#[derive(Default)]
pub struct RecordingNotifier {
    pub grades: Mutex<Vec<GradePosted>>,
    pub quizzes: Mutex<Vec<QuizAvailable>>,
}

impl GradeNotifier for RecordingNotifier {
    fn notify_grade_posted(&self, event: GradePosted) {
        self.grades.lock().unwrap().push(event);
    }

    fn notify_quiz_available(&self, event: QuizAvailable) {
        self.quizzes.lock().unwrap().push(event);
    }
}

pub struct Harness {
    pub state: AppState,
    pub quizzes: Arc<InMemoryQuizRepository>,
    pub notifier: Arc<RecordingNotifier>,
    pub course: CourseInfo,
}

pub fn harness() -> Harness {
    harness_with(Arc::new(InMemoryAttemptRepository::new()))
}

pub fn harness_with(attempts: Arc<dyn AttemptRepository>) -> Harness {
    let course = CourseInfo {
        id: Uuid::new_v4(),
        name: "Introductory Biology".into(),
        instructor_id: Uuid::new_v4(),
    };
    let courses = InMemoryCourseDirectory::new();
    courses.insert(course.clone()).unwrap();

    let quizzes = Arc::new(InMemoryQuizRepository::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let state = AppState::new(
        quizzes.clone(),
        attempts,
        Arc::new(courses),
        notifier.clone(),
        AnswerMatchPolicy::default(),
    );

    Harness {
        state,
        quizzes,
        notifier,
        course,
    }
}

pub fn short_answer(text: &str, marks: i32, correct: &str) -> CreateQuestion {
    CreateQuestion {
        text: text.into(),
        question_type: QuestionType::ShortAnswer,
        marks,
        order: None,
        options: None,
        correct_answer: correct.into(),
    }
}

/// Open from an hour ago to an hour from now, two five-mark questions.
pub fn quiz_payload(course_id: Uuid, now: DateTime<Utc>) -> CreateQuizPayload {
    CreateQuizPayload {
        course_id,
        title: "Cell Biology".into(),
        description: Some("Chapter 2".into()),
        duration_minutes: 30,
        start_time: now - Duration::hours(1),
        end_time: now + Duration::hours(1),
        shuffle_questions: false,
        max_attempts: None,
        questions: vec![
            short_answer("Powerhouse of the cell", 5, "Mitochondria"),
            short_answer("Unit of heredity", 5, "Gene"),
        ],
    }
}

impl Harness {
    pub async fn create_quiz(&self, payload: CreateQuizPayload, now: DateTime<Utc>) -> (Quiz, Vec<QuizQuestion>) {
        self.state
            .quiz_service
            .create_quiz(payload, now)
            .await
            .expect("create quiz")
    }
}
