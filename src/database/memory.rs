//! Process-local stores. Every operation takes a single lock, which gives the same
//! atomicity the Postgres adapter gets from its partial unique index and conditional update.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use crate::database::repository::{AttemptRepository, OpenAttempt, QuizRepository};
use crate::error::{Error, Result};
use crate::models::answer::QuizAnswer;
use crate::models::question::QuizQuestion;
use crate::models::quiz::{limit_reached, Quiz};
use crate::models::quiz_attempt::{AttemptCompletion, QuizAttempt};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| Error::Internal("in-memory store lock poisoned".to_string()))
}

#[derive(Default)]
pub struct InMemoryQuizRepository {
    quizzes: Mutex<HashMap<Uuid, (Quiz, Vec<QuizQuestion>)>>,
}

impl InMemoryQuizRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips `is_active`, standing in for the administrative update path.
    pub fn set_active(&self, quiz_id: Uuid, is_active: bool) -> Result<()> {
        let mut quizzes = lock(&self.quizzes)?;
        let (quiz, _) = quizzes
            .get_mut(&quiz_id)
            .ok_or_else(|| Error::NotFound(format!("Quiz {} not found", quiz_id)))?;
        quiz.is_active = is_active;
        Ok(())
    }
}

#[async_trait]
impl QuizRepository for InMemoryQuizRepository {
    async fn insert_quiz(&self, quiz: &Quiz, questions: &[QuizQuestion]) -> Result<()> {
        let mut quizzes = lock(&self.quizzes)?;
        if quizzes.contains_key(&quiz.id) {
            return Err(Error::Internal(format!("Quiz {} already exists", quiz.id)));
        }
        quizzes.insert(quiz.id, (quiz.clone(), questions.to_vec()));
        Ok(())
    }

    async fn find_quiz(&self, quiz_id: Uuid) -> Result<Option<Quiz>> {
        Ok(lock(&self.quizzes)?.get(&quiz_id).map(|(q, _)| q.clone()))
    }

    async fn find_questions(&self, quiz_id: Uuid) -> Result<Vec<QuizQuestion>> {
        let mut questions = lock(&self.quizzes)?
            .get(&quiz_id)
            .map(|(_, qs)| qs.clone())
            .unwrap_or_default();
        questions.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        Ok(questions)
    }
}

#[derive(Default)]
struct AttemptTables {
    attempts: HashMap<Uuid, QuizAttempt>,
    answers: HashMap<Uuid, Vec<QuizAnswer>>,
}

impl AttemptTables {
    fn open_for(&self, quiz_id: Uuid, student_id: Uuid) -> Option<&QuizAttempt> {
        self.attempts
            .values()
            .find(|a| a.quiz_id == quiz_id && a.student_id == student_id && !a.is_completed)
    }

    fn completed_count(&self, quiz_id: Uuid, student_id: Uuid) -> i64 {
        self.attempts
            .values()
            .filter(|a| a.quiz_id == quiz_id && a.student_id == student_id && a.is_completed)
            .count() as i64
    }
}

#[derive(Default)]
pub struct InMemoryAttemptRepository {
    tables: Mutex<AttemptTables>,
}

impl InMemoryAttemptRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn by_score_desc(a: &QuizAttempt, b: &QuizAttempt) -> Ordering {
    let score = match (a.score, b.score) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    score
        .then_with(|| match (a.submitted_at, b.submitted_at) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.started_at.cmp(&b.started_at))
}

#[async_trait]
impl AttemptRepository for InMemoryAttemptRepository {
    async fn count_completed(&self, quiz_id: Uuid, student_id: Uuid) -> Result<i64> {
        Ok(lock(&self.tables)?.completed_count(quiz_id, student_id))
    }

    async fn find_in_progress(
        &self,
        quiz_id: Uuid,
        student_id: Uuid,
    ) -> Result<Option<QuizAttempt>> {
        Ok(lock(&self.tables)?.open_for(quiz_id, student_id).cloned())
    }

    async fn insert_if_none_open(
        &self,
        attempt: QuizAttempt,
        max_attempts: Option<i32>,
    ) -> Result<OpenAttempt> {
        let mut tables = lock(&self.tables)?;
        let completed = tables.completed_count(attempt.quiz_id, attempt.student_id);
        if limit_reached(max_attempts, completed) {
            return Ok(OpenAttempt::LimitReached { completed });
        }
        if let Some(existing) = tables.open_for(attempt.quiz_id, attempt.student_id) {
            return Ok(OpenAttempt::Existing(existing.clone()));
        }
        tables.attempts.insert(attempt.id, attempt.clone());
        Ok(OpenAttempt::Created(attempt))
    }

    async fn find_by_id(&self, attempt_id: Uuid) -> Result<Option<QuizAttempt>> {
        Ok(lock(&self.tables)?.attempts.get(&attempt_id).cloned())
    }

    async fn find_answers(&self, attempt_id: Uuid) -> Result<Vec<QuizAnswer>> {
        Ok(lock(&self.tables)?
            .answers
            .get(&attempt_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn complete(
        &self,
        attempt_id: Uuid,
        completion: &AttemptCompletion,
        answers: &[QuizAnswer],
    ) -> Result<bool> {
        let mut tables = lock(&self.tables)?;
        let Some(attempt) = tables.attempts.get_mut(&attempt_id) else {
            return Ok(false);
        };
        if attempt.is_completed {
            return Ok(false);
        }
        completion.apply_to(attempt);
        if !answers.is_empty() {
            tables.answers.insert(attempt_id, answers.to_vec());
        }
        Ok(true)
    }

    async fn list_for_quiz(&self, quiz_id: Uuid) -> Result<Vec<QuizAttempt>> {
        let mut attempts: Vec<QuizAttempt> = lock(&self.tables)?
            .attempts
            .values()
            .filter(|a| a.quiz_id == quiz_id)
            .cloned()
            .collect();
        attempts.sort_by(by_score_desc);
        Ok(attempts)
    }

    async fn list_in_progress(&self) -> Result<Vec<QuizAttempt>> {
        let mut attempts: Vec<QuizAttempt> = lock(&self.tables)?
            .attempts
            .values()
            .filter(|a| !a.is_completed)
            .cloned()
            .collect();
        attempts.sort_by_key(|a| a.started_at);
        Ok(attempts)
    }
}
