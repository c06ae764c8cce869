use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::database::repository::{AttemptRepository, OpenAttempt, QuizRepository};
use crate::error::{Error, Result};
use crate::models::answer::QuizAnswer;
use crate::models::question::QuizQuestion;
use crate::models::quiz::{limit_reached, Quiz};
use crate::models::quiz_attempt::{AttemptCompletion, QuizAttempt};

const ATTEMPT_COLUMNS: &str = "id, quiz_id, student_id, started_at, submitted_at, is_completed, \
                               status, score, percentage, question_order";

#[derive(FromRow)]
struct QuestionRow {
    id: Uuid,
    quiz_id: Uuid,
    text: String,
    question_type: String,
    marks: i32,
    sort_order: i32,
    options: Option<Vec<String>>,
    correct_answer: String,
}

impl TryFrom<QuestionRow> for QuizQuestion {
    type Error = Error;

    fn try_from(row: QuestionRow) -> Result<Self> {
        Ok(QuizQuestion {
            id: row.id,
            quiz_id: row.quiz_id,
            text: row.text,
            question_type: row.question_type.parse().map_err(Error::Internal)?,
            marks: row.marks,
            order: row.sort_order,
            options: row.options,
            correct_answer: row.correct_answer,
        })
    }
}

#[derive(FromRow)]
struct AttemptRow {
    id: Uuid,
    quiz_id: Uuid,
    student_id: Uuid,
    started_at: DateTime<Utc>,
    submitted_at: Option<DateTime<Utc>>,
    is_completed: bool,
    status: String,
    score: Option<Decimal>,
    percentage: Option<Decimal>,
    question_order: Vec<Uuid>,
}

impl TryFrom<AttemptRow> for QuizAttempt {
    type Error = Error;

    fn try_from(row: AttemptRow) -> Result<Self> {
        Ok(QuizAttempt {
            id: row.id,
            quiz_id: row.quiz_id,
            student_id: row.student_id,
            started_at: row.started_at,
            submitted_at: row.submitted_at,
            is_completed: row.is_completed,
            status: row.status.parse().map_err(Error::Internal)?,
            score: row.score,
            percentage: row.percentage,
            question_order: row.question_order,
        })
    }
}

fn into_attempts(rows: Vec<AttemptRow>) -> Result<Vec<QuizAttempt>> {
    rows.into_iter().map(QuizAttempt::try_from).collect()
}

/// Serializes opening and completing attempts for one (quiz, student) until the
/// transaction ends. `complete` derives the same key from the attempt row.
async fn lock_student_slot(conn: &mut PgConnection, quiz_id: Uuid, student_id: Uuid) -> Result<()> {
    sqlx::query(
        r#"SELECT pg_advisory_xact_lock(hashtextextended($1::uuid::text || ':' || $2::uuid::text, 0))"#,
    )
    .bind(quiz_id)
    .bind(student_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

#[derive(Clone)]
pub struct PgQuizRepository {
    pool: PgPool,
}

impl PgQuizRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuizRepository for PgQuizRepository {
    async fn insert_quiz(&self, quiz: &Quiz, questions: &[QuizQuestion]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO quizzes (
                id, course_id, title, description, duration_minutes, start_time, end_time,
                total_marks, shuffle_questions, max_attempts, is_active, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(quiz.id)
        .bind(quiz.course_id)
        .bind(&quiz.title)
        .bind(&quiz.description)
        .bind(quiz.duration_minutes)
        .bind(quiz.start_time)
        .bind(quiz.end_time)
        .bind(quiz.total_marks)
        .bind(quiz.shuffle_questions)
        .bind(quiz.max_attempts)
        .bind(quiz.is_active)
        .bind(quiz.created_at)
        .execute(&mut *tx)
        .await?;

        if !questions.is_empty() {
            let mut builder = QueryBuilder::<Postgres>::new(
                "INSERT INTO quiz_questions \
                 (id, quiz_id, text, question_type, marks, sort_order, options, correct_answer) ",
            );
            builder.push_values(questions, |mut b, q| {
                b.push_bind(q.id)
                    .push_bind(q.quiz_id)
                    .push_bind(q.text.clone())
                    .push_bind(q.question_type.as_str())
                    .push_bind(q.marks)
                    .push_bind(q.order)
                    .push_bind(q.options.clone())
                    .push_bind(q.correct_answer.clone());
            });
            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_quiz(&self, quiz_id: Uuid) -> Result<Option<Quiz>> {
        let quiz = sqlx::query_as::<_, Quiz>(
            r#"
            SELECT id, course_id, title, description, duration_minutes, start_time, end_time,
                   total_marks, shuffle_questions, max_attempts, is_active, created_at
            FROM quizzes WHERE id = $1
            "#,
        )
        .bind(quiz_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(quiz)
    }

    async fn find_questions(&self, quiz_id: Uuid) -> Result<Vec<QuizQuestion>> {
        let rows = sqlx::query_as::<_, QuestionRow>(
            r#"
            SELECT id, quiz_id, text, question_type, marks, sort_order, options, correct_answer
            FROM quiz_questions
            WHERE quiz_id = $1
            ORDER BY sort_order ASC, id ASC
            "#,
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(QuizQuestion::try_from).collect()
    }
}

#[derive(Clone)]
pub struct PgAttemptRepository {
    pool: PgPool,
}

impl PgAttemptRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttemptRepository for PgAttemptRepository {
    async fn count_completed(&self, quiz_id: Uuid, student_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM quiz_attempts WHERE quiz_id = $1 AND student_id = $2 AND is_completed"#,
        )
        .bind(quiz_id)
        .bind(student_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn find_in_progress(
        &self,
        quiz_id: Uuid,
        student_id: Uuid,
    ) -> Result<Option<QuizAttempt>> {
        let row = sqlx::query_as::<_, AttemptRow>(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM quiz_attempts \
             WHERE quiz_id = $1 AND student_id = $2 AND NOT is_completed"
        ))
        .bind(quiz_id)
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(QuizAttempt::try_from).transpose()
    }

    async fn insert_if_none_open(
        &self,
        attempt: QuizAttempt,
        max_attempts: Option<i32>,
    ) -> Result<OpenAttempt> {
        let mut tx = self.pool.begin().await?;
        lock_student_slot(&mut tx, attempt.quiz_id, attempt.student_id).await?;

        let completed: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM quiz_attempts WHERE quiz_id = $1 AND student_id = $2 AND is_completed"#,
        )
        .bind(attempt.quiz_id)
        .bind(attempt.student_id)
        .fetch_one(&mut *tx)
        .await?;
        if limit_reached(max_attempts, completed) {
            tx.rollback().await?;
            return Ok(OpenAttempt::LimitReached { completed });
        }

        let inserted = sqlx::query_as::<_, AttemptRow>(&format!(
            "INSERT INTO quiz_attempts \
                 (id, quiz_id, student_id, started_at, is_completed, status, question_order) \
             VALUES ($1, $2, $3, $4, FALSE, $5, $6) \
             ON CONFLICT (quiz_id, student_id) WHERE NOT is_completed DO NOTHING \
             RETURNING {ATTEMPT_COLUMNS}"
        ))
        .bind(attempt.id)
        .bind(attempt.quiz_id)
        .bind(attempt.student_id)
        .bind(attempt.started_at)
        .bind(attempt.status.as_str())
        .bind(&attempt.question_order)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = match inserted {
            Some(row) => OpenAttempt::Created(row.try_into()?),
            None => {
                // The slot lock keeps the conflicting row open until we commit.
                let existing = sqlx::query_as::<_, AttemptRow>(&format!(
                    "SELECT {ATTEMPT_COLUMNS} FROM quiz_attempts \
                     WHERE quiz_id = $1 AND student_id = $2 AND NOT is_completed"
                ))
                .bind(attempt.quiz_id)
                .bind(attempt.student_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| {
                    Error::Internal(format!(
                        "open attempt for quiz {} and student {} vanished under lock",
                        attempt.quiz_id, attempt.student_id
                    ))
                })?;
                OpenAttempt::Existing(existing.try_into()?)
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    async fn find_by_id(&self, attempt_id: Uuid) -> Result<Option<QuizAttempt>> {
        let row = sqlx::query_as::<_, AttemptRow>(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM quiz_attempts WHERE id = $1"
        ))
        .bind(attempt_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(QuizAttempt::try_from).transpose()
    }

    async fn find_answers(&self, attempt_id: Uuid) -> Result<Vec<QuizAnswer>> {
        let answers = sqlx::query_as::<_, QuizAnswer>(
            r#"
            SELECT attempt_id, question_id, answer_text, is_correct, marks_awarded
            FROM quiz_answers WHERE attempt_id = $1
            "#,
        )
        .bind(attempt_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(answers)
    }

    async fn complete(
        &self,
        attempt_id: Uuid,
        completion: &AttemptCompletion,
        answers: &[QuizAnswer],
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            SELECT pg_advisory_xact_lock(hashtextextended(quiz_id::text || ':' || student_id::text, 0))
            FROM quiz_attempts WHERE id = $1
            "#,
        )
        .bind(attempt_id)
        .execute(&mut *tx)
        .await?;

        let updated = sqlx::query(
            r#"
            UPDATE quiz_attempts
            SET is_completed = TRUE, status = $2, submitted_at = $3, score = $4, percentage = $5
            WHERE id = $1 AND NOT is_completed
            "#,
        )
        .bind(attempt_id)
        .bind(completion.status.as_str())
        .bind(completion.submitted_at)
        .bind(completion.score)
        .bind(completion.percentage)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        if !answers.is_empty() {
            let mut builder = QueryBuilder::<Postgres>::new(
                "INSERT INTO quiz_answers \
                 (attempt_id, question_id, answer_text, is_correct, marks_awarded) ",
            );
            builder.push_values(answers, |mut b, a| {
                b.push_bind(a.attempt_id)
                    .push_bind(a.question_id)
                    .push_bind(a.answer_text.clone())
                    .push_bind(a.is_correct)
                    .push_bind(a.marks_awarded);
            });
            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn list_for_quiz(&self, quiz_id: Uuid) -> Result<Vec<QuizAttempt>> {
        let rows = sqlx::query_as::<_, AttemptRow>(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM quiz_attempts \
             WHERE quiz_id = $1 \
             ORDER BY score DESC NULLS LAST, submitted_at ASC NULLS LAST, started_at ASC"
        ))
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;

        into_attempts(rows)
    }

    async fn list_in_progress(&self) -> Result<Vec<QuizAttempt>> {
        let rows = sqlx::query_as::<_, AttemptRow>(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM quiz_attempts \
             WHERE NOT is_completed ORDER BY started_at ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        into_attempts(rows)
    }
}
