use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dto::attempt_dto::{AttemptResult, QuestionResult, SubmitAnswer};
use crate::error::{Error, Result};
use crate::models::answer::QuizAnswer;
use crate::models::question::QuizQuestion;
use crate::models::quiz::Quiz;
use crate::models::quiz_attempt::QuizAttempt;

/// How a submitted answer is compared with the answer key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerMatchPolicy {
    /// Surrounding whitespace ignored, case ignored.
    #[default]
    TrimIgnoreCase,
    /// Byte-for-byte equality.
    Exact,
    /// Like `TrimIgnoreCase`, and runs of internal whitespace count as one space.
    CollapseWhitespace,
}

impl AnswerMatchPolicy {
    pub fn matches(&self, submitted: &str, correct: &str) -> bool {
        match self {
            AnswerMatchPolicy::Exact => submitted == correct,
            AnswerMatchPolicy::TrimIgnoreCase => {
                submitted.trim().to_lowercase() == correct.trim().to_lowercase()
            }
            AnswerMatchPolicy::CollapseWhitespace => {
                collapse_whitespace(submitted) == collapse_whitespace(correct)
            }
        }
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl std::str::FromStr for AnswerMatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trim_ignore_case" => Ok(AnswerMatchPolicy::TrimIgnoreCase),
            "exact" => Ok(AnswerMatchPolicy::Exact),
            "collapse_whitespace" => Ok(AnswerMatchPolicy::CollapseWhitespace),
            other => Err(format!("unknown answer match policy '{}'", other)),
        }
    }
}

/// `100 * score / total_marks`, or zero for a quiz without marks.
pub fn percentage(score: Decimal, total_marks: i32) -> Decimal {
    if total_marks == 0 {
        return Decimal::ZERO;
    }
    score * Decimal::ONE_HUNDRED / Decimal::from(total_marks)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradedSubmission {
    pub answers: Vec<QuizAnswer>,
    pub score: Decimal,
    pub percentage: Decimal,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GradingService {
    policy: AnswerMatchPolicy,
}

impl GradingService {
    pub fn new(policy: AnswerMatchPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> AnswerMatchPolicy {
        self.policy
    }

    pub fn grade_answer(&self, question: &QuizQuestion, answer_text: &str) -> (bool, Decimal) {
        let is_correct = self.policy.matches(answer_text, &question.correct_answer);
        let marks = if is_correct {
            Decimal::from(question.marks)
        } else {
            Decimal::ZERO
        };
        (is_correct, marks)
    }

    /// Grades one submission. Unanswered questions add nothing and produce no row.
    pub fn grade(
        &self,
        attempt_id: Uuid,
        questions: &[QuizQuestion],
        total_marks: i32,
        submitted: &[SubmitAnswer],
    ) -> Result<GradedSubmission> {
        let by_id: HashMap<Uuid, &QuizQuestion> = questions.iter().map(|q| (q.id, q)).collect();
        let mut seen = HashSet::with_capacity(submitted.len());
        let mut answers = Vec::with_capacity(submitted.len());
        let mut score = Decimal::ZERO;

        for answer in submitted {
            let question = by_id.get(&answer.question_id).ok_or_else(|| {
                Error::Validation(format!(
                    "Question {} does not belong to this quiz",
                    answer.question_id
                ))
            })?;
            if !seen.insert(answer.question_id) {
                return Err(Error::Validation(format!(
                    "Question {} was answered more than once",
                    answer.question_id
                )));
            }

            let (is_correct, marks_awarded) = self.grade_answer(question, &answer.answer_text);
            score += marks_awarded;
            answers.push(QuizAnswer {
                attempt_id,
                question_id: answer.question_id,
                answer_text: answer.answer_text.clone(),
                is_correct,
                marks_awarded,
            });
        }

        Ok(GradedSubmission {
            answers,
            score,
            percentage: percentage(score, total_marks),
        })
    }

    /// Per-question breakdown in the attempt's snapshot order.
    pub fn result_view(
        &self,
        attempt: &QuizAttempt,
        quiz: &Quiz,
        questions: &[QuizQuestion],
        answers: &[QuizAnswer],
    ) -> AttemptResult {
        let by_id: HashMap<Uuid, &QuizQuestion> = questions.iter().map(|q| (q.id, q)).collect();
        let answers_by_question: HashMap<Uuid, &QuizAnswer> =
            answers.iter().map(|a| (a.question_id, a)).collect();

        let ordered: Vec<&QuizQuestion> = if attempt.question_order.is_empty() {
            questions.iter().collect()
        } else {
            attempt
                .question_order
                .iter()
                .filter_map(|id| by_id.get(id).copied())
                .collect()
        };

        let breakdown = ordered
            .into_iter()
            .map(|q| {
                let answer = answers_by_question.get(&q.id);
                QuestionResult {
                    question_id: q.id,
                    question_text: q.text.clone(),
                    submitted_answer: answer.map(|a| a.answer_text.clone()),
                    correct_answer: q.correct_answer.clone(),
                    is_correct: answer.map(|a| a.is_correct).unwrap_or(false),
                    marks_awarded: answer.map(|a| a.marks_awarded).unwrap_or(Decimal::ZERO),
                    marks: q.marks,
                }
            })
            .collect();

        AttemptResult {
            attempt_id: attempt.id,
            quiz_id: quiz.id,
            student_id: attempt.student_id,
            status: attempt.status,
            submitted_at: attempt.submitted_at,
            score: attempt.score.unwrap_or(Decimal::ZERO),
            percentage: attempt.percentage.unwrap_or(Decimal::ZERO),
            total_marks: quiz.total_marks,
            questions: breakdown,
        }
    }
}
