mod common;

use chrono::{Duration, Utc};
use common::{harness, quiz_payload, short_answer};
use quiz_engine::dto::attempt_dto::{SubmitAnswer, SubmitAttemptRequest};
use quiz_engine::error::Error;
use quiz_engine::models::quiz_attempt::AttemptStatus;
use quiz_engine::models::user::Role;
use rust_decimal::Decimal;
use uuid::Uuid;

fn answers(pairs: &[(Uuid, &str)]) -> SubmitAttemptRequest {
    SubmitAttemptRequest {
        answers: pairs
            .iter()
            .map(|(id, text)| SubmitAnswer::new(*id, *text))
            .collect(),
    }
}

#[tokio::test]
async fn all_correct_answers_score_full_marks() {
    let h = harness();
    let now = Utc::now();
    let (quiz, questions) = h.create_quiz(quiz_payload(h.course.id, now), now).await;
    let student = Uuid::new_v4();

    let session = h
        .state
        .attempt_service
        .start_or_resume(quiz.id, student, now)
        .await
        .unwrap();
    assert!(!session.resumed);
    assert_eq!(session.deadline, now + Duration::minutes(30));

    let result = h
        .state
        .attempt_service
        .submit(
            session.attempt_id(),
            student,
            now + Duration::minutes(5),
            answers(&[(questions[0].id, "mitochondria"), (questions[1].id, "  GENE ")]),
        )
        .await
        .unwrap();

    assert_eq!(result.score, Decimal::from(10));
    assert_eq!(result.percentage, Decimal::from(100));
    assert_eq!(result.total_marks, 10);
    assert_eq!(result.status, AttemptStatus::Completed);
    assert!(result.questions.iter().all(|q| q.is_correct));

    let grades = h.notifier.grades.lock().unwrap();
    assert_eq!(grades.len(), 1);
    assert_eq!(grades[0].student_id, student);
    assert_eq!(grades[0].course_name, "Introductory Biology");
    assert_eq!(grades[0].item_title, "Cell Biology");
    assert_eq!(grades[0].score, Decimal::from(10));
}

#[tokio::test]
async fn partial_answers_score_half() {
    let h = harness();
    let now = Utc::now();
    let (quiz, questions) = h.create_quiz(quiz_payload(h.course.id, now), now).await;
    let student = Uuid::new_v4();

    let session = h
        .state
        .attempt_service
        .start_or_resume(quiz.id, student, now)
        .await
        .unwrap();
    let result = h
        .state
        .attempt_service
        .submit(
            session.attempt_id(),
            student,
            now,
            answers(&[(questions[0].id, "Mitochondria"), (questions[1].id, "Chromosome")]),
        )
        .await
        .unwrap();

    assert_eq!(result.score, Decimal::from(5));
    assert_eq!(result.percentage, Decimal::from(50));
    let wrong = result
        .questions
        .iter()
        .find(|q| q.question_id == questions[1].id)
        .unwrap();
    assert!(!wrong.is_correct);
    assert_eq!(wrong.submitted_answer.as_deref(), Some("Chromosome"));
    assert_eq!(wrong.correct_answer, "Gene");
}

#[tokio::test]
async fn unanswered_questions_show_up_in_the_breakdown() {
    let h = harness();
    let now = Utc::now();
    let (quiz, questions) = h.create_quiz(quiz_payload(h.course.id, now), now).await;
    let student = Uuid::new_v4();

    let session = h
        .state
        .attempt_service
        .start_or_resume(quiz.id, student, now)
        .await
        .unwrap();
    let result = h
        .state
        .attempt_service
        .submit(
            session.attempt_id(),
            student,
            now,
            answers(&[(questions[1].id, "gene")]),
        )
        .await
        .unwrap();

    assert_eq!(result.questions.len(), 2);
    let skipped = &result.questions[0];
    assert_eq!(skipped.question_id, questions[0].id);
    assert_eq!(skipped.submitted_answer, None);
    assert_eq!(skipped.marks_awarded, Decimal::ZERO);
    assert_eq!(result.score, Decimal::from(5));
}

#[tokio::test]
async fn overdue_attempt_expires_on_resume_and_cannot_be_submitted() {
    let h = harness();
    let now = Utc::now();
    let (quiz, questions) = h.create_quiz(quiz_payload(h.course.id, now), now).await;
    let student = Uuid::new_v4();

    let session = h
        .state
        .attempt_service
        .start_or_resume(quiz.id, student, now)
        .await
        .unwrap();

    let at_deadline = session.deadline;
    let err = h
        .state
        .attempt_service
        .start_or_resume(quiz.id, student, at_deadline)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Expired { deadline } if deadline == session.deadline));

    let err = h
        .state
        .attempt_service
        .submit(
            session.attempt_id(),
            student,
            at_deadline,
            answers(&[(questions[0].id, "Mitochondria")]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AlreadySubmitted));

    let result = h
        .state
        .result_service
        .get_attempt_result(session.attempt_id(), student, Role::Student)
        .await
        .unwrap();
    assert_eq!(result.status, AttemptStatus::Expired);
    assert_eq!(result.score, Decimal::ZERO);
    assert_eq!(result.percentage, Decimal::ZERO);
    assert!(result.questions.iter().all(|q| q.submitted_answer.is_none()));
    assert!(h.notifier.grades.lock().unwrap().is_empty());
}

#[tokio::test]
async fn submit_is_on_time_up_to_the_deadline_and_expired_after() {
    let h = harness();
    let now = Utc::now();
    let (quiz, questions) = h.create_quiz(quiz_payload(h.course.id, now), now).await;

    let on_time = Uuid::new_v4();
    let session = h
        .state
        .attempt_service
        .start_or_resume(quiz.id, on_time, now)
        .await
        .unwrap();
    assert!(h
        .state
        .attempt_service
        .submit(
            session.attempt_id(),
            on_time,
            session.deadline,
            answers(&[(questions[0].id, "Mitochondria")]),
        )
        .await
        .is_ok());

    let late = Uuid::new_v4();
    let session = h
        .state
        .attempt_service
        .start_or_resume(quiz.id, late, now)
        .await
        .unwrap();
    let err = h
        .state
        .attempt_service
        .submit(
            session.attempt_id(),
            late,
            session.deadline + Duration::milliseconds(1),
            answers(&[(questions[0].id, "Mitochondria")]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Expired { .. }));
}

#[tokio::test]
async fn second_submit_is_rejected_and_score_is_unchanged() {
    let h = harness();
    let now = Utc::now();
    let (quiz, questions) = h.create_quiz(quiz_payload(h.course.id, now), now).await;
    let student = Uuid::new_v4();

    let session = h
        .state
        .attempt_service
        .start_or_resume(quiz.id, student, now)
        .await
        .unwrap();
    h.state
        .attempt_service
        .submit(
            session.attempt_id(),
            student,
            now,
            answers(&[(questions[0].id, "Mitochondria")]),
        )
        .await
        .unwrap();

    let err = h
        .state
        .attempt_service
        .submit(
            session.attempt_id(),
            student,
            now,
            answers(&[(questions[0].id, "Mitochondria"), (questions[1].id, "Gene")]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AlreadySubmitted));

    let result = h
        .state
        .result_service
        .get_attempt_result(session.attempt_id(), student, Role::Student)
        .await
        .unwrap();
    assert_eq!(result.score, Decimal::from(5));
    assert_eq!(h.notifier.grades.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn attempt_limit_blocks_a_second_attempt() {
    let h = harness();
    let now = Utc::now();
    let mut payload = quiz_payload(h.course.id, now);
    payload.max_attempts = Some(1);
    let (quiz, _) = h.create_quiz(payload, now).await;
    let student = Uuid::new_v4();

    let session = h
        .state
        .attempt_service
        .start_or_resume(quiz.id, student, now)
        .await
        .unwrap();
    h.state
        .attempt_service
        .submit(session.attempt_id(), student, now, SubmitAttemptRequest::default())
        .await
        .unwrap();

    let err = h
        .state
        .attempt_service
        .start_or_resume(quiz.id, student, now + Duration::minutes(1))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AttemptLimitReached { max_attempts: 1 }));
}

#[tokio::test]
async fn unlimited_quizzes_allow_fresh_attempts_after_completion() {
    let h = harness();
    let now = Utc::now();
    let (quiz, _) = h.create_quiz(quiz_payload(h.course.id, now), now).await;
    let student = Uuid::new_v4();

    let first = h
        .state
        .attempt_service
        .start_or_resume(quiz.id, student, now)
        .await
        .unwrap();
    h.state
        .attempt_service
        .submit(first.attempt_id(), student, now, SubmitAttemptRequest::default())
        .await
        .unwrap();

    let second = h
        .state
        .attempt_service
        .start_or_resume(quiz.id, student, now)
        .await
        .unwrap();
    assert_ne!(first.attempt_id(), second.attempt_id());
    assert!(!second.resumed);
}

#[tokio::test]
async fn availability_window_and_active_flag_gate_starts() {
    let h = harness();
    let now = Utc::now();
    let (quiz, _) = h.create_quiz(quiz_payload(h.course.id, now), now).await;
    let student = Uuid::new_v4();
    let svc = &h.state.attempt_service;

    assert!(matches!(
        svc.start_or_resume(quiz.id, student, quiz.start_time - Duration::seconds(1))
            .await,
        Err(Error::NotStarted { .. })
    ));
    assert!(matches!(
        svc.start_or_resume(quiz.id, student, quiz.end_time + Duration::seconds(1))
            .await,
        Err(Error::Ended { .. })
    ));
    assert!(matches!(
        svc.start_or_resume(Uuid::new_v4(), student, now).await,
        Err(Error::NotFound(_))
    ));

    h.quizzes.set_active(quiz.id, false).unwrap();
    assert!(matches!(
        svc.start_or_resume(quiz.id, student, now).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn resume_returns_the_same_shuffled_order() {
    let h = harness();
    let now = Utc::now();
    let mut payload = quiz_payload(h.course.id, now);
    payload.shuffle_questions = true;
    payload.questions = (0..12)
        .map(|i| short_answer(&format!("Question {}", i), 1, &i.to_string()))
        .collect();
    let (quiz, questions) = h.create_quiz(payload, now).await;
    let student = Uuid::new_v4();

    let first = h
        .state
        .attempt_service
        .start_or_resume(quiz.id, student, now)
        .await
        .unwrap();
    let again = h
        .state
        .attempt_service
        .start_or_resume(quiz.id, student, now + Duration::minutes(10))
        .await
        .unwrap();

    assert!(again.resumed);
    assert_eq!(again.attempt_id(), first.attempt_id());
    assert_eq!(again.deadline, first.deadline);
    let first_ids: Vec<Uuid> = first.questions.iter().map(|q| q.id).collect();
    let again_ids: Vec<Uuid> = again.questions.iter().map(|q| q.id).collect();
    assert_eq!(first_ids, again_ids);
    assert_eq!(first_ids, first.attempt.question_order);

    let mut sorted = first_ids.clone();
    sorted.sort();
    let mut declared: Vec<Uuid> = questions.iter().map(|q| q.id).collect();
    declared.sort();
    assert_eq!(sorted, declared);
}

#[tokio::test]
async fn unshuffled_quizzes_keep_declared_order() {
    let h = harness();
    let now = Utc::now();
    let (quiz, questions) = h.create_quiz(quiz_payload(h.course.id, now), now).await;

    let session = h
        .state
        .attempt_service
        .start_or_resume(quiz.id, Uuid::new_v4(), now)
        .await
        .unwrap();
    let ids: Vec<Uuid> = session.questions.iter().map(|q| q.id).collect();
    assert_eq!(ids, questions.iter().map(|q| q.id).collect::<Vec<_>>());
}

#[tokio::test]
async fn malformed_submissions_are_validation_errors() {
    let h = harness();
    let now = Utc::now();
    let (quiz, questions) = h.create_quiz(quiz_payload(h.course.id, now), now).await;
    let student = Uuid::new_v4();
    let session = h
        .state
        .attempt_service
        .start_or_resume(quiz.id, student, now)
        .await
        .unwrap();
    let svc = &h.state.attempt_service;

    let foreign = answers(&[(Uuid::new_v4(), "x")]);
    assert!(matches!(
        svc.submit(session.attempt_id(), student, now, foreign).await,
        Err(Error::Validation(_))
    ));

    let repeated = answers(&[(questions[0].id, "a"), (questions[0].id, "b")]);
    assert!(matches!(
        svc.submit(session.attempt_id(), student, now, repeated).await,
        Err(Error::Validation(_))
    ));

    let huge = "y".repeat(10_001);
    let oversized = answers(&[(questions[0].id, huge.as_str())]);
    assert!(matches!(
        svc.submit(session.attempt_id(), student, now, oversized).await,
        Err(Error::Validation(_))
    ));

    // Rejected payloads leave the attempt open.
    assert!(svc
        .submit(
            session.attempt_id(),
            student,
            now,
            answers(&[(questions[0].id, "Mitochondria")])
        )
        .await
        .is_ok());
}

#[tokio::test]
async fn results_are_visible_to_owner_instructor_and_admin_only() {
    let h = harness();
    let now = Utc::now();
    let (quiz, questions) = h.create_quiz(quiz_payload(h.course.id, now), now).await;
    let student = Uuid::new_v4();
    let session = h
        .state
        .attempt_service
        .start_or_resume(quiz.id, student, now)
        .await
        .unwrap();
    h.state
        .attempt_service
        .submit(
            session.attempt_id(),
            student,
            now,
            answers(&[(questions[0].id, "Mitochondria")]),
        )
        .await
        .unwrap();
    let results = &h.state.result_service;

    let as_instructor = results
        .get_attempt_result(session.attempt_id(), h.course.instructor_id, Role::Instructor)
        .await
        .unwrap();
    assert_eq!(as_instructor.score, Decimal::from(5));

    assert!(results
        .get_attempt_result(session.attempt_id(), Uuid::new_v4(), Role::Admin)
        .await
        .is_ok());

    assert!(matches!(
        results
            .get_attempt_result(session.attempt_id(), Uuid::new_v4(), Role::Student)
            .await,
        Err(Error::Forbidden(_))
    ));
    assert!(matches!(
        results
            .get_attempt_result(session.attempt_id(), Uuid::new_v4(), Role::Instructor)
            .await,
        Err(Error::Forbidden(_))
    ));
    assert!(matches!(
        results
            .get_attempt_result(Uuid::new_v4(), student, Role::Student)
            .await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn in_progress_attempts_have_no_result_yet() {
    let h = harness();
    let now = Utc::now();
    let (quiz, _) = h.create_quiz(quiz_payload(h.course.id, now), now).await;
    let student = Uuid::new_v4();
    let session = h
        .state
        .attempt_service
        .start_or_resume(quiz.id, student, now)
        .await
        .unwrap();

    assert!(matches!(
        h.state
            .result_service
            .get_attempt_result(session.attempt_id(), student, Role::Student)
            .await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn listing_ranks_attempts_by_score() {
    let h = harness();
    let now = Utc::now();
    let (quiz, questions) = h.create_quiz(quiz_payload(h.course.id, now), now).await;
    let svc = &h.state.attempt_service;

    let mut students = Vec::new();
    for correct in [1, 2, 0] {
        let student = Uuid::new_v4();
        let session = svc.start_or_resume(quiz.id, student, now).await.unwrap();
        let given: Vec<(Uuid, &str)> = questions
            .iter()
            .zip(["Mitochondria", "Gene"])
            .take(correct)
            .map(|(q, a)| (q.id, a))
            .collect();
        svc.submit(session.attempt_id(), student, now, answers(&given))
            .await
            .unwrap();
        students.push(student);
    }
    let pending = Uuid::new_v4();
    svc.start_or_resume(quiz.id, pending, now).await.unwrap();

    let listed = svc.list_attempts_for_quiz(quiz.id).await.unwrap();
    let order: Vec<Uuid> = listed.iter().map(|a| a.student_id).collect();
    assert_eq!(order, vec![students[1], students[0], students[2], pending]);
    assert_eq!(listed[3].score, None);

    assert!(matches!(
        svc.list_attempts_for_quiz(Uuid::new_v4()).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn percentage_matches_score_over_total_marks() {
    let h = harness();
    let now = Utc::now();
    let mut payload = quiz_payload(h.course.id, now);
    payload.questions = vec![
        short_answer("a", 3, "a"),
        short_answer("b", 4, "b"),
        short_answer("c", 2, "c"),
    ];
    let (quiz, questions) = h.create_quiz(payload, now).await;
    assert_eq!(quiz.total_marks, 9);

    let svc = &h.state.attempt_service;
    for mask in 0u8..8 {
        let student = Uuid::new_v4();
        let session = svc.start_or_resume(quiz.id, student, now).await.unwrap();
        let given: Vec<(Uuid, &str)> = questions
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << *i) != 0)
            .map(|(_, q)| (q.id, q.correct_answer.as_str()))
            .collect();
        let result = svc
            .submit(session.attempt_id(), student, now, answers(&given))
            .await
            .unwrap();
        assert_eq!(
            result.percentage,
            result.score * Decimal::from(100) / Decimal::from(quiz.total_marks)
        );
    }
}

#[tokio::test]
async fn creating_a_quiz_announces_it() {
    let h = harness();
    let now = Utc::now();
    let (quiz, _) = h.create_quiz(quiz_payload(h.course.id, now), now).await;

    let announced = h.notifier.quizzes.lock().unwrap();
    assert_eq!(announced.len(), 1);
    assert_eq!(announced[0].quiz_id, quiz.id);
    assert_eq!(announced[0].course_name, "Introductory Biology");
}

#[tokio::test]
async fn sweep_expires_only_overdue_attempts() {
    let h = harness();
    let now = Utc::now();
    let (quiz, _) = h.create_quiz(quiz_payload(h.course.id, now), now).await;
    let svc = &h.state.attempt_service;

    let early = Uuid::new_v4();
    svc.start_or_resume(quiz.id, early, now - Duration::minutes(45))
        .await
        .unwrap();
    let fresh = Uuid::new_v4();
    svc.start_or_resume(quiz.id, fresh, now).await.unwrap();

    let expired = h.state.expiry_service.expire_overdue(now).await.unwrap();
    assert_eq!(expired, 1);
    assert_eq!(h.state.expiry_service.expire_overdue(now).await.unwrap(), 0);

    let listed = svc.list_attempts_for_quiz(quiz.id).await.unwrap();
    let early_row = listed.iter().find(|a| a.student_id == early).unwrap();
    let fresh_row = listed.iter().find(|a| a.student_id == fresh).unwrap();
    assert_eq!(early_row.status, AttemptStatus::Expired);
    assert_eq!(fresh_row.status, AttemptStatus::InProgress);
}
