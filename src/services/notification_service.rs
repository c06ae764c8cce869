use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::config::Config;
use crate::dto::webhook_dto::{GradePostedWebhook, QuizAvailableWebhook, WebhookCourse};

pub const GRADE_POSTED_EVENT: &str = "grade-posted";
pub const QUIZ_AVAILABLE_EVENT: &str = "quiz-available";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradePosted {
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub course_name: String,
    pub item_title: String,
    pub score: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizAvailable {
    pub course_id: Uuid,
    pub course_name: String,
    pub quiz_id: Uuid,
    pub quiz_title: String,
    pub start_time: DateTime<Utc>,
}

/// Fire-and-forget sink for engine events. Implementations must not block the caller
/// and must swallow their own failures.
#[cfg_attr(test, mockall::automock)]
pub trait GradeNotifier: Send + Sync {
    fn notify_grade_posted(&self, event: GradePosted);
    fn notify_quiz_available(&self, event: QuizAvailable);
}

/// Used when no webhook target is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl GradeNotifier for LogNotifier {
    fn notify_grade_posted(&self, event: GradePosted) {
        tracing::info!(
            student_id = %event.student_id,
            course = %event.course_name,
            item = %event.item_title,
            score = %event.score,
            "grade posted"
        );
    }

    fn notify_quiz_available(&self, event: QuizAvailable) {
        tracing::info!(
            quiz_id = %event.quiz_id,
            course = %event.course_name,
            title = %event.quiz_title,
            starts_at = %event.start_time,
            "quiz available"
        );
    }
}

#[derive(Clone)]
pub struct WebhookNotifier {
    client: Client,
    target_url: String,
    secret: Option<String>,
}

impl WebhookNotifier {
    pub fn new(target_url: String, secret: Option<String>) -> Self {
        Self {
            client: Client::new(),
            target_url,
            secret,
        }
    }

    fn send_webhook<T>(&self, event_type: &'static str, payload: T)
    where
        T: Serialize + Send + 'static,
    {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::error!(event = event_type, "no async runtime, webhook dropped");
            return;
        };

        let client = self.client.clone();
        let url = self.target_url.clone();
        let secret = self.secret.clone();
        handle.spawn(async move {
            let mut request = client.post(&url).json(&payload);
            if let Some(secret) = secret {
                request = request.header("X-Webhook-Secret", secret);
            }
            match request.send().await {
                Ok(resp) if resp.status().is_success() => {
                    tracing::debug!(event = event_type, status = %resp.status(), "webhook delivered");
                }
                Ok(resp) => {
                    tracing::error!(
                        event = event_type,
                        status = %resp.status(),
                        url = %url,
                        "webhook rejected"
                    );
                }
                Err(e) => {
                    tracing::error!(error = ?e, event = event_type, url = %url, "webhook delivery failed");
                }
            }
        });
    }
}

impl GradeNotifier for WebhookNotifier {
    fn notify_grade_posted(&self, event: GradePosted) {
        let payload = GradePostedWebhook {
            event: GRADE_POSTED_EVENT.to_string(),
            student_id: event.student_id,
            course: WebhookCourse {
                id: Some(event.course_id),
                name: event.course_name,
            },
            item_title: event.item_title,
            score: event.score,
        };
        self.send_webhook(GRADE_POSTED_EVENT, payload);
    }

    fn notify_quiz_available(&self, event: QuizAvailable) {
        let payload = QuizAvailableWebhook {
            event: QUIZ_AVAILABLE_EVENT.to_string(),
            quiz_id: event.quiz_id,
            course: WebhookCourse {
                id: Some(event.course_id),
                name: event.course_name,
            },
            quiz_title: event.quiz_title,
            start_time: event.start_time,
        };
        self.send_webhook(QUIZ_AVAILABLE_EVENT, payload);
    }
}

/// Webhook delivery when `GRADE_WEBHOOK_URL` is set, log lines otherwise.
pub fn notifier_from_config(config: &Config) -> Arc<dyn GradeNotifier> {
    match &config.grade_webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url.clone(), config.webhook_secret.clone())),
        None => Arc::new(LogNotifier),
    }
}
