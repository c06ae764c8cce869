use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradePostedWebhook {
    pub event: String,
    pub student_id: uuid::Uuid,
    pub course: WebhookCourse,
    pub item_title: String,
    pub score: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizAvailableWebhook {
    pub event: String,
    pub quiz_id: uuid::Uuid,
    pub course: WebhookCourse,
    pub quiz_title: String,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookCourse {
    pub id: Option<uuid::Uuid>,
    pub name: String,
}
