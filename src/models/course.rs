use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Course facts owned by the surrounding course service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseInfo {
    pub id: Uuid,
    pub name: String,
    pub instructor_id: Uuid,
}
