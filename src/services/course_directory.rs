use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::course::CourseInfo;

/// Read-only view of the course catalogue owned by the surrounding application.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CourseDirectory: Send + Sync {
    async fn course(&self, course_id: Uuid) -> Result<Option<CourseInfo>>;
}

#[derive(Default)]
pub struct InMemoryCourseDirectory {
    courses: RwLock<HashMap<Uuid, CourseInfo>>,
}

impl InMemoryCourseDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, course: CourseInfo) -> Result<()> {
        self.courses
            .write()
            .map_err(|_| Error::Internal("course directory lock poisoned".to_string()))?
            .insert(course.id, course);
        Ok(())
    }
}

#[async_trait]
impl CourseDirectory for InMemoryCourseDirectory {
    async fn course(&self, course_id: Uuid) -> Result<Option<CourseInfo>> {
        let courses = self
            .courses
            .read()
            .map_err(|_| Error::Internal("course directory lock poisoned".to_string()))?;
        Ok(courses.get(&course_id).cloned())
    }
}
