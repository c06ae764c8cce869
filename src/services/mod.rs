pub mod attempt_service;
pub mod course_directory;
pub mod expiry_service;
pub mod grading_service;
pub mod notification_service;
pub mod quiz_service;
pub mod result_service;
