pub mod attempt_dto;
pub mod quiz_dto;
pub mod webhook_dto;
