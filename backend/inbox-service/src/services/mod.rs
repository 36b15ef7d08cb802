pub mod conversation_service;
pub mod message_service;
pub mod notification_service;
pub mod story_service;
