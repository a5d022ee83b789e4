pub mod health_handlers;
pub mod photo_handlers;
pub mod user_handlers;
