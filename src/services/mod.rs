pub mod password;
pub mod photo_service;
pub mod user_store;
