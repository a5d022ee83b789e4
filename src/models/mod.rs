//! Core data models for the alumni-association backend.
//!
//! These entities represent registered alumni and the payloads used to
//! create and update them. They map cleanly to database rows via
//! `sqlx::FromRow` and serialize naturally as JSON via `serde`.

pub mod user;
