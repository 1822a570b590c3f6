//! Persistence layer for the authentication subsystem.

pub mod user_repository;
