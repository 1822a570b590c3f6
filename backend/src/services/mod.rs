//! External collaborator services.

pub mod email_service;
