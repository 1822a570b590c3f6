//! Authentication module for managing user credentials and sessions.
//!
//! This module provides the public interface for the credential lifecycle:
//! registration, login, session-token validation, and the time-limited
//! password-reset flow.

pub mod handlers;
pub mod models;
pub mod policy;
pub mod routes;
pub mod service;
