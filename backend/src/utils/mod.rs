//! Shared utility modules.

pub mod jwt;
