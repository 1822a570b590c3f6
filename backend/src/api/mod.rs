//! API surface shared across routes.

pub mod common;
