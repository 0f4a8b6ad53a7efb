//! `authgate` Core Library
//!
//! Shared functionality for `authgate` components:
//! - Layered configuration (defaults, settings file, environment)
//! - `SQLite` pool helpers and the database error type
//! - Tracing subscriber setup
//! - Common error types

pub mod config;
pub mod db;
pub mod error;
pub mod tracing_init;

pub use config::Config;
pub use error::{Error, Result};
