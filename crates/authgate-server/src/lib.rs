//! authgate server library
//!
//! Core functionality for the authgate API:
//! - SQLite identity store with lockout tracking
//! - bcrypt password hashing and credential verification
//! - HS256 JWT issuance and validation
//! - axum HTTP routes with bearer-token role checks

pub mod auth;
pub mod error;
pub mod server;
pub mod service;
pub mod storage;
