//! `SQLite` storage for authgate identities.
//!
//! Holds accounts, their password hashes, roles and lockout state.

mod db;
mod models;
mod queries;


pub use authgate_core::db::DatabaseError;
pub use db::IdentityDatabase;
pub use models::*;
