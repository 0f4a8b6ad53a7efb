//! `SQLite` identity store.

authgate_core::define_database!(IdentityDatabase, "Identity store migrations complete");
