//! Persistence layer — libSQL-backed storage for users, sessions, and
//! transcript messages.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::{SessionPatch, SessionStore, User};
