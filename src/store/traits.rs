//! `SessionStore` — single async interface for all persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::interview::model::{InterviewSession, Role, SessionStatus, StoredMessage};

/// A registered user account.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub login: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Partial session update. Unset fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct SessionPatch {
    pub status: Option<SessionStatus>,
    pub question_index: Option<u32>,
    pub answers_count: Option<u32>,
}

impl SessionPatch {
    pub fn status(mut self, status: SessionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn question_index(mut self, index: u32) -> Self {
        self.question_index = Some(index);
        self
    }

    pub fn answers_count(mut self, count: u32) -> Self {
        self.answers_count = Some(count);
        self
    }
}

/// Backend-agnostic persistence trait covering sessions, messages,
/// and user accounts.
///
/// Each call is individually atomic; the interview flow only requires
/// last-writer-wins semantics across calls.
#[async_trait]
pub trait SessionStore: Send + Sync {
    // ── Sessions ────────────────────────────────────────────────────

    /// Create a fresh active session for a user.
    async fn create_session(&self, user_id: Uuid) -> Result<InterviewSession, DatabaseError>;

    /// Get a session by id.
    async fn get_session(&self, id: Uuid) -> Result<Option<InterviewSession>, DatabaseError>;

    /// Get the user's most recently created session, if any.
    async fn get_latest_session(
        &self,
        user_id: Uuid,
    ) -> Result<Option<InterviewSession>, DatabaseError>;

    /// Apply a partial update and return the updated session.
    async fn update_session(
        &self,
        id: Uuid,
        patch: SessionPatch,
    ) -> Result<InterviewSession, DatabaseError>;

    /// Persist one accepted answer into the session's collected data,
    /// keyed by question id.
    async fn record_answer(
        &self,
        id: Uuid,
        question_id: &str,
        answer: &str,
    ) -> Result<(), DatabaseError>;

    // ── Messages ────────────────────────────────────────────────────

    /// Append a transcript message.
    async fn add_message(
        &self,
        session_id: Uuid,
        role: Role,
        content: &str,
    ) -> Result<StoredMessage, DatabaseError>;

    /// All messages of a session, oldest first.
    async fn list_messages(&self, session_id: Uuid) -> Result<Vec<StoredMessage>, DatabaseError>;

    // ── Users ───────────────────────────────────────────────────────

    /// Create a user account. Fails on duplicate login.
    async fn create_user(
        &self,
        login: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, DatabaseError>;

    /// Look up a user by login.
    async fn get_user_by_login(&self, login: &str) -> Result<Option<User>, DatabaseError>;
}
