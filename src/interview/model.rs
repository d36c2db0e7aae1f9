//! Interview session and message data model.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Finished,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Finished => "finished",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "finished" => Self::Finished,
            _ => Self::Active,
        }
    }
}

/// One user's progress through the interview catalog.
///
/// Invariants maintained by the protocol handler:
/// - `answers_count <= question_index <= total questions`
/// - `status == Finished` implies `answers_count == total questions`
/// - for every answered index `i`, the answer exists both as a user-role
///   message at position `i` and as a `collected_data` entry keyed by
///   that question's id.
#[derive(Debug, Clone, Serialize)]
pub struct InterviewSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub status: SessionStatus,
    /// Count of questions presented so far (1-based; the next question
    /// to present sits at zero-based index `question_index - 1`).
    pub question_index: u32,
    /// Count of questions answered so far.
    pub answers_count: u32,
    /// Raw accepted answers keyed by question id.
    pub collected_data: HashMap<String, String>,
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Bot,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bot => "bot",
            Self::User => "user",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "user" => Self::User,
            _ => Self::Bot,
        }
    }
}

/// A persisted transcript message, append-only, ordered by `created_at`
/// within a session. The user-role message at position `i` answers the
/// question at global index `i`.
#[derive(Debug, Clone, Serialize)]
pub struct StoredMessage {
    pub id: Uuid,
    pub session_id: Uuid,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
