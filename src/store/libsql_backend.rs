//! libSQL backend — async `SessionStore` implementation.
//!
//! Supports local file and in-memory databases. A single connection is
//! reused for all operations; `libsql::Connection` is `Send + Sync`
//! and safe for concurrent async use.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::info;
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::interview::model::{InterviewSession, Role, SessionStatus, StoredMessage};
use crate::store::migrations;
use crate::store::traits::{SessionPatch, SessionStore, User};

/// libSQL database backend.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Connection(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Connection(format!("Failed to open database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Connection(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        migrations::run_migrations(backend.conn()).await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Connection(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Connection(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        migrations::run_migrations(backend.conn()).await?;
        Ok(backend)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Map a libsql Row to an InterviewSession.
///
/// Column order: 0:id, 1:user_id, 2:status, 3:question_index,
/// 4:answers_count, 5:collected_data, 6:created_at
fn row_to_session(row: &libsql::Row) -> Result<InterviewSession, libsql::Error> {
    let id_str: String = row.get(0)?;
    let user_str: String = row.get(1)?;
    let status_str: String = row.get(2)?;
    let question_index: i64 = row.get(3)?;
    let answers_count: i64 = row.get(4)?;
    let data_str: String = row.get(5)?;
    let created_str: String = row.get(6)?;

    let collected_data: HashMap<String, String> =
        serde_json::from_str(&data_str).unwrap_or_default();

    Ok(InterviewSession {
        id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::nil()),
        user_id: Uuid::parse_str(&user_str).unwrap_or_else(|_| Uuid::nil()),
        status: SessionStatus::from_str(&status_str),
        question_index: question_index as u32,
        answers_count: answers_count as u32,
        collected_data,
        created_at: parse_datetime(&created_str),
    })
}

const SESSION_COLUMNS: &str =
    "id, user_id, status, question_index, answers_count, collected_data, created_at";

#[async_trait]
impl SessionStore for LibSqlBackend {
    // ── Sessions ────────────────────────────────────────────────────

    async fn create_session(&self, user_id: Uuid) -> Result<InterviewSession, DatabaseError> {
        let conn = self.conn();
        let id = Uuid::new_v4();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO sessions (id, user_id, status, question_index, answers_count, collected_data, created_at)
             VALUES (?1, ?2, 'active', 0, 0, '{}', ?3)",
            params![id.to_string(), user_id.to_string(), now.to_rfc3339()],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("create_session: {e}")))?;

        Ok(InterviewSession {
            id,
            user_id,
            created_at: now,
            status: SessionStatus::Active,
            question_index: 0,
            answers_count: 0,
            collected_data: HashMap::new(),
        })
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<InterviewSession>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"),
                params![id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_session: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(
                row_to_session(&row)
                    .map_err(|e| DatabaseError::Query(format!("get_session row: {e}")))?,
            )),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_session: {e}"))),
        }
    }

    async fn get_latest_session(
        &self,
        user_id: Uuid,
    ) -> Result<Option<InterviewSession>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {SESSION_COLUMNS} FROM sessions
                     WHERE user_id = ?1
                     ORDER BY created_at DESC, rowid DESC
                     LIMIT 1"
                ),
                params![user_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_latest_session: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(
                row_to_session(&row)
                    .map_err(|e| DatabaseError::Query(format!("get_latest_session row: {e}")))?,
            )),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_latest_session: {e}"))),
        }
    }

    async fn update_session(
        &self,
        id: Uuid,
        patch: SessionPatch,
    ) -> Result<InterviewSession, DatabaseError> {
        let current = self
            .get_session(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound {
                entity: "session".into(),
                id: id.to_string(),
            })?;

        let status = patch.status.unwrap_or(current.status);
        let question_index = patch.question_index.unwrap_or(current.question_index);
        let answers_count = patch.answers_count.unwrap_or(current.answers_count);

        self.conn()
            .execute(
                "UPDATE sessions SET status = ?2, question_index = ?3, answers_count = ?4
                 WHERE id = ?1",
                params![
                    id.to_string(),
                    status.as_str(),
                    question_index as i64,
                    answers_count as i64,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_session: {e}")))?;

        Ok(InterviewSession {
            status,
            question_index,
            answers_count,
            ..current
        })
    }

    async fn record_answer(
        &self,
        id: Uuid,
        question_id: &str,
        answer: &str,
    ) -> Result<(), DatabaseError> {
        let conn = self.conn();

        // Read-modify-write on the JSON column; the session id is the
        // unit of atomicity.
        let mut rows = conn
            .query(
                "SELECT collected_data FROM sessions WHERE id = ?1",
                params![id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("read collected_data: {e}")))?;

        let mut data: HashMap<String, String> = match rows.next().await {
            Ok(Some(row)) => {
                let raw: String = row.get(0).unwrap_or_else(|_| "{}".to_string());
                serde_json::from_str(&raw).unwrap_or_default()
            }
            Ok(None) => {
                return Err(DatabaseError::NotFound {
                    entity: "session".into(),
                    id: id.to_string(),
                });
            }
            Err(e) => return Err(DatabaseError::Query(format!("read collected_data: {e}"))),
        };

        data.insert(question_id.to_string(), answer.to_string());
        let serialized =
            serde_json::to_string(&data).map_err(|e| DatabaseError::Serialization(e.to_string()))?;

        conn.execute(
            "UPDATE sessions SET collected_data = ?2 WHERE id = ?1",
            params![id.to_string(), serialized],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("record_answer: {e}")))?;

        Ok(())
    }

    // ── Messages ────────────────────────────────────────────────────

    async fn add_message(
        &self,
        session_id: Uuid,
        role: Role,
        content: &str,
    ) -> Result<StoredMessage, DatabaseError> {
        let conn = self.conn();
        let id = Uuid::new_v4();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO messages (id, session_id, role, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id.to_string(),
                session_id.to_string(),
                role.as_str(),
                content,
                now.to_rfc3339(),
            ],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("add_message: {e}")))?;

        Ok(StoredMessage {
            id,
            session_id,
            role,
            content: content.to_string(),
            created_at: now,
        })
    }

    async fn list_messages(&self, session_id: Uuid) -> Result<Vec<StoredMessage>, DatabaseError> {
        let conn = self.conn();
        // rowid tiebreak keeps insertion order when timestamps collide.
        let mut rows = conn
            .query(
                "SELECT id, session_id, role, content, created_at FROM messages
                 WHERE session_id = ?1 ORDER BY created_at ASC, rowid ASC",
                params![session_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_messages: {e}")))?;

        let mut messages = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            let id_str: String = row.get(0).unwrap_or_default();
            let session_str: String = row.get(1).unwrap_or_default();
            let role_str: String = row.get(2).unwrap_or_default();
            let content: String = row.get(3).unwrap_or_default();
            let created_str: String = row.get(4).unwrap_or_default();
            messages.push(StoredMessage {
                id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::nil()),
                session_id: Uuid::parse_str(&session_str).unwrap_or_else(|_| Uuid::nil()),
                role: Role::from_str(&role_str),
                content,
                created_at: parse_datetime(&created_str),
            });
        }
        Ok(messages)
    }

    // ── Users ───────────────────────────────────────────────────────

    async fn create_user(
        &self,
        login: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, DatabaseError> {
        let conn = self.conn();
        let id = Uuid::new_v4();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO users (id, login, email, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id.to_string(),
                login,
                email,
                password_hash,
                now.to_rfc3339(),
            ],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("create_user: {e}")))?;

        Ok(User {
            id,
            login: login.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now,
        })
    }

    async fn get_user_by_login(&self, login: &str) -> Result<Option<User>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                "SELECT id, login, email, password_hash, created_at FROM users WHERE login = ?1",
                params![login],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_user_by_login: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let id_str: String = row.get(0).unwrap_or_default();
                let created_str: String = row.get(4).unwrap_or_default();
                Ok(Some(User {
                    id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::nil()),
                    login: row.get(1).unwrap_or_default(),
                    email: row.get(2).unwrap_or_default(),
                    password_hash: row.get(3).unwrap_or_default(),
                    created_at: parse_datetime(&created_str),
                }))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_user_by_login: {e}"))),
        }
    }
}
