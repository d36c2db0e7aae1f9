//! The interview session state machine.
//!
//! One handler instance drives one connection: resolve or create the
//! user's latest session, replay the answered transcript, then run the
//! question/answer loop until the catalog is exhausted. The transport
//! is abstract so the machine can be exercised without a socket.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::error::Error;
use crate::interview::model::{InterviewSession, Role, SessionStatus};
use crate::interview::normalize::normalize;
use crate::interview::protocol::ServerFrame;
use crate::interview::validate::validate;
use crate::recommend::RecommendationProvider;
use crate::store::{SessionPatch, SessionStore};

/// The peer went away. Senders report this explicitly so the handler
/// aborts deterministically instead of swallowing failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelClosed;

/// Bidirectional frame channel to one client.
#[async_trait]
pub trait Transport: Send {
    /// Send one frame. `Err(ChannelClosed)` means the peer is gone.
    async fn send(&mut self, frame: &ServerFrame) -> Result<(), ChannelClosed>;

    /// Await the next raw text frame. `None` means the peer disconnected.
    async fn recv(&mut self) -> Option<String>;
}

/// How a handler run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// All questions answered; the finished frame was sent.
    Completed,
    /// The client went away mid-interview. Not an error — persisted
    /// progress enables resumption on reconnect.
    Disconnected,
}

/// Drives the interview protocol for authenticated connections.
pub struct SessionProtocolHandler {
    catalog: Arc<Catalog>,
    store: Arc<dyn SessionStore>,
    recommender: Option<Arc<dyn RecommendationProvider>>,
}

impl SessionProtocolHandler {
    pub fn new(
        catalog: Arc<Catalog>,
        store: Arc<dyn SessionStore>,
        recommender: Option<Arc<dyn RecommendationProvider>>,
    ) -> Self {
        Self {
            catalog,
            store,
            recommender,
        }
    }

    /// Run the interview for an already-authenticated user.
    ///
    /// Store failures propagate as `Err`; the caller closes the channel
    /// with an internal-error code. Disconnects resolve to
    /// `Ok(Disconnected)` and are never treated as failures.
    pub async fn run(
        &self,
        user_id: Uuid,
        transport: &mut dyn Transport,
    ) -> Result<HandlerOutcome, Error> {
        let session = self.resolve_session(user_id).await?;
        let total = self.catalog.total();
        let answered = session.answers_count as usize;

        info!(
            session_id = %session.id,
            answered,
            total,
            "Interview session resolved"
        );

        // Replay the visible transcript for already-answered questions.
        let messages = self.store.list_messages(session.id).await?;
        let user_answers: Vec<String> = messages
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .collect();

        for idx in 0..answered {
            let Some(question) = self.catalog.by_global_index(idx) else {
                break;
            };
            let answer = user_answers
                .get(idx)
                .cloned()
                .or_else(|| session.collected_data.get(&question.id).cloned())
                .unwrap_or_default();

            let bot = ServerFrame::history(Role::Bot, question.prompt.clone());
            let user = ServerFrame::history(Role::User, answer);
            if transport.send(&bot).await.is_err() || transport.send(&user).await.is_err() {
                return Ok(HandlerOutcome::Disconnected);
            }
        }

        // The guard compares against the most recent accepted answer,
        // including one carried over from before a reconnect.
        let mut last_accepted: Option<String> = if answered > 0 {
            user_answers.get(answered - 1).cloned()
        } else {
            None
        };
        let mut collected_data = session.collected_data.clone();

        for idx in answered..total {
            let Some(question) = self.catalog.by_global_index(idx) else {
                break;
            };

            // Mark the question as presented before waiting for the
            // reply, so a crash here resumes at the same question.
            self.store
                .update_session(
                    session.id,
                    SessionPatch::default().question_index(idx as u32 + 1),
                )
                .await?;
            self.store
                .add_message(session.id, Role::Bot, &question.prompt)
                .await?;

            loop {
                let frame = ServerFrame::question(question, total);
                if transport.send(&frame).await.is_err() {
                    return Ok(HandlerOutcome::Disconnected);
                }

                let Some(reply) = transport.recv().await else {
                    debug!(session_id = %session.id, index = idx, "Client disconnected while answering");
                    return Ok(HandlerOutcome::Disconnected);
                };

                if let Err(rejection) = validate(&reply, question) {
                    debug!(
                        session_id = %session.id,
                        question_id = %question.id,
                        reason = %rejection.message,
                        "Answer rejected"
                    );
                    let frame = ServerFrame::validation_error(rejection.message);
                    if transport.send(&frame).await.is_err() {
                        return Ok(HandlerOutcome::Disconnected);
                    }
                    continue;
                }

                let new_key = normalize(Some(&reply), &question.kind);
                let last_key = normalize(last_accepted.as_deref(), &question.kind);
                if last_key.is_some() && new_key == last_key {
                    debug!(
                        session_id = %session.id,
                        question_id = %question.id,
                        "Duplicate answer ignored"
                    );
                    if transport.send(&ServerFrame::duplicate()).await.is_err() {
                        return Ok(HandlerOutcome::Disconnected);
                    }
                    continue;
                }

                self.store
                    .add_message(session.id, Role::User, &reply)
                    .await?;
                self.store
                    .record_answer(session.id, &question.id, &reply)
                    .await?;
                self.store
                    .update_session(
                        session.id,
                        SessionPatch::default().answers_count(idx as u32 + 1),
                    )
                    .await?;
                collected_data.insert(question.id.clone(), reply.clone());
                last_accepted = Some(reply);
                break;
            }
        }

        self.complete(&session, &collected_data, transport).await
    }

    /// Fetch the user's latest session, or create a fresh one when none
    /// exists, the latest is finished, or it has no questions left.
    async fn resolve_session(&self, user_id: Uuid) -> Result<InterviewSession, Error> {
        let total = self.catalog.total() as u32;
        match self.store.get_latest_session(user_id).await? {
            Some(session)
                if session.status == SessionStatus::Active && session.answers_count < total =>
            {
                Ok(session)
            }
            _ => {
                let session = self.store.create_session(user_id).await?;
                info!(session_id = %session.id, user_id = %user_id, "Created interview session");
                Ok(session)
            }
        }
    }

    /// Finish the session, run the recommender (soft-fail), and emit
    /// the completion frames.
    async fn complete(
        &self,
        session: &InterviewSession,
        collected_data: &HashMap<String, String>,
        transport: &mut dyn Transport,
    ) -> Result<HandlerOutcome, Error> {
        self.store
            .update_session(
                session.id,
                SessionPatch::default().status(SessionStatus::Finished),
            )
            .await?;
        info!(session_id = %session.id, "Interview finished");

        if let Some(provider) = &self.recommender {
            match provider.produce(collected_data).await {
                Ok(outcome) => {
                    if let Some(consultation) = outcome.consultation {
                        let frame = ServerFrame::consultation(consultation);
                        if transport.send(&frame).await.is_err() {
                            return Ok(HandlerOutcome::Disconnected);
                        }
                    }
                    if !outcome.hh_ids.is_empty() || !outcome.recommendations.is_empty() {
                        let frame = ServerFrame::recommendations(
                            outcome.hh_ids,
                            outcome.recommendations,
                        );
                        if transport.send(&frame).await.is_err() {
                            return Ok(HandlerOutcome::Disconnected);
                        }
                    }
                }
                Err(e) => {
                    warn!(
                        session_id = %session.id,
                        error = %e,
                        "Recommendation provider failed; completing without recommendations"
                    );
                }
            }
        }

        if transport.send(&ServerFrame::finished()).await.is_err() {
            return Ok(HandlerOutcome::Disconnected);
        }
        Ok(HandlerOutcome::Completed)
    }
}
