//! One query/response cycle.
//!
//! A [`Dispatch`] is issued by [`SessionController::submit`] once the user
//! Turn is recorded. Running it sends the query through the backend and folds
//! the response into the transcript:
//!
//! ```text
//!   submit ──► busy ──► dispatch ──┬─► Complete ─────► answer Turn, idle
//!                                  ├─► Err ──────────► error Turn, idle
//!                                  └─► Streaming ────► open Turn, idle
//!                                          │
//!                                          ├─ chunk ─► append increment
//!                                          ├─ end ───► close Turn
//!                                          ├─ empty ─► error Turn, close
//!                                          └─ err ───► partial policy, close
//! ```
//!
//! Every write is tagged with the generation the cycle started in. Once the
//! session moves to a later generation (reset, or a newer submission) the
//! cycle is orphaned and its writes are dropped.
//!
//! [`SessionController::submit`]: crate::SessionController::submit

use std::sync::Arc;

use futures::StreamExt;

use crate::assembler::ChunkAssembler;
use crate::backend::{BackendResponse, ChunkStream};
use crate::config::PartialFailurePolicy;
use crate::error::BackendError;
use crate::ids::Generation;
use crate::mode::QueryMode;
use crate::session::Shared;
use crate::transcript::Turn;

/// How a cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The query was blank or the session was busy; nothing happened.
    Rejected,
    /// A structured answer was appended.
    Answered,
    /// The dispatch failed, or a stream ended without any text; an error
    /// Turn was appended.
    Failed(BackendError),
    /// The stream ended normally and its Turn was closed.
    Streamed {
        /// Raw bytes received.
        bytes: usize,
    },
    /// The stream failed part way; its Turn was closed.
    Interrupted(BackendError),
    /// The session moved on while the cycle was in flight.
    Superseded,
}

/// A pending cycle for a submitted query.
///
/// Dropping it without running releases the busy flag.
#[must_use = "the query is not sent unless the dispatch is run"]
pub struct Dispatch {
    guard: CycleGuard,
    mode: QueryMode,
    query: String,
}

impl std::fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatch")
            .field("generation", &self.guard.generation)
            .field("mode", &self.mode)
            .field("query", &self.query)
            .finish()
    }
}

impl Dispatch {
    pub(crate) fn new(
        shared: Arc<Shared>,
        generation: Generation,
        mode: QueryMode,
        query: String,
    ) -> Self {
        Self {
            guard: CycleGuard {
                shared,
                generation,
                done: false,
            },
            mode,
            query,
        }
    }

    /// Generation this cycle belongs to.
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.guard.generation
    }

    /// Mode captured at submission.
    #[must_use]
    pub fn mode(&self) -> QueryMode {
        self.mode
    }

    /// Send the query and fold the response into the transcript.
    pub async fn run(mut self) -> CycleOutcome {
        let shared = Arc::clone(&self.guard.shared);
        let generation = self.guard.generation;

        tracing::debug!(
            session_id = %shared.session_id,
            generation = %generation,
            mode = %self.mode,
            "Dispatching query"
        );

        let response = shared.backend.dispatch(self.mode, &self.query).await;

        let outcome = match response {
            Ok(BackendResponse::Complete(answer)) => self.answer(answer),
            Ok(BackendResponse::Streaming(stream)) => self.stream(stream).await,
            Err(err) => self.fail(err),
        };

        self.guard.done = true;
        outcome
    }

    fn answer(&self, answer: String) -> CycleOutcome {
        let shared = &self.guard.shared;
        let len = answer.len();
        let applied = shared.with_current(self.guard.generation, |state| {
            state.transcript.push(Turn::assistant(answer));
            state.busy = false;
        });

        if applied.is_none() {
            return self.superseded();
        }

        tracing::debug!(
            session_id = %shared.session_id,
            generation = %self.guard.generation,
            answer_len = len,
            "Structured answer received"
        );
        CycleOutcome::Answered
    }

    fn fail(&self, err: BackendError) -> CycleOutcome {
        let shared = &self.guard.shared;
        let message = shared.config.error_message(self.mode).to_string();
        let applied = shared.with_current(self.guard.generation, |state| {
            state.transcript.push(Turn::assistant(message));
            state.busy = false;
        });

        if applied.is_none() {
            return self.superseded();
        }

        tracing::warn!(
            session_id = %shared.session_id,
            generation = %self.guard.generation,
            mode = %self.mode,
            error = %err,
            retriable = err.is_retriable(),
            "Query failed"
        );
        CycleOutcome::Failed(err)
    }

    async fn stream(&self, mut stream: ChunkStream) -> CycleOutcome {
        let shared = &self.guard.shared;
        let generation = self.guard.generation;

        let opened = shared.with_current(generation, |state| {
            state.transcript.open_assistant();
            state.busy = false;
        });
        if opened.is_none() {
            return self.superseded();
        }

        tracing::debug!(
            session_id = %shared.session_id,
            generation = %generation,
            "Stream opened"
        );

        let mut assembler = ChunkAssembler::new();

        while let Some(item) = stream.next().await {
            match item {
                Ok(chunk) => {
                    tracing::trace!(
                        session_id = %shared.session_id,
                        generation = %generation,
                        chunk_len = chunk.len(),
                        "Chunk received"
                    );
                    let text = assembler.decode(&chunk);
                    if text.is_empty() {
                        continue;
                    }
                    let appended = shared.update_current(generation, |state| {
                        state.transcript.append_to_open(&text)
                    });
                    if appended != Some(true) {
                        return self.superseded();
                    }
                }
                Err(err) => return self.interrupt(err, assembler.bytes_seen()),
            }
        }

        let tail = assembler.finish();
        let error_message = &shared.config.stream_error_message;
        let closed = shared.with_current(generation, |state| {
            if !state.transcript.has_open_turn() {
                return None;
            }
            if let Some(tail) = &tail {
                state.transcript.append_to_open(tail);
            }
            let empty = state.transcript.open_content().is_some_and(str::is_empty);
            if empty {
                state.transcript.append_to_open(error_message);
            }
            state.transcript.close_open();
            Some(empty)
        });
        let Some(Some(empty)) = closed else {
            return self.superseded();
        };

        let bytes = assembler.bytes_seen();
        if empty {
            tracing::warn!(
                session_id = %shared.session_id,
                generation = %generation,
                bytes,
                "Stream ended without any text"
            );
            return CycleOutcome::Failed(BackendError::MissingBody);
        }

        tracing::debug!(
            session_id = %shared.session_id,
            generation = %generation,
            bytes,
            "Stream completed"
        );
        CycleOutcome::Streamed { bytes }
    }

    fn interrupt(&self, err: BackendError, bytes: usize) -> CycleOutcome {
        let shared = &self.guard.shared;
        let config = &shared.config;

        let applied = shared.with_current(self.guard.generation, |state| {
            if !state.transcript.has_open_turn() {
                return false;
            }
            let partial = state
                .transcript
                .open_content()
                .is_some_and(|content| !content.is_empty());
            if !partial {
                state.transcript.append_to_open(&config.stream_error_message);
            } else if config.partial_failure_policy == PartialFailurePolicy::Annotate {
                state.transcript.append_to_open(&config.partial_failure_note);
            }
            state.transcript.close_open();
            true
        });
        if applied != Some(true) {
            return self.superseded();
        }

        tracing::warn!(
            session_id = %shared.session_id,
            generation = %self.guard.generation,
            bytes,
            error = %err,
            retriable = err.is_retriable(),
            "Stream interrupted"
        );
        CycleOutcome::Interrupted(err)
    }

    fn superseded(&self) -> CycleOutcome {
        tracing::debug!(
            session_id = %self.guard.shared.session_id,
            generation = %self.guard.generation,
            "Discarding response for superseded cycle"
        );
        CycleOutcome::Superseded
    }
}

/// Releases the busy flag and closes the open Turn if a cycle is abandoned.
///
/// Covers a dispatch dropped before running and a running cycle whose task
/// was cancelled.
struct CycleGuard {
    shared: Arc<Shared>,
    generation: Generation,
    done: bool,
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        let released = self.shared.update_current(self.generation, |state| {
            let changed = state.busy || state.transcript.has_open_turn();
            state.busy = false;
            state.transcript.close_open();
            changed
        });
        if released == Some(true) {
            tracing::debug!(
                session_id = %self.shared.session_id,
                generation = %self.generation,
                "Abandoned cycle released"
            );
        }
    }
}
