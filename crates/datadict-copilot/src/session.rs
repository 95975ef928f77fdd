//! Session controller.
//!
//! The `SessionController` owns the transcript, the busy flag, and the mode.
//! It is a cheap clonable handle handed to the presentation layer; every
//! mutation goes through its methods or through a [`Dispatch`] it issued.
//!
//! The lock around the state is never held across an await, so each state
//! transition is atomic with respect to observers.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::backend::CopilotBackend;
use crate::config::CopilotConfig;
use crate::dispatcher::{CycleOutcome, Dispatch};
use crate::ids::{Generation, SessionId};
use crate::mode::QueryMode;
use crate::transcript::{Transcript, Turn};

/// Mutable state of one session.
#[derive(Debug)]
pub(crate) struct SessionState {
    pub(crate) mode: QueryMode,
    pub(crate) busy: bool,
    pub(crate) generation: Generation,
    pub(crate) transcript: Transcript,
}

/// State and collaborators shared between the controller and its cycles.
pub(crate) struct Shared {
    pub(crate) session_id: SessionId,
    pub(crate) config: CopilotConfig,
    pub(crate) backend: Arc<dyn CopilotBackend>,
    state: Mutex<SessionState>,
    revision: watch::Sender<u64>,
}

impl Shared {
    /// Run `f` on the state if `generation` is still current.
    ///
    /// Returns `None` without touching anything when the cycle was orphaned.
    pub(crate) fn with_current<R>(
        &self,
        generation: Generation,
        f: impl FnOnce(&mut SessionState) -> R,
    ) -> Option<R> {
        let result = {
            let mut state = self.state.lock();
            if state.generation != generation {
                return None;
            }
            f(&mut state)
        };
        self.notify();
        Some(result)
    }

    /// Like [`with_current`](Self::with_current), but `f` reports whether it
    /// changed anything and observers are only notified if it did.
    pub(crate) fn update_current(
        &self,
        generation: Generation,
        f: impl FnOnce(&mut SessionState) -> bool,
    ) -> Option<bool> {
        let changed = {
            let mut state = self.state.lock();
            if state.generation != generation {
                return None;
            }
            f(&mut state)
        };
        if changed {
            self.notify();
        }
        Some(changed)
    }

    /// Tell observers the state changed.
    pub(crate) fn notify(&self) {
        self.revision.send_modify(|rev| *rev = rev.wrapping_add(1));
    }

    pub(crate) fn lock(&self) -> parking_lot::MutexGuard<'_, SessionState> {
        self.state.lock()
    }
}

/// Read-only copy of the session state for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Session this snapshot belongs to.
    pub session_id: SessionId,
    /// Mode the next submission will use.
    pub mode: QueryMode,
    /// Waiting for a response to start.
    pub busy: bool,
    /// An assistant Turn is receiving streamed text.
    pub streaming: bool,
    /// Current generation.
    pub generation: Generation,
    /// Turns in order.
    pub turns: Vec<Turn>,
}

impl SessionSnapshot {
    /// The most recent Turn.
    #[must_use]
    pub fn last_turn(&self) -> Option<&Turn> {
        self.turns.last()
    }
}

/// Handle to a copilot session.
#[derive(Clone)]
pub struct SessionController {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("session_id", &self.shared.session_id)
            .finish_non_exhaustive()
    }
}

impl SessionController {
    /// Start a session with a fresh seeded transcript.
    #[must_use]
    pub fn new(backend: Arc<dyn CopilotBackend>, config: CopilotConfig) -> Self {
        let session_id = SessionId::generate();
        let state = SessionState {
            mode: config.initial_mode,
            busy: false,
            generation: Generation::INITIAL,
            transcript: Transcript::seeded(config.welcome_message.clone()),
        };
        let (revision, _) = watch::channel(0);

        tracing::debug!(session_id = %session_id, mode = %state.mode, "Copilot session started");

        Self {
            shared: Arc::new(Shared {
                session_id,
                config,
                backend,
                state: Mutex::new(state),
                revision,
            }),
        }
    }

    /// Start a session with default configuration.
    #[must_use]
    pub fn with_defaults(backend: Arc<dyn CopilotBackend>) -> Self {
        Self::new(backend, CopilotConfig::default())
    }

    /// Accept a query and prepare its dispatch cycle.
    ///
    /// Appends the user Turn, marks the session busy, and returns the cycle
    /// to drive with [`Dispatch::run`]. Returns `None`, changing nothing, if
    /// the query is blank or the session is busy.
    ///
    /// A submission accepted while an earlier answer is still streaming
    /// closes that answer; its remaining chunks are discarded.
    #[must_use = "the cycle does nothing unless run"]
    pub fn submit(&self, query: &str) -> Option<Dispatch> {
        if query.trim().is_empty() {
            tracing::debug!(session_id = %self.shared.session_id, "Ignoring blank query");
            return None;
        }

        let (generation, mode) = {
            let mut state = self.shared.lock();
            if state.busy {
                tracing::debug!(
                    session_id = %self.shared.session_id,
                    generation = %state.generation,
                    "Rejecting query while busy"
                );
                return None;
            }
            state.generation = state.generation.next();
            state.transcript.push(Turn::user(query));
            state.busy = true;
            (state.generation, state.mode)
        };
        self.shared.notify();

        tracing::debug!(
            session_id = %self.shared.session_id,
            generation = %generation,
            mode = %mode,
            "Query accepted"
        );

        Some(Dispatch::new(
            Arc::clone(&self.shared),
            generation,
            mode,
            query.to_string(),
        ))
    }

    /// Submit a query and drive its cycle to completion.
    pub async fn submit_and_wait(&self, query: &str) -> CycleOutcome {
        match self.submit(query) {
            Some(dispatch) => dispatch.run().await,
            None => CycleOutcome::Rejected,
        }
    }

    /// Discard the conversation and start over with the seed Turn.
    ///
    /// Callable at any time. Any cycle still in flight is orphaned: nothing
    /// it receives afterwards reaches the new transcript.
    pub fn reset(&self) {
        let generation = {
            let mut state = self.shared.lock();
            state.generation = state.generation.next();
            state.transcript = Transcript::seeded(self.shared.config.welcome_message.clone());
            state.busy = false;
            state.generation
        };
        self.shared.notify();

        tracing::info!(
            session_id = %self.shared.session_id,
            generation = %generation,
            "Copilot conversation reset"
        );
    }

    /// Select the mode for the next submission.
    ///
    /// A cycle already in flight keeps the mode it was dispatched with.
    pub fn set_mode(&self, mode: QueryMode) {
        {
            let mut state = self.shared.lock();
            if state.mode == mode {
                return;
            }
            state.mode = mode;
        }
        self.shared.notify();
        tracing::debug!(session_id = %self.shared.session_id, mode = %mode, "Mode changed");
    }

    /// Switch to the other mode and return it.
    pub fn toggle_mode(&self) -> QueryMode {
        let mode = self.mode().toggle();
        self.set_mode(mode);
        mode
    }

    /// Current mode.
    #[must_use]
    pub fn mode(&self) -> QueryMode {
        self.shared.lock().mode
    }

    /// Whether a cycle is waiting for its response to start.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.shared.lock().busy
    }

    /// Whether an assistant Turn is receiving streamed text.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.shared.lock().transcript.has_open_turn()
    }

    /// Number of Turns in the transcript.
    #[must_use]
    pub fn transcript_len(&self) -> usize {
        self.shared.lock().transcript.len()
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.shared.lock();
        SessionSnapshot {
            session_id: self.shared.session_id,
            mode: state.mode,
            busy: state.busy,
            streaming: state.transcript.has_open_turn(),
            generation: state.generation,
            turns: state.transcript.turns().to_vec(),
        }
    }

    /// Receiver that changes after every state mutation.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }

    /// Session identifier.
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.shared.session_id
    }

    /// Session configuration.
    #[must_use]
    pub fn config(&self) -> &CopilotConfig {
        &self.shared.config
    }
}
