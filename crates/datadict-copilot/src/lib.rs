//! Conversational query controller for the DataDict AI Copilot.
//!
//! This crate owns the state of one copilot conversation and drives each
//! query through the backend, including:
//!
//! - The append-only transcript of user and assistant Turns
//! - Structured (single answer) and conversational (streamed) query modes
//! - Incremental UTF-8 assembly of streamed chunks
//! - The busy guard and generation-based discarding of stale responses
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌────────────────────┐
//! │   TUI / caller   │────▶│ SessionController  │◀── snapshot / subscribe
//! └──────────────────┘     └─────────┬──────────┘
//!                                    │ submit
//!                          ┌─────────▼──────────┐
//!                          │     Dispatch       │
//!                          │ (one cycle)        │
//!                          └─────────┬──────────┘
//!                                    │
//!                          ┌─────────▼──────────┐     ┌────────────────┐
//!                          │  CopilotBackend    │────▶│ ChunkAssembler │
//!                          │  (trait)           │     │ (UTF-8)        │
//!                          └─────────┬──────────┘     └────────────────┘
//!                                    │ HTTP
//!                          ┌─────────▼──────────┐
//!                          │  datadict-client   │
//!                          └────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use datadict_copilot::{CopilotBackend, QueryMode, SessionController};
//!
//! # async fn example(backend: Arc<dyn CopilotBackend>) {
//! let session = SessionController::with_defaults(backend);
//! session.set_mode(QueryMode::Conversational);
//!
//! if let Some(dispatch) = session.submit("describe the orders table") {
//!     tokio::spawn(dispatch.run());
//! }
//!
//! let mut changes = session.subscribe();
//! while changes.changed().await.is_ok() {
//!     let snapshot = session.snapshot();
//!     println!("{} turns, streaming: {}", snapshot.turns.len(), snapshot.streaming);
//! }
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod assembler;
pub mod backend;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod ids;
pub mod mode;
pub mod session;
pub mod transcript;

pub use assembler::ChunkAssembler;
pub use backend::{BackendResponse, ChunkStream, CopilotBackend};
pub use config::{CopilotConfig, PartialFailurePolicy};
pub use dispatcher::{CycleOutcome, Dispatch};
pub use error::{BackendError, Result};
pub use ids::{Generation, SessionId};
pub use mode::{ParseModeError, QueryMode};
pub use session::{SessionController, SessionSnapshot};
pub use transcript::{Role, Transcript, Turn};

#[cfg(any(test, feature = "test-utils"))]
pub use backend::{ScriptedBackend, ScriptedStep, StreamFeed};
