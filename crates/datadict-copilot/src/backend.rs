//! Backend seam for copilot queries.
//!
//! The controller only knows the two operations below. The concrete HTTP
//! implementation lives in `datadict-client`; tests use [`ScriptedBackend`].

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::{BackendError, Result};
use crate::mode::QueryMode;

/// Lazy, finite, non-restartable sequence of raw byte chunks.
///
/// Chunks are undelimited UTF-8 text; an `Err` item ends the stream abnormally.
pub type ChunkStream = BoxStream<'static, Result<Vec<u8>>>;

/// Response to one dispatched query, shaped by the mode it was sent in.
pub enum BackendResponse {
    /// The full answer in one piece.
    Complete(String),
    /// The answer as an incrementally delivered byte stream.
    Streaming(ChunkStream),
}

impl std::fmt::Debug for BackendResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Complete(text) => f.debug_tuple("Complete").field(text).finish(),
            Self::Streaming(_) => f.write_str("Streaming(..)"),
        }
    }
}

/// Trait for the two backend query operations.
///
/// This trait abstracts the transport, allowing scripted implementations in
/// tests.
#[async_trait]
pub trait CopilotBackend: Send + Sync {
    /// Send a query and await the single complete answer.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or a
    /// malformed payload.
    async fn structured_query(&self, query: &str) -> Result<String>;

    /// Send a query and obtain the streamed answer.
    ///
    /// `Ok(None)` means the backend accepted the request but supplied no body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails before any body is available.
    async fn conversational_query(&self, query: &str) -> Result<Option<ChunkStream>>;

    /// Send a query using the protocol selected by `mode`.
    ///
    /// # Errors
    ///
    /// Propagates the failure of the selected operation. A streaming
    /// response without a body becomes [`BackendError::MissingBody`].
    async fn dispatch(&self, mode: QueryMode, query: &str) -> Result<BackendResponse> {
        match mode {
            QueryMode::Structured => self
                .structured_query(query)
                .await
                .map(BackendResponse::Complete),
            QueryMode::Conversational => self
                .conversational_query(query)
                .await?
                .map(BackendResponse::Streaming)
                .ok_or(BackendError::MissingBody),
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use scripted::{ScriptedBackend, ScriptedStep, StreamFeed};

#[cfg(any(test, feature = "test-utils"))]
mod scripted {
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use futures::StreamExt;
    use parking_lot::Mutex;
    use tokio::sync::{mpsc, oneshot};

    use super::{ChunkStream, CopilotBackend};
    use crate::error::{BackendError, Result};
    use crate::mode::QueryMode;

    /// One scripted reaction to an incoming query.
    pub enum ScriptedStep {
        /// Answer with this text (a single chunk when streaming).
        Answer(String),
        /// Fail before any body is available.
        Fail(BackendError),
        /// Stream these items, then end.
        Chunks(Vec<Result<Vec<u8>>>),
        /// Stream whatever the paired [`StreamFeed`] sends.
        Feed(mpsc::UnboundedReceiver<Result<Vec<u8>>>),
        /// Accept the streaming request but supply no body.
        NoBody,
        /// Wait for the step sent through the paired sender.
        Deferred(oneshot::Receiver<ScriptedStep>),
    }

    /// Test handle that pushes chunks into a scripted stream.
    ///
    /// Dropping the feed ends the stream normally.
    #[derive(Debug, Clone)]
    pub struct StreamFeed {
        tx: mpsc::UnboundedSender<Result<Vec<u8>>>,
    }

    impl StreamFeed {
        /// Deliver raw bytes as one chunk.
        pub fn send_bytes(&self, bytes: &[u8]) {
            let _ = self.tx.send(Ok(bytes.to_vec()));
        }

        /// Deliver UTF-8 text as one chunk.
        pub fn send_text(&self, text: &str) {
            self.send_bytes(text.as_bytes());
        }

        /// Terminate the stream abnormally.
        pub fn fail(&self, message: &str) {
            let _ = self.tx.send(Err(BackendError::Stream(message.to_string())));
        }
    }

    /// In-memory backend answering from a queue of scripted steps.
    #[derive(Default)]
    pub struct ScriptedBackend {
        steps: Mutex<VecDeque<ScriptedStep>>,
        requests: Mutex<Vec<(QueryMode, String)>>,
    }

    impl ScriptedBackend {
        /// Create a backend with an empty script.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue an arbitrary step.
        pub fn push(&self, step: ScriptedStep) {
            self.steps.lock().push_back(step);
        }

        /// Queue a complete answer.
        pub fn push_answer(&self, text: impl Into<String>) {
            self.push(ScriptedStep::Answer(text.into()));
        }

        /// Queue a dispatch failure.
        pub fn push_failure(&self, error: BackendError) {
            self.push(ScriptedStep::Fail(error));
        }

        /// Queue a stream of text chunks.
        pub fn push_chunks<I, S>(&self, chunks: I)
        where
            I: IntoIterator<Item = S>,
            S: AsRef<[u8]>,
        {
            let items = chunks
                .into_iter()
                .map(|c| Ok(c.as_ref().to_vec()))
                .collect();
            self.push(ScriptedStep::Chunks(items));
        }

        /// Queue a stream driven by the returned feed.
        #[must_use]
        pub fn push_feed(&self) -> StreamFeed {
            let (tx, rx) = mpsc::unbounded_channel();
            self.push(ScriptedStep::Feed(rx));
            StreamFeed { tx }
        }

        /// Queue a step decided later through the returned sender.
        #[must_use]
        pub fn push_deferred(&self) -> oneshot::Sender<ScriptedStep> {
            let (tx, rx) = oneshot::channel();
            self.push(ScriptedStep::Deferred(rx));
            tx
        }

        /// Queries received so far, with the mode they arrived in.
        #[must_use]
        pub fn requests(&self) -> Vec<(QueryMode, String)> {
            self.requests.lock().clone()
        }

        async fn next_step(&self, mode: QueryMode, query: &str) -> Result<ScriptedStep> {
            self.requests.lock().push((mode, query.to_string()));
            let step = self
                .steps
                .lock()
                .pop_front()
                .ok_or_else(|| BackendError::Transport("no scripted response".to_string()))?;
            match step {
                ScriptedStep::Deferred(rx) => rx
                    .await
                    .map_err(|_| BackendError::Transport("deferred step dropped".to_string())),
                other => Ok(other),
            }
        }
    }

    fn into_stream(items: Vec<Result<Vec<u8>>>) -> ChunkStream {
        futures::stream::iter(items).boxed()
    }

    fn feed_stream(rx: mpsc::UnboundedReceiver<Result<Vec<u8>>>) -> ChunkStream {
        futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
        .boxed()
    }

    #[async_trait]
    impl CopilotBackend for ScriptedBackend {
        async fn structured_query(&self, query: &str) -> Result<String> {
            match self.next_step(QueryMode::Structured, query).await? {
                ScriptedStep::Answer(text) => Ok(text),
                ScriptedStep::Fail(err) => Err(err),
                _ => Err(BackendError::Malformed(
                    "scripted stream for structured query".to_string(),
                )),
            }
        }

        async fn conversational_query(&self, query: &str) -> Result<Option<ChunkStream>> {
            match self.next_step(QueryMode::Conversational, query).await? {
                ScriptedStep::Answer(text) => Ok(Some(into_stream(vec![Ok(text.into_bytes())]))),
                ScriptedStep::Fail(err) => Err(err),
                ScriptedStep::Chunks(items) => Ok(Some(into_stream(items))),
                ScriptedStep::Feed(rx) => Ok(Some(feed_stream(rx))),
                ScriptedStep::NoBody => Ok(None),
                ScriptedStep::Deferred(_) => Err(BackendError::Malformed(
                    "nested deferred step".to_string(),
                )),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    #[tokio::test]
    async fn dispatch_structured_returns_complete() {
        let backend = ScriptedBackend::new();
        backend.push_answer("SELECT 1");
        let response = backend.dispatch(QueryMode::Structured, "q").await.unwrap();
        assert!(matches!(response, BackendResponse::Complete(ref t) if t == "SELECT 1"));
        assert_eq!(backend.requests(), vec![(QueryMode::Structured, "q".to_string())]);
    }

    #[tokio::test]
    async fn dispatch_conversational_returns_stream() {
        let backend = ScriptedBackend::new();
        backend.push_chunks(["a", "b"]);
        let response = backend
            .dispatch(QueryMode::Conversational, "q")
            .await
            .unwrap();
        let BackendResponse::Streaming(stream) = response else {
            panic!("expected a stream");
        };
        let chunks: Vec<_> = stream.collect().await;
        assert_eq!(chunks, vec![Ok(b"a".to_vec()), Ok(b"b".to_vec())]);
    }

    #[tokio::test]
    async fn missing_body_becomes_error() {
        let backend = ScriptedBackend::new();
        backend.push(ScriptedStep::NoBody);
        let err = backend
            .dispatch(QueryMode::Conversational, "q")
            .await
            .unwrap_err();
        assert_eq!(err, BackendError::MissingBody);
    }

    #[tokio::test]
    async fn empty_script_is_a_transport_error() {
        let backend = ScriptedBackend::new();
        let err = backend.structured_query("q").await.unwrap_err();
        assert!(matches!(err, BackendError::Transport(_)));
    }

    #[tokio::test]
    async fn deferred_step_resolves_later() {
        let backend = ScriptedBackend::new();
        let release = backend.push_deferred();
        let task = tokio::spawn(async move { backend.structured_query("q").await });
        release.send(ScriptedStep::Answer("late".into())).ok();
        assert_eq!(task.await.unwrap().unwrap(), "late");
    }
}
