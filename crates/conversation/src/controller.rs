//! Wiring between the transport and the conversation state machines.
//!
//! One controller owns the store, the preview state, and the identity of
//! the single active stream session. Cancellation is enforced by session
//! identity, not locking: every new send (or reset) supersedes the
//! previous session, and events still queued from a superseded session
//! are discarded before they can touch shared state.

use futures::future::{AbortHandle, Abortable};
use providers::backend::BackendClient;
use providers::stream::StreamHandle;
use shared::error::{StoreError, StreamError, TransportError};
use shared::settings::AppSettings;
use shared::turn::{Attachment, Turn};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use uuid::Uuid;

use crate::accumulator;
use crate::extract::CodeExtractor;
use crate::preview::PreviewController;
use crate::store::ConversationStore;

/// Shown in place of the assistant answer when the stream fails.
pub const FALLBACK_ERROR_MESSAGE: &str = "Sorry, there was an error processing your request.";

/// Event from a stream pump, tagged with the session that produced it.
#[derive(Debug)]
pub struct SessionEvent {
    pub session: Uuid,
    pub payload: StreamEvent,
}

#[derive(Debug)]
pub enum StreamEvent {
    /// Cumulative answer text so far, never a delta.
    Update(String),
    /// Final answer text; produced exactly once per successful stream.
    Done(String),
    Failed(StreamError),
}

/// What applying one event changed, for the presentation layer.
#[derive(Debug)]
pub enum Applied {
    Updated(String),
    Completed { answer: String, preview_open: bool },
    Failed(String),
    /// The event belonged to a superseded session and was discarded.
    Stale,
}

struct ActiveSession {
    id: Uuid,
    abort: Option<AbortHandle>,
}

pub struct ChatController {
    client: BackendClient,
    store: ConversationStore,
    preview: PreviewController,
    extractor: CodeExtractor,
    active: Option<ActiveSession>,
    events_tx: UnboundedSender<SessionEvent>,
    events_rx: UnboundedReceiver<SessionEvent>,
}

impl ChatController {
    pub fn new(client: BackendClient, extractor: CodeExtractor) -> Self {
        let (events_tx, events_rx) = unbounded_channel();
        Self {
            client,
            store: ConversationStore::new(),
            preview: PreviewController::new(),
            extractor,
            active: None,
            events_tx,
            events_rx,
        }
    }

    pub fn from_settings(settings: &AppSettings) -> Result<Self, TransportError> {
        let client = BackendClient::from_settings(&settings.backend)?;
        let extractor = CodeExtractor::new(settings.preview_languages.iter().cloned());
        Ok(Self::new(client, extractor))
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn preview(&self) -> &PreviewController {
        &self.preview
    }

    pub fn subscribe_turns(&self) -> watch::Receiver<Vec<Turn>> {
        self.store.subscribe()
    }

    pub fn open_preview(&mut self) {
        self.preview.user_open();
    }

    pub fn close_preview(&mut self) {
        self.preview.user_close();
    }

    /// Submit a prompt and start streaming the answer.
    ///
    /// Blank input (after trimming) is rejected here, before the
    /// transport is touched. Any in-flight session is cancelled first.
    /// Must be called from within a tokio runtime; the request/pump
    /// future runs as an abortable spawned task.
    pub fn send(&mut self, text: &str, attachment: Option<Attachment>) -> Option<Uuid> {
        let prompt = text.trim();
        if prompt.is_empty() {
            tracing::debug!("ignoring blank prompt");
            return None;
        }

        let session = self.begin_exchange(prompt, attachment.clone());
        let client = self.client.clone();
        let tx = self.events_tx.clone();
        let prompt = prompt.to_string();
        let (abort, reg) = AbortHandle::new_pair();
        if let Some(active) = self.active.as_mut() {
            active.abort = Some(abort);
        }

        tokio::spawn(Abortable::new(
            async move {
                match client.send(&prompt, attachment.as_ref()).await {
                    Ok(handle) => pump(session, handle, &tx).await,
                    Err(e) => {
                        let _ = tx.send(SessionEvent {
                            session,
                            payload: StreamEvent::Failed(e.into()),
                        });
                    }
                }
            },
            reg,
        ));
        Some(session)
    }

    /// Cancel any active session and open a new one with its turn pair:
    /// the user turn and the live assistant placeholder are appended
    /// together, before any chunk can arrive.
    pub fn begin_exchange(&mut self, prompt: &str, attachment: Option<Attachment>) -> Uuid {
        self.cancel_active();
        let session = Uuid::new_v4();
        self.store.append_user_turn(prompt, attachment);
        self.store.append_live_assistant_placeholder();
        self.active = Some(ActiveSession {
            id: session,
            abort: None,
        });
        session
    }

    /// Feed an already-open stream into the controller's event queue.
    /// `send` does this on a spawned task; tests and offline replays can
    /// drive it directly.
    pub async fn pump_stream(&self, session: Uuid, handle: StreamHandle) {
        pump(session, handle, &self.events_tx).await;
    }

    /// Wait for the next stream event. Returns `None` only if every
    /// sender is gone, which cannot happen while the controller lives.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events_rx.recv().await
    }

    /// Apply everything currently queued.
    pub fn drain_events(&mut self) -> Result<Vec<Applied>, StoreError> {
        let mut out = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            out.push(self.apply(event)?);
        }
        Ok(out)
    }

    /// Apply one event to the store and preview.
    ///
    /// Events from superseded sessions are discarded without touching
    /// any state. Store errors here mean the one-live-turn discipline
    /// was broken and are propagated, not swallowed.
    pub fn apply(&mut self, event: SessionEvent) -> Result<Applied, StoreError> {
        let is_current = matches!(&self.active, Some(a) if a.id == event.session);
        if !is_current {
            tracing::debug!(session = %event.session, "discarding event from superseded session");
            return Ok(Applied::Stale);
        }

        match event.payload {
            StreamEvent::Update(text) => {
                self.store.update_live_assistant(&text)?;
                Ok(Applied::Updated(text))
            }
            StreamEvent::Done(text) => {
                self.active = None;
                self.store.finalize_live_assistant(text.clone())?;
                self.preview.sync(self.extractor.extract(&text));
                Ok(Applied::Completed {
                    answer: text,
                    preview_open: self.preview.visible(),
                })
            }
            StreamEvent::Failed(err) => {
                tracing::warn!(error = %err, "stream failed; finalizing turn with fallback message");
                self.active = None;
                self.store
                    .finalize_live_assistant(FALLBACK_ERROR_MESSAGE.to_string())?;
                // The fallback answer has no code block, so the preview
                // derives to hidden, matching a no-match answer.
                self.preview.sync(None);
                Ok(Applied::Failed(err.to_string()))
            }
        }
    }

    /// New chat: cancel any in-flight stream, tell the backend to drop
    /// its context, and clear store and preview together. Partial state
    /// never survives a reset; calling it twice leaves the same empty
    /// state as once.
    pub async fn reset(&mut self) {
        self.cancel_active();
        if let Err(e) = self.client.reset().await {
            tracing::warn!(error = %e, "backend reset failed");
        }
        self.store.reset();
        self.preview.reset();
    }

    fn cancel_active(&mut self) {
        if let Some(active) = self.active.take() {
            tracing::debug!(session = %active.id, "superseding in-flight stream session");
            if let Some(abort) = active.abort {
                abort.abort();
            }
            // Freeze whatever partial text the superseded turn had.
            if let Some(partial) = self.store.live_content().map(str::to_string) {
                let _ = self.store.finalize_live_assistant(partial);
            }
        }
    }
}

/// Drive one stream session, forwarding cumulative updates, the final
/// text, or the single failure as tagged events.
async fn pump(session: Uuid, handle: StreamHandle, tx: &UnboundedSender<SessionEvent>) {
    accumulator::consume(
        handle,
        |text| {
            let _ = tx.send(SessionEvent {
                session,
                payload: StreamEvent::Update(text.to_string()),
            });
        },
        |text| {
            let _ = tx.send(SessionEvent {
                session,
                payload: StreamEvent::Done(text),
            });
        },
        |err| {
            let _ = tx.send(SessionEvent {
                session,
                payload: StreamEvent::Failed(err),
            });
        },
    )
    .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::turn::Role;
    use std::time::Duration;

    fn offline_controller() -> ChatController {
        // Port 1 on loopback refuses immediately; nothing in these tests
        // actually reaches a backend.
        let client = BackendClient::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
        ChatController::new(client, CodeExtractor::default())
    }

    #[tokio::test]
    async fn test_streamed_code_block_scenario() {
        let mut controller = offline_controller();
        let session = controller.begin_exchange("draw a box", None);
        let handle = StreamHandle::from_chunks(vec![
            Ok(b"Here:\n```".to_vec()),
            Ok(b"jsx\n<Box".to_vec()),
            Ok(b"/>\n```\n".to_vec()),
        ]);
        controller.pump_stream(session, handle).await;
        controller.drain_events().unwrap();

        let turns = controller.store().turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[1].content, "Here:\n```jsx\n<Box/>\n```\n");
        assert!(!turns[1].is_live);
        assert!(controller.preview().visible());
        assert_eq!(controller.preview().code(), "<Box/>");
    }

    #[tokio::test]
    async fn test_plain_answer_keeps_preview_hidden() {
        let mut controller = offline_controller();
        let session = controller.begin_exchange("hello", None);
        let handle = StreamHandle::from_chunks(vec![Ok(b"Hi there!".to_vec())]);
        controller.pump_stream(session, handle).await;
        controller.drain_events().unwrap();

        assert!(!controller.preview().visible());
        controller.open_preview();
        assert!(!controller.preview().visible());
    }

    #[tokio::test]
    async fn test_empty_fenced_block_keeps_preview_hidden() {
        let mut controller = offline_controller();
        let session = controller.begin_exchange("draw a box", None);
        let handle =
            StreamHandle::from_chunks(vec![Ok(b"Here you go:\n```jsx\n```\n".to_vec())]);
        controller.pump_stream(session, handle).await;
        controller.drain_events().unwrap();

        assert!(!controller.preview().visible());
        assert_eq!(controller.preview().code(), "");
        controller.open_preview();
        assert!(!controller.preview().visible());
    }

    #[tokio::test]
    async fn test_superseded_session_events_are_discarded() {
        let mut controller = offline_controller();

        let session_a = controller.begin_exchange("first", None);
        let handle_a = StreamHandle::from_chunks(vec![
            Ok(b"stale text".to_vec()),
        ]);
        // A's chunks sit in the queue, unapplied, when B supersedes it.
        controller.pump_stream(session_a, handle_a).await;
        let session_b = controller.begin_exchange("second", None);

        let applied = controller.drain_events().unwrap();
        assert!(applied.iter().all(|a| matches!(a, Applied::Stale)));

        // A's placeholder was frozen at cancellation; B's is live and last.
        let turns = controller.store().turns();
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[1].content, "");
        assert!(!turns[1].is_live);
        assert!(turns[3].is_live);
        assert!(!controller.preview().visible());

        let handle_b = StreamHandle::from_chunks(vec![Ok(b"fresh".to_vec())]);
        controller.pump_stream(session_b, handle_b).await;
        controller.drain_events().unwrap();
        assert_eq!(controller.store().turns()[3].content, "fresh");
    }

    #[tokio::test]
    async fn test_transport_failure_finalizes_with_fallback() {
        let mut controller = offline_controller();
        let session = controller.begin_exchange("hello", None);
        let handle = StreamHandle::from_chunks(vec![
            Ok(b"partial ans".to_vec()),
            Err(TransportError::Read("connection reset".into())),
        ]);
        controller.pump_stream(session, handle).await;
        let applied = controller.drain_events().unwrap();
        assert!(applied.iter().any(|a| matches!(a, Applied::Failed(_))));

        let turns = controller.store().turns();
        assert_eq!(turns[1].content, FALLBACK_ERROR_MESSAGE);
        assert!(!turns[1].is_live);
        assert!(!controller.preview().visible());
    }

    #[tokio::test]
    async fn test_reset_clears_everything_and_is_idempotent() {
        let mut controller = offline_controller();
        let session = controller.begin_exchange("draw a box", None);
        let handle =
            StreamHandle::from_chunks(vec![Ok(b"```jsx\n<Box/>\n```".to_vec())]);
        controller.pump_stream(session, handle).await;
        controller.drain_events().unwrap();
        assert!(controller.preview().visible());

        controller.reset().await;
        assert!(controller.store().is_empty());
        assert!(!controller.preview().visible());
        assert_eq!(controller.preview().code(), "");

        controller.reset().await;
        assert!(controller.store().is_empty());
        assert_eq!(controller.preview().code(), "");
    }

    #[tokio::test]
    async fn test_blank_prompt_is_rejected_before_transport() {
        let mut controller = offline_controller();
        assert!(controller.send("   ", None).is_none());
        assert!(controller.store().is_empty());
    }
}
