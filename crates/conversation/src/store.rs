//! Ordered, append-only conversation log with last-element amendment.

use shared::error::StoreError;
use shared::turn::{Attachment, Role, Turn};
use tokio::sync::watch;

/// Owns the transcript and its invariant: at most one turn is live, and
/// if present it is the last element. A finalized turn is immutable.
///
/// Every mutation publishes the full ordered turn sequence to watch
/// subscribers; presentation consumes snapshots and never mutates turns.
pub struct ConversationStore {
    turns: Vec<Turn>,
    notify: watch::Sender<Vec<Turn>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        let (notify, _) = watch::channel(Vec::new());
        Self {
            turns: Vec::new(),
            notify,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Turn>> {
        self.notify.subscribe()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Content of the live assistant turn, if one exists.
    pub fn live_content(&self) -> Option<&str> {
        self.live_index().map(|i| self.turns[i].content.as_str())
    }

    pub fn append_user_turn(&mut self, text: &str, attachment: Option<Attachment>) {
        self.turns.push(Turn::user(text, attachment));
        self.changed();
    }

    pub fn append_live_assistant_placeholder(&mut self) {
        self.turns.push(Turn::live_assistant());
        self.changed();
    }

    /// Replace the live turn's content with the cumulative answer so far.
    pub fn update_live_assistant(&mut self, text: &str) -> Result<(), StoreError> {
        let idx = self.live_index().ok_or(StoreError::NoLiveTurn)?;
        self.turns[idx].content = text.to_string();
        self.changed();
        Ok(())
    }

    /// Transition the live turn to its immutable final content.
    pub fn finalize_live_assistant(&mut self, text: String) -> Result<(), StoreError> {
        match self.live_index() {
            Some(idx) => {
                let turn = &mut self.turns[idx];
                turn.content = text;
                turn.is_live = false;
                self.changed();
                Ok(())
            }
            None => {
                // Distinguish a double finalize from a finalize with no
                // placeholder at all.
                if matches!(self.turns.last(), Some(t) if t.role == Role::Assistant) {
                    Err(StoreError::AlreadyFinalized)
                } else {
                    Err(StoreError::NoLiveTurn)
                }
            }
        }
    }

    /// Clear all turns unconditionally.
    pub fn reset(&mut self) {
        self.turns.clear();
        self.changed();
    }

    // Only the last turn can be live; anything else is a broken invariant.
    fn live_index(&self) -> Option<usize> {
        match self.turns.last() {
            Some(t) if t.is_live => Some(self.turns.len() - 1),
            _ => None,
        }
    }

    fn changed(&self) {
        self.notify.send_replace(self.turns.clone());
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}
