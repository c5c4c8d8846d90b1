//! Incremental ingestion of one streamed answer.

use providers::stream::StreamHandle;
use shared::error::{DecodeError, StreamError};

/// Growable text buffer for one stream session.
///
/// Decoding is stateful across chunk boundaries: a multi-byte UTF-8
/// scalar split between two chunks is held back until its remaining
/// bytes arrive, so `text()` is always valid and never corrupted.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    text: String,
    pending: Vec<u8>,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes from the transport. On success returns the full
    /// accumulated text so far, never a delta.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<&str, DecodeError> {
        self.pending.extend_from_slice(chunk);
        match std::str::from_utf8(&self.pending) {
            Ok(s) => {
                self.text.push_str(s);
                self.pending.clear();
            }
            Err(e) => {
                let valid = e.valid_up_to();
                if e.error_len().is_some() {
                    return Err(DecodeError::InvalidUtf8 {
                        offset: self.text.len() + valid,
                    });
                }
                // Incomplete trailing scalar: keep the tail for the next chunk.
                if let Ok(prefix) = std::str::from_utf8(&self.pending[..valid]) {
                    self.text.push_str(prefix);
                }
                self.pending.drain(..valid);
            }
        }
        Ok(&self.text)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// End of stream. Fails if bytes of an unfinished scalar are still pending.
    pub fn finish(self) -> Result<String, DecodeError> {
        if !self.pending.is_empty() {
            return Err(DecodeError::TruncatedStream);
        }
        Ok(self.text)
    }
}

/// Pull every chunk from `handle` in order.
///
/// After each chunk, `on_update` receives the complete current answer.
/// On a clean end of stream `on_done` fires exactly once with the final
/// text; on any transport or decode failure `on_error` fires exactly
/// once instead, and `on_done` never does.
pub async fn consume<U, D, E>(mut handle: StreamHandle, mut on_update: U, on_done: D, on_error: E)
where
    U: FnMut(&str),
    D: FnOnce(String),
    E: FnOnce(StreamError),
{
    let mut acc = StreamAccumulator::new();
    while let Some(item) = handle.next_chunk().await {
        match item {
            Ok(bytes) => match acc.feed(&bytes) {
                Ok(text) => on_update(text),
                Err(e) => {
                    on_error(e.into());
                    return;
                }
            },
            Err(e) => {
                on_error(e.into());
                return;
            }
        }
    }
    match acc.finish() {
        Ok(text) => on_done(text),
        Err(e) => on_error(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::error::TransportError;
    use std::cell::RefCell;

    #[test]
    fn test_updates_are_cumulative() {
        let mut acc = StreamAccumulator::new();
        assert_eq!(acc.feed(b"Hel").unwrap(), "Hel");
        assert_eq!(acc.feed(b"lo, ").unwrap(), "Hello, ");
        assert_eq!(acc.feed(b"world").unwrap(), "Hello, world");
        assert_eq!(acc.finish().unwrap(), "Hello, world");
    }

    #[test]
    fn test_multibyte_scalar_split_across_chunks() {
        // "héllo" with the two-byte é split between chunks
        let mut acc = StreamAccumulator::new();
        assert_eq!(acc.feed(&[b'h', 0xC3]).unwrap(), "h");
        assert_eq!(acc.feed(&[0xA9, b'l']).unwrap(), "h\u{e9}l");
        assert_eq!(acc.feed(b"lo").unwrap(), "h\u{e9}llo");
    }

    #[test]
    fn test_four_byte_scalar_split_one_byte_at_a_time() {
        let crab = "🦀".as_bytes();
        let mut acc = StreamAccumulator::new();
        for &b in &crab[..3] {
            assert_eq!(acc.feed(&[b]).unwrap(), "");
        }
        assert_eq!(acc.feed(&crab[3..]).unwrap(), "🦀");
    }

    #[test]
    fn test_invalid_sequence_is_an_error() {
        let mut acc = StreamAccumulator::new();
        acc.feed(b"ok").unwrap();
        assert_eq!(
            acc.feed(&[0xFF]),
            Err(DecodeError::InvalidUtf8 { offset: 2 })
        );
    }

    #[test]
    fn test_finish_with_pending_tail_is_truncation() {
        let mut acc = StreamAccumulator::new();
        acc.feed(&[b'a', 0xC3]).unwrap();
        assert_eq!(acc.finish(), Err(DecodeError::TruncatedStream));
    }

    #[tokio::test]
    async fn test_consume_reports_cumulative_then_done() {
        let handle = StreamHandle::from_chunks(vec![
            Ok(b"Hel".to_vec()),
            Ok(b"lo, ".to_vec()),
            Ok(b"world".to_vec()),
        ]);
        let updates = RefCell::new(Vec::new());
        let done = RefCell::new(None);
        consume(
            handle,
            |t| updates.borrow_mut().push(t.to_string()),
            |t| *done.borrow_mut() = Some(t),
            |e| panic!("unexpected error: {e}"),
        )
        .await;
        assert_eq!(
            updates.into_inner(),
            vec!["Hel".to_string(), "Hello, ".to_string(), "Hello, world".to_string()]
        );
        assert_eq!(done.into_inner().as_deref(), Some("Hello, world"));
    }

    #[tokio::test]
    async fn test_consume_transport_failure_skips_done() {
        let handle = StreamHandle::from_chunks(vec![
            Ok(b"part".to_vec()),
            Err(TransportError::Read("reset by peer".into())),
        ]);
        let done_called = RefCell::new(false);
        let error = RefCell::new(None);
        consume(
            handle,
            |_| {},
            |_| *done_called.borrow_mut() = true,
            |e| *error.borrow_mut() = Some(e),
        )
        .await;
        assert!(!done_called.into_inner());
        assert!(matches!(
            error.into_inner(),
            Some(StreamError::Transport(TransportError::Read(_)))
        ));
    }
}
