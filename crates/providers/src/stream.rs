//! Cancellable pull-based byte source for one chat response.

use std::pin::Pin;

use futures::{Stream, StreamExt};
use shared::error::TransportError;

/// Handle over one in-flight response body.
///
/// `next_chunk` yields raw byte fragments in transport order and then
/// exactly one terminal signal: `None` on a clean end of stream, or a
/// single `Err` item on failure. Dropping the handle cancels the
/// underlying request.
pub struct StreamHandle {
    inner: Pin<Box<dyn Stream<Item = Result<Vec<u8>, TransportError>> + Send>>,
}

impl StreamHandle {
    pub fn new(
        stream: impl Stream<Item = Result<Vec<u8>, TransportError>> + Send + 'static,
    ) -> Self {
        Self {
            inner: Box::pin(stream),
        }
    }

    /// In-memory handle over a fixed chunk sequence, for simulated streams.
    pub fn from_chunks<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = Result<Vec<u8>, TransportError>>,
        I::IntoIter: Send + 'static,
    {
        Self::new(futures::stream::iter(chunks))
    }

    pub async fn next_chunk(&mut self) -> Option<Result<Vec<u8>, TransportError>> {
        self.inner.next().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_chunks_arrive_in_order() {
        let mut handle = StreamHandle::from_chunks(vec![
            Ok(b"Hel".to_vec()),
            Ok(b"lo".to_vec()),
        ]);
        assert_eq!(handle.next_chunk().await.unwrap().unwrap(), b"Hel".to_vec());
        assert_eq!(handle.next_chunk().await.unwrap().unwrap(), b"lo".to_vec());
        assert!(handle.next_chunk().await.is_none());
    }

    #[tokio::test]
    async fn test_error_is_terminal_item() {
        let mut handle = StreamHandle::from_chunks(vec![
            Ok(b"partial".to_vec()),
            Err(TransportError::Read("connection reset".into())),
        ]);
        assert!(matches!(handle.next_chunk().await, Some(Ok(_))));
        assert!(matches!(handle.next_chunk().await, Some(Err(_))));
        assert!(handle.next_chunk().await.is_none());
    }
}
