//! Error taxonomy shared across the workspace.

use thiserror::Error;

/// Any failure on the request/stream path. Network errors, non-success
/// status codes, and body-read errors all normalize to this one signal
/// with a human-readable message; partial success is never reported as
/// success.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),
    #[error("backend returned {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("stream read error: {0}")]
    Read(String),
}

/// Misuse of the conversation store. These indicate the one-live-turn
/// invariant was broken by the caller and must surface loudly rather
/// than silently corrupt the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("no live turn to update")]
    NoLiveTurn,
    #[error("assistant turn already finalized")]
    AlreadyFinalized,
}

/// Malformed byte input on the stream path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid utf-8 byte sequence at offset {offset}")]
    InvalidUtf8 { offset: usize },
    #[error("stream ended inside a multi-byte character")]
    TruncatedStream,
}

/// Terminal failure of one stream session.
#[derive(Debug, Clone, Error)]
pub enum StreamError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}
