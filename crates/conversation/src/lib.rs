//! The streaming-response ingestion pipeline and code-preview
//! synchronization core: accumulating a chat answer chunk by chunk,
//! keeping the transcript's single live turn consistent, extracting a
//! fenced code block from the finished answer, and deriving preview
//! visibility from it.

pub mod accumulator;
pub mod controller;
pub mod extract;
pub mod preview;
pub mod store;
