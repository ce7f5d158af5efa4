//! Shared helpers for dbot-stream integration tests.

pub mod mock_sink;

#[allow(unused_imports)]
pub use mock_sink::{MockSink, SinkCall};
