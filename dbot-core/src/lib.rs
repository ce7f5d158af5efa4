//! # dbot-core
//!
//! Core abstractions for streamed bot replies: the [`Sink`] capability, [`UnitHandle`] / [`UnitOptions`],
//! the [`SinkError`] taxonomy and tracing initialization. Transport-agnostic; used by dbot-stream and
//! dbot-telegram.

pub mod error;
pub mod logger;
pub mod sink;
pub mod types;

pub use error::{SinkError, SinkResult};
pub use logger::init_tracing;
pub use sink::Sink;
pub use types::{UnitHandle, UnitOptions};
