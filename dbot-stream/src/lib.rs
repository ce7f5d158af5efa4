//! # dbot-stream
//!
//! Turns a streamed LLM reply into live "typing" in a chat: incoming chunks are buffered and committed to a
//! [`dbot_core::Sink`] as paced edits, splitting into follow-up units when a unit would exceed the sink's
//! length limit.
//!
//! - **[`StreamSession`]** – per-reply coalescer: `add_chunk`, `finalize`, `set_follow_up_options`.
//! - **[`StreamConfig`]** – edit interval, minimum chars per edit, placeholder text (env-loaded).
//! - **[`splitter`]** – boundary selection for overflowing text.
//! - **[`HistoryRegistry`]** – bounded per-key conversation history for finalized replies.

pub mod config;
pub mod history;
pub mod session;
pub mod splitter;
pub mod timer;

pub use config::StreamConfig;
pub use history::{HistoryEntry, HistoryRegistry, Role};
pub use session::StreamSession;
pub use splitter::find_split_point;
