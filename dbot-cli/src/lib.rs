//! # dbot-cli
//!
//! `dbot` binary support: argument parsing, a terminal sink and the replay driver that feeds a text
//! through a [`dbot_stream::StreamSession`].

pub mod cli;
pub mod console_sink;
pub mod replay;

pub use cli::{Cli, Commands, ReplayArgs};
pub use console_sink::ConsoleSink;
pub use replay::{chunk_text, replay};
