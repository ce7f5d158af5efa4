//! CLI parser.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "dbot")]
#[command(about = "Replay a text as a streamed bot reply: console or Telegram", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Stream into the terminal; every unit create/edit is printed.
    Stream {
        #[command(flatten)]
        replay: ReplayArgs,
        /// Characters per unit (Telegram allows 4096).
        #[arg(long, default_value = "200")]
        max_unit_length: usize,
        /// History key the reply is recorded under.
        #[arg(long, default_value = "console")]
        user: String,
    },
    /// Stream into a Telegram chat (config from env; token can override BOT_TOKEN).
    Telegram {
        #[command(flatten)]
        replay: ReplayArgs,
        /// Target chat; group and supergroup ids are negative.
        #[arg(long, allow_negative_numbers = true)]
        chat_id: i64,
        #[arg(short, long)]
        token: Option<String>,
    },
}

/// How the input text is replayed as a stream.
#[derive(Args, Debug, Clone)]
pub struct ReplayArgs {
    /// Read the reply from this file instead of stdin.
    #[arg(short, long)]
    pub file: Option<PathBuf>,
    /// Characters per chunk.
    #[arg(long, default_value = "12")]
    pub chunk_size: usize,
    /// Delay between chunks, simulating token arrival.
    #[arg(long, default_value = "80")]
    pub chunk_delay_ms: u64,
}

impl ReplayArgs {
    pub fn chunk_delay(&self) -> Duration {
        Duration::from_millis(self.chunk_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stream_defaults() {
        let cli = Cli::try_parse_from(["dbot", "stream"]).unwrap();
        match cli.command {
            Commands::Stream {
                replay,
                max_unit_length,
                user,
            } => {
                assert!(replay.file.is_none());
                assert_eq!(replay.chunk_size, 12);
                assert_eq!(replay.chunk_delay(), Duration::from_millis(80));
                assert_eq!(max_unit_length, 200);
                assert_eq!(user, "console");
            }
            _ => panic!("expected stream command"),
        }
    }

    #[test]
    fn test_parse_telegram_accepts_group_chat_id() {
        let cli = Cli::try_parse_from(["dbot", "telegram", "--chat-id", "-1001234567890"]).unwrap();
        match cli.command {
            Commands::Telegram { chat_id, token, .. } => {
                assert_eq!(chat_id, -1001234567890);
                assert!(token.is_none());
            }
            _ => panic!("expected telegram command"),
        }
        assert!(Cli::try_parse_from(["dbot", "telegram", "--chat-id", "-12x"]).is_err());
    }

    #[test]
    fn test_parse_telegram_requires_chat_id() {
        assert!(Cli::try_parse_from(["dbot", "telegram"]).is_err());
        let cli =
            Cli::try_parse_from(["dbot", "telegram", "--chat-id", "-100123", "-t", "tok"]).unwrap();
        match cli.command {
            Commands::Telegram { chat_id, token, .. } => {
                assert_eq!(chat_id, -100123);
                assert_eq!(token.as_deref(), Some("tok"));
            }
            _ => panic!("expected telegram command"),
        }
    }
}
