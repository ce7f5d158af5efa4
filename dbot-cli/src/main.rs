//! dbot CLI: replay a text as a streamed reply into the terminal or a Telegram chat. Config from env and
//! optional CLI args.

use anyhow::{Context, Result};
use clap::Parser;
use dbot_cli::{replay, Cli, Commands, ConsoleSink, ReplayArgs};
use dbot_stream::{HistoryRegistry, StreamConfig};
use dbot_telegram::{TelegramConfig, TelegramSink};
use std::io::Read;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let stream_config = StreamConfig::from_env().context("Load stream config from env")?;
    stream_config.validate()?;
    let mut history = HistoryRegistry::new(stream_config.history_max_length);

    match cli.command {
        Commands::Stream {
            replay: args,
            max_unit_length,
            user,
        } => {
            dbot_core::init_tracing(None)?;
            let text = read_input(&args)?;
            let sink = Arc::new(ConsoleSink::new(max_unit_length));
            replay(
                sink,
                &stream_config,
                &text,
                args.chunk_size,
                args.chunk_delay(),
                &mut history,
                &user,
            )
            .await?;
            println!();
            Ok(())
        }
        Commands::Telegram {
            replay: args,
            chat_id,
            token,
        } => {
            let config = TelegramConfig::load(token)?;
            config.validate()?;
            dbot_core::init_tracing(Some(&config.log_file))?;
            let text = read_input(&args)?;
            let sink = Arc::new(TelegramSink::new(config.build_bot(), chat_id));
            replay(
                sink,
                &stream_config,
                &text,
                args.chunk_size,
                args.chunk_delay(),
                &mut history,
                &chat_id.to_string(),
            )
            .await?;
            Ok(())
        }
    }
}

/// Reads the reply text from `--file` or stdin.
fn read_input(args: &ReplayArgs) -> Result<String> {
    let text = match &args.file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Read input file {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Read input from stdin")?;
            buf
        }
    };
    if text.is_empty() {
        anyhow::bail!("Input is empty; nothing to stream");
    }
    Ok(text)
}
