//! Replays a finished text as if it were arriving from a model, through a [`StreamSession`].

use anyhow::Result;
use dbot_core::Sink;
use dbot_stream::{HistoryRegistry, StreamConfig, StreamSession};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Splits `text` into chunks of `chunk_size` characters (at least one).
pub fn chunk_text(text: &str, chunk_size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(chunk_size.max(1))
        .map(|c| c.iter().collect())
        .collect()
}

/// Streams `text` into `sink` chunk by chunk, then records the exchange under `history_key`.
/// Returns the content of the last unit written.
#[instrument(skip(sink, config, text, history))]
pub async fn replay(
    sink: Arc<dyn Sink>,
    config: &StreamConfig,
    text: &str,
    chunk_size: usize,
    chunk_delay: Duration,
    history: &mut HistoryRegistry,
    history_key: &str,
) -> Result<String> {
    let session = StreamSession::start(sink, config.clone())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start stream: {}", e))?;

    let chunks = chunk_text(text, chunk_size);
    info!(chunks = chunks.len(), chars = text.chars().count(), "replay started");
    for chunk in &chunks {
        session.add_chunk(chunk);
        if session.is_stopped() {
            warn!("sink stopped accepting edits, abandoning replay");
            break;
        }
        tokio::time::sleep(chunk_delay).await;
    }

    let last = session.finalize().await;
    if session.undelivered_len() > 0 {
        warn!(undelivered = session.undelivered_len(), "part of the reply was not delivered");
    }

    history.add_user_message(history_key, format!("replay of {} chars", text.chars().count()));
    history.add_assistant_message(history_key, last.clone());
    info!(
        follow_ups = session.follow_ups_created(),
        history_len = history.len_of(history_key),
        "replay finished"
    );
    Ok(last)
}
