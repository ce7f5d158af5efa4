//! Maps Telegram API error text onto [`SinkError`].

use dbot_core::SinkError;
use std::time::Duration;

/// True when Telegram returns "message is not modified" (content unchanged); treat as success.
pub fn is_message_not_modified_error(error: &str) -> bool {
    error.contains("message is not modified") || error.contains("exactly the same")
}

/// True when the message being edited no longer exists or can no longer be edited.
pub fn is_message_gone_error(error: &str) -> bool {
    let error = error.to_lowercase();
    error.contains("message to edit not found")
        || error.contains("message can't be edited")
        || error.contains("message_id_invalid")
        || error.contains("message not found")
}

/// Parses "Retry after Ns" from Telegram API error string; returns `Some(seconds)` for rate-limit retry.
fn extract_retry_after_seconds(error: &str) -> Option<u64> {
    let pattern = "Retry after ";
    let start = error.find(pattern)? + pattern.len();
    let digits: String = error[start..]
        .chars()
        .skip_while(|c| c.is_whitespace())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Classifies a failed Telegram call.
pub fn classify_error(unit_id: &str, error: &str) -> SinkError {
    if is_message_gone_error(error) {
        return SinkError::NotFound(unit_id.to_string());
    }
    if let Some(secs) = extract_retry_after_seconds(error) {
        return SinkError::RateLimited {
            retry_after: Some(Duration::from_secs(secs)),
        };
    }
    if error.contains("Too Many Requests") {
        return SinkError::RateLimited { retry_after: None };
    }
    SinkError::Other(error.to_string())
}
