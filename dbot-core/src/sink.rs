//! Sink abstraction for streamed replies.
//!
//! [`Sink`] is transport-agnostic; `dbot-telegram` implements it via teloxide and tests substitute a
//! recording mock.

use crate::error::SinkResult;
use crate::types::{UnitHandle, UnitOptions};
use async_trait::async_trait;

/// A messaging endpoint hosting editable, length-bounded units.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Maximum content length of one unit, in characters.
    fn max_unit_length(&self) -> usize;

    /// Creates a new unit holding `content`.
    async fn create_unit(&self, content: &str, options: &UnitOptions) -> SinkResult<UnitHandle>;

    /// Returns the current content of `unit`. May differ from what was last written if the unit
    /// was changed externally.
    async fn fetch_current_content(&self, unit: &UnitHandle) -> SinkResult<String>;

    /// Replaces the content of `unit` wholesale. `SinkError::NotFound` means the unit is gone.
    async fn edit_unit(&self, unit: &UnitHandle, content: &str) -> SinkResult<()>;

    /// Creates the unit that continues a reply after the previous one overflowed.
    async fn append_follow_up(
        &self,
        content: &str,
        options: &UnitOptions,
    ) -> SinkResult<UnitHandle> {
        self.create_unit(content, options).await
    }
}
