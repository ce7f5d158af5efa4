//! Stream session: coalesces incoming text chunks into paced edits of a length-bounded sink unit.
//!
//! # Flow
//!
//! [`StreamSession::add_chunk`] appends to the buffer and arms the session's single flush timer. When the
//! timer fires, one flush cycle runs:
//!
//! - **fits** – the unit is re-read and `content + buffer` is written back in one edit.
//! - **overflow** – the buffer is cut at the best boundary that fits ([`crate::splitter`]), the head is
//!   written into the current unit and the next slice is seeded into a new follow-up unit. At most one
//!   unit is created per cycle; any backlog beyond that is left for the next cycle.
//!
//! [`StreamSession::finalize`] stops the timer and drains whatever is left, then returns the content of
//! the last unit touched.
//!
//! # Concurrency
//!
//! The buffer, timer slot and unit bookkeeping live behind a plain mutex that is never held across an
//! `.await`. Flush cycles and `finalize` are serialized by an async flush lock, so at most one sink call
//! of a session is in flight at a time. A commit drains exactly the buffer prefix it wrote; chunks that
//! arrive while a cycle awaits the sink stay buffered for the next one.
//!
//! The re-read before each edit keeps external changes to the unit, but the sink has no compare-and-swap:
//! an external edit landing between the read and the write is still overwritten.

use crate::config::StreamConfig;
use crate::splitter::{char_len, split_for_limit, truncate_chars};
use crate::timer::TimerSlot;
use dbot_core::{Sink, SinkError, SinkResult, UnitHandle, UnitOptions};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Mutable session state. Guarded by `SessionInner::state`.
struct SessionState {
    /// Received but not yet committed text.
    buffer: String,
    /// The unit receiving edits; replaced when a follow-up unit is created.
    active_unit: UnitHandle,
    /// Characters committed into `active_unit`.
    emitted_len: usize,
    /// Content last committed into `active_unit`.
    committed: String,
    last_flush_at: Instant,
    /// Earliest time the sink accepts another call after a rate-limit error.
    retry_at: Option<Instant>,
    timer: TimerSlot,
    terminated: bool,
    /// Terminated by a fatal sink error rather than by `finalize`.
    stopped: bool,
    first_flush_done: bool,
    follow_up_options: UnitOptions,
    follow_ups_created: usize,
    /// Characters dropped because the sink became unusable.
    undelivered: usize,
    final_content: Option<String>,
}

impl SessionState {
    fn new(unit: UnitHandle) -> Self {
        Self {
            buffer: String::new(),
            active_unit: unit,
            emitted_len: 0,
            committed: String::new(),
            last_flush_at: Instant::now(),
            retry_at: None,
            timer: TimerSlot::new(),
            terminated: false,
            stopped: false,
            first_flush_done: false,
            follow_up_options: UnitOptions::default(),
            follow_ups_created: 0,
            undelivered: 0,
            final_content: None,
        }
    }

    /// Time left before the next commit may happen: the edit interval since the last commit, or the
    /// rate-limit deadline if that is later.
    fn flush_delay(&self, interval: Duration, now: Instant) -> Duration {
        let since_last = now.saturating_duration_since(self.last_flush_at);
        let delay = interval.saturating_sub(since_last);
        match self.retry_at {
            Some(at) => delay.max(at.saturating_duration_since(now)),
            None => delay,
        }
    }

    fn record_edit(&mut self, content: String) {
        self.emitted_len = char_len(&content);
        self.committed = content;
        self.last_flush_at = Instant::now();
        self.retry_at = None;
        self.first_flush_done = true;
    }

    fn record_new_unit(&mut self, unit: UnitHandle, content: String) {
        self.active_unit = unit;
        self.follow_ups_created += 1;
        self.record_edit(content);
    }
}

/// Snapshot of what one cycle is about to commit.
struct Pending {
    text: String,
    unit: UnitHandle,
    emitted_len: usize,
}

struct SessionInner {
    sink: Arc<dyn Sink>,
    config: StreamConfig,
    max_unit_length: usize,
    state: Mutex<SessionState>,
    flush_lock: tokio::sync::Mutex<()>,
}

impl SessionInner {
    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ---------- Scheduling ----------

    /// Arms the flush timer unless one is pending, the session is terminated or there is nothing to send.
    fn schedule(self: &Arc<Self>, st: &mut SessionState) {
        if st.terminated || st.buffer.is_empty() {
            return;
        }
        let delay = st.flush_delay(self.config.min_edit_interval, Instant::now());
        let weak = Arc::downgrade(self);
        let armed = st.timer.arm(|id| {
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if let Some(inner) = weak.upgrade() {
                    inner.on_timer(id).await;
                }
            })
        });
        if armed {
            debug!(delay_ms = delay.as_millis() as u64, "flush scheduled");
        }
    }

    async fn on_timer(self: &Arc<Self>, id: u64) {
        {
            let mut st = self.state();
            if !st.timer.claim(id) || st.terminated {
                return;
            }
        }
        self.flush().await;
    }

    // ---------- Flush cycle ----------

    async fn flush(self: &Arc<Self>) {
        let _cycle = self.flush_lock.lock().await;

        let pending = {
            let mut st = self.state();
            if st.terminated || st.buffer.is_empty() {
                return;
            }
            // Another cycle committed while this one waited for the lock.
            if !st
                .flush_delay(self.config.min_edit_interval, Instant::now())
                .is_zero()
            {
                self.schedule(&mut st);
                return;
            }
            let buffered = char_len(&st.buffer);
            if st.first_flush_done && buffered < self.config.min_chars_per_edit {
                debug!(
                    buffered,
                    min_chars = self.config.min_chars_per_edit,
                    "flush skipped, not enough new content"
                );
                return;
            }
            Pending {
                text: st.buffer.clone(),
                unit: st.active_unit.clone(),
                emitted_len: st.emitted_len,
            }
        };

        if pending.emitted_len + char_len(&pending.text) <= self.max_unit_length {
            self.commit_in_place(&pending).await;
        } else {
            self.split_and_continue(&pending).await;
        }
    }

    /// Appends `text` to `unit` and returns the committed content. With nothing emitted yet the unit
    /// only holds the placeholder, which `text` replaces.
    async fn write_unit(
        &self,
        unit: &UnitHandle,
        emitted_len: usize,
        text: &str,
    ) -> SinkResult<String> {
        let mut content = if emitted_len == 0 {
            String::new()
        } else {
            self.sink.fetch_current_content(unit).await?
        };
        content.push_str(text);

        let composed_len = char_len(&content);
        let content = truncate_chars(&content, self.max_unit_length).to_string();
        if composed_len > self.max_unit_length {
            warn!(
                unit = %unit,
                dropped = composed_len - self.max_unit_length,
                "unit content grew externally, edit truncated"
            );
        }

        self.sink.edit_unit(unit, &content).await?;
        Ok(content)
    }

    async fn commit_in_place(self: &Arc<Self>, pending: &Pending) {
        match self
            .write_unit(&pending.unit, pending.emitted_len, &pending.text)
            .await
        {
            Ok(content) => {
                let mut st = self.state();
                st.buffer.drain(..pending.text.len());
                st.record_edit(content);
                debug!(
                    unit = %pending.unit,
                    emitted = st.emitted_len,
                    backlog = st.buffer.len(),
                    "unit edited"
                );
            }
            Err(e) => self.sink_failed(e, "edit"),
        }
    }

    async fn split_and_continue(self: &Arc<Self>, pending: &Pending) {
        let remaining = self.max_unit_length.saturating_sub(pending.emitted_len);
        let (head, tail) = split_for_limit(&pending.text, remaining);
        debug!(
            unit = %pending.unit,
            remaining,
            head = char_len(head),
            tail = char_len(tail),
            "buffer overflows unit, splitting"
        );

        if !head.is_empty() {
            match self
                .write_unit(&pending.unit, pending.emitted_len, head)
                .await
            {
                Ok(content) => {
                    let mut st = self.state();
                    st.buffer.drain(..head.len());
                    st.record_edit(content);
                }
                Err(e) => {
                    self.sink_failed(e, "edit before split");
                    return;
                }
            }
        }

        let seed = truncate_chars(tail, self.max_unit_length);
        let options = self.state().follow_up_options.clone();
        match self.sink.append_follow_up(seed, &options).await {
            Ok(unit) => {
                let mut st = self.state();
                st.buffer.drain(..seed.len());
                st.record_new_unit(unit.clone(), seed.to_string());
                info!(
                    unit = %unit,
                    seeded = st.emitted_len,
                    backlog = st.buffer.len(),
                    "reply continued in follow-up unit"
                );
                // Backlog beyond one more unit waits for the next cycle.
                self.schedule(&mut st);
            }
            Err(e) => self.stop(&e, "create follow-up unit"),
        }
    }

    // ---------- Failures ----------

    /// Classifies a failed edit: `NotFound` stops the session, anything else leaves the buffer for
    /// the next scheduled cycle.
    fn sink_failed(&self, err: SinkError, op: &'static str) {
        if err.is_fatal() {
            self.stop(&err, op);
            return;
        }
        match err.retry_after() {
            Some(wait) => {
                self.state().retry_at = Some(Instant::now() + wait);
                warn!(error = %err, op, retry_after_ms = wait.as_millis() as u64, "sink rate limited, buffer kept");
            }
            None => warn!(error = %err, op, "sink call failed, buffer kept for next flush"),
        }
    }

    fn stop(&self, err: &SinkError, op: &'static str) {
        let mut st = self.state();
        st.terminated = true;
        st.stopped = true;
        st.timer.disarm();
        error!(
            error = %err,
            op,
            unit = %st.active_unit,
            buffered = char_len(&st.buffer),
            "streaming stopped"
        );
    }

    // ---------- Finalization ----------

    /// Commits the final buffer: in place when it fits, otherwise split into the current unit plus a
    /// follow-up. A vanished unit stops the session and abandons the text; other failures degrade to
    /// best-effort follow-ups instead of raising.
    async fn drain(&self, pending: Pending) {
        let fits = pending.emitted_len + char_len(&pending.text) <= self.max_unit_length;

        let carry = if fits {
            let written = self
                .write_unit(&pending.unit, pending.emitted_len, &pending.text)
                .await;
            match written {
                Ok(content) => {
                    self.state().record_edit(content);
                    return;
                }
                Err(e) if e.is_fatal() => return self.abandon(&e, &pending.text),
                Err(e) => {
                    warn!(error = %e, unit = %pending.unit, "final edit failed, sending rest as follow-up");
                    pending.text
                }
            }
        } else {
            let remaining = self.max_unit_length.saturating_sub(pending.emitted_len);
            let (head, tail) = split_for_limit(&pending.text, remaining);
            if head.is_empty() {
                tail.to_string()
            } else {
                let written = self
                    .write_unit(&pending.unit, pending.emitted_len, head)
                    .await;
                match written {
                    Ok(content) => {
                        self.state().record_edit(content);
                        tail.to_string()
                    }
                    Err(e) if e.is_fatal() => return self.abandon(&e, &pending.text),
                    Err(e) => {
                        warn!(error = %e, unit = %pending.unit, "final split edit failed, sending all as follow-up");
                        pending.text.clone()
                    }
                }
            }
        };

        self.send_follow_ups(&carry).await;
    }

    /// Stops the session during finalize and counts `text` as undelivered.
    fn abandon(&self, err: &SinkError, text: &str) {
        self.stop(err, "final edit");
        self.state().undelivered += char_len(text);
    }

    async fn send_follow_ups(&self, text: &str) {
        let options = self.state().follow_up_options.clone();
        let mut rest = text;
        while !rest.is_empty() {
            let (piece, tail) = split_for_limit(rest, self.max_unit_length);
            match self.sink.append_follow_up(piece, &options).await {
                Ok(unit) => {
                    debug!(unit = %unit, len = char_len(piece), "final follow-up sent");
                    self.state().record_new_unit(unit, piece.to_string());
                    rest = tail;
                }
                Err(e) => {
                    let undelivered = char_len(rest);
                    self.state().undelivered += undelivered;
                    error!(error = %e, undelivered, "final follow-up failed, rest of reply not delivered");
                    return;
                }
            }
        }
    }
}

/// One streamed reply: owns the unit being edited, the pending buffer and the flush timer.
///
/// Must be used inside a tokio runtime; [`add_chunk`](Self::add_chunk) spawns the flush timer task.
/// Dropping the session cancels a pending flush.
pub struct StreamSession {
    inner: Arc<SessionInner>,
}

impl StreamSession {
    /// Sends the placeholder (`config.thinking_message`) as the first unit and streams into it.
    #[instrument(skip(sink, config))]
    pub async fn start(sink: Arc<dyn Sink>, config: StreamConfig) -> SinkResult<Self> {
        let unit = sink
            .create_unit(&config.thinking_message, &UnitOptions::default())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send placeholder unit");
                e
            })?;
        info!(unit = %unit, "stream session started");
        Ok(Self::attach(sink, config, unit))
    }

    /// Streams into an already existing `unit`, whose current content is replaced by the first flush.
    pub fn attach(sink: Arc<dyn Sink>, config: StreamConfig, unit: UnitHandle) -> Self {
        let max_unit_length = sink.max_unit_length().max(1);
        Self {
            inner: Arc::new(SessionInner {
                sink,
                config,
                max_unit_length,
                state: Mutex::new(SessionState::new(unit)),
                flush_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Buffers `text` and makes sure a flush is scheduled. No-op for empty text or a terminated session.
    pub fn add_chunk(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        let mut st = self.inner.state();
        if st.terminated {
            debug!(len = text.len(), "chunk ignored, session terminated");
            return;
        }
        st.buffer.push_str(text);
        self.inner.schedule(&mut st);
    }

    /// Options for every unit created after the first. Set before the first overflow.
    pub fn set_follow_up_options(&self, options: UnitOptions) {
        self.inner.state().follow_up_options = options;
    }

    /// Stops scheduling, drains the buffer and returns the content of the last unit touched (not the
    /// whole multi-unit reply). Idempotent: later calls return the same content without sink calls.
    #[instrument(skip(self))]
    pub async fn finalize(&self) -> String {
        {
            let mut st = self.inner.state();
            if let Some(content) = &st.final_content {
                return content.clone();
            }
            st.terminated = true;
            st.timer.disarm();
        }

        // Waits for a cycle that is already talking to the sink.
        let _cycle = self.inner.flush_lock.lock().await;

        let (pending, stopped, follow_ups_before) = {
            let mut st = self.inner.state();
            if let Some(content) = &st.final_content {
                return content.clone();
            }
            let pending = Pending {
                text: std::mem::take(&mut st.buffer),
                unit: st.active_unit.clone(),
                emitted_len: st.emitted_len,
            };
            (pending, st.stopped, st.follow_ups_created)
        };

        if stopped {
            if !pending.text.is_empty() {
                let abandoned = char_len(&pending.text);
                self.inner.state().undelivered += abandoned;
                warn!(abandoned, "session already stopped, buffered text not delivered");
            }
        } else if !pending.text.is_empty() {
            self.inner.drain(pending).await;
        }

        let mut st = self.inner.state();
        let content = st.committed.clone();
        st.final_content = Some(content.clone());
        info!(
            unit = %st.active_unit,
            follow_ups = st.follow_ups_created,
            final_follow_ups = st.follow_ups_created - follow_ups_before,
            stopped = st.stopped,
            undelivered = st.undelivered,
            "stream finalized"
        );
        content
    }

    /// True once `finalize` ran or the sink failed fatally; later chunks are ignored.
    pub fn is_terminated(&self) -> bool {
        self.inner.state().terminated
    }

    /// True when the session was terminated by a fatal sink error.
    pub fn is_stopped(&self) -> bool {
        self.inner.state().stopped
    }

    pub fn has_pending_flush(&self) -> bool {
        self.inner.state().timer.is_armed()
    }

    /// Characters received but not yet committed.
    pub fn buffered_len(&self) -> usize {
        char_len(&self.inner.state().buffer)
    }

    /// Characters given up on because the sink failed.
    pub fn undelivered_len(&self) -> usize {
        self.inner.state().undelivered
    }

    pub fn active_unit(&self) -> UnitHandle {
        self.inner.state().active_unit.clone()
    }

    /// Units created on overflow, not counting the first one.
    pub fn follow_ups_created(&self) -> usize {
        self.inner.state().follow_ups_created
    }

    /// Content last committed into the active unit.
    pub fn committed_content(&self) -> String {
        self.inner.state().committed.clone()
    }

    pub fn max_unit_length(&self) -> usize {
        self.inner.max_unit_length
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.inner.state().timer.disarm();
    }
}
