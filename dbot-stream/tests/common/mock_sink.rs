//! Mock implementation of [`dbot_core::Sink`] for integration tests.
//!
//! Keeps every unit's content in memory, records each call so tests can assert on the exact sink traffic,
//! and lets tests queue failures, add latency, delete units or edit them "externally".

use async_trait::async_trait;
use dbot_core::{Sink, SinkError, SinkResult, UnitHandle, UnitOptions};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One recorded sink call.
#[derive(Debug, Clone, PartialEq)]
#[allow(dead_code)] // not every test binary inspects every variant
pub enum SinkCall {
    Create { content: String, options: UnitOptions },
    Fetch { unit: String },
    Edit { unit: String, content: String },
}

#[derive(Default)]
struct MockState {
    /// Unit `n` lives at index `n - 1`; `None` once deleted.
    units: Vec<Option<String>>,
    calls: Vec<SinkCall>,
    edit_failures: VecDeque<SinkError>,
    create_failures: VecDeque<SinkError>,
}

pub struct MockSink {
    max_unit_length: usize,
    edit_latency: Duration,
    state: Mutex<MockState>,
}

#[allow(dead_code)]
impl MockSink {
    pub fn new(max_unit_length: usize) -> Arc<Self> {
        Self::with_latency(max_unit_length, Duration::ZERO)
    }

    /// Mock whose edits take `edit_latency` (virtual time under a paused clock).
    pub fn with_latency(max_unit_length: usize, edit_latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            max_unit_length,
            edit_latency,
            state: Mutex::new(MockState::default()),
        })
    }

    pub fn fail_next_edit(&self, err: SinkError) {
        self.state.lock().unwrap().edit_failures.push_back(err);
    }

    pub fn fail_next_create(&self, err: SinkError) {
        self.state.lock().unwrap().create_failures.push_back(err);
    }

    /// Deletes unit `id` behind the session's back.
    pub fn delete_unit(&self, id: usize) {
        self.state.lock().unwrap().units[id - 1] = None;
    }

    /// Overwrites unit `id` behind the session's back.
    pub fn set_unit_content(&self, id: usize, content: &str) {
        self.state.lock().unwrap().units[id - 1] = Some(content.to_string());
    }

    /// Contents of all live units, in creation order.
    pub fn units(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .units
            .iter()
            .flatten()
            .cloned()
            .collect()
    }

    /// Everything shown to the user, concatenated across units.
    pub fn transcript(&self) -> String {
        self.units().concat()
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    pub fn edit_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, SinkCall::Edit { .. }))
            .count()
    }

    pub fn fetch_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, SinkCall::Fetch { .. }))
            .count()
    }

    /// Options passed to each create call, in order.
    pub fn create_options(&self) -> Vec<UnitOptions> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SinkCall::Create { options, .. } => Some(options),
                _ => None,
            })
            .collect()
    }

    fn index(unit: &UnitHandle) -> SinkResult<usize> {
        unit.id
            .parse::<usize>()
            .map(|n| n - 1)
            .map_err(|_| SinkError::NotFound(unit.id.clone()))
    }
}

#[async_trait]
impl Sink for MockSink {
    fn max_unit_length(&self) -> usize {
        self.max_unit_length
    }

    async fn create_unit(&self, content: &str, options: &UnitOptions) -> SinkResult<UnitHandle> {
        let mut st = self.state.lock().unwrap();
        st.calls.push(SinkCall::Create {
            content: content.to_string(),
            options: options.clone(),
        });
        if let Some(err) = st.create_failures.pop_front() {
            return Err(err);
        }
        st.units.push(Some(content.to_string()));
        Ok(UnitHandle::new(st.units.len().to_string()))
    }

    async fn fetch_current_content(&self, unit: &UnitHandle) -> SinkResult<String> {
        let mut st = self.state.lock().unwrap();
        st.calls.push(SinkCall::Fetch {
            unit: unit.id.clone(),
        });
        let idx = Self::index(unit)?;
        st.units
            .get(idx)
            .cloned()
            .flatten()
            .ok_or_else(|| SinkError::NotFound(unit.id.clone()))
    }

    async fn edit_unit(&self, unit: &UnitHandle, content: &str) -> SinkResult<()> {
        if !self.edit_latency.is_zero() {
            tokio::time::sleep(self.edit_latency).await;
        }
        let mut st = self.state.lock().unwrap();
        st.calls.push(SinkCall::Edit {
            unit: unit.id.clone(),
            content: content.to_string(),
        });
        if let Some(err) = st.edit_failures.pop_front() {
            return Err(err);
        }
        let idx = Self::index(unit)?;
        match st.units.get_mut(idx) {
            Some(Some(slot)) => {
                *slot = content.to_string();
                Ok(())
            }
            _ => Err(SinkError::NotFound(unit.id.clone())),
        }
    }
}
