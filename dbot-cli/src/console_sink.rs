//! Terminal [`Sink`]: keeps units in memory and prints what a chat user would see change.

use async_trait::async_trait;
use dbot_core::{Sink, SinkError, SinkResult, UnitHandle, UnitOptions};
use std::sync::{Mutex, MutexGuard, PoisonError};

pub struct ConsoleSink {
    max_unit_length: usize,
    units: Mutex<Vec<String>>,
    echo: bool,
}

impl ConsoleSink {
    pub fn new(max_unit_length: usize) -> Self {
        Self {
            max_unit_length,
            units: Mutex::new(Vec::new()),
            echo: true,
        }
    }

    /// A sink that records without printing.
    pub fn quiet(max_unit_length: usize) -> Self {
        Self {
            echo: false,
            ..Self::new(max_unit_length)
        }
    }

    fn units(&self) -> MutexGuard<'_, Vec<String>> {
        self.units.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Contents of all units, in creation order.
    pub fn snapshot(&self) -> Vec<String> {
        self.units().clone()
    }

    fn index(&self, unit: &UnitHandle) -> SinkResult<usize> {
        unit.id
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .filter(|i| *i < self.units().len())
            .ok_or_else(|| SinkError::NotFound(unit.id.clone()))
    }
}

#[async_trait]
impl Sink for ConsoleSink {
    fn max_unit_length(&self) -> usize {
        self.max_unit_length
    }

    async fn create_unit(&self, content: &str, options: &UnitOptions) -> SinkResult<UnitHandle> {
        let mut units = self.units();
        units.push(content.to_string());
        let id = units.len();
        if self.echo {
            let flags = if options.silent { " silent" } else { "" };
            println!("\n── unit #{id}{flags} ──");
            print!("{content}");
        }
        Ok(UnitHandle::new(id.to_string()))
    }

    async fn fetch_current_content(&self, unit: &UnitHandle) -> SinkResult<String> {
        let idx = self.index(unit)?;
        Ok(self.units()[idx].clone())
    }

    async fn edit_unit(&self, unit: &UnitHandle, content: &str) -> SinkResult<()> {
        let idx = self.index(unit)?;
        let mut units = self.units();
        if self.echo {
            match content.strip_prefix(units[idx].as_str()) {
                Some(appended) => print!("{appended}"),
                None => {
                    println!("\n── unit #{} (rewritten) ──", unit.id);
                    print!("{content}");
                }
            }
        }
        units[idx] = content.to_string();
        Ok(())
    }
}
