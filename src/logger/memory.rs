//! In-memory Transaction Logger
//!
//! Keeps events in a [`MemoryLog`] that can be shared between logger
//! instances, so a "restart" is just a new logger over the same log.

use std::sync::Arc;

use crossbeam::channel::Receiver;
use parking_lot::Mutex;

use crate::error::{DuraError, Result};
use crate::event::Event;
use super::lifecycle::LoggerCore;
use super::pipeline::EventSink;
use super::replay::{LogState, Replay};
use super::TransactionLogger;

/// Shared, cloneable event list
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    events: Arc<Mutex<Vec<Event>>>,
}

impl MemoryLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every recorded event, in write order
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Number of recorded events
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Check if nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Append an already-sequenced event, bypassing any logger
    pub fn push(&self, event: Event) {
        self.events.lock().push(event);
    }
}

/// [`TransactionLogger`] over a [`MemoryLog`]
pub struct MemoryTransactionLogger {
    log: MemoryLog,
    core: LoggerCore,
}

impl MemoryTransactionLogger {
    pub fn new(log: MemoryLog) -> Self {
        Self {
            log,
            core: LoggerCore::new("memory-log"),
        }
    }

    /// The shared log this logger writes to
    pub fn log(&self) -> &MemoryLog {
        &self.log
    }
}

impl TransactionLogger for MemoryTransactionLogger {
    fn write_put(&self, key: &str, value: &str) {
        self.core.submit(Event::put(key, value));
    }

    fn write_delete(&self, key: &str) {
        self.core.submit(Event::delete(key));
    }

    fn err(&self) -> Receiver<DuraError> {
        self.core.errors()
    }

    fn read_events(&mut self) -> Replay {
        let snapshot = self.log.events();
        self.core.replay(move |feed| {
            for event in snapshot {
                feed.emit(event)?;
            }
            Ok(())
        })
    }

    fn run(&mut self) -> Result<()> {
        let sink = MemorySink {
            log: self.log.clone(),
            state: Arc::clone(self.core.state()),
        };
        self.core.start(|| Ok(sink))
    }

    fn last_sequence(&self) -> u64 {
        self.core.last_sequence()
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

struct MemorySink {
    log: MemoryLog,
    state: Arc<LogState>,
}

impl EventSink for MemorySink {
    fn append(&mut self, event: Event) -> Result<u64> {
        let sequence = self.state.next_sequence();
        self.log.push(event.with_sequence(sequence));
        Ok(sequence)
    }
}
