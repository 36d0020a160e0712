//! File sink
//!
//! Appends encoded events to the log file on the pipeline worker.

use std::fs::File;
use std::io::Write;
use std::sync::Arc;

use crate::config::SyncStrategy;
use crate::error::Result;
use crate::event::Event;
use crate::logger::pipeline::EventSink;
use crate::logger::replay::LogState;
use super::format::encode_line;

/// Writes events to the append-only log file
pub(crate) struct FileSink {
    file: File,
    state: Arc<LogState>,
    sync_strategy: SyncStrategy,
    /// Events written since the last fsync
    unsynced: usize,
}

impl FileSink {
    pub(crate) fn new(file: File, state: Arc<LogState>, sync_strategy: SyncStrategy) -> Self {
        Self {
            file,
            state,
            sync_strategy,
            unsynced: 0,
        }
    }

    fn sync(&mut self) -> Result<()> {
        self.file.sync_data()?;
        self.unsynced = 0;
        Ok(())
    }
}

impl EventSink for FileSink {
    fn append(&mut self, event: Event) -> Result<u64> {
        let sequence = self.state.next_sequence();
        let line = encode_line(&event.with_sequence(sequence));

        // One write per line keeps records whole under O_APPEND
        self.file.write_all(line.as_bytes())?;
        self.unsynced += 1;

        match self.sync_strategy {
            SyncStrategy::EveryWrite => self.sync()?,
            SyncStrategy::EveryNEntries { count } => {
                if self.unsynced >= count.max(1) {
                    self.sync()?;
                }
            }
        }

        Ok(sequence)
    }

    fn flush(&mut self) -> Result<()> {
        if self.unsynced > 0 {
            self.sync()?;
        }
        Ok(())
    }
}
