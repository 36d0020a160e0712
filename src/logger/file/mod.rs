//! File Transaction Logger
//!
//! Append-only text log, one event per line.
//!
//! ## File Format
//! ```text
//! ┌──────────┬────┬──────┬────┬─────┬────┬───────┬────┐
//! │ sequence │ \t │ kind │ \t │ key │ \t │ value │ \n │
//! └──────────┴────┴──────┴────┴─────┴────┴───────┴────┘
//!   decimal        1=Delete    escaped     escaped
//!                  2=Put
//! ```
//!
//! ## Replay Checks
//! - every line has four well-formed fields, else `Parse`
//! - sequence numbers strictly increase, else `OutOfSequence`
//! - no partial recovery: the first bad line ends replay

mod format;
mod writer;
mod reader;

pub use format::{encode_line, parse_line};

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crossbeam::channel::Receiver;

use crate::config::{RecoveryMode, SyncStrategy};
use crate::error::{DuraError, Result};
use crate::event::Event;
use super::lifecycle::LoggerCore;
use super::replay::Replay;
use super::TransactionLogger;
use writer::FileSink;

/// [`TransactionLogger`] over an append-only file
pub struct FileTransactionLogger {
    /// Log file, opened read + append
    file: File,

    /// Path, kept for diagnostics
    path: PathBuf,

    sync_strategy: SyncStrategy,
    recovery_mode: RecoveryMode,

    core: LoggerCore,
}

impl FileTransactionLogger {
    /// Open or create the log at `path` with default sync and recovery settings
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_options(path, SyncStrategy::EveryWrite, RecoveryMode::Strict)
    }

    /// Open or create the log at `path`
    pub fn with_options(
        path: impl AsRef<Path>,
        sync_strategy: SyncStrategy,
        recovery_mode: RecoveryMode,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)
            .map_err(|e| {
                DuraError::Backend(format!(
                    "cannot open transaction log file {}: {}",
                    path.display(),
                    e
                ))
            })?;

        tracing::debug!(path = %path.display(), "opened transaction log file");

        Ok(Self {
            file,
            path,
            sync_strategy,
            recovery_mode,
            core: LoggerCore::new("file-log"),
        })
    }

    /// Path of the underlying log file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TransactionLogger for FileTransactionLogger {
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
        let file = match self.file.try_clone() {
            Ok(file) => file,
            Err(e) => return Replay::failed(DuraError::Io(e)),
        };
        let mode = self.recovery_mode;
        self.core.replay(move |feed| reader::scan(file, mode, feed))
    }

    fn run(&mut self) -> Result<()> {
        let file = &self.file;
        let state = self.core.state().clone();
        let sync_strategy = self.sync_strategy;
        self.core
            .start(|| Ok(FileSink::new(file.try_clone()?, state, sync_strategy)))
    }

    fn last_sequence(&self) -> u64 {
        self.core.last_sequence()
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}
