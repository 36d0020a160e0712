//! Transaction Log Module
//!
//! Records every store mutation as an [`Event`] and replays the history on
//! startup.
//!
//! ## Responsibilities
//! - Accept put/delete submissions without blocking on I/O
//! - Persist events in submission order on a dedicated worker thread
//! - Assign strictly increasing sequence numbers
//! - Replay the full history once, before going live
//! - Report asynchronous write failures on an error channel
//!
//! ## Lifecycle
//! ```text
//!   open ──► read_events() ──► (drain replay) ──► run() ──► write_*()
//!                                                  │
//!                                                  └──► err() reports worker failure
//! ```
//!
//! ## Backends
//! - [`FileTransactionLogger`]: tab-separated lines in an append-only file;
//!   sequence numbers counted by the worker
//! - [`SqliteTransactionLogger`]: rows in a SQLite table; sequence numbers
//!   assigned by the table's autoincrement key
//! - [`MemoryTransactionLogger`]: a shared in-process event list
//!
//! [`Event`]: crate::event::Event

mod lifecycle;
mod replay;
pub mod pipeline;
pub mod file;
mod sqlite;
mod memory;

pub use replay::Replay;
pub use pipeline::{EventSink, Pipeline};
pub use file::FileTransactionLogger;
pub use sqlite::SqliteTransactionLogger;
pub use memory::{MemoryLog, MemoryTransactionLogger};

use crossbeam::channel::Receiver;

use crate::error::{DuraError, Result};

/// Capacity of the outgoing event queue
pub const QUEUE_CAPACITY: usize = 16;

/// Durable, replayable record of store mutations
///
/// All backends honour the same contract:
/// 1. [`read_events`](Self::read_events) is called at most once, before
///    [`run`](Self::run), and drained to completion
/// 2. [`run`](Self::run) starts the background worker
/// 3. [`write_put`](Self::write_put) / [`write_delete`](Self::write_delete)
///    enqueue events for the worker
pub trait TransactionLogger: Send + Sync {
    /// Enqueue a put event
    ///
    /// # Panics
    ///
    /// Panics if called before [`run`](Self::run).
    fn write_put(&self, key: &str, value: &str);

    /// Enqueue a delete event
    ///
    /// # Panics
    ///
    /// Panics if called before [`run`](Self::run).
    fn write_delete(&self, key: &str);

    /// Asynchronous write failures; never yields before [`run`](Self::run)
    fn err(&self) -> Receiver<DuraError>;

    /// Stream every durable event in ascending sequence order
    fn read_events(&mut self) -> Replay;

    /// Start the background worker
    fn run(&mut self) -> Result<()>;

    /// Sequence number of the last replayed or written event
    fn last_sequence(&self) -> u64;

    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;
}
