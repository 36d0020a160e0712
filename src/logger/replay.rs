//! Replay streams
//!
//! A replay is a one-shot, forward-only pair of channels fed by a background
//! thread: events in ascending sequence order, and at most one error. Both
//! close when the thread finishes.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam::channel::{bounded, Receiver, Sender};

use crate::error::{DuraError, Result};
use crate::event::Event;
use super::QUEUE_CAPACITY;

/// Event and error streams produced by [`TransactionLogger::read_events`]
///
/// [`TransactionLogger::read_events`]: super::TransactionLogger::read_events
#[derive(Debug)]
pub struct Replay {
    /// Every durable event, ascending by sequence
    pub events: Receiver<Event>,

    /// Replay failure, if any; at most one is ever sent
    pub errors: Receiver<DuraError>,
}

impl Replay {
    /// A replay that yields no events and a single error
    pub(crate) fn failed(err: DuraError) -> Self {
        let (_, events) = bounded(0);
        let (error_tx, errors) = bounded(1);
        let _ = error_tx.send(err);
        Self { events, errors }
    }
}

/// Sequence bookkeeping shared by a logger, its replay thread and its worker
#[derive(Debug, Default)]
pub(crate) struct LogState {
    last_sequence: AtomicU64,
    replay_started: AtomicBool,
    replay_complete: AtomicBool,
}

impl LogState {
    pub(crate) fn last_sequence(&self) -> u64 {
        self.last_sequence.load(Ordering::Acquire)
    }

    pub(crate) fn set_last_sequence(&self, sequence: u64) {
        self.last_sequence.store(sequence, Ordering::Release);
    }

    /// Increment and return the next sequence number
    pub(crate) fn next_sequence(&self) -> u64 {
        self.last_sequence.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn replay_complete(&self) -> bool {
        self.replay_complete.load(Ordering::Acquire)
    }
}

/// Producer side of a replay
pub(crate) struct ReplayFeed {
    events: Sender<Event>,
    state: Arc<LogState>,
    emitted: u64,
}

impl ReplayFeed {
    /// Send one event, enforcing strictly increasing sequence numbers
    pub(crate) fn emit(&mut self, event: Event) -> Result<()> {
        let last = self.state.last_sequence();
        if event.sequence <= last {
            return Err(DuraError::OutOfSequence {
                last,
                found: event.sequence,
            });
        }

        self.state.set_last_sequence(event.sequence);
        self.events.send(event).map_err(|_| DuraError::ReplayAborted)?;
        self.emitted += 1;
        Ok(())
    }

    /// Number of events emitted so far
    pub(crate) fn emitted(&self) -> u64 {
        self.emitted
    }
}

/// Run `scan` on a named thread, feeding its events into a new [`Replay`]
///
/// Only the first call per [`LogState`] scans; later calls get
/// [`DuraError::ReplayConsumed`].
pub(crate) fn spawn_replay<F>(state: &Arc<LogState>, name: &str, scan: F) -> Replay
where
    F: FnOnce(&mut ReplayFeed) -> Result<()> + Send + 'static,
{
    if state.replay_started.swap(true, Ordering::AcqRel) {
        return Replay::failed(DuraError::ReplayConsumed);
    }

    let (event_tx, events) = bounded(QUEUE_CAPACITY);
    let (error_tx, errors) = bounded(1);
    let mut feed = ReplayFeed {
        events: event_tx,
        state: Arc::clone(state),
        emitted: 0,
    };

    let spawned = thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            match scan(&mut feed) {
                Ok(()) => {
                    tracing::debug!(
                        events = feed.emitted(),
                        last_sequence = feed.state.last_sequence(),
                        "replay scan complete"
                    );
                    feed.state.replay_complete.store(true, Ordering::Release);
                }
                Err(err) => {
                    tracing::error!(error = %err, "replay scan failed");
                    let _ = error_tx.send(err);
                }
            }
            // feed and error_tx drop here, closing both streams
        });

    match spawned {
        Ok(_) => Replay { events, errors },
        Err(e) => Replay::failed(DuraError::Io(e)),
    }
}
