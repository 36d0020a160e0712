//! Event pipeline
//!
//! The bounded queue and dedicated worker thread behind every running
//! logger. Request threads enqueue; the worker drains the queue in order and
//! hands each event to an [`EventSink`]. The first sink failure is reported
//! on a single-slot error channel and stops the worker.

use std::thread::{self, JoinHandle};

use crossbeam::channel::{bounded, Receiver, Sender};

use crate::error::{DuraError, Result};
use crate::event::Event;
use super::QUEUE_CAPACITY;

/// Durable destination for events, driven by the pipeline worker
pub trait EventSink: Send + 'static {
    /// Persist one event, returning the sequence number it was recorded under
    fn append(&mut self, event: Event) -> Result<u64>;

    /// Called once after the queue closes, before the worker exits
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A running queue + worker pair
pub struct Pipeline {
    /// Producer end of the queue; `None` once closed
    events: Option<Sender<Event>>,

    /// Worker failures (capacity 1)
    errors: Receiver<DuraError>,

    /// Worker thread handle, joined on close
    worker: Option<JoinHandle<()>>,
}

impl Pipeline {
    /// Start a worker thread named `name` that drains into `sink`
    pub fn start<S: EventSink>(sink: S, name: &str) -> Result<Self> {
        let (event_tx, event_rx) = bounded(QUEUE_CAPACITY);
        let (error_tx, error_rx) = bounded(1);

        let worker = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || drain(sink, event_rx, error_tx))?;

        tracing::debug!(worker = name, capacity = QUEUE_CAPACITY, "event pipeline started");

        Ok(Self {
            events: Some(event_tx),
            errors: error_rx,
            worker: Some(worker),
        })
    }

    /// Enqueue an event, blocking while the queue is full
    ///
    /// If the worker has already stopped the event is discarded.
    pub fn submit(&self, event: Event) {
        let Some(events) = &self.events else {
            return;
        };

        if let Err(rejected) = events.send(event) {
            let event = rejected.into_inner();
            tracing::warn!(
                key = %event.key,
                kind = ?event.kind,
                "transaction log worker has stopped; event discarded"
            );
        }
    }

    /// Receiver for asynchronous worker failures
    pub fn errors(&self) -> Receiver<DuraError> {
        self.errors.clone()
    }

    /// Close the queue and wait for the worker to persist what remains
    pub fn close(&mut self) {
        drop(self.events.take());

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("transaction log worker panicked");
            }
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.close();
    }
}

/// Worker loop: persist events in queue order until close or first failure
fn drain<S: EventSink>(mut sink: S, events: Receiver<Event>, errors: Sender<DuraError>) {
    for event in events.iter() {
        match sink.append(event) {
            Ok(sequence) => tracing::trace!(sequence, "event persisted"),
            Err(err) => {
                tracing::error!(error = %err, "transaction log write failed; worker stopping");
                let _ = errors.try_send(err);
                // Dropping `events` here makes later submissions fail fast
                return;
            }
        }
    }

    if let Err(err) = sink.flush() {
        tracing::error!(error = %err, "transaction log flush failed");
        let _ = errors.try_send(err);
        return;
    }

    tracing::debug!("event pipeline drained");
}
