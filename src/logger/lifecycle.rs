//! Logger lifecycle shared by every backend
//!
//! Tracks the two states a logger moves through (replaying, running) and
//! owns the pipeline once running. Backends supply the scan and the sink.

use std::sync::Arc;

use crossbeam::channel::{never, Receiver};

use crate::error::{DuraError, Result};
use crate::event::Event;
use super::pipeline::{EventSink, Pipeline};
use super::replay::{spawn_replay, LogState, Replay, ReplayFeed};

pub(crate) struct LoggerCore {
    name: &'static str,
    state: Arc<LogState>,
    pipeline: Option<Pipeline>,
}

impl LoggerCore {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Arc::new(LogState::default()),
            pipeline: None,
        }
    }

    pub(crate) fn state(&self) -> &Arc<LogState> {
        &self.state
    }

    pub(crate) fn last_sequence(&self) -> u64 {
        self.state.last_sequence()
    }

    pub(crate) fn is_running(&self) -> bool {
        self.pipeline.is_some()
    }

    pub(crate) fn replay<F>(&self, scan: F) -> Replay
    where
        F: FnOnce(&mut ReplayFeed) -> Result<()> + Send + 'static,
    {
        if self.is_running() {
            return Replay::failed(DuraError::AlreadyRunning);
        }
        spawn_replay(&self.state, &format!("{}-replay", self.name), scan)
    }

    pub(crate) fn start<S: EventSink>(&mut self, sink: impl FnOnce() -> Result<S>) -> Result<()> {
        if self.is_running() {
            return Err(DuraError::AlreadyRunning);
        }
        if !self.state.replay_complete() {
            return Err(DuraError::ReplayIncomplete);
        }

        let pipeline = Pipeline::start(sink()?, &format!("{}-writer", self.name))?;
        self.pipeline = Some(pipeline);

        tracing::info!(
            backend = self.name,
            last_sequence = self.last_sequence(),
            "transaction logger running"
        );
        Ok(())
    }

    /// # Panics
    ///
    /// Panics if the logger is not running.
    pub(crate) fn submit(&self, event: Event) {
        match &self.pipeline {
            Some(pipeline) => pipeline.submit(event),
            None => panic!(
                "{} transaction logger: write submitted before run()",
                self.name
            ),
        }
    }

    pub(crate) fn errors(&self) -> Receiver<DuraError> {
        match &self.pipeline {
            Some(pipeline) => pipeline.errors(),
            None => never(),
        }
    }
}
