//! Recovery Module
//!
//! Startup protocol that rebuilds the store from the transaction log.
//!
//! ## Steps
//! 1. Build the logger selected by configuration
//! 2. Drain its replay, applying each event to the store in order
//! 3. Abort on the first replay error (never serve a truncated state)
//! 4. Switch the logger into live-write mode

use crossbeam::select;

use crate::config::{Config, LoggerBackend};
use crate::error::Result;
use crate::event::{Event, EventKind};
use crate::logger::{
    FileTransactionLogger, MemoryTransactionLogger, Replay, SqliteTransactionLogger,
    TransactionLogger,
};
use crate::store::KeyValueStore;

/// Summary of a completed replay
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryStats {
    /// Events applied to the store
    pub events_replayed: u64,

    /// Put events among them
    pub puts: u64,

    /// Delete events among them
    pub deletes: u64,

    /// Sequence number of the last applied event (0 when the log was empty)
    pub last_sequence: u64,
}

/// Build the logger backend named by `config`
pub fn open_logger(config: &Config) -> Result<Box<dyn TransactionLogger>> {
    let logger: Box<dyn TransactionLogger> = match &config.logger {
        LoggerBackend::File { path } => Box::new(FileTransactionLogger::with_options(
            path,
            config.sync_strategy,
            config.recovery_mode,
        )?),
        LoggerBackend::Sqlite { path, table } => {
            Box::new(SqliteTransactionLogger::open(path, table)?)
        }
        LoggerBackend::Memory(log) => Box::new(MemoryTransactionLogger::new(log.clone())),
    };

    tracing::debug!(backend = logger.backend_name(), "transaction logger opened");
    Ok(logger)
}

/// Open the configured logger, restore `store` from it and start it
pub fn bootstrap(config: &Config, store: &KeyValueStore) -> Result<(Box<dyn TransactionLogger>, RecoveryStats)> {
    let mut logger = open_logger(config)?;
    let stats = restore(logger.as_mut(), store)?;
    Ok((logger, stats))
}

/// Replay `logger` into `store`, then put the logger in live-write mode
///
/// On a replay error the logger is left stopped and the error returned.
pub fn restore(logger: &mut dyn TransactionLogger, store: &KeyValueStore) -> Result<RecoveryStats> {
    let stats = replay_into(logger.read_events(), store).map_err(|e| {
        tracing::error!(
            backend = logger.backend_name(),
            error = %e,
            "transaction log replay failed; refusing to start"
        );
        e
    })?;

    tracing::info!(
        backend = logger.backend_name(),
        events = stats.events_replayed,
        puts = stats.puts,
        deletes = stats.deletes,
        last_sequence = stats.last_sequence,
        "transaction log replayed"
    );

    logger.run()?;
    Ok(stats)
}

/// Apply every event of `replay` to `store` in arrival order
pub fn replay_into(replay: Replay, store: &KeyValueStore) -> Result<RecoveryStats> {
    let mut stats = RecoveryStats::default();
    drain(replay, |event| {
        match event.kind {
            EventKind::Delete => {
                store.delete(&event.key);
                stats.deletes += 1;
            }
            EventKind::Put => {
                store.put(event.key, event.value);
                stats.puts += 1;
            }
        }
        stats.events_replayed += 1;
        stats.last_sequence = event.sequence;
    })?;
    Ok(stats)
}

/// Collect every event of `replay` without applying them anywhere
pub fn collect_events(replay: Replay) -> Result<Vec<Event>> {
    let mut events = Vec::new();
    drain(replay, |event| events.push(event))?;
    Ok(events)
}

/// Multiplex the two replay streams until events close or an error arrives
fn drain(replay: Replay, mut apply: impl FnMut(Event)) -> Result<()> {
    let Replay { events, errors } = replay;

    loop {
        select! {
            recv(events) -> msg => match msg {
                Ok(event) => apply(event),
                // The error, if any, is sent before the streams close
                Err(_) => return match errors.recv() {
                    Ok(err) => Err(err),
                    Err(_) => Ok(()),
                },
            },
            recv(errors) -> msg => match msg {
                Ok(err) => {
                    // Events sent ahead of the error are valid; apply them
                    for event in events.try_iter() {
                        apply(event);
                    }
                    return Err(err);
                }
                Err(_) => break,
            },
        }
    }

    // Error stream closed cleanly; take whatever events are still buffered
    for event in events.iter() {
        apply(event);
    }
    Ok(())
}
