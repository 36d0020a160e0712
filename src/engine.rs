//! Engine Module
//!
//! Couples the store and the transaction logger for live traffic.
//!
//! ## Responsibilities
//! - Run recovery on startup
//! - Apply mutations: validate, mutate the store, submit the event
//! - Supervise the logger's error channel
//! - Refuse further mutations once the logger has failed

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Mutex, RwLock};

use crate::config::Config;
use crate::error::{DuraError, Result};
use crate::logger::TransactionLogger;
use crate::protocol::Command;
use crate::recovery::{self, RecoveryStats};
use crate::store::KeyValueStore;

/// The store plus its live transaction logger
///
/// ## Mutation Order
///
/// Each put/delete first changes the store, then enqueues the event, both
/// under one write lock so concurrent writers reach the store and the log in
/// the same order. The store is visible to readers before the event is
/// durable; a crash in that window loses the mutation, and replay restores
/// the last durable state.
///
/// ## Degraded Mode
///
/// A supervisor thread waits on [`TransactionLogger::err`]. After the first
/// write failure the engine is degraded: mutations fail with
/// [`DuraError::LoggerDegraded`] without touching the store. Events enqueued
/// between the failure and the supervisor noticing it are lost.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Current state
    store: KeyValueStore,

    /// Live logger (running)
    logger: Option<Box<dyn TransactionLogger>>,

    /// Serializes writers so store order and log order agree
    write_lock: Mutex<()>,

    /// First logger failure, once observed
    degraded: Arc<RwLock<Option<String>>>,

    /// Error channel supervisor
    supervisor: Option<JoinHandle<()>>,

    /// What startup replay did
    recovery: RecoveryStats,
}

impl Engine {
    /// Open the logger named by `config`, recover, and go live
    pub fn open(config: Config) -> Result<Self> {
        let logger = recovery::open_logger(&config)?;
        Self::with_logger(config, logger)
    }

    /// Recover from an injected logger that has not been replayed yet
    pub fn with_logger(config: Config, mut logger: Box<dyn TransactionLogger>) -> Result<Self> {
        let store = KeyValueStore::new();
        let recovery = recovery::restore(logger.as_mut(), &store)?;

        let degraded = Arc::new(RwLock::new(None));
        let supervisor = spawn_supervisor(logger.as_ref(), Arc::clone(&degraded))?;

        Ok(Self {
            config,
            store,
            logger: Some(logger),
            write_lock: Mutex::new(()),
            degraded,
            supervisor: Some(supervisor),
            recovery,
        })
    }

    /// Execute a command
    ///
    /// Returns the payload to send back, if any.
    pub fn execute(&self, command: Command) -> Result<Option<String>> {
        match command {
            Command::Get { key } => self.get(&key).map(Some),
            Command::Put { key, value } => {
                self.put(&key, &value)?;
                Ok(None)
            }
            Command::Delete { key } => {
                self.delete(&key)?;
                Ok(None)
            }
            Command::Ping => Ok(Some("PONG".to_string())),
        }
    }

    /// Get a value by key
    pub fn get(&self, key: &str) -> Result<String> {
        self.store.get(key)
    }

    /// Put a key-value pair
    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        if value.len() > self.config.max_value_size {
            return Err(DuraError::ValueTooLarge {
                size: value.len(),
                max: self.config.max_value_size,
            });
        }
        let _write_guard = self.write_lock.lock();
        let logger = self.live_logger()?;

        self.store.put(key, value);
        logger.write_put(key, value);
        Ok(())
    }

    /// Delete a key (absent keys are not an error)
    pub fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        let _write_guard = self.write_lock.lock();
        let logger = self.live_logger()?;

        self.store.delete(key);
        logger.write_delete(key);
        Ok(())
    }

    /// Close the engine, persisting every event already submitted
    pub fn close(mut self) -> Result<()> {
        self.shutdown();
        match self.degraded.read().clone() {
            Some(reason) => Err(DuraError::LoggerDegraded(reason)),
            None => Ok(()),
        }
    }

    fn shutdown(&mut self) {
        // Dropping the logger drains its queue and stops the worker, which
        // also ends the supervisor's wait
        drop(self.logger.take());
        if let Some(supervisor) = self.supervisor.take() {
            if supervisor.join().is_err() {
                tracing::error!("logger supervisor panicked");
            }
        }
    }

    fn live_logger(&self) -> Result<&dyn TransactionLogger> {
        if let Some(reason) = self.degraded.read().as_ref() {
            return Err(DuraError::LoggerDegraded(reason.clone()));
        }
        self.logger
            .as_deref()
            .ok_or_else(|| DuraError::LoggerDegraded("engine is closed".to_string()))
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// The underlying store
    pub fn store(&self) -> &KeyValueStore {
        &self.store
    }

    /// Startup replay summary
    pub fn recovery_stats(&self) -> RecoveryStats {
        self.recovery
    }

    /// The logger failure that degraded the engine, if any
    pub fn degraded_reason(&self) -> Option<String> {
        self.degraded.read().clone()
    }

    /// Sequence number of the last logged event
    pub fn last_sequence(&self) -> u64 {
        self.logger.as_ref().map_or(0, |l| l.last_sequence())
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(DuraError::InvalidKey("key must not be empty".to_string()));
    }
    Ok(())
}

fn spawn_supervisor(
    logger: &dyn TransactionLogger,
    degraded: Arc<RwLock<Option<String>>>,
) -> Result<JoinHandle<()>> {
    let errors = logger.err();
    let backend = logger.backend_name();

    let handle = thread::Builder::new()
        .name("log-supervisor".to_string())
        .spawn(move || {
            // Disconnects without a message when the worker stops cleanly
            if let Ok(err) = errors.recv() {
                tracing::error!(
                    backend,
                    error = %err,
                    "transaction logger failed; rejecting further writes"
                );
                *degraded.write() = Some(err.to_string());
            }
        })?;

    Ok(handle)
}
