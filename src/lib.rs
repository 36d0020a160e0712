//! # DuraKV
//!
//! A networked key-value store whose mutations survive restarts:
//! - In-memory map behind a single readers-writer lock
//! - Write-ahead transaction log with pluggable backends (file, SQLite, memory)
//! - Replay-based recovery that refuses to start on a corrupt log
//! - TCP-based client protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │                  (Multiple Clients)                          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Engine                                 │
//! │          (mutate store, then submit event)                   │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌──────────────────┐
//!   │    Store    │          │ TransactionLogger │
//!   │  (RwLock)   │          │  queue (16) ──►   │
//!   └──────▲──────┘          │  worker thread    │
//!          │                 └────────┬─────────┘
//!          │   replay on startup      │
//!          └──────────────────────────┤
//!                                     ▼
//!                        file  │  SQLite  │  memory
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod event;
pub mod store;
pub mod logger;
pub mod recovery;
pub mod engine;
pub mod network;
pub mod protocol;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{DuraError, Result};
pub use config::Config;
pub use engine::Engine;
pub use event::{Event, EventKind};
pub use store::KeyValueStore;
pub use logger::TransactionLogger;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of DuraKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
