//! Store Module
//!
//! The in-memory key-value map that holds current state.
//!
//! ## Responsibilities
//! - Single source of truth for the current value of every key
//! - Safe under arbitrary concurrent get/put/delete
//! - Populated by log replay at startup, then by live traffic
//!
//! ## Data Structure Choice
//! A `HashMap` behind one `parking_lot::RwLock`:
//! - No multi-key transactions, so a map-wide lock is enough
//! - Readers share the lock, writers take it exclusively
//! - Nothing is persisted from here; durability belongs to the transaction log

mod table;

pub use table::KeyValueStore;
