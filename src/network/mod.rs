//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single non-blocking acceptor loop
//! - One thread per connection, capped by `max_connections`
//! - Commands routed through Engine

mod server;
mod connection;

pub use server::{Server, ShutdownHandle};
pub use connection::Connection;
