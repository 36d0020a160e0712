//! TCP Server
//!
//! Accepts connections and hands each one to its own thread.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::Config;
use crate::engine::Engine;
use crate::error::{DuraError, Result};
use crate::protocol::{write_response, Response};
use super::Connection;

/// How long the accept loop sleeps when no client is waiting
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// TCP server for DuraKV
pub struct Server {
    config: Config,
    engine: Arc<Engine>,
    listener: TcpListener,
    shutdown: Arc<AtomicBool>,
    active: Arc<AtomicUsize>,
}

/// Cloneable handle that stops a running [`Server`]
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    /// Ask the accept loop to stop; open connections finish on their own
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::Release);
    }
}

impl Server {
    /// Bind to `config.listen_addr`
    pub fn bind(config: Config, engine: Arc<Engine>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            DuraError::Network(format!("failed to bind {}: {}", config.listen_addr, e))
        })?;
        listener.set_nonblocking(true)?;

        Ok(Self {
            config,
            engine,
            listener,
            shutdown: Arc::new(AtomicBool::new(false)),
            active: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle for stopping the server from another thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
        }
    }

    /// Number of connections currently being served
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Run the accept loop until shut down (blocking)
    pub fn run(&self) -> Result<()> {
        tracing::info!("Listening on {}", self.local_addr()?);

        while !self.shutdown.load(Ordering::Acquire) {
            match self.listener.accept() {
                Ok((stream, peer)) => self.dispatch(stream, peer),
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(ref e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::error!("Accept failed: {}", e);
                    return Err(DuraError::Io(e));
                }
            }
        }

        tracing::info!("Server shutting down");
        Ok(())
    }

    fn dispatch(&self, stream: TcpStream, peer: SocketAddr) {
        if let Err(e) = stream.set_nonblocking(false) {
            tracing::warn!("Dropping {}: {}", peer, e);
            return;
        }

        if self.active.load(Ordering::Acquire) >= self.config.max_connections {
            tracing::warn!("Rejecting {}: connection limit {} reached", peer, self.config.max_connections);
            let mut stream = stream;
            let _ = write_response(&mut stream, &Response::error("too many connections"));
            return;
        }

        self.active.fetch_add(1, Ordering::AcqRel);
        let active = Arc::clone(&self.active);
        let engine = Arc::clone(&self.engine);
        let (read_ms, write_ms) = (self.config.read_timeout_ms, self.config.write_timeout_ms);

        let spawned = thread::Builder::new()
            .name(format!("conn-{}", peer))
            .spawn(move || {
                let result = Connection::new(stream, engine).and_then(|mut conn| {
                    conn.set_timeouts(read_ms, write_ms)?;
                    conn.handle()
                });
                if let Err(e) = result {
                    tracing::debug!("Connection {} ended with error: {}", peer, e);
                }
                active.fetch_sub(1, Ordering::AcqRel);
            });

        if let Err(e) = spawned {
            tracing::error!("Failed to spawn connection thread for {}: {}", peer, e);
            self.active.fetch_sub(1, Ordering::AcqRel);
        }
    }
}
