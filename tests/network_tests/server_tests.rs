//! Server Tests
//!
//! Runs a server on an ephemeral port and talks to it over TCP.

use std::io::{BufReader, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use durakv::logger::MemoryLog;
use durakv::network::{Server, ShutdownHandle};
use durakv::protocol::{read_response, write_command, Command, Response, Status};
use durakv::{Config, Engine};

// =============================================================================
// Helper Functions
// =============================================================================

struct TestServer {
    addr: SocketAddr,
    server: Arc<Server>,
    shutdown: ShutdownHandle,
    handle: Option<JoinHandle<()>>,
    log: MemoryLog,
}

impl TestServer {
    fn start(max_connections: usize, max_value_size: usize) -> Self {
        let log = MemoryLog::new();
        let config = Config::builder()
            .memory_log(log.clone())
            .listen_addr("127.0.0.1:0")
            .max_connections(max_connections)
            .max_value_size(max_value_size)
            .build();

        let engine = Arc::new(Engine::open(config.clone()).unwrap());
        let server = Arc::new(Server::bind(config, engine).unwrap());
        let addr = server.local_addr().unwrap();
        let shutdown = server.shutdown_handle();
        let runner = Arc::clone(&server);
        let handle = thread::spawn(move || runner.run().unwrap());

        Self {
            addr,
            server,
            shutdown,
            handle: Some(handle),
            log,
        }
    }

    fn connect(&self) -> Client {
        let stream = TcpStream::connect(self.addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        Client {
            reader: BufReader::new(stream.try_clone().unwrap()),
            writer: stream,
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.shutdown();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

struct Client {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl Client {
    fn send(&mut self, command: Command) -> Response {
        write_command(&mut self.writer, &command).unwrap();
        read_response(&mut self.reader).unwrap()
    }

    fn put(&mut self, key: &str, value: &str) -> Response {
        self.send(Command::Put {
            key: key.to_string(),
            value: value.to_string(),
        })
    }

    fn get(&mut self, key: &str) -> Response {
        self.send(Command::Get {
            key: key.to_string(),
        })
    }

    fn delete(&mut self, key: &str) -> Response {
        self.send(Command::Delete {
            key: key.to_string(),
        })
    }
}

// =============================================================================
// Request Tests
// =============================================================================

#[test]
fn test_ping() {
    let server = TestServer::start(16, 1024);
    let mut client = server.connect();

    let response = client.send(Command::Ping);
    assert_eq!(response.status, Status::Ok);
    assert_eq!(response.payload_str().as_deref(), Some("PONG"));
}

#[test]
fn test_put_get_delete_statuses() {
    let server = TestServer::start(16, 1024);
    let mut client = server.connect();

    assert_eq!(client.put("key", "value").status, Status::Created);

    let response = client.get("key");
    assert_eq!(response.status, Status::Ok);
    assert_eq!(response.payload_str().as_deref(), Some("value"));

    assert_eq!(client.delete("key").status, Status::Ok);
    assert_eq!(client.get("key").status, Status::NotFound);

    // Deleting an absent key still succeeds
    assert_eq!(client.delete("key").status, Status::Ok);
}

#[test]
fn test_oversized_value_rejected() {
    let server = TestServer::start(16, 4);
    let mut client = server.connect();

    let response = client.put("key", "too long");
    assert_eq!(response.status, Status::TooLarge);
    assert!(response.payload_str().unwrap().contains("too large"));
    assert_eq!(client.get("key").status, Status::NotFound);
}

#[test]
fn test_empty_key_is_error() {
    let server = TestServer::start(16, 1024);
    let mut client = server.connect();

    let response = client.put("", "v");
    assert_eq!(response.status, Status::Error);
    assert!(response.payload_str().unwrap().contains("invalid key"));
}

#[test]
fn test_malformed_frame_gets_error_response() {
    let server = TestServer::start(16, 1024);
    let mut client = server.connect();

    client.writer.write_all(&[0x7f, 0, 0, 0, 0]).unwrap();
    let response = read_response(&mut client.reader).unwrap();
    assert_eq!(response.status, Status::Error);
}

#[test]
fn test_writes_reach_transaction_log() {
    let server = TestServer::start(16, 1024);
    let mut client = server.connect();

    client.put("a", "1");
    client.put("b", "2");
    client.delete("a");

    let deadline = Instant::now() + Duration::from_secs(5);
    while server.log.len() < 3 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    let keys: Vec<String> = server.log.events().into_iter().map(|e| e.key).collect();
    assert_eq!(keys, vec!["a", "b", "a"]);
}

// =============================================================================
// Connection Tests
// =============================================================================

#[test]
fn test_multiple_clients_share_state() {
    let server = TestServer::start(16, 1024);
    let mut writer = server.connect();
    let mut reader = server.connect();

    writer.put("shared", "yes");
    assert_eq!(reader.get("shared").payload_str().as_deref(), Some("yes"));
}

fn wait_for_active(server: &TestServer, expected: usize) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while server.server.active_connections() != expected && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    server.server.active_connections() == expected
}

#[test]
fn test_connection_limit() {
    let server = TestServer::start(1, 1024);
    assert_eq!(server.server.active_connections(), 0);

    let mut first = server.connect();
    assert_eq!(first.send(Command::Ping).status, Status::Ok);
    assert_eq!(server.server.active_connections(), 1);

    let mut second = server.connect();
    let response = read_response(&mut second.reader).unwrap();
    assert_eq!(response.status, Status::Error);
    assert_eq!(response.payload_str().as_deref(), Some("too many connections"));
    assert_eq!(server.server.active_connections(), 1);

    // A closed connection frees its slot
    drop(first);
    assert!(wait_for_active(&server, 0));
    let mut third = server.connect();
    assert_eq!(third.send(Command::Ping).status, Status::Ok);
}
