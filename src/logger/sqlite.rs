//! SQLite Transaction Logger
//!
//! Relational backend: one row per event in a table shaped like
//!
//! ```sql
//! CREATE TABLE transactions (
//!     sequence   INTEGER PRIMARY KEY AUTOINCREMENT,
//!     event_type TEXT NOT NULL,   -- "1" delete, "2" put
//!     key        TEXT NOT NULL,
//!     value      TEXT
//! );
//! ```
//!
//! Unlike the file backend, sequence numbers come from the table's
//! autoincrement key, not from a counter in the worker. They are strictly
//! increasing but may have gaps if rows are removed out of band.

use std::path::Path;
use std::sync::Arc;

use crossbeam::channel::Receiver;
use parking_lot::Mutex;
use rusqlite::{params, Connection};

use crate::error::{DuraError, Result};
use crate::event::{Event, EventKind};
use super::lifecycle::LoggerCore;
use super::pipeline::EventSink;
use super::replay::{LogState, Replay};
use super::TransactionLogger;

/// [`TransactionLogger`] over a SQLite table
pub struct SqliteTransactionLogger {
    /// Database connection (shared by the replay thread and the worker)
    conn: Arc<Mutex<Connection>>,

    /// Validated table name
    table: String,

    core: LoggerCore,
}

impl SqliteTransactionLogger {
    /// Open (or create) the database at `path` and ensure `table` exists
    pub fn open(path: impl AsRef<Path>, table: &str) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).map_err(|e| {
            DuraError::Backend(format!(
                "failed to open database {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::with_connection(conn, table)
    }

    /// Private in-memory database (tests)
    pub fn in_memory(table: &str) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, table)
    }

    fn with_connection(conn: Connection, table: &str) -> Result<Self> {
        validate_table_name(table)?;

        if !table_exists(&conn, table)? {
            create_table(&conn, table)?;
            tracing::info!(table, "created transaction log table");
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            table: table.to_string(),
            core: LoggerCore::new("sqlite-log"),
        })
    }

    /// Name of the backing table
    pub fn table(&self) -> &str {
        &self.table
    }
}

impl TransactionLogger for SqliteTransactionLogger {
    fn write_put(&self, key: &str, value: &str) {
        self.core.submit(Event::put(key, value));
    }

    fn write_delete(&self, key: &str) {
        self.core.submit(Event::delete(key));
    }

    fn err(&self) -> Receiver<DuraError> {
        self.core.errors()
    }

    fn read_events(&mut self) -> Replay {
        let conn = Arc::clone(&self.conn);
        let query = format!(
            "SELECT sequence, event_type, key, value FROM {} ORDER BY sequence",
            self.table
        );

        self.core.replay(move |feed| {
            let conn = conn.lock();
            let mut stmt = conn.prepare(&query)?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })?;

            for row in rows {
                let (sequence, event_type, key, value) = row?;
                feed.emit(row_to_event(sequence, &event_type, key, value)?)?;
            }
            Ok(())
        })
    }

    fn run(&mut self) -> Result<()> {
        let sink = SqliteSink {
            conn: Arc::clone(&self.conn),
            insert: format!(
                "INSERT INTO {} (event_type, key, value) VALUES (?1, ?2, ?3)",
                self.table
            ),
            state: Arc::clone(self.core.state()),
        };
        self.core.start(|| Ok(sink))
    }

    fn last_sequence(&self) -> u64 {
        self.core.last_sequence()
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

/// Inserts events as rows on the pipeline worker
struct SqliteSink {
    conn: Arc<Mutex<Connection>>,
    insert: String,
    state: Arc<LogState>,
}

impl EventSink for SqliteSink {
    fn append(&mut self, event: Event) -> Result<u64> {
        let conn = self.conn.lock();
        conn.prepare_cached(&self.insert)?.execute(params![
            event.kind.code().to_string(),
            event.key,
            event.value
        ])?;

        let sequence = conn.last_insert_rowid() as u64;
        self.state.set_last_sequence(sequence);
        Ok(sequence)
    }
}

fn row_to_event(sequence: i64, event_type: &str, key: String, value: Option<String>) -> Result<Event> {
    let location = || format!("row {}", sequence);

    let sequence = u64::try_from(sequence).map_err(|_| DuraError::Parse {
        location: location(),
        reason: "negative sequence".to_string(),
    })?;
    let kind = event_type
        .trim()
        .parse::<u8>()
        .ok()
        .and_then(EventKind::from_code)
        .ok_or_else(|| DuraError::Parse {
            location: location(),
            reason: format!("unknown event type {:?}", event_type),
        })?;
    if key.is_empty() {
        return Err(DuraError::Parse {
            location: location(),
            reason: "empty key".to_string(),
        });
    }

    Ok(Event {
        sequence,
        kind,
        key,
        value: value.unwrap_or_default(),
    })
}

fn validate_table_name(table: &str) -> Result<()> {
    let valid = !table.is_empty()
        && !table.starts_with(|c: char| c.is_ascii_digit())
        && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(DuraError::Config(format!("invalid table name {:?}", table)))
    }
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn create_table(conn: &Connection, table: &str) -> Result<()> {
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {} (
            sequence   INTEGER PRIMARY KEY AUTOINCREMENT,
            event_type TEXT NOT NULL,
            key        TEXT NOT NULL,
            value      TEXT
        );",
        table
    ))?;
    Ok(())
}
