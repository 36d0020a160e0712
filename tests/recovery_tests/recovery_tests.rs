//! Recovery Tests
//!
//! Tests verify:
//! - The store is rebuilt to its last durable state
//! - Replay aborts on the first bad record and the logger stays stopped
//! - Every backend goes through the same bootstrap

use std::fs;
use std::path::PathBuf;

use durakv::config::{Config, RecoveryMode};
use durakv::logger::{FileTransactionLogger, MemoryLog, MemoryTransactionLogger, TransactionLogger};
use durakv::recovery::{bootstrap, collect_events, replay_into, restore, RecoveryStats};
use durakv::{DuraError, Event, KeyValueStore};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_log() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("transaction.log");
    (temp_dir, log_path)
}

fn file_config(path: &PathBuf) -> Config {
    Config::builder().file_log(path).build()
}

// =============================================================================
// Restart Scenario Tests
// =============================================================================

#[test]
fn test_restart_restores_last_state() {
    let (_temp, log_path) = setup_temp_log();

    {
        let store = KeyValueStore::new();
        let (logger, stats) = bootstrap(&file_config(&log_path), &store).unwrap();
        assert_eq!(stats, RecoveryStats::default());

        store.put("a", "1");
        logger.write_put("a", "1");
        store.put("b", "2");
        logger.write_put("b", "2");
        store.delete("a");
        logger.write_delete("a");
    }

    let store = KeyValueStore::new();
    let (logger, stats) = bootstrap(&file_config(&log_path), &store).unwrap();

    assert!(matches!(store.get("a"), Err(DuraError::NoSuchKey)));
    assert_eq!(store.get("b").unwrap(), "2");
    assert_eq!(
        stats,
        RecoveryStats {
            events_replayed: 3,
            puts: 2,
            deletes: 1,
            last_sequence: 3,
        }
    );
    assert_eq!(logger.last_sequence(), 3);
}

#[test]
fn test_later_puts_win() {
    let log = MemoryLog::new();
    log.push(Event::put("k", "first").with_sequence(1));
    log.push(Event::put("k", "second").with_sequence(2));
    log.push(Event::delete("missing").with_sequence(3));

    let store = KeyValueStore::new();
    let mut logger = MemoryTransactionLogger::new(log);
    let stats = restore(&mut logger, &store).unwrap();

    assert_eq!(store.get("k").unwrap(), "second");
    assert_eq!(store.len(), 1);
    assert_eq!(stats.deletes, 1);
}

#[test]
fn test_empty_log_recovers_empty_store() {
    let (_temp, log_path) = setup_temp_log();
    let store = KeyValueStore::new();

    let (_logger, stats) = bootstrap(&file_config(&log_path), &store).unwrap();

    assert!(store.is_empty());
    assert_eq!(stats.events_replayed, 0);
    assert_eq!(stats.last_sequence, 0);
}

// =============================================================================
// Failure Tests
// =============================================================================

#[test]
fn test_corrupt_line_aborts_startup() {
    let (_temp, log_path) = setup_temp_log();
    fs::write(&log_path, "1\t2\ta\t1\n2\t7\tb\t2\n3\t2\tc\t3\n").unwrap();

    let store = KeyValueStore::new();
    let err = bootstrap(&file_config(&log_path), &store).err().unwrap();

    assert!(err.is_corruption());
    // Nothing past the last valid record was applied
    assert_eq!(store.get("a").unwrap(), "1");
    assert!(!store.contains_key("b"));
    assert!(!store.contains_key("c"));
}

#[test]
fn test_failed_restore_leaves_logger_stopped() {
    let (_temp, log_path) = setup_temp_log();
    fs::write(&log_path, "2\t2\ta\t1\n1\t2\tb\t2\n").unwrap();

    let store = KeyValueStore::new();
    let mut logger = FileTransactionLogger::open(&log_path).unwrap();
    let err = restore(&mut logger, &store).unwrap_err();

    assert!(matches!(err, DuraError::OutOfSequence { last: 2, found: 1 }));
    assert!(matches!(logger.run(), Err(DuraError::ReplayIncomplete)));
}

#[test]
fn test_torn_tail_policy_applies_through_bootstrap() {
    let (_temp, log_path) = setup_temp_log();
    fs::write(&log_path, "1\t2\ta\t1\n2\t2\tb").unwrap();

    let strict = file_config(&log_path);
    assert!(bootstrap(&strict, &KeyValueStore::new()).is_err());

    let lenient = Config::builder()
        .file_log(&log_path)
        .recovery_mode(RecoveryMode::TruncateTornTail)
        .build();
    let store = KeyValueStore::new();
    let (_logger, stats) = bootstrap(&lenient, &store).unwrap();

    assert_eq!(stats.events_replayed, 1);
    assert_eq!(store.get("a").unwrap(), "1");
}

#[test]
fn test_missing_parent_directory_is_backend_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("no").join("such").join("dir.log");

    let result = bootstrap(&file_config(&path), &KeyValueStore::new());
    assert!(matches!(result, Err(DuraError::Backend(_))));
}

// =============================================================================
// Backend Tests
// =============================================================================

#[test]
fn test_bootstrap_sqlite_backend() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("kv.db");
    let config = Config::builder().sqlite_log(&db_path, "transactions").build();

    {
        let store = KeyValueStore::new();
        let (logger, _) = bootstrap(&config, &store).unwrap();
        logger.write_put("x", "10");
        logger.write_put("y", "20");
        logger.write_delete("x");
    }

    let store = KeyValueStore::new();
    let (logger, stats) = bootstrap(&config, &store).unwrap();
    assert_eq!(logger.backend_name(), "sqlite");
    assert_eq!(stats.events_replayed, 3);
    assert_eq!(store.snapshot().into_iter().collect::<Vec<_>>(), vec![("y".to_string(), "20".to_string())]);
}

#[test]
fn test_bootstrap_memory_backend() {
    let log = MemoryLog::new();
    let config = Config::builder().memory_log(log.clone()).build();

    {
        let (logger, _) = bootstrap(&config, &KeyValueStore::new()).unwrap();
        logger.write_put("m", "1");
    }
    assert_eq!(log.len(), 1);

    let store = KeyValueStore::new();
    let (_logger, stats) = bootstrap(&config, &store).unwrap();
    assert_eq!(stats.last_sequence, 1);
    assert_eq!(store.get("m").unwrap(), "1");
}

// =============================================================================
// Replay Stream Tests
// =============================================================================

#[test]
fn test_collect_events_without_applying() {
    let log = MemoryLog::new();
    log.push(Event::put("a", "1").with_sequence(1));
    log.push(Event::delete("a").with_sequence(2));

    let mut logger = MemoryTransactionLogger::new(log);
    let events = collect_events(logger.read_events()).unwrap();

    assert_eq!(events.len(), 2);
    assert_eq!(events[1], Event::delete("a").with_sequence(2));
}

#[test]
fn test_replay_into_large_history() {
    let log = MemoryLog::new();
    for i in 1..=1000u64 {
        log.push(Event::put(format!("key{}", i % 10), i.to_string()).with_sequence(i));
    }

    let store = KeyValueStore::new();
    let mut logger = MemoryTransactionLogger::new(log);
    let stats = replay_into(logger.read_events(), &store).unwrap();

    assert_eq!(stats.events_replayed, 1000);
    assert_eq!(store.len(), 10);
    assert_eq!(store.get("key0").unwrap(), "1000");
}
