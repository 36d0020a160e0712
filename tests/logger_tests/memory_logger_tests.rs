//! In-memory Transaction Logger Tests

use std::time::{Duration, Instant};

use durakv::logger::{MemoryLog, MemoryTransactionLogger, TransactionLogger};
use durakv::recovery::collect_events;
use durakv::{DuraError, Event, EventKind};

fn wait_for_len(log: &MemoryLog, len: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while log.len() < len && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn test_events_recorded_in_order() {
    let log = MemoryLog::new();
    let mut logger = MemoryTransactionLogger::new(log.clone());
    collect_events(logger.read_events()).unwrap();
    logger.run().unwrap();

    logger.write_put("a", "1");
    logger.write_put("b", "2");
    logger.write_delete("a");
    wait_for_len(&log, 3);

    let events = log.events();
    assert_eq!(
        events,
        vec![
            Event::put("a", "1").with_sequence(1),
            Event::put("b", "2").with_sequence(2),
            Event::delete("a").with_sequence(3),
        ]
    );
    assert_eq!(logger.backend_name(), "memory");
}

#[test]
fn test_shared_log_survives_restart() {
    let log = MemoryLog::new();
    {
        let mut logger = MemoryTransactionLogger::new(log.clone());
        collect_events(logger.read_events()).unwrap();
        logger.run().unwrap();
        logger.write_put("a", "1");
    }
    assert_eq!(log.len(), 1);

    let mut logger = MemoryTransactionLogger::new(log.clone());
    let events = collect_events(logger.read_events()).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(logger.last_sequence(), 1);

    logger.run().unwrap();
    logger.write_delete("a");
    drop(logger);

    let last = log.events().pop().unwrap();
    assert_eq!(last.sequence, 2);
    assert_eq!(last.kind, EventKind::Delete);
}

#[test]
fn test_out_of_order_history_rejected() {
    let log = MemoryLog::new();
    log.push(Event::put("a", "1").with_sequence(4));
    log.push(Event::put("b", "2").with_sequence(3));

    let mut logger = MemoryTransactionLogger::new(log);
    let err = collect_events(logger.read_events()).unwrap_err();
    assert!(matches!(err, DuraError::OutOfSequence { last: 4, found: 3 }));
    assert!(err.is_corruption());
}

#[test]
fn test_log_handle_shared() {
    let log = MemoryLog::new();
    let logger = MemoryTransactionLogger::new(log.clone());
    assert!(logger.log().is_empty());

    log.push(Event::put("k", "v").with_sequence(1));
    assert_eq!(logger.log().len(), 1);
}
