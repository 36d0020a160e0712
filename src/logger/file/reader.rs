//! File replay scan
//!
//! Reads the log from the start, parsing each complete line. A final line
//! without a newline is a torn write; [`RecoveryMode`] decides whether that
//! aborts replay or is cut off.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};

use crate::config::RecoveryMode;
use crate::error::{DuraError, Result};
use crate::logger::replay::ReplayFeed;
use super::format::parse_line;

/// Scan `file` from offset 0 into `feed`
pub(crate) fn scan(file: File, mode: RecoveryMode, feed: &mut ReplayFeed) -> Result<()> {
    let mut reader = BufReader::new(file);
    reader.seek(SeekFrom::Start(0))?;

    let mut buf = Vec::new();
    let mut line_no: u64 = 0;
    let mut offset: u64 = 0;

    loop {
        buf.clear();
        let read = reader.read_until(b'\n', &mut buf)?;
        if read == 0 {
            return Ok(());
        }
        line_no += 1;

        if buf.last() != Some(&b'\n') {
            return handle_torn_tail(reader.into_inner(), mode, line_no, offset);
        }
        buf.pop();

        let line = std::str::from_utf8(&buf).map_err(|e| DuraError::Parse {
            location: format!("line {}", line_no),
            reason: format!("invalid UTF-8: {}", e),
        })?;

        feed.emit(parse_line(line_no, line)?)?;
        offset += read as u64;
    }
}

fn handle_torn_tail(file: File, mode: RecoveryMode, line_no: u64, offset: u64) -> Result<()> {
    match mode {
        RecoveryMode::Strict => Err(DuraError::Parse {
            location: format!("line {}", line_no),
            reason: "unterminated record (torn write)".to_string(),
        }),
        RecoveryMode::TruncateTornTail => {
            tracing::warn!(
                line = line_no,
                offset,
                "discarding torn record at end of transaction log"
            );
            file.set_len(offset)?;
            file.sync_all()?;
            Ok(())
        }
    }
}
