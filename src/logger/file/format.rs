//! Line format
//!
//! One event per line: `sequence \t kind \t key \t value \n`, with the kind
//! as its numeric code. Inside key and value, `\\`, tab, newline and
//! carriage return are escaped as `\\\\`, `\\t`, `\\n` and `\\r`; every other
//! character is written as-is.
//!
//! Logs written before escaping existed stored values raw. On read, a
//! backslash not followed by one of the four escape characters (including one
//! at the end of a field) is kept literally, so such values load unchanged.

use std::borrow::Cow;

use crate::error::{DuraError, Result};
use crate::event::{Event, EventKind};

/// Serialize an event to one newline-terminated line
pub fn encode_line(event: &Event) -> String {
    format!(
        "{}\t{}\t{}\t{}\n",
        event.sequence,
        event.kind.code(),
        escape(&event.key),
        escape(&event.value)
    )
}

/// Parse one line (without its trailing newline)
///
/// `line_no` is 1-based and only used for error reporting.
pub fn parse_line(line_no: u64, line: &str) -> Result<Event> {
    let fail = |reason: String| DuraError::Parse {
        location: format!("line {}", line_no),
        reason,
    };

    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != 4 {
        return Err(fail(format!(
            "expected 4 tab-separated fields, found {}",
            fields.len()
        )));
    }

    let sequence = fields[0]
        .parse::<u64>()
        .map_err(|e| fail(format!("bad sequence {:?}: {}", fields[0], e)))?;

    let kind = fields[1]
        .parse::<u8>()
        .ok()
        .and_then(EventKind::from_code)
        .ok_or_else(|| fail(format!("unknown event kind {:?}", fields[1])))?;

    let key = unescape(fields[2]);
    if key.is_empty() {
        return Err(fail("empty key".to_string()));
    }
    let value = unescape(fields[3]);

    Ok(Event {
        sequence,
        kind,
        key,
        value,
    })
}

fn escape(field: &str) -> Cow<'_, str> {
    if !field.contains(['\\', '\t', '\n', '\r']) {
        return Cow::Borrowed(field);
    }

    let mut out = String::with_capacity(field.len() + 8);
    for c in field.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

fn unescape(field: &str) -> String {
    if !field.contains('\\') {
        return field.to_string();
    }

    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
