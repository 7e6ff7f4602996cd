//! Report parser.
//!
//! The csv reader silently skips empty lines, but empty rows are exactly
//! what separates conversations in a report. The parser keeps the raw input
//! and, for every record, looks at the line breaks between the previous
//! record's last byte and this record's first byte to recover them.

use super::{HEADER, TURN_LABEL_PREFIX};
use crate::error::{EvalError, EvalResult};
use convo_eval_core::{assemble, ConversationBatch, ConversationId, Turn};
use csv::{ByteRecord, ReaderBuilder};
use std::collections::VecDeque;
use std::io::Read;
use tracing::debug;

/// Parse a report from a reader.
pub fn parse_tabular<R: Read>(mut input: R) -> EvalResult<ConversationBatch> {
    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes)?;
    parse_tabular_bytes(&bytes)
}

/// Parse a report held in a string.
pub fn parse_tabular_str(input: &str) -> EvalResult<ConversationBatch> {
    parse_tabular_bytes(input.as_bytes())
}

/// Parse a report from raw bytes.
///
/// The header row is required. After it, fully empty rows end the current
/// conversation (runs of them collapse into one boundary), rows labelled
/// `Turn ...` add a turn, and everything else is skipped. Rows that are not
/// valid UTF-8 or do not have exactly three cells are skipped too.
///
/// Every conversation gets the placeholder id, since reports carry none.
pub fn parse_tabular_bytes(input: &[u8]) -> EvalResult<ConversationBatch> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(input);

    let mut record = ByteRecord::new();
    if !reader.read_byte_record(&mut record)? {
        return Err(EvalError::MissingHeader);
    }
    check_header(&record)?;

    let mut parser = Parser::default();
    let mut row = 1usize;
    while reader.read_byte_record(&mut record)? {
        row += 1;
        if let Some(start) = record.position().map(|p| p.byte()) {
            if blank_rows_before(input, start) > 0 {
                parser.boundary();
            }
        }
        parser.record(row, &record);
    }

    Ok(parser.finish())
}

fn check_header(record: &ByteRecord) -> EvalResult<()> {
    let found: Vec<String> = record
        .iter()
        .map(|cell| String::from_utf8_lossy(cell).into_owned())
        .collect();

    let matches = found.len() >= HEADER.len()
        && found
            .iter()
            .zip(HEADER)
            .all(|(cell, expected)| cell.trim_start_matches('\u{feff}').trim() == expected);

    if matches {
        Ok(())
    } else {
        Err(EvalError::invalid_header(&HEADER, found))
    }
}

fn is_line_break(b: u8) -> bool {
    b == b'\r' || b == b'\n'
}

/// Count the empty lines immediately before the record starting at or after
/// `start`.
///
/// `start` may point into the previous record's terminator or at blank lines
/// the reader skipped, never past the record's first byte.
fn blank_rows_before(input: &[u8], start: u64) -> usize {
    let start = usize::try_from(start).unwrap_or(input.len()).min(input.len());
    let first = input[start..]
        .iter()
        .position(|b| !is_line_break(*b))
        .map_or(input.len(), |offset| start + offset);
    let last_content = input[..first].iter().rposition(|b| !is_line_break(*b));

    let Some(last_content) = last_content else {
        return 0;
    };

    let gap = &input[last_content + 1..first];
    let mut breaks: usize = 0;
    let mut i = 0;
    while i < gap.len() {
        // CRLF is one break; a lone CR or LF is one break.
        if gap[i] == b'\r' && gap.get(i + 1) == Some(&b'\n') {
            i += 2;
        } else {
            i += 1;
        }
        breaks += 1;
    }

    breaks.saturating_sub(1)
}

/// Row-level state machine: idle between conversations, accumulating while
/// turn rows arrive.
#[derive(Debug, Default)]
struct Parser {
    /// Pending turns, oldest first.
    pending: VecDeque<Turn>,
    conversations: ConversationBatch,
}

impl Parser {
    fn record(&mut self, row: usize, record: &ByteRecord) {
        if record.iter().all(<[u8]>::is_empty) {
            self.boundary();
            return;
        }

        if record.len() != HEADER.len() {
            debug!(row, cells = record.len(), "skipping row with wrong column count");
            return;
        }

        let cells: Result<Vec<&str>, _> = record.iter().map(std::str::from_utf8).collect();
        let Ok(cells) = cells else {
            debug!(row, "skipping row that is not valid UTF-8");
            return;
        };

        if !cells[0].starts_with(TURN_LABEL_PREFIX) {
            debug!(row, label = cells[0], "ignoring row without a turn label");
            return;
        }

        // Rows are stored most-recent-first, so each row is older than the
        // one before it.
        self.pending.push_front(Turn::new(cells[1], cells[2]));
    }

    fn boundary(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let turns = std::mem::take(&mut self.pending);
        self.conversations
            .push(assemble(turns, ConversationId::simulated()));
    }

    fn finish(mut self) -> ConversationBatch {
        self.boundary();
        self.conversations
    }
}
