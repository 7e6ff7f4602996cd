//! Tabular conversation reports.
//!
//! A report is a CSV file with one row per turn and no conversation id
//! column:
//!
//! ```text
//! Turn,Input,Actual Output
//! Turn 1,Where are my tickets?,They were transferred this morning.
//! Turn 2,hi,Hello! How can I help?
//!
//!
//!
//! Turn 1,...
//! ```
//!
//! Exactly three empty rows separate consecutive conversations; there is no
//! separator after the last one. Those empty rows are the only boundary
//! marker, so conversation ids do not survive a write/parse cycle. Turn
//! content and order do: [`parse_tabular`] is the inverse of
//! [`write_tabular`] on everything the format carries.

mod parser;
mod writer;

pub use parser::{parse_tabular, parse_tabular_bytes, parse_tabular_str};
pub use writer::{write_tabular, write_tabular_string};

use crate::error::EvalResult;
use convo_eval_core::{Conversation, ConversationBatch};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Header row of every report.
pub const HEADER: [&str; 3] = ["Turn", "Input", "Actual Output"];

/// Prefix of the label column on turn rows.
pub const TURN_LABEL_PREFIX: &str = "Turn";

/// Number of empty rows between two conversations.
pub const SEPARATOR_ROWS: usize = 3;

pub(crate) const ROW_TERMINATOR: &[u8] = b"\r\n";

/// A CSV writer over one section of the output.
///
/// The csv crate encodes an empty record as `""`, which a spreadsheet shows
/// as a quoted cell rather than an empty row. Empty rows are therefore
/// written as raw terminators between sections, each section getting its own
/// short-lived writer.
pub(crate) fn csv_section<W: Write>(out: &mut W) -> csv::Writer<&mut W> {
    WriterBuilder::new()
        .terminator(Terminator::CRLF)
        .quote_style(QuoteStyle::Necessary)
        .from_writer(out)
}

/// Label for the turn at 1-based position `n`.
#[must_use]
pub fn turn_label(n: usize) -> String {
    format!("{TURN_LABEL_PREFIX} {n}")
}

/// Write a report file, creating parent directories as needed.
pub fn write_report<'a, I>(path: impl AsRef<Path>, conversations: I) -> EvalResult<()>
where
    I: IntoIterator<Item = &'a Conversation>,
{
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut out = BufWriter::new(File::create(path)?);
    let written = write_tabular(&mut out, conversations)?;
    out.flush()?;

    info!(path = %path.display(), conversations = written, "wrote conversation report");
    Ok(())
}

/// Read a report file back into a batch.
pub fn read_report(path: impl AsRef<Path>) -> EvalResult<ConversationBatch> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let batch = parse_tabular_bytes(&bytes)?;
    info!(path = %path.display(), conversations = batch.len(), "read conversation report");
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use convo_eval_core::{assemble, pair, Message, Turn};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn convo(turns: &[(&str, &str)], id: &str) -> Conversation {
        assemble(turns.iter().map(|(i, o)| Turn::new(*i, *o)), id)
    }

    #[test]
    fn test_end_to_end_example() {
        let messages = vec![
            Message::inbound("hi"),
            Message::outbound("hello"),
            Message::inbound("bye"),
        ];
        let conversations = vec![assemble(pair(&messages), "c1")];

        let text = write_tabular_string(&conversations).unwrap();
        assert_eq!(text, "Turn,Input,Actual Output\r\nTurn 1,hi,hello\r\n");

        let parsed = parse_tabular_str(&text).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.as_slice()[0].turns(), &[Turn::new("hi", "hello")]);
    }

    #[test]
    fn test_round_trip_preserves_turn_order() {
        let conversations = vec![
            convo(&[("a1", "b1"), ("a2", "b2"), ("a3", "b3")], "x"),
            convo(&[("c1", "d1")], "y"),
            convo(&[("e1", "f1"), ("e2", "f2")], "z"),
        ];

        let text = write_tabular_string(&conversations).unwrap();
        let parsed = parse_tabular_str(&text).unwrap();

        assert_eq!(parsed.len(), conversations.len());
        for (back, original) in parsed.iter().zip(&conversations) {
            assert_eq!(back.turns(), original.turns());
            assert!(back.id().is_placeholder());
        }
    }

    #[test]
    fn test_round_trip_awkward_text() {
        let conversations = vec![
            convo(
                &[
                    ("line one\nline two", "a \"quoted\" reply, with commas"),
                    ("", "reply to nothing"),
                    ("Turn 3 is not a label here", "crlf\r\ninside"),
                ],
                "x",
            ),
            convo(&[("  padded  ", "")], "y"),
        ];

        let text = write_tabular_string(&conversations).unwrap();
        let parsed = parse_tabular_str(&text).unwrap();

        let turns: Vec<_> = parsed.iter().map(|c| c.turns().to_vec()).collect();
        let expected: Vec<_> = conversations.iter().map(|c| c.turns().to_vec()).collect();
        assert_eq!(turns, expected);
    }

    #[test]
    fn test_round_trip_line_breaks_at_cell_edges() {
        let conversations = vec![
            convo(&[("\r\nlead", "trail\r"), ("\n", "\r\n\r\n")], "x"),
            convo(&[("Turn", "Turn")], "y"),
        ];

        let text = write_tabular_string(&conversations).unwrap();
        let parsed = parse_tabular_str(&text).unwrap();

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.as_slice()[0].turns(), conversations[0].turns());
        assert_eq!(parsed.as_slice()[1].turns(), conversations[1].turns());
    }

    #[test]
    fn test_report_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("conversations.csv");
        let conversations = vec![convo(&[("q", "a")], "x"), convo(&[("r", "b")], "y")];

        write_report(&path, &conversations).unwrap();
        let batch = read_report(&path).unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.as_slice()[1].turns(), &[Turn::new("r", "b")]);
    }

    #[test]
    fn test_read_report_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_report(dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, crate::EvalError::Io(_)));
    }

    fn text() -> impl Strategy<Value = String> {
        prop_oneof![
            "[a-zA-Z0-9 ,.?!']{0,24}",
            "[a-z\"\n,]{0,12}",
            Just(String::new()),
        ]
    }

    fn conversations() -> impl Strategy<Value = Vec<Conversation>> {
        prop::collection::vec(
            prop::collection::vec((text(), text()), 1..6),
            1..6,
        )
        .prop_map(|convos| {
            convos
                .into_iter()
                .enumerate()
                .map(|(i, turns)| {
                    assemble(
                        turns.into_iter().map(|(a, b)| Turn::new(a, b)),
                        format!("c{i}"),
                    )
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_write_then_parse_is_identity_on_turns(convos in conversations()) {
            let text = write_tabular_string(&convos).unwrap();
            let parsed = parse_tabular_str(&text).unwrap();
            prop_assert_eq!(parsed.len(), convos.len());
            for (back, original) in parsed.iter().zip(&convos) {
                prop_assert_eq!(back.turns(), original.turns());
            }
        }
    }
}
