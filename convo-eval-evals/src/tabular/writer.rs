//! Report writer.

use super::{csv_section, turn_label, HEADER, ROW_TERMINATOR, SEPARATOR_ROWS};
use crate::error::EvalResult;
use convo_eval_core::Conversation;
use std::io::Write;
use tracing::debug;

/// Write conversations as a tabular report.
///
/// Turn labels follow each conversation's stored order. Returns the number
/// of conversations written. With no conversations only the header row is
/// produced.
pub fn write_tabular<'a, W, I>(out: &mut W, conversations: I) -> EvalResult<usize>
where
    W: Write,
    I: IntoIterator<Item = &'a Conversation>,
{
    {
        let mut header = csv_section(out);
        header.write_record(HEADER)?;
        header.flush()?;
    }

    let mut written = 0;
    for convo in conversations {
        if written > 0 {
            for _ in 0..SEPARATOR_ROWS {
                out.write_all(ROW_TERMINATOR)?;
            }
        }

        let mut rows = csv_section(out);
        for (idx, turn) in convo.turns().iter().enumerate() {
            rows.write_record([
                turn_label(idx + 1).as_str(),
                turn.customer_input.as_str(),
                turn.agent_output.as_str(),
            ])?;
        }
        rows.flush()?;

        debug!(conversation = %convo.id(), turns = convo.len(), "wrote conversation rows");
        written += 1;
    }

    Ok(written)
}

/// Write conversations to an in-memory report.
pub fn write_tabular_string<'a, I>(conversations: I) -> EvalResult<String>
where
    I: IntoIterator<Item = &'a Conversation>,
{
    let mut buf = Vec::new();
    write_tabular(&mut buf, conversations)?;
    String::from_utf8(buf).map_err(|e| crate::EvalError::Other(e.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use convo_eval_core::{assemble, Turn};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rstest::rstest;

    fn convo(n: usize, tag: &str) -> Conversation {
        assemble(
            (1..=n).map(|i| Turn::new(format!("{tag}q{i}"), format!("{tag}a{i}"))),
            tag,
        )
    }

    #[test]
    fn test_header_only_for_empty_input() {
        let text = write_tabular_string(&Vec::<Conversation>::new()).unwrap();
        assert_eq!(text, "Turn,Input,Actual Output\r\n");
    }

    #[test]
    fn test_labels_follow_stored_order() {
        let text = write_tabular_string(&[convo(2, "x")]).unwrap();
        assert_eq!(
            text,
            "Turn,Input,Actual Output\r\nTurn 1,xq2,xa2\r\nTurn 2,xq1,xa1\r\n"
        );
    }

    #[test]
    fn test_separator_between_conversations() {
        let text = write_tabular_string(&[convo(1, "x"), convo(1, "y")]).unwrap();
        assert_eq!(
            text,
            "Turn,Input,Actual Output\r\n\
             Turn 1,xq1,xa1\r\n\
             \r\n\r\n\r\n\
             Turn 1,yq1,ya1\r\n"
        );
    }

    #[test]
    fn test_quotes_only_when_needed() {
        let c = assemble(vec![Turn::new("a, b", "say \"hi\"\nthen go")], "x");
        let text = write_tabular_string(&[c]).unwrap();
        assert_eq!(
            text,
            "Turn,Input,Actual Output\r\nTurn 1,\"a, b\",\"say \"\"hi\"\"\nthen go\"\r\n"
        );
    }

    #[test]
    fn test_returns_count() {
        let mut buf = Vec::new();
        let n = write_tabular(&mut buf, &[convo(1, "a"), convo(2, "b"), convo(3, "c")]).unwrap();
        assert_eq!(n, 3);
    }

    #[rstest]
    #[case(0, 0)]
    #[case(1, 0)]
    #[case(2, 1)]
    #[case(5, 4)]
    fn test_separator_gap_count(#[case] conversations: usize, #[case] gaps: usize) {
        let convos: Vec<_> = (0..conversations).map(|i| convo(2, &i.to_string())).collect();
        let text = write_tabular_string(&convos).unwrap();
        assert_eq!(text.matches("\r\n\r\n\r\n\r\n").count(), gaps);
        assert!(!text.contains("\r\n\r\n\r\n\r\n\r\n"));
        assert!(!text.ends_with("\r\n\r\n"));
    }

    proptest! {
        #[test]
        fn prop_separator_gaps_are_three_rows_wide(
            sizes in prop::collection::vec(1usize..5, 0..8)
        ) {
            let convos: Vec<_> = sizes
                .iter()
                .enumerate()
                .map(|(i, n)| convo(*n, &format!("c{i}")))
                .collect();
            let text = write_tabular_string(&convos).unwrap();

            let lines: Vec<&str> = text.split("\r\n").collect();
            // Trailing terminator leaves one empty tail element.
            let body = &lines[..lines.len() - 1];
            let mut gaps = Vec::new();
            let mut run = 0;
            for line in body {
                if line.is_empty() {
                    run += 1;
                } else if run > 0 {
                    gaps.push(run);
                    run = 0;
                }
            }
            prop_assert_eq!(run, 0);
            prop_assert_eq!(gaps.len(), convos.len().saturating_sub(1));
            prop_assert!(gaps.iter().all(|g| *g == SEPARATOR_ROWS));
        }
    }
}
