//! Interactive yes/no confirmation.
//!
//! Answers come from a [`LineReader`], so the gate can read standard input
//! in the binary and a fixed script in tests.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

/// Source of answer lines.
pub trait LineReader {
    /// Read one line. `Ok(None)` means end of input.
    fn read_line(&mut self) -> io::Result<Option<String>>;
}

/// Reads answers from standard input.
#[derive(Debug, Default)]
pub struct StdinReader;

impl LineReader for StdinReader {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut input = String::new();
        let read = io::stdin().lock().read_line(&mut input)?;
        Ok((read > 0).then_some(input))
    }
}

/// Replays a fixed list of answers.
#[derive(Debug, Default, Clone)]
pub struct ScriptedReader {
    answers: VecDeque<String>,
}

impl ScriptedReader {
    /// Answer with `answers`, in order, then end of input.
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
        }
    }

    /// Answers not yet consumed
    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl LineReader for ScriptedReader {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        Ok(self.answers.pop_front())
    }
}

/// Ask `question` and wait for an answer.
///
/// Only `y` or `yes` (any case) confirm. Anything else, including end of
/// input, declines.
///
/// # Errors
///
/// Returns any IO error from writing the question or reading the answer.
pub fn confirm(reader: &mut dyn LineReader, out: &mut dyn Write, question: &str) -> io::Result<bool> {
    write!(out, "{question} [y/N]: ")?;
    out.flush()?;
    let Some(answer) = reader.read_line()? else {
        writeln!(out)?;
        return Ok(false);
    };
    let answer = answer.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("y", true)]
    #[case("YES\n", true)]
    #[case(" yes ", true)]
    #[case("n", false)]
    #[case("", false)]
    #[case("yep", false)]
    fn test_confirm_answers(#[case] answer: &str, #[case] expected: bool) {
        let mut reader = ScriptedReader::new([answer]);
        let mut out = Vec::new();
        assert_eq!(confirm(&mut reader, &mut out, "Proceed?").unwrap(), expected);
        assert_eq!(String::from_utf8(out).unwrap(), "Proceed? [y/N]: ");
    }

    #[test]
    fn test_end_of_input_declines() {
        let mut reader = ScriptedReader::default();
        let mut out = Vec::new();
        assert!(!confirm(&mut reader, &mut out, "Proceed?").unwrap());
    }

    #[test]
    fn test_answers_consumed_in_order() {
        let mut reader = ScriptedReader::new(["y", "n"]);
        let mut out = Vec::new();
        assert!(confirm(&mut reader, &mut out, "First?").unwrap());
        assert!(!confirm(&mut reader, &mut out, "Second?").unwrap());
        assert_eq!(reader.remaining(), 0);
    }
}
