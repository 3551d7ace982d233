//! Line input abstraction.
//!
//! The session asks for lines in several places (the main prompt,
//! confirmations, API keys). The interactive editor lives in
//! [`repl`](crate::repl); tests feed scripted lines instead.

use anyhow::Result;
use std::collections::VecDeque;

/// Result of asking for one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    /// Ctrl-C while the line was being typed.
    Interrupted,
    /// End of input (Ctrl-D or a closed pipe).
    Eof,
}

pub trait LineReader {
    /// Shows `prompt` and waits for one line.
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome>;

    /// Offers `line` for later recall. Only shell input is remembered,
    /// never answers to confirmations.
    fn remember(&mut self, _line: &str) {}
}

/// Replays a fixed list of lines, then reports end of input.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    lines: VecDeque<String>,
    /// Every prompt shown, in order.
    pub prompts: Vec<String>,
}

impl ScriptedInput {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            prompts: Vec::new(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.lines.len()
    }
}

impl LineReader for ScriptedInput {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome> {
        self.prompts.push(prompt.to_string());
        Ok(self
            .lines
            .pop_front()
            .map(ReadOutcome::Line)
            .unwrap_or(ReadOutcome::Eof))
    }
}
