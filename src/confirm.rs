//! Confirmation dialogs for translated commands.
//!
//! Two prompts with opposite defaults:
//! - a danger prompt, where only an explicit `y` runs the command
//! - a light prompt, where Enter runs it and only `n`/`no` declines

use crate::input::{LineReader, ReadOutcome};
use anyhow::Result;
use colored::Colorize;
use std::io::Write;
use tracing::info;

/// The user's answer to a confirmation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Proceed,
    Decline,
}

/// Handles user interaction for command confirmation.
///
/// # Example
///
/// ```
/// use natsh::confirm::{Confirmation, ConfirmationUI};
/// use natsh::input::ScriptedInput;
///
/// let ui = ConfirmationUI::new();
/// let mut input = ScriptedInput::new([""]);
/// let answer = ui.confirm_with_io("ls -la", false, &mut input, &mut Vec::new())?;
/// assert_eq!(answer, Some(Confirmation::Proceed));
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct ConfirmationUI;

impl ConfirmationUI {
    pub fn new() -> Self {
        Self
    }

    /// Asks whether `command` should run.
    ///
    /// Returns `None` when the prompt was interrupted or input ended; the
    /// caller aborts the turn without recording anything.
    pub fn confirm_with_io<R: LineReader + ?Sized, W: Write>(
        &self,
        command: &str,
        dangerous: bool,
        input: &mut R,
        output: &mut W,
    ) -> Result<Option<Confirmation>> {
        let prompt = if dangerous {
            format!(
                "{} {} ",
                format!("[!] {}", command).red(),
                "(dangerous) [y/N]".yellow()
            )
        } else {
            format!("{} [Enter/n] ", format!("-> {}", command).yellow())
        };

        let answer = match input.read_line(&prompt)? {
            ReadOutcome::Line(line) => line.trim().to_lowercase(),
            ReadOutcome::Interrupted | ReadOutcome::Eof => {
                writeln!(output)?;
                return Ok(None);
            }
        };

        let decision = if dangerous {
            if answer == "y" {
                Confirmation::Proceed
            } else {
                Confirmation::Decline
            }
        } else if answer == "n" || answer == "no" {
            Confirmation::Decline
        } else {
            Confirmation::Proceed
        };

        info!("User answered {:?} for '{}' (dangerous: {})", decision, command, dangerous);
        Ok(Some(decision))
    }

    /// Asks a `[y/N]` question. Anything but `y` is a no.
    pub fn ask_yes_no_with_io<R: LineReader + ?Sized>(&self, question: &str, input: &mut R) -> Result<bool> {
        let prompt = format!("{} ", format!("{} [y/N]", question).yellow());
        Ok(match input.read_line(&prompt)? {
            ReadOutcome::Line(line) => line.trim().eq_ignore_ascii_case("y"),
            ReadOutcome::Interrupted | ReadOutcome::Eof => false,
        })
    }

    pub fn show_declined_with_io<W: Write>(&self, command: &str, output: &mut W) -> Result<()> {
        writeln!(output, "{}", format!("Skipped: {}", command).dimmed())?;
        Ok(())
    }
}
