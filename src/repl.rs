//! The interactive loop.
//!
//! Reads a line, hands it to the [`Session`], and keeps going whatever the
//! turn did, except for end of input and the exit words. A turn waiting on
//! the backend can be cancelled with Ctrl-C.

use crate::backend::BackendError;
use crate::input::{LineReader, ReadOutcome};
use crate::session::{Session, Turn};
use anyhow::Result;
use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::Write;
use std::path::Path;
use tracing::{error, info};

const GENERIC_ERROR_LIMIT: usize = 100;

// ===== Line editor =====

/// Line input backed by rustyline: editing keys and in-memory recall.
pub struct EditorInput {
    editor: DefaultEditor,
}

impl EditorInput {
    pub fn new() -> Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl LineReader for EditorInput {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(ReadOutcome::Line(line)),
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadOutcome::Eof),
            Err(e) => Err(e.into()),
        }
    }

    fn remember(&mut self, line: &str) {
        let _ = self.editor.add_history_entry(line);
    }
}

// ===== Error buckets =====

/// How a failed turn is reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorBucket {
    RateLimit,
    Authentication,
    Generic(String),
}

impl ErrorBucket {
    /// Buckets an error by the first [`BackendError`] in its chain, or by
    /// keywords when the chain carries none.
    pub fn classify(err: &anyhow::Error) -> Self {
        let text = format!("{:#}", err);
        if let Some(backend) = err.chain().find_map(|e| e.downcast_ref::<BackendError>()) {
            return match backend {
                BackendError::RateLimited(_) => ErrorBucket::RateLimit,
                BackendError::Authentication(_) | BackendError::MissingCredential(_) => {
                    ErrorBucket::Authentication
                }
                _ => ErrorBucket::generic(&text),
            };
        }

        let lower = text.to_lowercase();
        if lower.contains("429") || lower.contains("quota") || lower.contains("rate limit") {
            ErrorBucket::RateLimit
        } else if text.contains("API key") || lower.contains("authentication") || lower.contains("apikey") {
            ErrorBucket::Authentication
        } else {
            ErrorBucket::generic(&text)
        }
    }

    fn generic(text: &str) -> Self {
        ErrorBucket::Generic(text.chars().take(GENERIC_ERROR_LIMIT).collect())
    }

    pub fn message(&self) -> String {
        match self {
            ErrorBucket::RateLimit => "Rate limit hit - wait a moment and try again".to_string(),
            ErrorBucket::Authentication => "API key error - run !api to set a new key".to_string(),
            ErrorBucket::Generic(text) => format!("Error: {}", text),
        }
    }
}

// ===== Loop =====

/// `<folder> > `, with the folder name of `cwd` in green.
pub fn prompt_for(cwd: &Path) -> String {
    let folder = cwd
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| cwd.display().to_string());
    format!("{} > ", folder.green())
}

/// Runs turns until the user leaves. Returns the process exit code.
pub async fn run_with_io<R: LineReader + ?Sized, W: Write>(
    session: &mut Session,
    input: &mut R,
    output: &mut W,
) -> Result<i32> {
    loop {
        let cwd = std::env::current_dir().unwrap_or_else(|_| ".".into());
        let line = match input.read_line(&prompt_for(&cwd))? {
            ReadOutcome::Line(line) => line,
            ReadOutcome::Interrupted => {
                writeln!(output)?;
                continue;
            }
            ReadOutcome::Eof => {
                writeln!(output, "\n{}", "Goodbye!".dimmed())?;
                return Ok(0);
            }
        };
        if !line.trim().is_empty() {
            input.remember(line.trim());
        }

        let result = tokio::select! {
            result = session.handle_line_with_io(&line, &mut *input, &mut *output) => Some(result),
            _ = tokio::signal::ctrl_c() => None,
        };

        match result {
            Some(Ok(Turn::Continue)) => {}
            Some(Ok(Turn::Exit(code))) => {
                info!("Exiting with code {}", code);
                return Ok(code);
            }
            Some(Err(e)) => {
                error!("Turn failed: {:#}", e);
                writeln!(output, "{}", ErrorBucket::classify(&e).message().red())?;
            }
            None => {
                info!("Turn cancelled");
                writeln!(output, "\n{}", "Cancelled.".yellow())?;
            }
        }
    }
}
