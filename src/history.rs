//! Command history.
//!
//! Two ordered logs are kept. The persisted log survives restarts, is
//! capped at `max_history` entries and rewritten in full after every turn.
//! The session log only covers the current process and feeds the context
//! block of translation prompts.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use colored::Colorize;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Captured output is cut to this many characters before it is stored.
pub const OUTPUT_LIMIT: usize = 500;

/// Number of entries included in the prompt context.
pub const CONTEXT_ENTRIES: usize = 5;

const CONTEXT_OUTPUT_LINES: usize = 2;

/// One recorded turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Local>,
    /// What the user typed.
    pub input: String,
    /// What was (or would have been) executed.
    pub command: String,
    #[serde(default)]
    pub output: String,
    /// False when the user declined the command.
    #[serde(default = "default_executed")]
    pub executed: bool,
    #[serde(default)]
    pub cwd: String,
}

fn default_executed() -> bool {
    true
}

/// Accepts RFC 3339 timestamps and naive ones without an offset, which are
/// taken as local time.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Local>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Local>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Local));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()?;
    Local.from_local_datetime(&naive).earliest()
}

impl HistoryEntry {
    pub fn new(
        timestamp: DateTime<Local>,
        input: &str,
        command: &str,
        output: &str,
        executed: bool,
        cwd: &str,
    ) -> Self {
        Self {
            timestamp,
            input: input.to_string(),
            command: command.to_string(),
            output: output.chars().take(OUTPUT_LIMIT).collect(),
            executed,
            cwd: cwd.to_string(),
        }
    }
}

/// Parses the log entry by entry. Returns the readable entries and the
/// number that had to be skipped.
fn read_entries(path: &Path) -> Result<(Vec<HistoryEntry>, usize)> {
    let content = fs::read_to_string(path)?;
    let values: Vec<serde_json::Value> = serde_json::from_str(&content)?;
    let total = values.len();
    let entries: Vec<HistoryEntry> = values
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable history entry: {}", e);
                None
            }
        })
        .collect();
    let skipped = total - entries.len();
    Ok((entries, skipped))
}

/// Where a log that could not be read completely is moved before it is
/// rewritten.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".bak");
    path.with_file_name(name)
}

pub struct History {
    path: Option<PathBuf>,
    max_entries: usize,
    persisted: Vec<HistoryEntry>,
    session: Vec<HistoryEntry>,
}

impl History {
    /// Loads the persisted log, keeping only the newest `max_entries`.
    ///
    /// Entries that cannot be read are skipped. A file that could not be
    /// read in full is moved to [`backup_path`] before anything is written
    /// back; if that fails the log stays in memory only.
    pub fn load(path: PathBuf, max_entries: usize) -> Self {
        let mut persisted = Vec::new();
        let mut intact = true;
        if path.exists() {
            match read_entries(&path) {
                Ok((entries, 0)) => persisted = entries,
                Ok((entries, skipped)) => {
                    warn!("Skipped {} unreadable entries in {}", skipped, path.display());
                    persisted = entries;
                    intact = false;
                }
                Err(e) => {
                    warn!("Ignoring unreadable history {}: {}", path.display(), e);
                    intact = false;
                }
            }
        }

        let path = if intact {
            Some(path)
        } else {
            let backup = backup_path(&path);
            match fs::rename(&path, &backup) {
                Ok(()) => {
                    warn!("Moved {} to {}", path.display(), backup.display());
                    Some(path)
                }
                Err(e) => {
                    warn!("Could not move {} aside, history will not be saved: {}", path.display(), e);
                    None
                }
            }
        };

        let mut history = Self {
            path,
            max_entries,
            persisted,
            session: Vec::new(),
        };
        history.truncate();
        history
    }

    /// A log that is never written to disk.
    pub fn in_memory(max_entries: usize) -> Self {
        Self {
            path: None,
            max_entries,
            persisted: Vec::new(),
            session: Vec::new(),
        }
    }

    pub fn persisted(&self) -> &[HistoryEntry] {
        &self.persisted
    }

    pub fn session(&self) -> &[HistoryEntry] {
        &self.session
    }

    /// Appends to both logs and writes the persisted one through.
    pub fn record(&mut self, entry: HistoryEntry) -> Result<()> {
        debug!("Recording history entry: {} (executed: {})", entry.command, entry.executed);
        self.session.push(entry.clone());
        self.persisted.push(entry);
        self.truncate();
        self.save()
    }

    fn truncate(&mut self) {
        if self.persisted.len() > self.max_entries {
            let excess = self.persisted.len() - self.max_entries;
            self.persisted.drain(..excess);
        }
    }

    fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.persisted)?;
        fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    /// Recent activity as a text block for translation prompts.
    ///
    /// Uses the last entries of this session, or of the persisted log when
    /// nothing has happened yet in this session.
    pub fn format_context(&self) -> String {
        let source = if self.session.is_empty() {
            &self.persisted
        } else {
            &self.session
        };
        let start = source.len().saturating_sub(CONTEXT_ENTRIES);
        let entries = &source[start..];
        if entries.is_empty() {
            return "No previous commands.".to_string();
        }

        let mut lines = Vec::new();
        for (i, entry) in entries.iter().enumerate() {
            lines.push(format!("{}. > {}", i + 1, entry.command));
            for line in entry
                .output
                .lines()
                .map(str::trim_end)
                .filter(|l| !l.trim().is_empty())
                .take(CONTEXT_OUTPUT_LINES)
            {
                lines.push(format!("   {}", line));
            }
        }
        lines.join("\n")
    }

    /// Prints the last `count` persisted entries.
    pub fn show_with_io<W: Write>(&self, count: usize, output: &mut W) -> Result<()> {
        let start = self.persisted.len().saturating_sub(count);
        let entries = &self.persisted[start..];
        if entries.is_empty() {
            writeln!(output, "{}", "No history yet.".dimmed())?;
            return Ok(());
        }

        writeln!(output, "{}\n", format!("Last {} commands:", entries.len()).cyan())?;
        for entry in entries {
            let marker = if entry.executed { "+" } else { "-" };
            writeln!(
                output,
                "{} [{}] {}",
                entry.timestamp.format("%Y-%m-%d %H:%M").to_string().dimmed(),
                marker,
                entry.command.yellow()
            )?;
        }
        writeln!(output)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(command: &str, output: &str) -> HistoryEntry {
        let ts = Local.with_ymd_and_hms(2025, 3, 14, 9, 26, 0).unwrap();
        HistoryEntry::new(ts, command, command, output, true, "/tmp")
    }

    #[test]
    fn test_output_is_truncated() {
        let long = "x".repeat(OUTPUT_LIMIT + 50);
        assert_eq!(entry("ls", &long).output.chars().count(), OUTPUT_LIMIT);
    }

    #[test]
    fn test_output_truncation_counts_characters() {
        let long = "é".repeat(OUTPUT_LIMIT + 1);
        let e = entry("ls", &long);
        assert_eq!(e.output.chars().count(), OUTPUT_LIMIT);
    }

    #[test]
    fn test_persisted_log_keeps_newest_entries() {
        let mut history = History::in_memory(3);
        for i in 0..5 {
            history.record(entry(&format!("cmd{}", i), "")).unwrap();
        }

        let commands: Vec<_> = history.persisted().iter().map(|e| e.command.as_str()).collect();
        assert_eq!(commands, vec!["cmd2", "cmd3", "cmd4"]);
        assert_eq!(history.session().len(), 5);
    }

    #[test]
    fn test_zero_max_keeps_nothing_persisted() {
        let mut history = History::in_memory(0);
        history.record(entry("ls", "")).unwrap();
        assert!(history.persisted().is_empty());
        assert_eq!(history.session().len(), 1);
    }

    #[test]
    fn test_write_through_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");

        let mut history = History::load(path.clone(), 10);
        history.record(entry("echo one", "one\n")).unwrap();
        history.record(entry("echo two", "two\n")).unwrap();

        let reloaded = History::load(path, 1);
        assert_eq!(reloaded.persisted().len(), 1);
        assert_eq!(reloaded.persisted()[0].command, "echo two");
        assert!(reloaded.session().is_empty());
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "[{broken").unwrap();

        assert!(History::load(path.clone(), 10).persisted().is_empty());
        assert_eq!(fs::read_to_string(backup_path(&path)).unwrap(), "[{broken");
    }

    #[test]
    fn test_corrupt_file_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "not json at all").unwrap();

        let mut history = History::load(path.clone(), 10);
        history.record(entry("ls", "")).unwrap();

        assert_eq!(fs::read_to_string(backup_path(&path)).unwrap(), "not json at all");
        let saved: Vec<serde_json::Value> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved.len(), 1);
    }

    #[test]
    fn test_naive_timestamps_are_read_as_local_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(
            &path,
            r#"[{"timestamp": "2025-01-02T03:04:05.123456", "input": "list files",
                 "command": "ls", "output": "a\nb", "executed": true, "cwd": "/tmp"}]"#,
        )
        .unwrap();

        let mut history = History::load(path.clone(), 10);
        assert_eq!(history.persisted().len(), 1);
        assert_eq!(
            history.persisted()[0].timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            "2025-01-02 03:04:05"
        );

        history.record(entry("pwd", "/tmp")).unwrap();
        let saved: Vec<serde_json::Value> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0]["command"], "ls");
        assert!(!backup_path(&path).exists());
    }

    #[test]
    fn test_unreadable_entries_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(
            &path,
            r#"[{"timestamp": "yesterday", "input": "x", "command": "x"},
                {"timestamp": "2025-03-14T09:26:00+01:00", "input": "ls", "command": "ls"},
                {"command": "missing fields"}]"#,
        )
        .unwrap();

        let history = History::load(path.clone(), 10);
        assert_eq!(history.persisted().len(), 1);
        assert_eq!(history.persisted()[0].command, "ls");
        assert!(history.persisted()[0].executed);
        assert!(backup_path(&path).exists());
    }

    #[test]
    fn test_context_when_empty() {
        assert_eq!(History::in_memory(10).format_context(), "No previous commands.");
    }

    #[test]
    fn test_context_lists_last_five_with_two_output_lines() {
        let mut history = History::in_memory(100);
        for i in 0..7 {
            history.record(entry(&format!("cmd{}", i), "")).unwrap();
        }
        history
            .record(entry("ls", "\nfirst\n\n   \nsecond\nthird\n"))
            .unwrap();

        let context = history.format_context();
        let lines: Vec<_> = context.lines().collect();
        assert_eq!(lines[0], "1. > cmd3");
        assert_eq!(lines[4], "5. > ls");
        assert_eq!(lines[5], "   first");
        assert_eq!(lines[6], "   second");
        assert_eq!(lines.len(), 7);
    }

    #[test]
    fn test_context_falls_back_to_persisted_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let mut previous = History::load(path.clone(), 10);
        previous.record(entry("git status", "clean")).unwrap();

        let history = History::load(path, 10);
        assert_eq!(history.format_context(), "1. > git status\n   clean");
    }

    #[test]
    fn test_show_marks_declined_entries() {
        let mut history = History::in_memory(10);
        history.record(entry("ls", "")).unwrap();
        let mut declined = entry("rm -rf build", "");
        declined.executed = false;
        history.record(declined).unwrap();

        let mut output = Vec::new();
        history.show_with_io(20, &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();

        assert!(text.contains("Last 2 commands"));
        assert!(text.contains("[+]"));
        assert!(text.contains("[-]"));
        assert!(text.contains("rm -rf build"));
        assert!(text.contains("2025-03-14 09:26"));
    }

    #[test]
    fn test_show_empty() {
        let mut output = Vec::new();
        History::in_memory(10).show_with_io(20, &mut output).unwrap();
        assert!(String::from_utf8(output).unwrap().contains("No history yet."));
    }
}
