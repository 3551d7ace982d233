//! Danger checks for translated commands.
//!
//! Matching is textual. A denylist entry is flagged when the command starts
//! with it or when it follows a space anywhere later (`sudo rm ...`,
//! `cd x && rm ...`). The result only decides which confirmation is shown;
//! nothing is ever blocked outright.

use crate::config::Config;

pub struct SafetyEvaluator<'a> {
    safe_mode: bool,
    dangerous_commands: &'a [String],
}

impl<'a> SafetyEvaluator<'a> {
    pub fn new(safe_mode: bool, dangerous_commands: &'a [String]) -> Self {
        Self {
            safe_mode,
            dangerous_commands,
        }
    }

    pub fn from_config(config: &'a Config) -> Self {
        Self::new(config.safe_mode, &config.dangerous_commands)
    }

    pub fn is_dangerous(&self, command: &str) -> bool {
        if !self.safe_mode {
            return false;
        }
        let command = command.trim().to_lowercase();
        self.dangerous_commands
            .iter()
            .map(|d| d.to_lowercase())
            .filter(|d| !d.trim().is_empty())
            .any(|d| command.starts_with(&d) || command.contains(&format!(" {}", d)))
    }
}
