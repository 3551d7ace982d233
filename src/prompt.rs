//! Prompt construction for the translation backend.
//!
//! Pure string assembly. Nothing here touches the network or the session.

use crate::classifier::ShellDialect;
use std::path::Path;

const POSIX_RULES: &str = "\
- Use Unix shell commands (ls, rm, cp, mv, cat, etc.)
- Use forward slashes for paths
- Use '~' for home directory
- Use 'open' on macOS or 'xdg-open' on Linux to open files";

const WINDOWS_RULES: &str = "\
- Use Windows CMD commands (dir, del, copy, move, type, cls, start, etc.)
- Use backslashes for paths (C:\\Users\\...)
- Use 'dir' instead of 'ls'
- Use 'del' or 'rmdir /s /q' instead of 'rm -r'
- Use 'copy' instead of 'cp'
- Use 'move' instead of 'mv'
- Use 'type' instead of 'cat'
- Use 'cls' instead of 'clear'
- Use 'start' to open applications or files
- Use '%USERPROFILE%' for home directory
- For deleting folders use 'rmdir /s /q foldername'";

/// Builds translate and explain prompts for one shell dialect.
#[derive(Debug, Clone, Copy)]
pub struct PromptBuilder {
    dialect: ShellDialect,
}

impl PromptBuilder {
    pub fn new(dialect: ShellDialect) -> Self {
        Self { dialect }
    }

    fn shell_name(&self) -> &'static str {
        match self.dialect {
            ShellDialect::Posix => "bash/zsh",
            ShellDialect::WindowsCmd => "Windows CMD (cmd.exe)",
        }
    }

    fn shell_rules(&self) -> &'static str {
        match self.dialect {
            ShellDialect::Posix => POSIX_RULES,
            ShellDialect::WindowsCmd => WINDOWS_RULES,
        }
    }

    /// Prompt asking for a single command that fulfils `user_input`.
    ///
    /// `history_context` is the block produced by
    /// [`History::format_context`](crate::history::History::format_context).
    pub fn translation_prompt(&self, user_input: &str, cwd: &Path, history_context: &str) -> String {
        format!(
            "You are a shell command translator. Convert the user's natural language request into a shell command for {shell}.

Current directory: {cwd}

Recent command history:
{history}

STRICT RULES:
- Output ONLY the command, nothing else
- No explanations, no markdown, no backticks, no quotes around the command
- If unclear, make a reasonable assumption
- Use the command history for context (e.g., \"do that again\", \"undo that\")
{rules}

User request: {request}",
            shell = self.shell_name(),
            cwd = cwd.display(),
            history = history_context,
            rules = self.shell_rules(),
            request = user_input,
        )
    }

    pub fn explain_prompt(&self, command: &str) -> String {
        format!(
            "Explain this shell command in simple terms. Be concise (2-3 sentences max).

Command: {}

Explain what it does and any important flags/options.",
            command
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translation_prompt_posix() {
        let prompt = PromptBuilder::new(ShellDialect::Posix).translation_prompt(
            "show all files",
            Path::new("/home/ada/src"),
            "1. > git status",
        );

        assert!(prompt.contains("shell command for bash/zsh."));
        assert!(prompt.contains("Current directory: /home/ada/src"));
        assert!(prompt.contains("Recent command history:\n1. > git status"));
        assert!(prompt.contains("- Output ONLY the command, nothing else"));
        assert!(prompt.contains("no markdown, no backticks"));
        assert!(prompt.contains("- Use '~' for home directory"));
        assert!(!prompt.contains("%USERPROFILE%"));
        assert!(prompt.ends_with("User request: show all files"));
    }

    #[test]
    fn test_translation_prompt_windows() {
        let prompt = PromptBuilder::new(ShellDialect::WindowsCmd).translation_prompt(
            "delete the build folder",
            Path::new("C:\\work"),
            "No previous commands.",
        );

        assert!(prompt.contains("Windows CMD (cmd.exe)"));
        assert!(prompt.contains("Use backslashes for paths (C:\\Users\\...)"));
        assert!(prompt.contains("'%USERPROFILE%' for home directory"));
        assert!(prompt.contains("rmdir /s /q foldername"));
        assert!(prompt.contains("No previous commands."));
        assert!(prompt.ends_with("User request: delete the build folder"));
    }

    #[test]
    fn test_explain_prompt() {
        let prompt = PromptBuilder::new(ShellDialect::Posix).explain_prompt("tar -xzf a.tgz");
        assert!(prompt.contains("Command: tar -xzf a.tgz"));
        assert!(prompt.contains("2-3 sentences max"));
    }
}
