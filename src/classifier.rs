//! Input classification.
//!
//! Decides whether a line is already a shell command or needs translating.
//! This is a keyword heuristic, not a parser: it only looks at the second
//! word, a list of bare command names and a list of command prefixes. Some
//! inputs are misclassified ("find my keys" vs. `find`) and that is accepted.

use crate::meta::MetaCommand;
use std::collections::BTreeMap;
use tracing::debug;

/// Marker for running the rest of the line verbatim (or a meta-command).
pub const DIRECT_MARKER: char = '!';
/// Marker for asking what a command does.
pub const EXPLAIN_MARKER: char = '?';

/// Words that, in second position, mark a line as natural language.
const NATURAL_LANGUAGE_INDICATORS: &[&str] = &[
    "to", "the", "a", "an", "my", "all", "me", "this", "that", "please", "can", "could",
    "would", "should", "what", "how", "show", "list", "create", "make", "delete", "remove",
    "open", "go", "navigate", "switch", "change", "find", "search", "get",
];

const POSIX_BARE_COMMANDS: &[&str] = &[
    "ls", "pwd", "clear", "exit", "quit", "whoami", "date", "cal", "top", "htop", "history",
    "which", "man", "touch", "head", "tail", "grep", "find", "sort", "wc", "diff", "tar", "zip",
    "unzip",
];

const POSIX_COMMAND_PREFIXES: &[&str] = &[
    "cd ", "ls ", "echo ", "cat ", "mkdir ", "rm ", "cp ", "mv ", "git ", "npm ", "node ",
    "npx ", "python", "pip ", "brew ", "curl ", "wget ", "chmod ", "chown ", "sudo ", "vi ",
    "vim ", "nano ", "code ", "open ", "export ", "source ", "docker ", "kubectl ", "aws ",
    "gcloud ", "./", "/", "~", "$", ">", ">>", "|", "&&",
];

const WINDOWS_BARE_COMMANDS: &[&str] = &[
    "dir", "cls", "exit", "quit", "whoami", "date", "time", "type", "copy", "move", "del", "ren",
    "md", "rd", "tree", "find", "findstr", "sort", "more", "ver", "vol", "path", "set", "echo",
    "pause", "title", "color", "start", "tasklist", "ipconfig", "ping", "netstat", "systeminfo",
    "hostname",
];

const WINDOWS_COMMAND_PREFIXES: &[&str] = &[
    "cd ", "cd\\", "dir ", "echo ", "type ", "mkdir ", "md ", "del ", "rmdir ", "rd ", "copy ",
    "move ", "ren ", "rename ", "git ", "npm ", "node ", "npx ", "python ", "pip ", "curl ",
    "code ", "start ", "set ", "docker ", "kubectl ", "aws ", "powershell ", "pwsh ", "wsl ",
    "where ", "taskkill ", ".\\", "c:\\", "d:\\", "e:\\", "%", ">", ">>", "|", "&&",
];

/// Command interpreter the shell targets, fixed once from the host OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellDialect {
    Posix,
    WindowsCmd,
}

impl ShellDialect {
    pub fn host() -> Self {
        if cfg!(windows) {
            ShellDialect::WindowsCmd
        } else {
            ShellDialect::Posix
        }
    }

    fn bare_commands(&self) -> &'static [&'static str] {
        match self {
            ShellDialect::Posix => POSIX_BARE_COMMANDS,
            ShellDialect::WindowsCmd => WINDOWS_BARE_COMMANDS,
        }
    }

    fn command_prefixes(&self) -> &'static [&'static str] {
        match self {
            ShellDialect::Posix => POSIX_COMMAND_PREFIXES,
            ShellDialect::WindowsCmd => WINDOWS_COMMAND_PREFIXES,
        }
    }
}

/// What a line of input asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    LiteralShellCommand(String),
    /// An alias, already expanded. Executed as is.
    AliasInvocation { alias: String, resolved: String },
    NaturalLanguage(String),
    /// `!command`, run without translation or confirmation.
    DirectExecRequest(String),
    /// `?command`, explained but never run.
    ExplainRequest(String),
    MetaCommand(MetaCommand),
}

pub struct Classifier<'a> {
    dialect: ShellDialect,
    aliases: &'a BTreeMap<String, String>,
}

impl<'a> Classifier<'a> {
    pub fn new(dialect: ShellDialect, aliases: &'a BTreeMap<String, String>) -> Self {
        Self { dialect, aliases }
    }

    /// Classifies one trimmed line of input.
    pub fn classify(&self, text: &str) -> InputKind {
        let kind = if let Some(rest) = text.strip_prefix(DIRECT_MARKER) {
            match MetaCommand::parse(rest) {
                Some(meta) => InputKind::MetaCommand(meta),
                None => InputKind::DirectExecRequest(rest.to_string()),
            }
        } else if let Some(rest) = text.strip_prefix(EXPLAIN_MARKER) {
            InputKind::ExplainRequest(rest.trim().to_string())
        } else if let Some((alias, resolved)) = resolve_alias(self.aliases, text) {
            InputKind::AliasInvocation { alias, resolved }
        } else if is_natural_language(self.dialect, text) {
            InputKind::NaturalLanguage(text.to_string())
        } else {
            InputKind::LiteralShellCommand(text.to_string())
        };
        debug!("Classified {:?} as {:?}", text, kind);
        kind
    }
}

/// Heuristic check applied to input without a marker or alias.
///
/// The second-word rule runs first on purpose: "list my files" starts with
/// a word that is also a command name.
pub fn is_natural_language(dialect: ShellDialect, text: &str) -> bool {
    let lower = text.trim().to_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();

    if words.len() >= 2 && NATURAL_LANGUAGE_INDICATORS.contains(&words[1]) {
        return true;
    }
    if dialect.bare_commands().iter().any(|cmd| *cmd == lower) {
        return false;
    }
    !dialect
        .command_prefixes()
        .iter()
        .any(|prefix| lower.starts_with(prefix))
}

/// Expands an alias at the start of `text`.
///
/// The first word is looked up case-insensitively; the remaining words are
/// appended to the template. Returns the alias name as stored and the
/// expanded command.
pub fn resolve_alias(aliases: &BTreeMap<String, String>, text: &str) -> Option<(String, String)> {
    let mut words = text.split_whitespace();
    let first = words.next()?;
    let (name, template) = aliases
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(first))?;

    let args: Vec<&str> = words.collect();
    let resolved = if args.is_empty() {
        template.clone()
    } else {
        format!("{} {}", template, args.join(" "))
    };
    Some((name.clone(), resolved))
}
