//! `cd` handling.
//!
//! A child shell cannot change natsh's own working directory, so `cd` is
//! intercepted and applied to the natsh process instead.

use crate::classifier::ShellDialect;
use anyhow::{Context, Result, anyhow};
use dirs::home_dir;
use std::path::PathBuf;
use tracing::info;

/// Target of a directory change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CdTarget {
    Home,
    Path(String),
}

/// Recognizes `cd` and `cd <path>` (the keyword is case-insensitive).
pub fn parse_cd(input: &str) -> Option<CdTarget> {
    let input = input.trim();
    let keyword = input.get(..2)?;
    if !keyword.eq_ignore_ascii_case("cd") {
        return None;
    }
    let rest = &input[2..];
    if rest.is_empty() {
        return Some(CdTarget::Home);
    }
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let path = rest.trim();
    if path.is_empty() {
        Some(CdTarget::Home)
    } else {
        Some(CdTarget::Path(path.to_string()))
    }
}

/// Expands environment references and a leading `~`.
///
/// POSIX uses `$NAME` / `${NAME}`, Windows `%NAME%`. Unknown variables are
/// left as written.
pub fn expand_path<F>(raw: &str, dialect: ShellDialect, home: Option<PathBuf>, lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    let expanded = match dialect {
        ShellDialect::Posix => expand_posix_vars(raw, &lookup),
        ShellDialect::WindowsCmd => expand_windows_vars(raw, &lookup),
    };

    if let Some(home) = home {
        if expanded == "~" {
            return home;
        }
        if let Some(rest) = expanded.strip_prefix("~/").or_else(|| expanded.strip_prefix("~\\")) {
            return home.join(rest);
        }
    }
    PathBuf::from(expanded)
}

fn expand_posix_vars<F: Fn(&str) -> Option<String>>(raw: &str, lookup: &F) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        let braced = matches!(chars.peek(), Some((_, '{')));
        if braced {
            chars.next();
        }
        let mut name = String::new();
        while let Some(&(_, n)) = chars.peek() {
            if n.is_ascii_alphanumeric() || n == '_' {
                name.push(n);
                chars.next();
            } else {
                break;
            }
        }
        let closed = braced && matches!(chars.peek(), Some((_, '}')));
        if closed {
            chars.next();
        }
        let end = chars.peek().map(|(i, _)| *i).unwrap_or(raw.len());

        match lookup(&name) {
            Some(value) if !name.is_empty() && (closed || !braced) => out.push_str(&value),
            _ => out.push_str(&raw[start..end]),
        }
    }
    out
}

fn expand_windows_vars<F: Fn(&str) -> Option<String>>(raw: &str, lookup: &F) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(open) = rest.find('%') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('%') {
            Some(close) if close > 0 => {
                let name = &after[..close];
                match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => out.push_str(&rest[open..open + close + 2]),
                }
                rest = &after[close + 1..];
            }
            _ => {
                out.push('%');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Applies a `cd` to the natsh process and returns the new directory.
pub fn change_directory(target: &CdTarget, dialect: ShellDialect) -> Result<PathBuf> {
    let path = match target {
        CdTarget::Home => home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?,
        CdTarget::Path(raw) => expand_path(raw, dialect, home_dir(), |name| std::env::var(name).ok()),
    };
    std::env::set_current_dir(&path).with_context(|| format!("{}", path.display()))?;
    info!("Changed directory to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(name: &str) -> Option<String> {
        match name {
            "PROJ" => Some("/work/proj".to_string()),
            "USERPROFILE" => Some("C:\\Users\\ada".to_string()),
            _ => None,
        }
    }

    fn posix(raw: &str) -> PathBuf {
        expand_path(raw, ShellDialect::Posix, Some(PathBuf::from("/home/ada")), env)
    }

    fn windows(raw: &str) -> PathBuf {
        expand_path(raw, ShellDialect::WindowsCmd, Some(PathBuf::from("C:\\Users\\ada")), env)
    }

    #[test]
    fn test_parse_cd() {
        assert_eq!(parse_cd("cd"), Some(CdTarget::Home));
        assert_eq!(parse_cd("CD"), Some(CdTarget::Home));
        assert_eq!(parse_cd("cd   "), Some(CdTarget::Home));
        assert_eq!(parse_cd("cd /tmp"), Some(CdTarget::Path("/tmp".into())));
        assert_eq!(parse_cd("Cd  my dir "), Some(CdTarget::Path("my dir".into())));
        assert_eq!(parse_cd("cdrecord -v"), None);
        assert_eq!(parse_cd("echo cd"), None);
        assert_eq!(parse_cd("c"), None);
    }

    #[test]
    fn test_parse_cd_handles_multibyte_input() {
        assert_eq!(parse_cd("é"), None);
        assert_eq!(parse_cd("ça va"), None);
    }

    #[test]
    fn test_tilde_expansion() {
        assert_eq!(posix("~"), PathBuf::from("/home/ada"));
        assert_eq!(posix("~/src"), PathBuf::from("/home/ada/src"));
        assert_eq!(posix("~other"), PathBuf::from("~other"));
    }

    #[test]
    fn test_posix_variables() {
        assert_eq!(posix("$PROJ/src"), PathBuf::from("/work/proj/src"));
        assert_eq!(posix("${PROJ}_old"), PathBuf::from("/work/proj_old"));
        assert_eq!(posix("$NOPE/x"), PathBuf::from("$NOPE/x"));
        assert_eq!(posix("${NOPE}"), PathBuf::from("${NOPE}"));
        assert_eq!(posix("cost$"), PathBuf::from("cost$"));
    }

    #[test]
    fn test_windows_variables() {
        assert_eq!(windows("%USERPROFILE%\\Desktop"), PathBuf::from("C:\\Users\\ada\\Desktop"));
        assert_eq!(windows("%NOPE%\\x"), PathBuf::from("%NOPE%\\x"));
        assert_eq!(windows("100%"), PathBuf::from("100%"));
    }

    #[test]
    fn test_change_directory_failure_reports_path() {
        let err = change_directory(
            &CdTarget::Path("/definitely/not/a/real/dir".into()),
            ShellDialect::Posix,
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("/definitely/not/a/real/dir"));
    }
}
