//! Self-maintenance: the `!update` release check and `!uninstall`.

use crate::confirm::ConfirmationUI;
use crate::http_client::HttpClient;
use crate::input::LineReader;
use crate::paths::NatshHome;
use anyhow::{Context, Result, anyhow};
use colored::Colorize;
use std::cmp::Ordering;
use std::fs;
use std::io::Write;
use tracing::{info, warn};

pub const RELEASES_URL: &str = "https://api.github.com/repos/pieronoviello/natsh/releases/latest";
pub const REINSTALL_COMMAND: &str = "cargo install natsh --force";
pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Outcome of comparing the running version with the latest release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    UpToDate,
    Available(String),
}

/// Fetches the latest release tag.
pub async fn latest_release(http: &dyn HttpClient) -> Result<String> {
    let user_agent = format!("natsh/{}", CURRENT_VERSION);
    let response = http
        .get(
            RELEASES_URL,
            &[
                ("User-Agent", user_agent.as_str()),
                ("Accept", "application/vnd.github.v3+json"),
            ],
        )
        .await
        .context("checking for updates")?;

    if !response.is_success() {
        return Err(anyhow!("release check returned HTTP {}", response.status));
    }

    let release: serde_json::Value = serde_json::from_str(&response.body)?;
    let tag = release
        .get("tag_name")
        .and_then(|t| t.as_str())
        .ok_or_else(|| anyhow!("release has no tag_name"))?;
    Ok(tag.trim_start_matches('v').to_string())
}

/// Compares dotted versions numerically; missing parts count as zero.
fn compare_versions(a: &str, b: &str) -> Ordering {
    let parse = |v: &str| -> Vec<u64> {
        v.split('.')
            .map(|part| {
                part.chars()
                    .take_while(char::is_ascii_digit)
                    .collect::<String>()
                    .parse()
                    .unwrap_or(0)
            })
            .collect()
    };
    let (a, b) = (parse(a), parse(b));
    let len = a.len().max(b.len());
    for i in 0..len {
        let ordering = a.get(i).unwrap_or(&0).cmp(b.get(i).unwrap_or(&0));
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

pub fn update_status(current: &str, latest: &str) -> UpdateStatus {
    if compare_versions(latest, current) == Ordering::Greater {
        UpdateStatus::Available(latest.to_string())
    } else {
        UpdateStatus::UpToDate
    }
}

/// Runs `!update`. Failures are reported, never propagated.
pub async fn check_for_update_with_io<W: Write>(http: &dyn HttpClient, output: &mut W) -> Result<()> {
    writeln!(output, "Checking for updates...")?;

    match latest_release(http).await {
        Ok(latest) => match update_status(CURRENT_VERSION, &latest) {
            UpdateStatus::UpToDate => {
                writeln!(output, "{}", format!("Already up to date (v{}).", CURRENT_VERSION).green())?;
            }
            UpdateStatus::Available(version) => {
                info!("Update available: {} -> {}", CURRENT_VERSION, version);
                writeln!(
                    output,
                    "{}",
                    format!("New version available: v{} (current: v{})", version, CURRENT_VERSION).yellow()
                )?;
                writeln!(output, "Update with: {}", REINSTALL_COMMAND)?;
            }
        },
        Err(e) => {
            warn!("Update check failed: {:#}", e);
            writeln!(output, "{}", format!("Update check failed: {:#}", e).red())?;
        }
    }
    Ok(())
}

/// Runs `!uninstall`. Returns `true` when the state directory was removed
/// and the shell should exit.
pub fn uninstall_with_io<R: LineReader + ?Sized, W: Write>(
    home: &NatshHome,
    ui: &ConfirmationUI,
    input: &mut R,
    output: &mut W,
) -> Result<bool> {
    writeln!(
        output,
        "This removes {} (configuration, history and API keys).",
        home.root().display()
    )?;
    if !ui.ask_yes_no_with_io("Uninstall natsh?", input)? {
        writeln!(output, "Uninstall cancelled.")?;
        return Ok(false);
    }

    if home.root().exists() {
        fs::remove_dir_all(home.root())
            .with_context(|| format!("removing {}", home.root().display()))?;
        info!("Removed state directory {}", home.root().display());
    }
    writeln!(output, "{}", format!("Removed {}", home.root().display()).green())?;

    match which::which("natsh") {
        Ok(binary) => {
            writeln!(output, "The natsh binary is still installed at {}", binary.display())?;
            writeln!(output, "Remove it with: cargo uninstall natsh")?;
        }
        Err(_) => writeln!(output, "No natsh binary found on PATH.")?,
    }
    writeln!(output, "Goodbye!")?;
    Ok(true)
}
