//! Location of the natsh state directory.
//!
//! Everything natsh persists lives under one directory: the configuration,
//! the command history and the provider keys. It defaults to `~/.natsh` and
//! can be redirected with `NATSH_HOME`, which is how the tests isolate state.

use anyhow::{Result, anyhow};
use dirs::home_dir;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the state directory.
pub const HOME_ENV: &str = "NATSH_HOME";

/// Resolved paths of the natsh state directory.
#[derive(Debug, Clone)]
pub struct NatshHome {
    root: PathBuf,
}

impl NatshHome {
    /// Uses `$NATSH_HOME` when set, otherwise `~/.natsh`.
    pub fn locate() -> Result<Self> {
        if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::at(dir));
        }
        let home = home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
        Ok(Self::at(home.join(".natsh")))
    }

    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.json")
    }

    pub fn history_file(&self) -> PathBuf {
        self.root.join("history.json")
    }

    pub fn env_file(&self) -> PathBuf {
        self.root.join(".env")
    }

    pub fn ensure_exists(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }
}
