//! Provider API keys kept in a `.env` file inside the state directory.
//!
//! Keys never go into `config.json`. Lookup prefers the file and falls back
//! to the process environment, so an exported `OPENAI_API_KEY` also works.

use crate::config::Provider;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

pub struct SecretStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl SecretStore {
    /// Loads `KEY=value` pairs from `path`. A missing file is an empty store.
    pub fn load(path: PathBuf) -> Self {
        let mut values = BTreeMap::new();
        if path.exists() {
            match dotenvy::from_path_iter(&path) {
                Ok(iter) => {
                    for item in iter {
                        match item {
                            Ok((key, value)) => {
                                values.insert(key, value);
                            }
                            Err(e) => warn!("Skipping malformed line in {}: {}", path.display(), e),
                        }
                    }
                }
                Err(e) => warn!("Could not read {}: {}", path.display(), e),
            }
        }
        Self { path, values }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values
            .get(key)
            .cloned()
            .or_else(|| std::env::var(key).ok())
            .filter(|v| !v.trim().is_empty())
    }

    pub fn api_key(&self, provider: Provider) -> Option<String> {
        self.get(provider.key_name())
    }

    /// Stores or replaces `key` and rewrites the whole file.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content: String = self
            .values
            .iter()
            .map(|(k, v)| format!("{}={}\n", k, v))
            .collect();
        fs::write(&self.path, content)
            .with_context(|| format!("writing {}", self.path.display()))?;
        info!("Saved {} to {}", key, self.path.display());
        Ok(())
    }

    pub fn set_api_key(&mut self, provider: Provider, value: &str) -> Result<()> {
        self.set(provider.key_name(), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SecretStore::load(dir.path().join(".env"));
        assert!(store.get("NATSH_TEST_SURELY_UNSET_KEY").is_none());
    }

    #[test]
    fn test_reads_pairs_and_skips_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "# keys\n\nNATSH_TEST_A=alpha\nNATSH_TEST_B=beta=gamma\n").unwrap();

        let store = SecretStore::load(path);
        assert_eq!(store.get("NATSH_TEST_A").as_deref(), Some("alpha"));
        assert_eq!(store.get("NATSH_TEST_B").as_deref(), Some("beta=gamma"));
    }

    #[test]
    fn test_set_preserves_other_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(".env");

        let mut store = SecretStore::load(path.clone());
        store.set("NATSH_TEST_ONE", "1").unwrap();
        store.set("NATSH_TEST_TWO", "2").unwrap();
        store.set("NATSH_TEST_ONE", "uno").unwrap();

        let reloaded = SecretStore::load(path);
        assert_eq!(reloaded.get("NATSH_TEST_ONE").as_deref(), Some("uno"));
        assert_eq!(reloaded.get("NATSH_TEST_TWO").as_deref(), Some("2"));
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "NATSH_TEST_BLANK=\n").unwrap();

        let store = SecretStore::load(path);
        assert!(store.get("NATSH_TEST_BLANK").is_none());
    }
}
