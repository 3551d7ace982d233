use crate::paths::NatshHome;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

/// Translation providers natsh can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Gemini,
    OpenAi,
    Claude,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Gemini, Provider::OpenAi, Provider::Claude];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::OpenAi => "openai",
            Provider::Claude => "claude",
        }
    }

    /// Name of the secret holding this provider's API key.
    pub fn key_name(&self) -> &'static str {
        match self {
            Provider::Gemini => "GEMINI_API_KEY",
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::Claude => "ANTHROPIC_API_KEY",
        }
    }

    /// Where users obtain a key for this provider.
    pub fn key_url(&self) -> &'static str {
        match self {
            Provider::Gemini => "https://aistudio.google.com/apikey",
            Provider::OpenAi => "https://platform.openai.com/api-keys",
            Provider::Claude => "https://console.anthropic.com/settings/keys",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini-2.5-flash",
            Provider::OpenAi => "gpt-4o-mini",
            Provider::Claude => "claude-3-haiku-20240307",
        }
    }

    pub fn available() -> String {
        Self::ALL.iter().map(|p| p.as_str()).collect::<Vec<_>>().join(", ")
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini" => Ok(Provider::Gemini),
            "openai" => Ok(Provider::OpenAi),
            "claude" => Ok(Provider::Claude),
            other => Err(anyhow!(
                "Invalid provider '{}'. Use: {}",
                other,
                Provider::available()
            )),
        }
    }
}

/// User configuration persisted as `config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub provider: Provider,
    /// Provider name to model identifier.
    pub model: BTreeMap<String, String>,
    pub safe_mode: bool,
    pub max_history: usize,
    pub aliases: BTreeMap<String, String>,
    pub dangerous_commands: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: Provider::Gemini,
            model: Provider::ALL
                .iter()
                .map(|p| (p.as_str().to_string(), p.default_model().to_string()))
                .collect(),
            safe_mode: true,
            max_history: 100,
            aliases: BTreeMap::new(),
            dangerous_commands: ["del", "rmdir", "rd", "format", "rm", "rm -rf", "shutdown", "restart"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Shape of a persisted file, where every field may be missing or stale.
#[derive(Debug, Default, Deserialize)]
struct ConfigOverlay {
    provider: Option<String>,
    model: Option<BTreeMap<String, String>>,
    safe_mode: Option<bool>,
    max_history: Option<usize>,
    aliases: Option<BTreeMap<String, String>>,
    dangerous_commands: Option<Vec<String>>,
}

impl Config {
    /// Loads `config.json`, falling back to defaults when it is missing or corrupt.
    pub fn load(home: &NatshHome) -> Self {
        let path = home.config_file();
        if !path.exists() {
            info!("No config file found, using defaults");
            return Self::default();
        }
        match Self::load_from_path(&path) {
            Ok(config) => {
                info!("Loaded config from: {}", path.display());
                config
            }
            Err(e) => {
                warn!("Ignoring unreadable config {}: {:#}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_json(&content)
    }

    /// Parses a persisted configuration and merges it over the defaults.
    ///
    /// Scalars replace the default, the `model` and `aliases` maps are merged
    /// key by key so a partial file never drops a defaulted entry.
    pub fn from_json(content: &str) -> Result<Self> {
        let overlay: ConfigOverlay = serde_json::from_str(content)?;
        let mut config = Self::default();

        if let Some(provider) = overlay.provider {
            match provider.parse() {
                Ok(p) => config.provider = p,
                Err(_) => warn!("Unknown provider '{}' in config, keeping {}", provider, config.provider),
            }
        }
        if let Some(model) = overlay.model {
            config.model.extend(model);
        }
        if let Some(safe_mode) = overlay.safe_mode {
            config.safe_mode = safe_mode;
        }
        if let Some(max_history) = overlay.max_history {
            config.max_history = max_history;
        }
        if let Some(aliases) = overlay.aliases {
            config.aliases.extend(aliases);
        }
        if let Some(dangerous) = overlay.dangerous_commands {
            config.dangerous_commands = dangerous;
        }

        Ok(config)
    }

    pub fn save(&self, home: &NatshHome) -> Result<()> {
        home.ensure_exists()?;
        let path = home.config_file();
        fs::write(&path, self.to_pretty_json()?)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("Saved config to: {}", path.display());
        Ok(())
    }

    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn model_for(&self, provider: Provider) -> &str {
        self.model
            .get(provider.as_str())
            .map(String::as_str)
            .unwrap_or_else(|| provider.default_model())
    }

    /// Model of the active provider.
    pub fn active_model(&self) -> &str {
        self.model_for(self.provider)
    }

    /// Sets the model for the active provider; `default` restores the built-in one.
    /// Returns the model now in effect.
    pub fn set_active_model(&mut self, model: &str) -> String {
        let model = if model.eq_ignore_ascii_case("default") {
            self.provider.default_model().to_string()
        } else {
            model.to_string()
        };
        self.model.insert(self.provider.as_str().to_string(), model.clone());
        model
    }

    pub fn add_alias(&mut self, name: &str, command: &str) {
        self.aliases.insert(name.to_string(), command.to_string());
    }

    /// Prints where state lives and the configuration in effect.
    pub fn show_config_info_with_io<W: Write>(&self, home: &NatshHome, output: &mut W) -> Result<()> {
        let path = home.config_file();
        writeln!(output, "State directory: {}", home.root().display())?;
        writeln!(output, "Configuration file: {}", path.display())?;
        writeln!(
            output,
            "Status: {}",
            if path.exists() { "Found" } else { "Not found (using defaults)" }
        )?;
        writeln!(output, "\n{}", self.to_pretty_json()?)?;
        writeln!(output, "\nTo set an API key:")?;
        writeln!(output, "  natsh --set-api-key <your-key>")?;
        writeln!(output, "\nOr from inside natsh:")?;
        writeln!(output, "  !api [gemini|openai|claude]")?;
        Ok(())
    }
}
