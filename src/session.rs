//! Per-turn state machine of the interactive shell.
//!
//! A [`Session`] owns everything that lives for the duration of one natsh
//! run: configuration, secrets, both history logs and the active backend.
//! The REPL feeds it one line at a time through
//! [`Session::handle_line_with_io`].

use crate::backend::{TranslationBackend, create_backend, sanitize_command};
use crate::classifier::{Classifier, InputKind, ShellDialect};
use crate::config::{Config, Provider};
use crate::confirm::{Confirmation, ConfirmationUI};
use crate::directory::{change_directory, parse_cd};
use crate::executor::Executor;
use crate::history::{History, HistoryEntry};
use crate::http_client::HttpClient;
use crate::input::{LineReader, ReadOutcome};
use crate::maintenance;
use crate::meta::MetaCommand;
use crate::paths::NatshHome;
use crate::prompt::PromptBuilder;
use crate::providers::{SystemTimeProvider, TimeProvider};
use crate::safety::SafetyEvaluator;
use crate::secrets::SecretStore;
use anyhow::Result;
use colored::Colorize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

const EXIT_WORDS: [&str; 3] = ["exit", "quit", "q"];

/// What the REPL should do after a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    Continue,
    Exit(i32),
}

pub struct Session {
    home: NatshHome,
    config: Config,
    /// Provider written to `config.json`; differs from the active one while
    /// a `--provider` override is in effect.
    saved_provider: Provider,
    secrets: SecretStore,
    history: History,
    backend: Option<Box<dyn TranslationBackend>>,
    dialect: ShellDialect,
    prompts: PromptBuilder,
    executor: Executor,
    confirm_ui: ConfirmationUI,
    http: Arc<dyn HttpClient>,
    clock: Box<dyn TimeProvider>,
}

impl Session {
    /// Opens the state directory and loads secrets, configuration and history.
    ///
    /// No backend is built yet; see [`Session::rebuild_backend`].
    pub fn open(home: NatshHome, http: Arc<dyn HttpClient>) -> Result<Self> {
        home.ensure_exists()?;
        let secrets = SecretStore::load(home.env_file());
        let config = Config::load(&home);
        let history = History::load(home.history_file(), config.max_history);
        let dialect = ShellDialect::host();

        info!(
            "Session opened in {} (provider: {}, dialect: {:?})",
            home.root().display(),
            config.provider,
            dialect
        );
        Ok(Self {
            saved_provider: config.provider,
            home,
            config,
            secrets,
            history,
            backend: None,
            dialect,
            prompts: PromptBuilder::new(dialect),
            executor: Executor::new(dialect),
            confirm_ui: ConfirmationUI::new(),
            http,
            clock: Box::new(SystemTimeProvider),
        })
    }

    pub fn with_backend(mut self, backend: Box<dyn TranslationBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_executor(mut self, executor: Executor) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_clock(mut self, clock: Box<dyn TimeProvider>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn home(&self) -> &NatshHome {
        &self.home
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    pub fn has_api_key(&self) -> bool {
        self.secrets.api_key(self.config.provider).is_some()
    }

    /// Uses `provider` for this run without writing it to `config.json`.
    pub fn override_provider(&mut self, provider: Provider) {
        info!("Using provider {} for this run", provider);
        self.config.provider = provider;
    }

    /// Rebuilds the backend for the active provider from the stored key.
    /// Returns whether a backend is now available.
    pub fn rebuild_backend(&mut self) -> bool {
        match create_backend(&self.config, &self.secrets, self.http.clone()) {
            Ok(backend) => {
                info!("Backend ready: {} / {}", backend.provider(), backend.model());
                self.backend = Some(backend);
                true
            }
            Err(e) => {
                warn!("Backend unavailable: {}", e);
                self.backend = None;
                false
            }
        }
    }

    fn persist_config(&self) -> Result<()> {
        let mut saved = self.config.clone();
        saved.provider = self.saved_provider;
        saved.save(&self.home)
    }

    /// Asks for an API key for `provider` and stores it.
    /// Returns `false` when nothing was entered.
    pub fn prompt_for_key_with_io<R: LineReader + ?Sized, W: Write>(
        &mut self,
        provider: Provider,
        input: &mut R,
        output: &mut W,
    ) -> Result<bool> {
        let name = provider.as_str().to_uppercase();
        writeln!(output, "\n{}\n", format!("Get your {} API key at: {}", name, provider.key_url()).cyan())?;

        let prompt = format!("{} ", format!("Enter your {} API key:", name).yellow());
        let key = match input.read_line(&prompt)? {
            ReadOutcome::Line(line) => line.trim().to_string(),
            ReadOutcome::Interrupted | ReadOutcome::Eof => String::new(),
        };
        if key.is_empty() {
            writeln!(output, "No API key provided.")?;
            return Ok(false);
        }

        self.secrets.set_api_key(provider, &key)?;
        writeln!(output, "{}\n", "API key saved!".green())?;
        Ok(true)
    }

    pub fn show_welcome_with_io<W: Write>(&self, output: &mut W) -> Result<()> {
        writeln!(output)?;
        writeln!(output, "{} v{} - Natural Shell", "natsh".bold(), maintenance::CURRENT_VERSION)?;
        writeln!(
            output,
            "{}",
            format!(
                "Provider: {} | Model: {} | Type !help for commands",
                self.config.provider.as_str().to_uppercase(),
                self.config.active_model()
            )
            .dimmed()
        )?;
        writeln!(output)?;
        Ok(())
    }

    /// Processes one line of input.
    ///
    /// `input` is used for any follow-up question asked during the turn
    /// (confirmations, API keys). Errors from the backend are returned to
    /// the caller; nothing is recorded for a failed turn.
    pub async fn handle_line_with_io<R: LineReader + ?Sized, W: Write>(
        &mut self,
        line: &str,
        input: &mut R,
        output: &mut W,
    ) -> Result<Turn> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Turn::Continue);
        }

        if let Some(target) = parse_cd(line) {
            if let Err(e) = change_directory(&target, self.dialect) {
                writeln!(output, "{}", format!("cd: {:#}", e).red())?;
            }
            return Ok(Turn::Continue);
        }

        if EXIT_WORDS.iter().any(|w| line.eq_ignore_ascii_case(w)) {
            writeln!(output, "{}", "Goodbye!".dimmed())?;
            return Ok(Turn::Exit(0));
        }

        let kind = Classifier::new(self.dialect, &self.config.aliases).classify(line);
        match kind {
            InputKind::MetaCommand(meta) => self.run_meta(meta, input, output).await,
            InputKind::DirectExecRequest(command) => {
                if !command.trim().is_empty() {
                    self.execute_and_record(line, &command, output)?;
                }
                Ok(Turn::Continue)
            }
            InputKind::ExplainRequest(command) => {
                if !command.is_empty() {
                    self.explain_with_io(&command, output).await?;
                }
                Ok(Turn::Continue)
            }
            InputKind::AliasInvocation { alias, resolved } => {
                info!("Alias '{}' expanded to: {}", alias, resolved);
                self.execute_and_record(line, &resolved, output)?;
                Ok(Turn::Continue)
            }
            InputKind::LiteralShellCommand(command) => {
                self.execute_and_record(&command, &command, output)?;
                Ok(Turn::Continue)
            }
            InputKind::NaturalLanguage(text) => self.translate_and_run(&text, input, output).await,
        }
    }

    async fn translate_and_run<R: LineReader + ?Sized, W: Write>(
        &mut self,
        text: &str,
        input: &mut R,
        output: &mut W,
    ) -> Result<Turn> {
        let Some(backend) = self.backend.as_ref() else {
            writeln!(output, "{}", "AI not initialized. Run !api to set up.".red())?;
            return Ok(Turn::Continue);
        };

        let prompt = self
            .prompts
            .translation_prompt(text, &current_dir(), &self.history.format_context());
        let reply = backend.translate(&prompt).await?;
        let command = sanitize_command(&reply);
        if command.is_empty() {
            writeln!(output, "{}", "Could not generate command.".red())?;
            return Ok(Turn::Continue);
        }
        info!("Translated {:?} to {:?}", text, command);

        let dangerous = SafetyEvaluator::from_config(&self.config).is_dangerous(&command);
        let Some(answer) = self.confirm_ui.confirm_with_io(&command, dangerous, input, output)? else {
            info!("Confirmation aborted for: {}", command);
            return Ok(Turn::Continue);
        };

        match answer {
            Confirmation::Proceed => self.execute_and_record(text, &command, output)?,
            Confirmation::Decline => {
                self.confirm_ui.show_declined_with_io(&command, output)?;
                self.record(text, &command, "", false)?;
            }
        }
        Ok(Turn::Continue)
    }

    async fn explain_with_io<W: Write>(&self, command: &str, output: &mut W) -> Result<()> {
        let Some(backend) = self.backend.as_ref() else {
            writeln!(output, "{}", "AI not initialized. Run !api to set up.".red())?;
            return Ok(());
        };

        writeln!(output, "{}", format!("Explaining: {}", command).dimmed())?;
        let explanation = backend.translate(&self.prompts.explain_prompt(command)).await?;
        writeln!(output, "\n{}\n", explanation)?;
        Ok(())
    }

    /// Runs `command` and records it. A `cd` changes natsh's own directory
    /// and records a short note instead of process output.
    fn execute_and_record<W: Write>(&mut self, input: &str, command: &str, output: &mut W) -> Result<()> {
        if let Some(target) = parse_cd(command) {
            match change_directory(&target, self.dialect) {
                Ok(path) => self.record(input, command, &format!("Changed to {}", path.display()), true)?,
                Err(e) => writeln!(output, "{}", format!("cd: {:#}", e).red())?,
            }
            return Ok(());
        }

        let result = self.executor.run_with_io(command, output)?;
        self.record(input, command, &result.combined(), true)
    }

    fn record(&mut self, input: &str, command: &str, output: &str, executed: bool) -> Result<()> {
        let cwd = current_dir();
        let entry = HistoryEntry::new(
            self.clock.now(),
            input,
            command,
            output,
            executed,
            &cwd.display().to_string(),
        );
        self.history.record(entry)
    }

    // ===== Meta-commands =====

    async fn run_meta<R: LineReader + ?Sized, W: Write>(
        &mut self,
        meta: MetaCommand,
        input: &mut R,
        output: &mut W,
    ) -> Result<Turn> {
        info!("Meta-command: {:?}", meta);
        match meta {
            MetaCommand::Help => self.show_help_with_io(output)?,
            MetaCommand::Api(provider) => self.set_key_with_io(provider, input, output)?,
            MetaCommand::Provider(name) => self.switch_provider_with_io(name, input, output)?,
            MetaCommand::Model(model) => self.model_with_io(model, output)?,
            MetaCommand::History(count) => self.history.show_with_io(count, output)?,
            MetaCommand::Config => {
                writeln!(output, "\n{}\n", "Current configuration:".cyan())?;
                writeln!(output, "{}\n", self.config.to_pretty_json()?)?;
            }
            MetaCommand::Alias(Some((name, command))) => {
                self.config.add_alias(&name, &command);
                self.persist_config()?;
                writeln!(output, "{}", format!("Alias '{}' created.", name).green())?;
            }
            MetaCommand::Alias(None) => {
                writeln!(output, "{}", "Usage: !alias name=command".red())?;
            }
            MetaCommand::Aliases => self.show_aliases_with_io(output)?,
            MetaCommand::Update => {
                maintenance::check_for_update_with_io(self.http.as_ref(), output).await?;
            }
            MetaCommand::Uninstall => {
                if maintenance::uninstall_with_io(&self.home, &self.confirm_ui, input, output)? {
                    return Ok(Turn::Exit(0));
                }
            }
        }
        Ok(Turn::Continue)
    }

    fn set_key_with_io<R: LineReader + ?Sized, W: Write>(
        &mut self,
        provider: Option<String>,
        input: &mut R,
        output: &mut W,
    ) -> Result<()> {
        let provider = match provider {
            Some(name) => match name.parse::<Provider>() {
                Ok(p) => p,
                Err(e) => {
                    writeln!(output, "{}", e.to_string().red())?;
                    return Ok(());
                }
            },
            None => self.config.provider,
        };

        if self.prompt_for_key_with_io(provider, input, output)? && provider == self.config.provider {
            self.rebuild_backend();
        }
        Ok(())
    }

    fn switch_provider_with_io<R: LineReader + ?Sized, W: Write>(
        &mut self,
        name: Option<String>,
        input: &mut R,
        output: &mut W,
    ) -> Result<()> {
        let Some(name) = name else {
            writeln!(output, "{}", format!("Current provider: {}", self.config.provider).dimmed())?;
            writeln!(output, "Available: {}", Provider::available())?;
            return Ok(());
        };
        let provider = match name.parse::<Provider>() {
            Ok(p) => p,
            Err(e) => {
                writeln!(output, "{}", e.to_string().red())?;
                return Ok(());
            }
        };

        self.config.provider = provider;
        self.saved_provider = provider;
        self.persist_config()?;

        if self.secrets.api_key(provider).is_none() {
            writeln!(output, "{}", format!("No API key for {}. Setting up...", provider).yellow())?;
            self.prompt_for_key_with_io(provider, input, output)?;
        }
        if self.rebuild_backend() {
            writeln!(output, "{}", format!("Switched to {}", provider.as_str().to_uppercase()).green())?;
        } else {
            writeln!(
                output,
                "{}",
                format!("Failed to initialize {}. Run !api to set key.", provider).red()
            )?;
        }
        Ok(())
    }

    fn model_with_io<W: Write>(&mut self, model: Option<String>, output: &mut W) -> Result<()> {
        let provider = self.config.provider;
        let Some(model) = model else {
            writeln!(
                output,
                "{}",
                format!("Current model ({}): {}", provider, self.config.active_model()).dimmed()
            )?;
            writeln!(
                output,
                "{}",
                format!("Default model ({}): {}", provider, provider.default_model()).dimmed()
            )?;
            writeln!(output, "\nUsage: !model <model-name>")?;
            writeln!(output, "       !model default        # reset to default")?;
            return Ok(());
        };

        let model = self.config.set_active_model(&model);
        self.persist_config()?;
        self.rebuild_backend();
        writeln!(output, "{}", format!("Model set to: {}", model).green())?;
        Ok(())
    }

    fn show_aliases_with_io<W: Write>(&self, output: &mut W) -> Result<()> {
        if self.config.aliases.is_empty() {
            writeln!(
                output,
                "{}",
                "No aliases defined. Create one with: !alias name=command".dimmed()
            )?;
            return Ok(());
        }

        writeln!(output, "\n{}\n", "Aliases:".cyan())?;
        for (name, command) in &self.config.aliases {
            writeln!(output, "  {} = {}", name.yellow(), command)?;
        }
        writeln!(output)?;
        Ok(())
    }

    fn show_help_with_io<W: Write>(&self, output: &mut W) -> Result<()> {
        writeln!(output, "\n{} - Natural Shell", "natsh".bold())?;
        writeln!(
            output,
            "{}\n",
            format!(
                "Provider: {} | Model: {}",
                self.config.provider.as_str().to_uppercase(),
                self.config.active_model()
            )
            .dimmed()
        )?;
        writeln!(output, "{}", "Commands:".cyan())?;
        writeln!(output, "  !help               Show this help")?;
        writeln!(output, "  !api [provider]     Set API key (gemini/openai/claude)")?;
        writeln!(output, "  !provider <name>    Switch AI provider")?;
        writeln!(output, "  !model [name]       Show or set AI model (!model default to reset)")?;
        writeln!(output, "  !history [n]        Show last n commands (default: 20)")?;
        writeln!(output, "  !config             Show current configuration")?;
        writeln!(output, "  !alias <name>=<cmd> Create alias")?;
        writeln!(output, "  !aliases            List all aliases")?;
        writeln!(output, "  !update             Check for a newer release")?;
        writeln!(output, "  !uninstall          Remove natsh state")?;
        writeln!(output, "\n{}", "Special:".cyan())?;
        writeln!(output, "  ?<command>          Explain what a command does")?;
        writeln!(output, "  !<command>          Run command directly (bypass AI)")?;
        writeln!(output, "\n{}", "Examples:".cyan())?;
        writeln!(output, "  show all files      -> ls -la (translated by AI)")?;
        writeln!(output, "  ?tar -xzf a.tgz     -> explains the command")?;
        writeln!(output, "  !ls                 -> runs ls directly")?;
        writeln!(output, "\n{}\n", "Type 'exit' or press Ctrl+D to quit".dimmed())?;
        Ok(())
    }
}

fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
