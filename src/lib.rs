//! natsh - a natural-language shell.
//!
//! Lines typed at the prompt are either run as shell commands or, when they
//! read like a request in plain language, translated into a command by an AI
//! provider and run after confirmation. It supports:
//!
//! - **Input classification** into literal commands, aliases, requests,
//!   `!` direct runs, `?` explanations and `!` meta-commands
//! - **Translation** through Gemini, OpenAI or Claude
//! - **A danger gate** that asks for an explicit `y` before risky commands
//! - **History** of executed and declined commands, fed back as context
//!
//! # Architecture
//!
//! - [`paths`] - State directory layout
//! - [`config`] - Persisted configuration and providers
//! - [`secrets`] - API keys in a `.env` file
//! - [`providers`] - Shared dependency injection traits
//! - [`history`] - Bounded command history
//! - [`classifier`] - Input classification and alias expansion
//! - [`meta`] - The `!` meta-command vocabulary
//! - [`prompt`] - Translation and explanation prompts
//! - [`safety`] - Dangerous command detection
//! - [`http_client`] - HTTP client abstraction
//! - [`backend`] - Translation backends
//! - [`executor`] - Runs commands through the host shell
//! - [`directory`] - `cd` handling
//! - [`input`] - Line input abstraction
//! - [`confirm`] - Confirmation dialogs
//! - [`maintenance`] - Update check and uninstall
//! - [`session`] - Per-turn state machine
//! - [`repl`] - Interactive loop, line editor and error reporting
//!
//! # Example
//!
//! ```ignore
//! use natsh::{http_client::ReqwestHttpClient, paths::NatshHome, repl, session::Session};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut session = Session::open(NatshHome::locate()?, Arc::new(ReqwestHttpClient::new()))?;
//!     session.rebuild_backend();
//!
//!     let mut input = repl::EditorInput::new()?;
//!     repl::run_with_io(&mut session, &mut input, &mut std::io::stdout()).await?;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod classifier;
pub mod config;
pub mod confirm;
pub mod directory;
pub mod executor;
pub mod history;
pub mod http_client;
pub mod input;
pub mod maintenance;
pub mod meta;
pub mod paths;
pub mod prompt;
pub mod providers;
pub mod repl;
pub mod safety;
pub mod secrets;
pub mod session;
