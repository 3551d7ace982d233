use clap::{Arg, Command};
use colored::Colorize;
use natsh::config::{Config, Provider};
use natsh::http_client::ReqwestHttpClient;
use natsh::paths::NatshHome;
use natsh::repl::{self, EditorInput};
use natsh::secrets::SecretStore;
use natsh::session::Session;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let matches = Command::new("natsh")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Natural Shell - type what you want, run the command it means")
        .long_about(
            "natsh runs shell commands as typed and translates plain-language requests \
             into commands through an AI provider, asking before it runs them",
        )
        .arg(Arg::new("provider")
            .long("provider")
            .help("Use this provider for this run only (gemini, openai, claude)")
            .value_name("NAME")
            .num_args(1))
        .arg(Arg::new("set-api-key")
            .long("set-api-key")
            .help("Store the API key for the active provider and exit")
            .value_name("API_KEY")
            .num_args(1))
        .arg(Arg::new("config")
            .long("config")
            .help("Show configuration information and exit")
            .action(clap::ArgAction::SetTrue))
        .get_matches();

    let provider = matches
        .get_one::<String>("provider")
        .map(|name| name.parse::<Provider>())
        .transpose()?;
    let home = NatshHome::locate()?;

    if let Some(api_key) = matches.get_one::<String>("set-api-key") {
        home.ensure_exists()?;
        let provider = provider.unwrap_or(Config::load(&home).provider);
        SecretStore::load(home.env_file()).set_api_key(provider, api_key.trim())?;
        println!("{}", format!("API key for {} saved successfully", provider).green());
        return Ok(ExitCode::SUCCESS);
    }

    let mut stdout = std::io::stdout();

    if matches.get_flag("config") {
        Config::load(&home).show_config_info_with_io(&home, &mut stdout)?;
        return Ok(ExitCode::SUCCESS);
    }

    let mut session = Session::open(home, Arc::new(ReqwestHttpClient::new()))?;
    if let Some(provider) = provider {
        session.override_provider(provider);
    }
    let mut input = EditorInput::new()?;

    if !session.has_api_key() {
        session.show_welcome_with_io(&mut stdout)?;
        let provider = session.config().provider;
        if !session.prompt_for_key_with_io(provider, &mut input, &mut stdout)? {
            return Ok(ExitCode::from(1));
        }
    }

    if session.rebuild_backend() {
        session.show_welcome_with_io(&mut stdout)?;
    } else {
        println!(
            "{}",
            format!("Failed to initialize {}. Run !api to set key.", session.config().provider).red()
        );
    }

    info!("Starting interactive loop");
    let code = repl::run_with_io(&mut session, &mut input, &mut stdout).await?;
    Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
}
