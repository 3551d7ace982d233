//! The `!` meta-command vocabulary.

/// Administrative commands typed as `!<name> [args]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaCommand {
    Help,
    /// Set an API key, optionally for another provider.
    Api(Option<String>),
    /// Show or switch the active provider.
    Provider(Option<String>),
    /// Show or set the active model (`default` resets it).
    Model(Option<String>),
    /// Show the last `n` history entries.
    History(usize),
    Config,
    /// `!alias name=command`. `None` when the definition is malformed.
    Alias(Option<(String, String)>),
    Aliases,
    Update,
    Uninstall,
}

pub const DEFAULT_HISTORY_COUNT: usize = 20;

impl MetaCommand {
    /// Parses the text after the `!` marker.
    ///
    /// Returns `None` when the first word is not part of the vocabulary, in
    /// which case the input is a direct execution request instead. The word
    /// must follow the marker immediately.
    pub fn parse(rest: &str) -> Option<Self> {
        let rest = rest.trim_end();
        let (word, arg) = match rest.split_once(char::is_whitespace) {
            Some((word, arg)) => (word, arg.trim()),
            None => (rest, ""),
        };
        let arg = (!arg.is_empty()).then(|| arg.to_string());

        let command = match word {
            "help" if arg.is_none() => MetaCommand::Help,
            "api" => MetaCommand::Api(first_word(arg)),
            "provider" => MetaCommand::Provider(first_word(arg)),
            "model" => MetaCommand::Model(arg),
            "history" => MetaCommand::History(
                arg.and_then(|a| a.split_whitespace().next()?.parse().ok())
                    .unwrap_or(DEFAULT_HISTORY_COUNT),
            ),
            "config" if arg.is_none() => MetaCommand::Config,
            "alias" => MetaCommand::Alias(arg.as_deref().and_then(parse_alias_definition)),
            "aliases" if arg.is_none() => MetaCommand::Aliases,
            "update" if arg.is_none() => MetaCommand::Update,
            "uninstall" if arg.is_none() => MetaCommand::Uninstall,
            _ => return None,
        };
        Some(command)
    }
}

fn first_word(arg: Option<String>) -> Option<String> {
    arg.and_then(|a| a.split_whitespace().next().map(str::to_string))
}

fn parse_alias_definition(definition: &str) -> Option<(String, String)> {
    let (name, command) = definition.split_once('=')?;
    let (name, command) = (name.trim(), command.trim());
    if name.is_empty() || command.is_empty() || name.contains(char::is_whitespace) {
        return None;
    }
    Some((name.to_string(), command.to_string()))
}
