use authgate_core::ProviderId;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Drive an authgate session gate against a local virtual backend.
#[derive(Debug, Parser)]
#[command(name = "authgate", version, about)]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON).
    #[arg(short, long, env = "AUTHGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// State file; overrides the configured `state_path`.
    #[arg(short, long, env = "AUTHGATE_STATE")]
    pub state: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Show the signed-in user and provider state.
    Status,
    /// Create and sign in an anonymous account.
    SignInAnonymous,
    /// Sign in through a provider.
    SignIn { provider: ProviderId },
    /// Link a provider to the signed-in account.
    Link { provider: ProviderId },
    /// Unlink a provider from the signed-in account.
    Unlink { provider: ProviderId },
    /// Sign out, keeping the account.
    SignOut,
    /// Delete the signed-in account.
    Delete,
}

impl Command {
    /// Subcommand name as typed on the command line.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::SignInAnonymous => "sign-in-anonymous",
            Self::SignIn { .. } => "sign-in",
            Self::Link { .. } => "link",
            Self::Unlink { .. } => "unlink",
            Self::SignOut => "sign-out",
            Self::Delete => "delete",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_provider_subcommands() {
        let cli = Cli::try_parse_from(["authgate", "--state", "s.json", "link", "apple.com"])
            .expect("parse");
        assert_eq!(cli.state, Some(PathBuf::from("s.json")));
        assert_eq!(
            cli.command,
            Command::Link {
                provider: ProviderId::apple()
            }
        );
        assert_eq!(cli.command.name(), "link");
    }

    #[test]
    fn subcommand_names_are_kebab_case() {
        let cli = Cli::try_parse_from(["authgate", "sign-in-anonymous"]).expect("parse");
        assert_eq!(cli.command, Command::SignInAnonymous);
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
