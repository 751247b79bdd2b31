//! One CLI run: load state, install a gate, execute a command, save state.

use authgate::{
    AuthGate, GateError, GateFacade, GateState, MemoryHintStore, MemoryIdentityStore,
};
use authgate_core::Result;
use rootcause::prelude::ResultExt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cli::{Cli, Command};
use crate::config::CliConfig;
use crate::error::CliError;
use crate::state::StateFile;

/// Runs `cli` and returns the text to print.
///
/// State is saved whether or not the command succeeds, since initialization
/// may already have changed it.
///
/// # Errors
///
/// Returns `Config`, `State`, or `Command` naming the stage that failed.
pub async fn run(cli: Cli) -> Result<String, CliError> {
    let config = CliConfig::load(cli.config.as_deref()).context(CliError::Config)?;
    let state_path = cli.state.unwrap_or_else(|| config.state_path.clone());
    run_with(&config, state_path, cli.command).await
}

pub(crate) async fn run_with(
    config: &CliConfig,
    state_path: PathBuf,
    command: Command,
) -> Result<String, CliError> {
    let registry = config.registry().context(CliError::Config)?;
    let state = StateFile::load(&state_path).context(CliError::State)?;

    let store = Arc::new(MemoryIdentityStore::from_state(state.identity));
    let hints = Arc::new(MemoryHintStore::from_values(state.hints));
    let gate = AuthGate::new(registry, store.clone(), hints.clone(), &config.gate);

    let facade = GateFacade::new();
    match facade.install(Arc::new(gate)).await {
        Ok(initialized) => {
            for warning in &initialized.report.warnings {
                warn!(%warning, "validation warning");
            }
            if !initialized.report.pruned.is_empty() {
                info!(pruned = ?initialized.report.pruned, "pruned identities");
            }
        }
        Err(err) => warn!(error = %err, "cached session rejected"),
    }

    let result = execute(&facade, &command).await;

    StateFile {
        identity: store.state(),
        hints: hints.values(),
        saved_at: None,
    }
    .save(&state_path)
    .context(CliError::State)?;

    result.context(CliError::Command {
        name: command.name(),
    })
}

async fn execute(
    facade: &GateFacade,
    command: &Command,
) -> Result<String, GateError> {
    let output = match command {
        Command::Status => status(facade),
        Command::SignInAnonymous => {
            let session = facade.sign_in_anonymous().await?;
            format!("signed in anonymously as {}", session.user_id())
        }
        Command::SignIn { provider } => {
            let session = facade.sign_in(provider).await?;
            format!("signed in as {session} via {provider}")
        }
        Command::Link { provider } => {
            let linked = facade.link(provider).await?;
            format!("linked {linked}")
        }
        Command::Unlink { provider } => {
            facade.sign_out_provider(provider).await?;
            format!("unlinked {provider}")
        }
        Command::SignOut => {
            facade.sign_out().await?;
            "signed out".to_string()
        }
        Command::Delete => {
            facade.delete().await?;
            "deleted account".to_string()
        }
    };
    Ok(output)
}

fn status(facade: &GateFacade) -> String {
    let Some(gate) = facade.gate() else {
        return "no gate installed".to_string();
    };

    let state = match gate.state() {
        GateState::Unauthenticated => "unauthenticated".to_string(),
        GateState::Anonymous => "anonymous".to_string(),
        GateState::Authenticated { providers } => {
            let names: Vec<_> = providers.iter().map(|p| p.as_str()).collect();
            format!("authenticated ({})", names.join(", "))
        }
    };
    let latest = gate
        .latest_provider()
        .map_or_else(|| "-".to_string(), |p| p.to_string());

    let providers: Vec<String> = gate
        .registry()
        .available()
        .into_iter()
        .map(|provider| {
            let mark = if gate.is_connected_provider(&provider) {
                "connected"
            } else if facade.can_link(&provider) {
                "linkable"
            } else {
                "available"
            };
            format!("{provider} [{mark}]")
        })
        .collect();

    [
        format!("user:      {}", gate.current_user()),
        format!("state:     {state}"),
        format!("latest:    {latest}"),
        format!("providers: {}", providers.join(" ")),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use authgate::{ValidateBehavior, ValidationPolicy};
    use authgate_core::ProviderId;

    async fn run_in(
        dir: &tempfile::TempDir,
        config: &CliConfig,
        command: Command,
    ) -> Result<String, CliError> {
        run_with(config, dir.path().join("state.json"), command).await
    }

    #[tokio::test]
    async fn state_survives_between_runs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = CliConfig::default();

        let out = run_in(&dir, &config, Command::SignInAnonymous)
            .await
            .expect("sign in");
        assert!(out.starts_with("signed in anonymously as uid_"));

        let out = run_in(&dir, &config, Command::Status).await.expect("status");
        assert!(out.contains("state:     anonymous"));
        assert!(out.contains("google.com [linkable]"));

        let err = run_in(&dir, &config, Command::SignInAnonymous)
            .await
            .unwrap_err();
        assert_eq!(
            err.current_context(),
            &CliError::Command {
                name: "sign-in-anonymous"
            }
        );
    }

    #[tokio::test]
    async fn sign_in_link_and_status() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = CliConfig::default();

        run_in(&dir, &config, Command::SignIn { provider: ProviderId::google() })
            .await
            .expect("sign in");
        let out = run_in(&dir, &config, Command::Link { provider: ProviderId::apple() })
            .await
            .expect("link");
        assert_eq!(out, "linked apple.com");

        let out = run_in(&dir, &config, Command::Status).await.expect("status");
        assert!(out.contains("authenticated (google.com, apple.com)"));
        assert_eq!(out.lines().count(), 4);
        assert!(out.ends_with("providers: apple.com [connected] google.com [connected]"));
        assert!(out.contains("latest:    google.com"));

        let state = StateFile::load(&dir.path().join("state.json")).expect("load");
        assert!(state.saved_at.is_some());
        assert_eq!(state.identity.accounts.len(), 1);
    }

    #[tokio::test]
    async fn rejected_cached_session_is_persisted_signed_out() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = CliConfig::default();
        run_in(&dir, &config, Command::SignIn { provider: ProviderId::google() })
            .await
            .expect("sign in");

        config.gate = config.gate.with_validation(ValidationPolicy::ValidateLatest);
        assert_eq!(config.providers[0].id, ProviderId::google());
        config.providers[0].validate = Some(ValidateBehavior::Invalid);

        let out = run_in(&dir, &config, Command::Status).await.expect("status");
        assert!(out.contains("state:     unauthenticated"));
        assert!(out.contains("latest:    -"));

        let state = StateFile::load(&dir.path().join("state.json")).expect("load");
        assert_eq!(state.identity.current, None);
    }

    #[tokio::test]
    async fn command_failure_names_command() {
        let dir = tempfile::tempdir().expect("tempdir");

        let err = run_in(&dir, &CliConfig::default(), Command::SignOut)
            .await
            .unwrap_err();
        assert_eq!(err.current_context(), &CliError::Command { name: "sign-out" });

        // The gate did not act, so nothing was created.
        let state = StateFile::load(&dir.path().join("state.json")).expect("load");
        assert!(state.identity.accounts.is_empty());
    }

    #[tokio::test]
    async fn unreadable_state_fails_before_running() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("state.json"), "{").expect("write");

        let err = run_in(&dir, &CliConfig::default(), Command::Status)
            .await
            .unwrap_err();
        assert_eq!(err.current_context(), &CliError::State);
    }
}
