pub mod auth;
pub mod auth_handler;
pub mod plugin;
pub mod plugin_handler;
pub mod prompt;

pub use auth::AuthArgs;
pub use plugin::PluginArgs;

use atomemo::config::{ConfigError, validate_endpoint};
use clap::{Parser, Subcommand};
use console::style;

/// Atomemo plugin CLI
#[derive(Parser)]
#[command(
    name = "atomemo",
    version,
    about = "Atomemo plugin CLI: log in, scaffold plugins, manage debug keys"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Log in with your Choiceform account and inspect the session
    Auth(AuthArgs),

    /// Create plugins and refresh their debug API key
    Plugin(PluginArgs),
}

/// Hint appended to failures that a new login fixes.
pub const LOGIN_HINT: &str = "Run `atomemo auth login` to authenticate again.";

/// Wrap a remote failure with `context` and the login hint.
///
/// The whole cause chain of `err` goes into the message.
pub fn with_login_hint<E>(context: &str, err: E) -> anyhow::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    let err = anyhow::Error::new(err);
    anyhow::anyhow!("{context}: {err:#}\n  {LOGIN_HINT}")
}

/// Print a usage problem followed by a pointer to `atomemo help <command>`.
pub fn print_usage_hint(problem: &str, command: &str) {
    eprintln!("{}", style(problem).red().bright());
    eprintln!(
        "{}",
        style(format!(
            "Use {} to see all available options.",
            style(format!("atomemo help {command}")).blue()
        ))
        .red()
        .bright()
    );
}

/// Validate an endpoint passed as `flag` before anything is persisted.
///
/// Prints the problem and returns `false` when the value is not usable.
pub fn check_endpoint_flag(flag: &str, field: &'static str, value: &str, command: &str) -> bool {
    match validate_endpoint(field, value) {
        Ok(()) => true,
        Err(e) => {
            let reason = match e {
                ConfigError::Validation { reason, .. } => reason,
                other => other.to_string(),
            };
            print_usage_hint(&format!("Invalid {flag}: {reason}"), command);
            false
        }
    }
}
