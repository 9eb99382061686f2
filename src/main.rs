mod cli;

use clap::Parser;
use cli::{Cli, Command};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Auth(args) => cli::auth_handler::run(args).await,
        Command::Plugin(args) => cli::plugin_handler::run(args).await,
    };

    if let Err(err) = result {
        eprintln!("{}", console::style(format!("✗ {err:#}")).red());
        std::process::exit(1);
    }
}
