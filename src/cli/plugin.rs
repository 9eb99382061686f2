use std::path::PathBuf;

use clap::builder::PossibleValuesParser;
use clap::{Parser, Subcommand};

pub const LOCALES: [&str; 3] = ["en_US", "zh_Hans", "ja_JP"];
pub const DEFAULT_LOCALE: &str = "en_US";
pub const LANGUAGES: [&str; 3] = ["elixir", "python", "typescript"];
pub const PLUGIN_TYPES: [&str; 4] = ["extension", "llm", "tool", "trigger"];

#[derive(Parser)]
pub struct PluginArgs {
    #[command(subcommand)]
    pub command: PluginCommand,
}

#[derive(Subcommand)]
pub enum PluginCommand {
    /// Initialize a new plugin with step-by-step interactive instructions
    ///
    /// Providing a valid --name skips the interactive flow and completes
    /// initialization in one go.
    Init(InitArgs),

    /// Refresh or create the API key used to debug a plugin locally
    RefreshKey(RefreshKeyArgs),
}

#[derive(Parser)]
pub struct InitArgs {
    /// Use interactive mode (default)
    #[arg(short, long, overrides_with = "no_interactive")]
    pub interactive: bool,

    /// Do not prompt; --name and --language must be given
    #[arg(long, overrides_with = "interactive")]
    pub no_interactive: bool,

    /// Plugin name
    #[arg(short, long, value_name = "my-awesome-plugin")]
    pub name: Option<String>,

    /// Short description
    #[arg(short, long, value_name = "TEXT")]
    pub description: Option<String>,

    /// Author name
    #[arg(short, long, value_name = "John Doe")]
    pub author: Option<String>,

    /// Author email address
    #[arg(short, long, value_name = "john.doe@example.com")]
    pub email: Option<String>,

    /// Repository URL
    #[arg(short, long, value_name = "URL")]
    pub url: Option<String>,

    /// Provide READMEs in which languages
    #[arg(long, value_delimiter = ',', value_parser = PossibleValuesParser::new(LOCALES))]
    pub locales: Vec<String>,

    /// Programming language to use for plugin development
    #[arg(short, long, value_parser = PossibleValuesParser::new(LANGUAGES))]
    pub language: Option<String>,

    /// Plugin type
    #[arg(short = 't', long = "type", value_parser = PossibleValuesParser::new(PLUGIN_TYPES))]
    pub plugin_type: Option<String>,

    /// Permissions requested by the plugin, as scope:entry
    #[arg(short, long, value_delimiter = ',', value_name = "SCOPE:ENTRY")]
    pub permissions: Vec<String>,

    /// Directory holding the plugin templates, instead of the bundled set
    #[arg(long, env = "ATOMEMO_TEMPLATES_DIR", value_name = "DIR")]
    pub templates_dir: Option<PathBuf>,
}

impl InitArgs {
    /// Interactive unless `--no-interactive` came last.
    pub fn interactive_requested(&self) -> bool {
        self.interactive || !self.no_interactive
    }
}

#[derive(Parser)]
pub struct RefreshKeyArgs {
    /// Plugin hub URL, saved to the config for later commands
    #[arg(long, env = "ATOMEMO_HUB_ENDPOINT", value_name = "URL")]
    pub hub_endpoint: Option<String>,

    /// Plugin directory containing the .env file
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,
}
