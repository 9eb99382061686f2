use clap::{Parser, Subcommand};

#[derive(Parser)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Subcommand)]
pub enum AuthCommand {
    /// Log in using the device authorization flow
    ///
    /// 1. Request a verification code
    /// 2. Show the code and the verification URL
    /// 3. Open the URL in a browser and confirm the code
    /// 4. Wait until the login is approved
    Login {
        /// Identity service URL, saved to the config for later commands
        #[arg(long, value_name = "URL")]
        endpoint: Option<String>,

        /// Never offer to open the browser
        #[arg(long)]
        no_browser: bool,
    },

    /// Show the current authentication status
    Status,
}
