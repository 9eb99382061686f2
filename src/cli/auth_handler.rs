//! CLI handler for `atomemo auth` subcommands.

use std::io::IsTerminal;

use anyhow::Context;
use atomemo::api::ApiClient;
use atomemo::auth::{DeviceFlow, fetch_session};
use atomemo::config::{AuthConfig, Config, ConfigStore};
use console::style;
use tokio_util::sync::CancellationToken;

use super::auth::{AuthArgs, AuthCommand};
use super::{check_endpoint_flag, prompt, with_login_hint};

pub async fn run(args: AuthArgs) -> anyhow::Result<()> {
    let store = ConfigStore::from_env()?;

    match args.command {
        AuthCommand::Login {
            endpoint,
            no_browser,
        } => login(&store, endpoint, no_browser).await,
        AuthCommand::Status => status(&store).await,
    }
}

async fn login(
    store: &ConfigStore,
    endpoint: Option<String>,
    no_browser: bool,
) -> anyhow::Result<()> {
    if let Some(endpoint) = &endpoint {
        if !check_endpoint_flag("--endpoint", "auth.endpoint", endpoint, "auth login") {
            return Ok(());
        }
    }

    let config = match endpoint {
        Some(endpoint) => store.update(Config {
            auth: Some(AuthConfig {
                endpoint: Some(endpoint),
                access_token: None,
            }),
            hub: None,
        })?,
        None => store.load()?,
    };
    let endpoint = config
        .auth_endpoint()
        .context("Auth endpoint is required")?
        .to_string();

    let api = ApiClient::new()?;
    let flow = DeviceFlow::new(api.clone(), &endpoint);
    let authorization = flow
        .request_device_code()
        .await
        .context("Failed to request a device code")?;

    eprintln!(
        "{}\n",
        style("Starting device authorization flow...").yellow().bright()
    );
    eprintln!(
        "{} {}",
        style("Verification URL : ").bold().dim(),
        authorization.verification_uri
    );
    eprintln!(
        "{} {}\n",
        style("Verification Code: ").bold().dim(),
        authorization.user_code
    );

    if !no_browser && std::io::stdin().is_terminal() {
        let Some(open_browser) = prompt::confirm_open_browser()? else {
            return Ok(());
        };
        if open_browser {
            let target = authorization
                .verification_uri_complete
                .as_deref()
                .unwrap_or(&authorization.verification_uri);
            if let Err(e) = open::that(target) {
                tracing::warn!(error = %e, "failed to open browser");
                eprintln!("Could not open a browser, please open the URL manually.");
            }
        }
    }

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    eprintln!("{}", style("Polling for token...").dim());
    let result = flow
        .poll_for_token(&authorization.device_code, &cancel)
        .await;
    ctrl_c.abort();

    let grant = match result {
        Ok(grant) => grant,
        Err(e) if e.is_benign() => {
            eprintln!("{}", style(format!("✗ {e}")).red());
            return Ok(());
        }
        Err(e) => return Err(anyhow::Error::new(e).context("Device authorization failed")),
    };
    eprintln!("{} Token acquired successfully\n", style("✓").green().bold());

    store.update(Config {
        auth: Some(AuthConfig {
            endpoint: None,
            access_token: Some(grant.access_token.clone()),
        }),
        hub: None,
    })?;

    let session = fetch_session(&api, &endpoint, &grant.access_token)
        .await
        .map_err(|e| with_login_hint("Failed to fetch session", e))?;

    eprintln!(
        "{}",
        style(format!(
            "Welcome back, {} <{}>!",
            session.user.name, session.user.email
        ))
        .green()
        .bright()
    );
    eprintln!(
        "{}",
        style("To create a new plugin, you can use the following command:")
            .green()
            .bright()
    );
    eprintln!("`{}`", style("atomemo plugin init").yellow().bright().bold());
    Ok(())
}

async fn status(store: &ConfigStore) -> anyhow::Result<()> {
    let config = store.load()?;
    let Some(token) = config.access_token() else {
        eprintln!(
            "{}",
            style("Your device has not been authenticated yet. Please execute `atomemo auth login`.")
                .yellow()
        );
        return Ok(());
    };
    let endpoint = config.auth_endpoint().context("Auth endpoint is required")?;

    let api = ApiClient::new()?;
    let session = fetch_session(&api, endpoint, token)
        .await
        .map_err(|e| with_login_hint("Failed to fetch session", e))?;

    eprintln!("{}\n", style("✓ Authenticated").green().bright());
    print_row("Name    : ", &session.user.name);
    print_row("Email   : ", &session.user.email);
    print_row("Updated : ", &format_date(&session.session.updated_at));
    print_row("Expires : ", &format_date(&session.session.expires_at));
    Ok(())
}

fn print_row(label: &str, value: &str) {
    eprintln!("{} {value}", style(label).bold().dim());
}

/// RFC 3339 timestamp in local time; anything else is shown as received.
fn format_date(raw: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|date| {
            date.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|_| raw.to_string())
}
