//! CLI handler for `atomemo plugin` subcommands.

use std::io::IsTerminal;
use std::sync::LazyLock;

use anyhow::Context;
use atomemo::api::ApiClient;
use atomemo::auth::{User, fetch_debug_api_key, fetch_session};
use atomemo::config::{Config, ConfigStore, HubConfig};
use atomemo::env_file::{ENV_FILE_NAME, mask_api_key, update_env_file};
use atomemo::generator::{GenerationContext, TemplateSource, create_generator};
use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use console::style;
use regex::Regex;
use serde_json::{Map, Value, json};

use super::plugin::{DEFAULT_LOCALE, InitArgs, PluginArgs, PluginCommand, RefreshKeyArgs};
use super::prompt::{self, PluginAnswers, PromptDefaults};
use super::{check_endpoint_flag, print_usage_hint, with_login_hint};

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_-]{2,62}[a-z0-9]$").expect("valid regex"));

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}(?:\.[a-zA-Z]{2,})*$")
        .expect("valid regex")
});

const URL_SCHEMES: [&str; 3] = ["http", "https", "git"];

const INIT_COMMAND: &str = "plugin init";
const REFRESH_KEY_COMMAND: &str = "plugin refresh-key";

pub async fn run(args: PluginArgs) -> anyhow::Result<()> {
    match args.command {
        PluginCommand::Init(args) => init(args).await,
        PluginCommand::RefreshKey(args) => refresh_key(args).await,
    }
}

pub fn name_is_valid(name: &str) -> bool {
    NAME_PATTERN.is_match(name)
}

fn validate_length(value: &str, min: usize, max: usize, what: &str) -> Result<(), String> {
    let len = value.chars().count();
    if (min..=max).contains(&len) && !value.contains('\n') {
        Ok(())
    } else {
        Err(format!(
            "You must provide {what}:\n  - Allows any characters, minimum {min} characters, maximum {max} characters"
        ))
    }
}

pub fn validate_description(value: &str) -> Result<(), String> {
    validate_length(value, 16, 256, "a description for the new plugin")
}

pub fn validate_author(value: &str) -> Result<(), String> {
    validate_length(value, 2, 64, "the author name")
}

pub fn validate_email(value: &str) -> Result<(), String> {
    if EMAIL_PATTERN.is_match(value) {
        Ok(())
    } else {
        Err("You must provide the author email".to_string())
    }
}

/// Empty is allowed; otherwise an absolute http, https or git URL.
pub fn validate_url(value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Ok(());
    }
    match url::Url::parse(value) {
        Ok(url) if URL_SCHEMES.contains(&url.scheme()) => Ok(()),
        _ => Err("You must provide a valid URL".to_string()),
    }
}

/// A valid `--name` turns prompting off; without prompting a valid name is
/// required. `None` means the flags cannot work.
fn reconcile_interactive(requested: bool, name: Option<&str>) -> Option<bool> {
    let valid = name.is_some_and(name_is_valid);
    match (requested, valid) {
        (true, true) => Some(false),
        (false, false) => None,
        (requested, _) => Some(requested),
    }
}

/// `en_US` first, then the rest in the order given, without duplicates.
fn normalize_locales(locales: &[String]) -> Vec<String> {
    let mut normalized = vec![DEFAULT_LOCALE.to_string()];
    for locale in locales {
        if !normalized.contains(locale) {
            normalized.push(locale.clone());
        }
    }
    normalized
}

/// The stored user, when a token exists and the session answers.
async fn session_user(store: &ConfigStore) -> Option<User> {
    let config = match store.load() {
        Ok(config) => config,
        Err(e) => {
            tracing::debug!(error = %e, "config unavailable, skipping author defaults");
            return None;
        }
    };
    let token = config.access_token()?;
    let endpoint = config.auth_endpoint()?;
    let api = ApiClient::new().ok()?;

    match fetch_session(&api, endpoint, token).await {
        Ok(session) => Some(session.user),
        Err(e) => {
            tracing::debug!(error = %e, "session unavailable, skipping author defaults");
            None
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Answers from flags alone, filling author and email from the session.
fn answers_from_flags(args: &InitArgs, user: Option<&User>) -> Option<PluginAnswers> {
    let author = non_empty(args.author.clone())
        .or_else(|| user.map(|u| u.name.clone()))
        .unwrap_or_default();
    let email = non_empty(args.email.clone())
        .or_else(|| user.map(|u| u.email.clone()))
        .unwrap_or_default();

    Some(PluginAnswers {
        name: args.name.clone()?,
        description: args.description.clone().unwrap_or_default(),
        author,
        email,
        url: args.url.clone().unwrap_or_default(),
        locales: normalize_locales(&args.locales),
        language: args.language.clone()?,
        plugin_type: args.plugin_type.clone().unwrap_or_default(),
    })
}

fn build_props(
    answers: &PluginAnswers,
    permissions: &[String],
    now: DateTime<Utc>,
) -> Map<String, Value> {
    let mut props = Map::new();
    props.insert("name".into(), json!(answers.name));
    props.insert("description".into(), json!(answers.description));
    props.insert("author".into(), json!(answers.author));
    props.insert("email".into(), json!(answers.email));
    props.insert("url".into(), json!(answers.url));
    props.insert("locales".into(), json!(answers.locales));
    props.insert("language".into(), json!(answers.language));
    props.insert("type".into(), json!(answers.plugin_type));
    props.insert("permissions".into(), json!(permissions));
    props.insert(
        "createdAt".into(),
        json!(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    props.insert("date".into(), json!(now.format("%Y-%m-%d").to_string()));
    props.insert("year".into(), json!(now.year().to_string()));
    props
}

async fn init(args: InitArgs) -> anyhow::Result<()> {
    let Some(interactive) = reconcile_interactive(args.interactive_requested(), args.name.as_deref())
    else {
        print_usage_hint(
            "Without interactive mode, you should provide initial information manually.",
            INIT_COMMAND,
        );
        return Ok(());
    };
    if interactive && !std::io::stdin().is_terminal() {
        print_usage_hint(
            "Interactive mode needs a terminal, pass --name and --language instead.",
            INIT_COMMAND,
        );
        return Ok(());
    }

    let store = ConfigStore::from_env()?;
    let user = session_user(&store).await;

    let answers = if interactive {
        let defaults = PromptDefaults {
            author: non_empty(args.author.clone()).or_else(|| user.as_ref().map(|u| u.name.clone())),
            email: non_empty(args.email.clone()).or_else(|| user.as_ref().map(|u| u.email.clone())),
            locales: args.locales.clone(),
        };
        match prompt::collect_plugin(defaults)? {
            Some(answers) => answers,
            None => return Ok(()),
        }
    } else {
        match answers_from_flags(&args, user.as_ref()) {
            Some(answers) => answers,
            None => {
                print_usage_hint(
                    "A programming language is required, pass --language.",
                    INIT_COMMAND,
                );
                return Ok(());
            }
        }
    };

    let props = build_props(&answers, &args.permissions, Utc::now());
    let target = std::env::current_dir()
        .context("Failed to resolve the current directory")?
        .join(&answers.name);
    let templates = args
        .templates_dir
        .map(TemplateSource::Dir)
        .unwrap_or_else(TemplateSource::from_env);
    tracing::debug!(?templates, "using templates");

    let generator = create_generator(
        &answers.language,
        GenerationContext {
            props,
            target: target.clone(),
        },
        templates,
    )?;
    generator.generate().await?;

    eprintln!(
        "{} Plugin {} created in {}",
        style("✓").green().bold(),
        style(&answers.name).bold(),
        target.display()
    );
    eprintln!(
        "  Next: {} then {}",
        style(format!("cd {}", answers.name)).yellow(),
        style("atomemo plugin refresh-key").yellow()
    );
    Ok(())
}

async fn refresh_key(args: RefreshKeyArgs) -> anyhow::Result<()> {
    if let Some(endpoint) = &args.hub_endpoint {
        if !check_endpoint_flag("--hub-endpoint", "hub.endpoint", endpoint, REFRESH_KEY_COMMAND) {
            return Ok(());
        }
    }

    let store = ConfigStore::from_env()?;
    let config = match args.hub_endpoint {
        Some(endpoint) => store.update(Config {
            auth: None,
            hub: Some(HubConfig {
                endpoint: Some(endpoint),
            }),
        })?,
        None => store.load()?,
    };

    let Some(token) = config.access_token() else {
        anyhow::bail!("You're not authenticated yet, please run 'atomemo auth login' first.");
    };
    let hub = config.hub_endpoint().context(
        "Hub endpoint is not configured, pass --hub-endpoint or set ATOMEMO_HUB_ENDPOINT",
    )?;

    let api = ApiClient::new()?;
    let api_key = fetch_debug_api_key(&api, hub, token)
        .await
        .map_err(|e| with_login_hint("Failed to refresh debug API Key", e))?;

    let env_path = args.dir.join(ENV_FILE_NAME);
    update_env_file(&env_path, &api_key)
        .await
        .context("Failed to refresh debug API Key")?;

    eprintln!("{}", style("✓ Debug API Key refreshed successfully").green());
    eprintln!("{}", style("✓ DEBUG_API_KEY updated in .env file").green());
    eprintln!();
    eprintln!("Your debug API Key has been saved to .env file.");
    eprintln!("Key preview: {}", mask_api_key(&api_key));
    Ok(())
}
