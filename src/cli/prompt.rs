//! Interactive prompts. A `None` answer means the user aborted with Esc or Ctrl-C.

use std::io;

use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, MultiSelect, Select};

use super::plugin::{DEFAULT_LOCALE, LANGUAGES, LOCALES, PLUGIN_TYPES};
use super::plugin_handler::{
    name_is_valid, validate_author, validate_description, validate_email, validate_url,
};

const NAME_RULES: &str = "You must provide a name for the new plugin:
  - Only lowercase letters, digits, underscores, and hyphens are allowed
  - Minimum length of 4 and maximum length of 64
  - Starts with a lowercase letter (not a digit)
  - Ends with a lowercase letter or digit (not underscore or hyphen)";

/// Everything `plugin init` asks for.
#[derive(Debug, Clone)]
pub struct PluginAnswers {
    pub name: String,
    pub description: String,
    pub author: String,
    pub email: String,
    pub url: String,
    pub locales: Vec<String>,
    pub language: String,
    pub plugin_type: String,
}

/// Initial values shown in the prompts.
#[derive(Debug, Clone, Default)]
pub struct PromptDefaults {
    pub author: Option<String>,
    pub email: Option<String>,
    pub locales: Vec<String>,
}

/// Treat an interrupted terminal read as an abort.
fn answered<T>(result: dialoguer::Result<T>) -> anyhow::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(dialoguer::Error::IO(e)) if e.kind() == io::ErrorKind::Interrupted => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn answered_opt<T>(result: dialoguer::Result<Option<T>>) -> anyhow::Result<Option<T>> {
    Ok(answered(result)?.flatten())
}

pub fn confirm_open_browser() -> anyhow::Result<Option<bool>> {
    answered_opt(
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(
                "Do you want to open the verification URL in your browser automatically?\n  \
                 If not, you can manually open the URL and paste the code.",
            )
            .default(true)
            .interact_opt(),
    )
}

pub fn collect_plugin(defaults: PromptDefaults) -> anyhow::Result<Option<PluginAnswers>> {
    let theme = ColorfulTheme::default();

    eprintln!("Guiding you through creating a new plugin in interactive mode");
    eprintln!("Please follow the instructions below to complete the process:\n");

    let Some(name) = answered(
        Input::<String>::with_theme(&theme)
            .with_prompt("What's the name of this new plugin")
            .validate_with(|input: &String| {
                if name_is_valid(input) {
                    Ok(())
                } else {
                    Err(NAME_RULES)
                }
            })
            .interact_text(),
    )?
    else {
        return Ok(None);
    };

    let Some(description) = answered(
        Input::<String>::with_theme(&theme)
            .with_prompt("How do you describe this new plugin")
            .with_initial_text("A brief description of the plugin's functionality")
            .validate_with(|input: &String| validate_description(input))
            .interact_text(),
    )?
    else {
        return Ok(None);
    };

    let Some(author) = answered(
        Input::<String>::with_theme(&theme)
            .with_prompt("Who is the author of the new plugin")
            .with_initial_text(defaults.author.as_deref().unwrap_or("John Doe"))
            .validate_with(|input: &String| validate_author(input))
            .interact_text(),
    )?
    else {
        return Ok(None);
    };

    let Some(email) = answered(
        Input::<String>::with_theme(&theme)
            .with_prompt("What is the email address of the author")
            .with_initial_text(defaults.email.as_deref().unwrap_or("john.doe@example.com"))
            .validate_with(|input: &String| validate_email(input))
            .interact_text(),
    )?
    else {
        return Ok(None);
    };

    let Some(url) = answered(
        Input::<String>::with_theme(&theme)
            .with_prompt("What is the repository URL address (Optional)")
            .with_initial_text("https://github.com/[user]/[repo]")
            .allow_empty(true)
            .validate_with(|input: &String| validate_url(input))
            .interact_text(),
    )?
    else {
        return Ok(None);
    };

    let optional_locales: Vec<&str> = LOCALES
        .iter()
        .copied()
        .filter(|locale| *locale != DEFAULT_LOCALE)
        .collect();
    let checked: Vec<bool> = optional_locales
        .iter()
        .map(|locale| defaults.locales.iter().any(|l| l == locale))
        .collect();
    let labels: Vec<&str> = optional_locales
        .iter()
        .map(|locale| match *locale {
            "zh_Hans" => "简体中文 (Simplified Chinese)",
            "ja_JP" => "日本語 (Japanese)",
            other => other,
        })
        .collect();
    let Some(selected) = answered_opt(
        MultiSelect::with_theme(&theme)
            .with_prompt("Provide READMEs in which language(s)? English is always included")
            .items(&labels)
            .defaults(&checked)
            .interact_opt(),
    )?
    else {
        return Ok(None);
    };
    let locales = std::iter::once(DEFAULT_LOCALE.to_string())
        .chain(selected.into_iter().map(|i| optional_locales[i].to_string()))
        .collect();

    let Some(language) = answered_opt(
        Select::with_theme(&theme)
            .with_prompt("What programming language do you prefer for developing this plugin?")
            .items(&["Elixir", "Python", "TypeScript"])
            .default(LANGUAGES.len() - 1)
            .interact_opt(),
    )?
    else {
        return Ok(None);
    };

    eprintln!(
        "\n{}\n\n\
         Plugins can extend the platform's capabilities in multiple ways.\n\
         Based on your requirement, plugins fall into the following types:\n",
        style("Choose the type of the new plugin").blue()
    );
    let Some(plugin_type) = answered_opt(
        Select::with_theme(&theme)
            .with_prompt("Plugin type")
            .items(&[
                "Extension: integrate external service APIs into workflows",
                "Model: introduce more LLMs to enrich AI capabilities",
                "Tool: custom logic, typically invoked by LLMs and agents",
                "Trigger: start workflows from webhook events",
            ])
            .default(0)
            .interact_opt(),
    )?
    else {
        return Ok(None);
    };

    Ok(Some(PluginAnswers {
        name,
        description,
        author,
        email,
        url,
        locales,
        language: LANGUAGES[language].to_string(),
        plugin_type: PLUGIN_TYPES[plugin_type].to_string(),
    }))
}
