//! Plugin project scaffolding.
//!
//! Templates are laid out as:
//!
//! ```text
//! templates/
//!   common/        rendered for every language
//!   typescript/    language specific tree
//! ```
//!
//! The tree in this repository is compiled into the binary; a directory with
//! the same layout can replace it. Files ending in `.tmpl` are rendered and
//! written without the suffix, everything else is copied byte for byte.

mod bundled;
pub mod permissions;
pub mod source;
pub mod template;

#[cfg(test)]
mod generator_tests;

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::{Map, Value, json};

pub use permissions::{PermissionGroup, group_permissions};
pub use source::TemplateSource;
pub use template::{Template, TemplateEngine, TemplateError};

pub const TEMPLATE_EXTENSION: &str = "tmpl";
pub const COMMON_TREE: &str = "common";
pub const TEMPLATES_DIR_ENV: &str = "ATOMEMO_TEMPLATES_DIR";

#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("Plugin generator type \"{0}\" is not implemented.")]
    Unsupported(String),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("Permission denied: cannot write {}", .path.display())]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot access {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GeneratorError {
    fn io(path: &Path) -> impl FnOnce(std::io::Error) -> GeneratorError + '_ {
        move |source| {
            let path = path.to_path_buf();
            if source.kind() == std::io::ErrorKind::PermissionDenied {
                GeneratorError::PermissionDenied { path, source }
            } else {
                GeneratorError::Io { path, source }
            }
        }
    }
}

/// Languages a plugin can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Elixir,
    Python,
    TypeScript,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::Elixir, Language::Python, Language::TypeScript];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Elixir => "elixir",
            Language::Python => "python",
            Language::TypeScript => "typescript",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = GeneratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|language| language.as_str() == s)
            .ok_or_else(|| GeneratorError::Unsupported(s.to_string()))
    }
}

/// Per-language part of a generator.
pub trait LanguageProfile: Sync {
    fn language(&self) -> Language;

    /// Template subtree rendered next to `common/`.
    fn template_dir(&self) -> &'static str;

    /// Fill language specific props before rendering.
    fn prepare(&self, props: &mut Map<String, Value>);
}

pub struct TypeScriptProfile;

impl LanguageProfile for TypeScriptProfile {
    fn language(&self) -> Language {
        Language::TypeScript
    }

    fn template_dir(&self) -> &'static str {
        "typescript"
    }

    fn prepare(&self, props: &mut Map<String, Value>) {
        props.insert("language".into(), json!(Language::TypeScript.as_str()));
    }
}

/// Implemented languages. Adding one means a new profile and a line here.
static REGISTRY: &[&dyn LanguageProfile] = &[&TypeScriptProfile];

#[derive(Debug, Clone)]
pub struct GenerationContext {
    pub props: Map<String, Value>,
    pub target: PathBuf,
}

/// Look up the generator for `language`.
pub fn create_generator(
    language: &str,
    context: GenerationContext,
    templates: impl Into<TemplateSource>,
) -> Result<Generator, GeneratorError> {
    let language_id = language.parse::<Language>()?;
    let profile = REGISTRY
        .iter()
        .copied()
        .find(|profile| profile.language() == language_id)
        .ok_or_else(|| GeneratorError::Unsupported(language.to_string()))?;

    Ok(Generator::new(profile, context, TemplateEngine::new(templates)))
}

pub struct Generator {
    profile: &'static dyn LanguageProfile,
    context: GenerationContext,
    engine: TemplateEngine,
}

impl Generator {
    fn new(
        profile: &'static dyn LanguageProfile,
        mut context: GenerationContext,
        engine: TemplateEngine,
    ) -> Self {
        let permissions: Vec<&str> = context
            .props
            .get("permissions")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        let grouped: Vec<Value> = group_permissions(&permissions)
            .into_iter()
            .map(|group| json!({ "scope": group.scope, "entries": group.entries }))
            .collect();
        context.props.insert("permissions".into(), Value::Array(grouped));

        profile.prepare(&mut context.props);

        Self {
            profile,
            context,
            engine,
        }
    }

    pub fn language(&self) -> Language {
        self.profile.language()
    }

    pub fn context(&self) -> &GenerationContext {
        &self.context
    }

    /// Render `common/` and the language tree into the target directory.
    ///
    /// The two trees are rendered concurrently and write into the same root
    /// without coordination; a name present in both trees ends up with
    /// whichever write lands last. Nothing is cleaned up on failure.
    pub async fn generate(&self) -> Result<(), GeneratorError> {
        let props = Value::Object(self.context.props.clone());

        tracing::info!(
            language = %self.language(),
            target = %self.context.target.display(),
            "generating plugin"
        );

        tokio::try_join!(
            self.render_tree(COMMON_TREE, &props),
            self.render_tree(self.profile.template_dir(), &props),
        )?;
        Ok(())
    }

    async fn render_tree(&self, tree: &str, props: &Value) -> Result<(), GeneratorError> {
        let root = &self.context.target;
        tokio::fs::create_dir_all(root)
            .await
            .map_err(GeneratorError::io(root))?;

        let source = self.engine.source();
        for lookup in source.list(tree).await? {
            let relative = lookup
                .strip_prefix(tree)
                .unwrap_or(lookup.as_str())
                .trim_start_matches('/');
            let mut target = root.join(relative);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(GeneratorError::io(parent))?;
            }

            if is_template(&target) {
                let content = self.engine.render(&lookup, props).await?;
                target.set_extension("");
                tracing::debug!(template = %lookup, target = %target.display(), "render");
                tokio::fs::write(&target, content)
                    .await
                    .map_err(GeneratorError::io(&target))?;
            } else {
                let bytes = source
                    .read(&lookup)
                    .await
                    .map_err(GeneratorError::io(&source.location(&lookup)))?;
                tracing::debug!(source = %lookup, target = %target.display(), "copy");
                tokio::fs::write(&target, bytes)
                    .await
                    .map_err(GeneratorError::io(&target))?;
            }
        }

        Ok(())
    }
}

fn is_template(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(TEMPLATE_EXTENSION))
}
