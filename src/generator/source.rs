use std::borrow::Cow;
use std::io;
use std::path::{Path, PathBuf};

use super::{GeneratorError, TEMPLATES_DIR_ENV, bundled};

/// Where template files are read from.
///
/// Lookup paths are `/`-separated and relative to the template root,
/// e.g. `typescript/src/index.ts.tmpl`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TemplateSource {
    /// Tree compiled into the binary.
    #[default]
    Bundled,
    Dir(PathBuf),
}

impl From<PathBuf> for TemplateSource {
    fn from(root: PathBuf) -> Self {
        TemplateSource::Dir(root)
    }
}

impl From<&Path> for TemplateSource {
    fn from(root: &Path) -> Self {
        TemplateSource::Dir(root.to_path_buf())
    }
}

impl TemplateSource {
    /// `ATOMEMO_TEMPLATES_DIR` when set, the bundled tree otherwise.
    pub fn from_env() -> Self {
        match std::env::var_os(TEMPLATES_DIR_ENV) {
            Some(dir) if !dir.is_empty() => TemplateSource::Dir(PathBuf::from(dir)),
            _ => TemplateSource::Bundled,
        }
    }

    /// Path shown in errors for `lookup`.
    pub fn location(&self, lookup: &str) -> PathBuf {
        match self {
            TemplateSource::Dir(root) => root.join(lookup),
            TemplateSource::Bundled => Path::new("<bundled>").join(lookup),
        }
    }

    pub async fn read(&self, lookup: &str) -> io::Result<Cow<'static, [u8]>> {
        match self {
            TemplateSource::Dir(root) => tokio::fs::read(root.join(lookup)).await.map(Cow::Owned),
            TemplateSource::Bundled => bundled::get(lookup)
                .map(|file| Cow::Borrowed(file.contents))
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "not a bundled template")),
        }
    }

    /// Lookup paths of every file under `tree`, sorted.
    pub async fn list(&self, tree: &str) -> Result<Vec<String>, GeneratorError> {
        match self {
            TemplateSource::Bundled => Ok(bundled::under(tree)
                .into_iter()
                .map(str::to_string)
                .collect()),
            TemplateSource::Dir(root) => {
                let mut files = Vec::new();
                walk(root, tree.to_string(), &mut files).await?;
                files.sort_unstable();
                Ok(files)
            }
        }
    }
}

async fn walk(root: &Path, dir: String, files: &mut Vec<String>) -> Result<(), GeneratorError> {
    let path = root.join(&dir);
    let mut entries = tokio::fs::read_dir(&path)
        .await
        .map_err(GeneratorError::io(&path))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(GeneratorError::io(&path))?
    {
        let lookup = format!("{dir}/{}", entry.file_name().to_string_lossy());
        let file_type = entry
            .file_type()
            .await
            .map_err(GeneratorError::io(&entry.path()))?;

        if file_type.is_dir() {
            Box::pin(walk(root, lookup, files)).await?;
        } else {
            files.push(lookup);
        }
    }
    Ok(())
}
