//! `.env` maintenance for the debug API key.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{NoExpand, Regex};

pub const ENV_FILE_NAME: &str = ".env";
pub const DEBUG_API_KEY_VAR: &str = "DEBUG_API_KEY";

static DEBUG_API_KEY_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mR)^DEBUG_API_KEY=.*$").expect("valid regex"));

#[derive(Debug, thiserror::Error)]
pub enum EnvFileError {
    #[error("Permission denied: cannot write .env file")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to update .env file {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl EnvFileError {
    fn from_io(path: &Path, source: std::io::Error) -> Self {
        let path = path.to_path_buf();
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            EnvFileError::PermissionDenied { path, source }
        } else {
            EnvFileError::Io { path, source }
        }
    }
}

/// Set `DEBUG_API_KEY` in `content`, replacing the first existing line or
/// appending a new one. The key is inserted literally and the file's line
/// ending (`\n` or `\r\n`) is kept.
pub fn upsert_debug_key(content: &str, api_key: &str) -> String {
    let line = format!("{DEBUG_API_KEY_VAR}={api_key}");
    let newline = if content.contains("\r\n") { "\r\n" } else { "\n" };

    if DEBUG_API_KEY_LINE.is_match(content) {
        return DEBUG_API_KEY_LINE
            .replacen(content, 1, NoExpand(&line))
            .into_owned();
    }

    let mut updated = String::with_capacity(content.len() + line.len() + 2);
    updated.push_str(content);
    if !content.is_empty() && !content.ends_with('\n') {
        updated.push_str(newline);
    }
    updated.push_str(&line);
    updated.push_str(newline);
    updated
}

/// Read `path` (missing counts as empty), set the key and write it back.
pub async fn update_env_file(path: &Path, api_key: &str) -> Result<(), EnvFileError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(EnvFileError::from_io(path, e)),
    };

    let updated = upsert_debug_key(&content, api_key);
    tokio::fs::write(path, updated)
        .await
        .map_err(|e| EnvFileError::from_io(path, e))?;

    tracing::debug!(path = %path.display(), "updated {DEBUG_API_KEY_VAR}");
    Ok(())
}

/// Short form of a secret for display.
pub fn mask_api_key(api_key: &str) -> String {
    let chars: Vec<char> = api_key.chars().collect();
    if chars.len() <= 8 {
        return "***".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}
