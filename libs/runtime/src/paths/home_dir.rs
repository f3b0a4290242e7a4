use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HomeDirError {
    #[error("cannot determine the user home directory")]
    HomeUnavailable,

    #[error("failed to resolve current directory: {0}")]
    CurrentDir(#[source] std::io::Error),

    #[error("failed to create home directory '{path}': {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Resolve the server home directory into an absolute path.
///
/// - `None` (or blank) falls back to `<platform base>/<default_subdir>`
///   (`%APPDATA%` on Windows, `$HOME` elsewhere).
/// - A leading `~` is expanded to the user home directory.
/// - Relative paths are anchored at the current working directory.
///
/// With `create = true` the directory is created if missing.
pub fn resolve_home_dir(
    requested: Option<String>,
    default_subdir: &str,
    create: bool,
) -> Result<PathBuf, HomeDirError> {
    let resolved = match requested.as_deref().map(str::trim) {
        None | Some("") => platform_base()?.join(default_subdir),
        Some(raw) => expand(raw)?,
    };

    if create {
        std::fs::create_dir_all(&resolved).map_err(|source| HomeDirError::Create {
            path: resolved.clone(),
            source,
        })?;
    }

    Ok(resolved)
}

fn platform_base() -> Result<PathBuf, HomeDirError> {
    #[cfg(target_os = "windows")]
    let base = dirs::config_dir();
    #[cfg(not(target_os = "windows"))]
    let base = dirs::home_dir();

    base.ok_or(HomeDirError::HomeUnavailable)
}

fn expand(raw: &str) -> Result<PathBuf, HomeDirError> {
    if raw == "~" {
        return dirs::home_dir().ok_or(HomeDirError::HomeUnavailable);
    }
    if let Some(rest) = raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        let home = dirs::home_dir().ok_or(HomeDirError::HomeUnavailable)?;
        return Ok(home.join(rest));
    }

    let p = Path::new(raw);
    if p.is_absolute() {
        Ok(p.to_path_buf())
    } else {
        let cwd = std::env::current_dir().map_err(HomeDirError::CurrentDir)?;
        Ok(cwd.join(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn absolute_path_is_kept_and_created() {
        let tmp = tempdir().unwrap();
        let target = tmp.path().join("nested/home");
        let out = resolve_home_dir(Some(target.to_string_lossy().to_string()), ".x", true).unwrap();
        assert_eq!(out, target);
        assert!(out.is_dir());
    }

    #[test]
    fn relative_path_becomes_absolute() {
        let out = resolve_home_dir(Some("some/rel".into()), ".x", false).unwrap();
        assert!(out.is_absolute());
        assert!(out.ends_with("some/rel"));
    }

    #[test]
    fn tilde_expands_to_home() {
        let out = resolve_home_dir(Some("~/.backoffice_test".into()), ".x", false).unwrap();
        assert!(out.is_absolute());
        assert!(!out.to_string_lossy().starts_with('~'));
        assert!(out.ends_with(".backoffice_test"));
    }
}
