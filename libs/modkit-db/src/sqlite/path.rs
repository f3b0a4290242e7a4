//! SQLite path preparation utilities.

use std::io;
use std::path::PathBuf;

/// `true` for `sqlite::memory:` style DSNs and `mode=memory` URIs.
pub(crate) fn is_memory_dsn(dsn: &str) -> bool {
    dsn.contains(":memory:") || dsn.contains("mode=memory")
}

/// Ensure the parent directory of a file-backed SQLite DSN exists.
///
/// Memory databases are returned untouched.
pub(crate) fn prepare_sqlite_path(dsn: &str, create_dirs: bool) -> io::Result<()> {
    if !create_dirs || is_memory_dsn(dsn) {
        return Ok(());
    }

    if let Some(path) = extract_file_path_from_dsn(dsn) {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }
    Ok(())
}

/// Extract the file path from a SQLite DSN.
///
/// Handles `sqlite:///abs/db.sqlite`, `sqlite://rel/db.sqlite` and `sqlite:rel/db.sqlite`.
fn extract_file_path_from_dsn(dsn: &str) -> Option<PathBuf> {
    if is_memory_dsn(dsn) {
        return None;
    }

    let rest = dsn
        .strip_prefix("sqlite://")
        .or_else(|| dsn.strip_prefix("sqlite:"))?;
    let rest = rest.split('?').next().unwrap_or_default();
    if rest.is_empty() || rest == "/" {
        return None;
    }
    Some(PathBuf::from(rest))
}
