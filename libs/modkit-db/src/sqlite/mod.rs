//! SQLite-specific DSN handling.

pub(crate) mod path;
pub(crate) mod pragmas;

pub(crate) use path::{is_memory_dsn, prepare_sqlite_path};
pub(crate) use pragmas::split_pragmas;
