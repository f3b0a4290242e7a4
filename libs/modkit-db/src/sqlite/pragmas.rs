//! SQLite PRAGMA parameters carried in the DSN query string.

use sqlx::sqlite::{SqliteJournalMode, SqliteSynchronous};
use std::time::Duration;

const PRAGMA_KEYS: &[&str] = &["journal_mode", "synchronous", "busy_timeout"];

/// Parsed SQLite PRAGMA parameters. Unknown or invalid values are ignored with a warning.
#[derive(Clone, Debug, Default)]
pub(crate) struct Pragmas {
    pub journal_mode: Option<SqliteJournalMode>,
    pub synchronous: Option<SqliteSynchronous>,
    pub busy_timeout: Option<Duration>,
}

impl Pragmas {
    fn apply(&mut self, key: &str, value: &str) {
        match key {
            "journal_mode" => match value.to_uppercase().as_str() {
                "DELETE" => self.journal_mode = Some(SqliteJournalMode::Delete),
                "WAL" => self.journal_mode = Some(SqliteJournalMode::Wal),
                "MEMORY" => self.journal_mode = Some(SqliteJournalMode::Memory),
                "TRUNCATE" => self.journal_mode = Some(SqliteJournalMode::Truncate),
                "PERSIST" => self.journal_mode = Some(SqliteJournalMode::Persist),
                "OFF" => self.journal_mode = Some(SqliteJournalMode::Off),
                _ => tracing::warn!("Invalid 'journal_mode' PRAGMA value '{}', ignoring", value),
            },
            "synchronous" => match value.to_uppercase().as_str() {
                "OFF" => self.synchronous = Some(SqliteSynchronous::Off),
                "NORMAL" => self.synchronous = Some(SqliteSynchronous::Normal),
                "FULL" => self.synchronous = Some(SqliteSynchronous::Full),
                "EXTRA" => self.synchronous = Some(SqliteSynchronous::Extra),
                _ => tracing::warn!("Invalid 'synchronous' PRAGMA value '{}', ignoring", value),
            },
            "busy_timeout" => match value.parse::<u64>() {
                Ok(ms) => self.busy_timeout = Some(Duration::from_millis(ms)),
                Err(_) => tracing::warn!("Invalid 'busy_timeout' PRAGMA value '{}', ignoring", value),
            },
            _ => {}
        }
    }
}

/// Split PRAGMA parameters out of the DSN, returning the DSN sqlx understands.
pub(crate) fn split_pragmas(dsn: &str) -> (String, Pragmas) {
    let mut pragmas = Pragmas::default();
    let Some((base, query)) = dsn.split_once('?') else {
        return (dsn.to_string(), pragmas);
    };

    let mut kept = Vec::new();
    for (k, v) in url::form_urlencoded::parse(query.as_bytes()) {
        let key = k.to_lowercase();
        if PRAGMA_KEYS.contains(&key.as_str()) {
            pragmas.apply(&key, &v);
        } else {
            kept.push(format!("{k}={v}"));
        }
    }

    let clean = if kept.is_empty() {
        base.to_string()
    } else {
        format!("{base}?{}", kept.join("&"))
    };
    (clean, pragmas)
}
