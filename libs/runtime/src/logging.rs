use crate::config::{LoggingConfig, Section};
use parking_lot::Mutex;
use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::Level;
use tracing_subscriber::{
    filter::{FilterFn, LevelFilter, Targets},
    fmt,
};

use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    ContentLimit, FileRotate,
};

const DEFAULT_MAX_SIZE_MB: u64 = 100;
const DEFAULT_MAX_BACKUPS: usize = 3;

fn parse_tracing_level(s: &str) -> Option<Level> {
    match s.to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        "off" | "none" => None,
        _ => Some(Level::INFO),
    }
}

/// Returns true if target == crate_name or target starts with "crate_name::"
fn matches_crate_prefix(target: &str, crate_name: &str) -> bool {
    target == crate_name
        || (target.starts_with(crate_name) && target[crate_name.len()..].starts_with("::"))
}

type CrateFilter = FilterFn<Box<dyn Fn(&tracing::Metadata<'_>) -> bool + Send + Sync + 'static>>;

/// Passes events that belong to none of the named subsystems, up to `max_level`.
fn outside_subsystems(subsystems: Vec<String>, max_level: Level) -> CrateFilter {
    FilterFn::new(Box::new(move |meta: &tracing::Metadata<'_>| {
        let t = meta.target();
        !subsystems.iter().any(|c| matches_crate_prefix(t, c)) && meta.level() <= &max_level
    }))
}

// -------- rotating file writers --------

#[derive(Clone)]
struct RotWriter(Arc<Mutex<FileRotate<AppendTimestamp>>>);

impl Write for RotWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0.lock().flush()
    }
}

/// Writer that may be detached; detached writes are dropped.
struct MaybeWriter(Option<RotWriter>);

impl Write for MaybeWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.0 {
            Some(w) => w.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.0 {
            Some(w) => w.flush(),
            None => Ok(()),
        }
    }
}

/// Routes records to per-subsystem files by target prefix, falling back to
/// the default file.
#[derive(Clone, Default)]
struct FileRouter {
    default: Option<RotWriter>,
    by_prefix: Vec<(String, RotWriter)>,
}

impl FileRouter {
    fn resolve_for(&self, target: &str) -> Option<RotWriter> {
        self.by_prefix
            .iter()
            .find(|(name, _)| matches_crate_prefix(target, name))
            .map(|(_, w)| w.clone())
            .or_else(|| self.default.clone())
    }
}

impl<'a> fmt::MakeWriter<'a> for FileRouter {
    type Writer = MaybeWriter;

    fn make_writer(&'a self) -> Self::Writer {
        MaybeWriter(self.default.clone())
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        MaybeWriter(self.resolve_for(meta.target()))
    }
}

/// Resolve a log file path against `base_dir` (home_dir).
/// Absolute paths are kept as-is; relative paths are joined with `base_dir`.
fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

fn create_rotating_writer_at_path(
    log_path: &Path,
    max_bytes: usize,
    max_files: usize,
) -> std::io::Result<RotWriter> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let rot = FileRotate::new(
        log_path,
        AppendTimestamp::default(FileLimit::MaxFiles(max_files)),
        ContentLimit::BytesSurpassed(max_bytes),
        Compression::None,
        #[cfg(unix)]
        None,
    );

    Ok(RotWriter(Arc::new(Mutex::new(rot))))
}

fn writer_for_section(name: &str, section: &Section, base_dir: &Path) -> Option<RotWriter> {
    if section.file.trim().is_empty() {
        return None;
    }
    let max_bytes = section.max_size_mb.unwrap_or(DEFAULT_MAX_SIZE_MB) * 1024 * 1024;
    let max_files = section.max_backups.unwrap_or(DEFAULT_MAX_BACKUPS);
    let log_path = resolve_log_path(&section.file, base_dir);

    match create_rotating_writer_at_path(&log_path, max_bytes as usize, max_files) {
        Ok(w) => Some(w),
        Err(e) => {
            eprintln!(
                "Failed to init log file for '{}': {} ({})",
                name,
                log_path.display(),
                e
            );
            None
        }
    }
}

/// Split view over the logging map: the catch-all section and the named subsystems.
struct LogPlan<'a> {
    default: Option<&'a Section>,
    subsystems: Vec<(&'a str, &'a Section)>,
}

impl<'a> LogPlan<'a> {
    fn from_config(cfg: &'a LoggingConfig) -> Self {
        let mut subsystems: Vec<(&str, &Section)> = cfg
            .iter()
            .filter(|(k, _)| k.as_str() != "default")
            .map(|(k, v)| (k.as_str(), v))
            .collect();
        // longest prefix first so nested targets win
        subsystems.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Self {
            default: cfg.get("default"),
            subsystems,
        }
    }

    fn names(&self) -> Vec<String> {
        self.subsystems.iter().map(|(n, _)| n.to_string()).collect()
    }

    fn console_targets(&self) -> Targets {
        self.subsystems
            .iter()
            .fold(Targets::new().with_default(LevelFilter::OFF), |t, (name, s)| {
                match parse_tracing_level(&s.console_level) {
                    Some(level) => t.with_target(name.to_string(), LevelFilter::from_level(level)),
                    None => t,
                }
            })
    }

    fn file_targets(&self) -> Targets {
        self.subsystems
            .iter()
            .filter(|(_, s)| !s.file.trim().is_empty())
            .fold(Targets::new().with_default(LevelFilter::OFF), |t, (name, s)| {
                match parse_tracing_level(&s.file_level) {
                    Some(level) => t.with_target(name.to_string(), LevelFilter::from_level(level)),
                    None => t,
                }
            })
    }

    fn file_router(&self, base_dir: &Path) -> FileRouter {
        FileRouter {
            default: self
                .default
                .and_then(|s| writer_for_section("default", s, base_dir)),
            by_prefix: self
                .subsystems
                .iter()
                .filter_map(|(name, s)| {
                    writer_for_section(name, s, base_dir).map(|w| (name.to_string(), w))
                })
                .collect(),
        }
    }
}

/// Initialize logging from a configuration.
/// - `cfg`: subsystem → section map; "default" catches everything else
/// - `base_dir`: base directory for relative log file paths (usually server.home_dir)
///
/// Console output is human readable; file output is JSON lines.
pub fn init_logging_from_config(cfg: &LoggingConfig, base_dir: &Path) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry};

    // Bridge `log` → `tracing` before installing the subscriber
    let _ = tracing_log::LogTracer::init();

    if cfg.is_empty() {
        init_default_logging();
        return;
    }

    let plan = LogPlan::from_config(cfg);
    let router = plan.file_router(base_dir);
    let ansi = atty::is(atty::Stream::Stdout);

    let subsystem_console = fmt::layer()
        .with_ansi(ansi)
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_filter(plan.console_targets());

    let subsystem_files = (!router.by_prefix.is_empty()).then(|| {
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(router.clone())
            .with_filter(plan.file_targets())
    });

    let default_console = plan
        .default
        .and_then(|s| parse_tracing_level(&s.console_level))
        .map(|level| {
            fmt::layer()
                .with_ansi(ansi)
                .with_target(true)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_filter(outside_subsystems(plan.names(), level))
        });

    let default_file = plan
        .default
        .filter(|_| router.default.is_some())
        .and_then(|s| parse_tracing_level(&s.file_level))
        .map(|level| {
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_target(true)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_writer(router.clone())
                .with_filter(outside_subsystems(plan.names(), level))
        });

    let _ = Registry::default()
        .with(subsystem_console)
        .with(subsystem_files)
        .with(default_console)
        .with(default_file)
        .try_init();
}

fn init_default_logging() {
    let _ = fmt()
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_logging_config, AppConfig};
    use std::fs;
    use tempfile::tempdir;

    fn section(file: &str) -> Section {
        Section {
            console_level: "info".into(),
            file: file.into(),
            file_level: "debug".into(),
            max_backups: Some(2),
            max_size_mb: Some(1),
        }
    }

    #[test]
    fn test_logging_level_parsing() {
        assert_eq!(parse_tracing_level("trace"), Some(Level::TRACE));
        assert_eq!(parse_tracing_level("DEBUG"), Some(Level::DEBUG));
        assert_eq!(parse_tracing_level("Info"), Some(Level::INFO));
        assert_eq!(parse_tracing_level("warn"), Some(Level::WARN));
        assert_eq!(parse_tracing_level("ERROR"), Some(Level::ERROR));
        assert_eq!(parse_tracing_level("off"), None);
        assert_eq!(parse_tracing_level("none"), None);
        assert_eq!(parse_tracing_level("invalid"), Some(Level::INFO));
    }

    #[test]
    fn test_crate_prefix_matching() {
        assert!(matches_crate_prefix("backoffice", "backoffice"));
        assert!(matches_crate_prefix("backoffice::domain", "backoffice"));
        assert!(!matches_crate_prefix("backoffice_extra", "backoffice"));
        assert!(!matches_crate_prefix("api_ingress", "backoffice"));
    }

    #[test]
    fn test_plan_splits_default_and_subsystems() {
        let mut cfg = default_logging_config();
        cfg.insert("backoffice".into(), section("logs/backoffice.log"));
        cfg.insert("backoffice::infra".into(), section(""));

        let plan = LogPlan::from_config(&cfg);
        assert!(plan.default.is_some());
        assert_eq!(plan.subsystems.len(), 2);
        assert_eq!(plan.subsystems[0].0, "backoffice::infra");
        assert_eq!(plan.names().len(), 2);
    }

    #[test]
    fn test_router_prefers_subsystem_file() {
        let tmp = tempdir().unwrap();
        let mut cfg = default_logging_config();
        cfg.insert("api_ingress".into(), section("logs/api.log"));

        let plan = LogPlan::from_config(&cfg);
        let router = plan.file_router(tmp.path());
        assert!(router.default.is_some());
        assert_eq!(router.by_prefix.len(), 1);
        assert!(router.resolve_for("api_ingress::request_id").is_some());
        assert!(router.resolve_for("somewhere_else").is_some());
        assert!(tmp.path().join("logs").is_dir());
    }

    #[test]
    fn test_router_without_files_drops_writes() {
        let router = FileRouter::default();
        assert!(router.resolve_for("anything").is_none());
        let mut w = MaybeWriter(None);
        assert_eq!(w.write(b"hello").unwrap(), 5);
    }

    #[test]
    fn test_file_paths_resolved_against_home_dir() {
        let tmp = tempdir().unwrap();
        let resolved = resolve_log_path("logs/test.log", tmp.path());
        assert!(resolved.starts_with(tmp.path()));
        assert!(resolved.ends_with("logs/test.log"));
    }

    #[test]
    fn test_create_rotating_writer_at_path_creates_parent() {
        let tmp = tempdir().unwrap();
        let p = tmp.path().join("nested/dir/app.log");

        let res = create_rotating_writer_at_path(&p, 128 * 1024, 2);
        assert!(res.is_ok(), "writer should be created");
        assert!(p.parent().unwrap().exists(), "parent dir must be created");
    }

    #[test]
    fn test_config_logging_integration_with_base_dir() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("test_config.yaml");

        let yaml_content = r#"
server:
  home_dir: "~/.test_backoffice"
  host: "127.0.0.1"
  port: 8088

logging:
  default:
    console_level: info
    file: ""
    file_level: debug
  backoffice:
    console_level: debug
    file: "logs/backoffice_test.log"
    file_level: warn
    max_size_mb: 5
    max_backups: 2
"#;
        fs::write(&config_path, yaml_content).unwrap();

        let config = AppConfig::load_layered(&config_path).unwrap();

        let abs = resolve_log_path("logs/backoffice_test.log", Path::new(&config.server.home_dir));
        assert!(abs.starts_with(&config.server.home_dir));
        assert!(abs.ends_with("logs/backoffice_test.log"));
        let section = &config.logging.as_ref().unwrap()["backoffice"];
        assert_eq!(section.max_backups, Some(2));
    }
}
