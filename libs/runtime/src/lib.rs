//! Process runtime support: layered configuration and logging setup.

pub mod config;
pub mod logging;
pub mod paths;

pub use config::{
    default_logging_config, AppConfig, AppConfigProvider, CliArgs, DatabaseConfig,
    LoggingConfig, Section, ServerConfig,
};
