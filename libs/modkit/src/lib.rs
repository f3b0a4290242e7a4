//! # ModKit - module contracts and shared plumbing
//!
//! Modules implement [`Module`] plus the optional [`DbModule`] / [`RestfulModule`]
//! capabilities and are driven by a [`ModuleRegistry`] through the ordered
//! phases: init → db → rest.
//!
//! ```rust,ignore
//! let registry = ModuleRegistry::builder()
//!     .register(ModuleEntry::new("backoffice", module.clone()).with_db(module.clone()).with_rest(module))
//!     .build();
//! registry.run_init_phase(&ctx).await?;
//! registry.run_db_phase(&ctx).await?;
//! let router = registry.run_rest_phase(&ctx, Router::new())?;
//! ```

pub use anyhow::Result;
pub use async_trait::async_trait;

// Core module contracts and traits
pub mod contracts;
pub use crate::contracts::*;

pub mod context;
pub use context::{ConfigProvider, ModuleCtx, ModuleCtxBuilder};

pub mod registry;
pub use registry::{ModuleEntry, ModuleRegistry, RegistryError};

// Problem details and response bodies
pub mod api;
pub use api::problem::{Problem, ProblemResponse};

// HTTP utilities
pub mod http;
pub use http::client::TracedClient;

pub mod runtime;
pub use runtime::wait_for_shutdown;
