// === PUBLIC CONTRACT ===
// Only the contract module should be public for other modules to consume
pub mod contract;
pub use contract::{error, model};

// === MODULE DEFINITION ===
pub mod module;
pub use module::Backoffice;

// === INTERNAL MODULES ===
// Exposed for integration tests; not a stable API.
#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod config;
#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod infra;
