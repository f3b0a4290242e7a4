//! HTTP utilities for modkit
//!
//! Outbound client wrapper plus W3C trace context helpers.

pub mod client;
pub mod simple_otel;
