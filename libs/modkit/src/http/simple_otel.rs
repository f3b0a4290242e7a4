//! Minimal W3C trace context helpers.
//!
//! Trace propagation is done with manual header manipulation; no
//! OpenTelemetry SDK is wired into the server.

use http::{HeaderMap, HeaderName, HeaderValue};
use tracing::Span;

/// W3C Trace Context header name
pub const TRACEPARENT: &str = "traceparent";

/// Write a fresh sampled `traceparent` header.
pub fn inject_trace_context(headers: &mut HeaderMap, _span: &Span) {
    let span_id = format!("{:016x}", rand::random::<u64>());
    let trace_id = format!("{:032x}", rand::random::<u128>());
    let traceparent = format!("00-{trace_id}-{span_id}-01");

    if let Ok(header_value) = HeaderValue::from_str(&traceparent) {
        headers.insert(HeaderName::from_static(TRACEPARENT), header_value);
    }
}

/// Trace id segment of a version-00 `traceparent`.
pub fn parse_trace_id(traceparent: &str) -> Option<String> {
    let parts: Vec<&str> = traceparent.split('-').collect();
    if parts.len() >= 4 && parts[0] == "00" {
        Some(parts[1].to_string())
    } else {
        None
    }
}
