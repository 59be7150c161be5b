//! Metrics hooks.
//!
//! Plain `tracing` events; a binary wires them to whatever collector it uses.

pub fn emit_span(event: &str, key_values: &[(&str, String)]) {
    let span = tracing::trace_span!("olapq", event);
    let _entered = span.enter();
    for (k, v) in key_values {
        tracing::trace!(%event, %k, %v, "metric");
    }
}
