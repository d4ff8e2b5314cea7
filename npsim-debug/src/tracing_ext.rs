//! Tracing span helpers.
//!
//! # Spans
//!
//! - `npsim_debug.request` - Handling of one client request
//! - `npsim_debug.event` - Ingestion of one simulation event
//! - `npsim_debug.pause` - Simulation thread parked at a stop

use tracing::{debug_span, info_span, Span};

/// Span names used by the debugger.
pub mod span_names {
    pub const REQUEST: &str = "npsim_debug.request";
    pub const EVENT: &str = "npsim_debug.event";
    pub const PAUSE: &str = "npsim_debug.pause";
}

/// Create a span for handling a client request.
///
/// `resumes` marks requests whose reply waits for the next pause.
pub fn request_span(kind: &str, resumes: bool) -> Span {
    info_span!(
        target: "npsim_debug",
        "npsim_debug.request",
        request_kind = %kind,
        resumes,
        otel.name = span_names::REQUEST,
    )
}

/// Create a span for ingesting a simulation event.
pub fn event_span(kind: &str, module: &str, time: f64) -> Span {
    debug_span!(
        target: "npsim_debug",
        "npsim_debug.event",
        event_kind = %kind,
        module = %module,
        sim_time = time,
        otel.name = span_names::EVENT,
    )
}

/// Create a span covering a pause of the simulation thread.
pub fn pause_span(reason: &str) -> Span {
    info_span!(
        target: "npsim_debug",
        "npsim_debug.pause",
        pause_reason = %reason,
        otel.name = span_names::PAUSE,
    )
}
