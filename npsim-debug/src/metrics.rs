//! Metrics for the debugger backplane.
//!
//! This module provides metrics using the `metrics` crate facade. Nothing is
//! exported unless the embedding application installs a recorder.
//!
//! # Metrics
//!
//! ## Counters
//! - `npsim_debug_requests_total` - Client requests by kind
//! - `npsim_debug_breakpoint_hits_total` - Breakpoint hits, stealth or user
//! - `npsim_debug_watchpoint_hits_total` - Watchpoint hits
//! - `npsim_debug_packet_drops_total` - Dropped packets reported by the simulation
//! - `npsim_debug_errors_total` - Errors by type
//!
//! ## Histograms
//! - `npsim_debug_pause_seconds` - Wall-clock time the simulation spent paused
//!
//! ## Gauges
//! - `npsim_debug_tracked_packets` - Packets currently tracked
//! - `npsim_debug_trace_value` - Last value forwarded to each trace

use metrics::{counter, gauge, histogram};
use std::time::Instant;

/// Metric names as constants for consistency.
pub mod names {
    pub const REQUESTS_TOTAL: &str = "npsim_debug_requests_total";
    pub const BREAKPOINT_HITS_TOTAL: &str = "npsim_debug_breakpoint_hits_total";
    pub const WATCHPOINT_HITS_TOTAL: &str = "npsim_debug_watchpoint_hits_total";
    pub const PACKET_DROPS_TOTAL: &str = "npsim_debug_packet_drops_total";
    pub const ERRORS_TOTAL: &str = "npsim_debug_errors_total";
    pub const PAUSE_SECONDS: &str = "npsim_debug_pause_seconds";
    pub const TRACKED_PACKETS: &str = "npsim_debug_tracked_packets";
    pub const TRACE_VALUE: &str = "npsim_debug_trace_value";
}

/// Error type labels.
pub mod error_type {
    pub const DECODE: &str = "decode";
    pub const CONNECTION: &str = "connection";
    pub const COUNTER: &str = "counter";
    pub const INTERNAL: &str = "internal";
}

/// Record a client request.
pub fn record_request(kind: &str) {
    counter!(names::REQUESTS_TOTAL, "kind" => kind.to_string()).increment(1);
}

/// Record a breakpoint hit.
pub fn record_breakpoint_hit(stealth: bool) {
    let kind = if stealth { "stealth" } else { "user" };
    counter!(names::BREAKPOINT_HITS_TOTAL, "kind" => kind).increment(1);
}

pub fn record_watchpoint_hit() {
    counter!(names::WATCHPOINT_HITS_TOTAL).increment(1);
}

pub fn record_packet_drop(module: &str) {
    counter!(names::PACKET_DROPS_TOTAL, "module" => module.to_string()).increment(1);
}

/// Record an error occurrence.
pub fn record_error(error_type: &str) {
    counter!(names::ERRORS_TOTAL, "type" => error_type.to_string()).increment(1);
}

/// Set the number of tracked packets.
pub fn set_tracked_packets(count: usize) {
    gauge!(names::TRACKED_PACKETS).set(count as f64);
}

/// Publish the latest value of a trace.
pub fn set_trace_value(trace_id: i32, value: f64) {
    gauge!(names::TRACE_VALUE, "trace" => trace_id.to_string()).set(value);
}

/// Measures how long the simulation stays paused.
///
/// Records the elapsed time when dropped.
pub struct PauseTimer {
    start: Instant,
    reason: &'static str,
}

impl PauseTimer {
    pub fn start(reason: &'static str) -> Self {
        Self {
            start: Instant::now(),
            reason,
        }
    }

    /// Get elapsed time without recording.
    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}

impl Drop for PauseTimer {
    fn drop(&mut self) {
        histogram!(names::PAUSE_SECONDS, "reason" => self.reason)
            .record(self.start.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        // Just verify it doesn't panic
        record_request("run");
        record_breakpoint_hit(true);
        record_breakpoint_hit(false);
        record_watchpoint_hit();
        record_packet_drop("queue");
        record_error(error_type::DECODE);
    }

    #[test]
    fn test_gauges() {
        set_tracked_packets(3);
        set_trace_value(0, 12.5);
    }

    #[test]
    fn test_pause_timer() {
        let timer = PauseTimer::start("breakpoint");
        std::thread::sleep(std::time::Duration::from_millis(1));
        assert!(timer.elapsed().as_millis() >= 1);
    }
}
