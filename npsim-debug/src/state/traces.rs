//! Trace triggers feeding the external plotting channel.
//!
//! Three trace flavours share one id space:
//! - counter traces forward every new counter value;
//! - latency traces measure the time between a packet being read by one
//!   module and written by another;
//! - throughput traces report the write rate of a module in packets per second.

use crate::packet::PacketId;
use std::collections::HashMap;

/// Trace identifier.
pub type TraceId = i32;

/// A value to forward to a trace.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TraceUpdate {
    pub trace_id: TraceId,
    pub value: f64,
}

#[derive(Debug, Clone)]
struct LatencyStart {
    trace_id: TraceId,
    to_module: String,
}

#[derive(Debug, Clone, Copy)]
struct PendingLatency {
    trace_id: TraceId,
    read_time: f64,
}

#[derive(Debug, Clone, Copy)]
struct Throughput {
    trace_id: TraceId,
    last_write: Option<f64>,
}

/// Bookkeeping for all registered traces.
#[derive(Debug, Default)]
pub(crate) struct TraceTriggers {
    counters: HashMap<String, TraceId>,
    /// From-module -> latency traces starting there.
    latency_starts: HashMap<String, Vec<LatencyStart>>,
    /// To-module -> packet -> measurements waiting for the write.
    latency_pending: HashMap<String, HashMap<PacketId, Vec<PendingLatency>>>,
    throughput: HashMap<String, Throughput>,
}

impl TraceTriggers {
    pub fn counter_trace(&self, counter: &str) -> Option<TraceId> {
        self.counters.get(counter).copied()
    }

    pub fn has_counter_trace(&self, counter: &str) -> bool {
        self.counters.contains_key(counter)
    }

    pub fn add_counter_trace(&mut self, counter: &str, trace_id: TraceId) {
        self.counters.insert(counter.to_string(), trace_id);
    }

    pub fn add_latency_trace(&mut self, from_module: &str, to_module: &str, trace_id: TraceId) {
        self.latency_starts
            .entry(from_module.to_string())
            .or_default()
            .push(LatencyStart {
                trace_id,
                to_module: to_module.to_string(),
            });
    }

    pub fn add_throughput_trace(&mut self, module: &str, trace_id: TraceId) {
        self.throughput.insert(
            module.to_string(),
            Throughput {
                trace_id,
                last_write: None,
            },
        );
    }

    /// A packet was read by `module`: arm the latency traces starting there.
    pub fn on_read(&mut self, module: &str, packet_id: PacketId, time: f64) {
        let Some(starts) = self.latency_starts.get(module) else {
            return;
        };

        for start in starts {
            self.latency_pending
                .entry(start.to_module.clone())
                .or_default()
                .entry(packet_id)
                .or_default()
                .push(PendingLatency {
                    trace_id: start.trace_id,
                    read_time: time,
                });
        }
    }

    /// Drop every latency measurement still waiting on `packet_id`.
    pub fn forget_packet(&mut self, packet_id: PacketId) {
        self.latency_pending.retain(|_, packets| {
            packets.remove(&packet_id);
            !packets.is_empty()
        });
    }

    /// A packet was written by `module`: complete latency measurements and
    /// update the module's throughput.
    pub fn on_write(&mut self, module: &str, packet_id: PacketId, time: f64) -> Vec<TraceUpdate> {
        let mut updates = Vec::new();

        if let Some(pending) = self
            .latency_pending
            .get_mut(module)
            .and_then(|packets| packets.remove(&packet_id))
        {
            updates.extend(pending.into_iter().map(|p| TraceUpdate {
                trace_id: p.trace_id,
                value: time - p.read_time,
            }));
        }

        if let Some(throughput) = self.throughput.get_mut(module) {
            if let Some(last) = throughput.last_write {
                let delta = time - last;
                if delta > 0.0 {
                    updates.push(TraceUpdate {
                        trace_id: throughput.trace_id,
                        value: 1e9 / delta,
                    });
                }
            }
            throughput.last_write = Some(time);
        }

        updates
    }
}
