//! Simulation event ingestion.
//!
//! [`DebugObserver::observe`] is the single entry point through which the
//! simulation kernel reports events. Each event updates the [`DebugState`]
//! first, then the clock, then stop conditions are evaluated, and only then
//! may the simulation thread be parked.

use crate::breakpoint::PacketAccess;
use crate::error::Result;
use crate::metrics;
use crate::packet::Payload;
use crate::protocol::Reply;
use crate::rendezvous::Rendezvous;
use crate::state::{DebugState, TraceId, TraceUpdate};
use crate::tracing_ext;
use std::fmt;
use std::sync::Arc;

/// An event reported by the simulation kernel.
///
/// `time` is the simulated time of the event in nanoseconds.
#[derive(Clone)]
pub enum SimEvent {
    CounterAdded {
        module: String,
        counter: String,
        time: f64,
    },
    CounterRemoved {
        module: String,
        counter: String,
        time: f64,
    },
    CounterUpdated {
        module: String,
        counter: String,
        value: i64,
        time: f64,
    },
    /// `module` wrote the payload out.
    DataWritten {
        module: String,
        payload: Arc<dyn Payload>,
        time: f64,
    },
    /// `module` read the payload in.
    DataRead {
        module: String,
        payload: Arc<dyn Payload>,
        time: f64,
    },
    DataDropped {
        module: String,
        payload: Arc<dyn Payload>,
        reason: String,
        time: f64,
    },
    ThreadBegin {
        module: String,
        thread_id: usize,
        packet_id: u64,
        time: f64,
    },
    ThreadEnd {
        module: String,
        thread_id: usize,
        packet_id: u64,
        time: f64,
    },
    ThreadIdle {
        module: String,
        thread_id: usize,
        time: f64,
    },
    CoreBusy {
        module: String,
        time: f64,
    },
    CoreIdle {
        module: String,
        time: f64,
    },
}

impl SimEvent {
    /// Event name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            SimEvent::CounterAdded { .. } => "counter_added",
            SimEvent::CounterRemoved { .. } => "counter_removed",
            SimEvent::CounterUpdated { .. } => "counter_updated",
            SimEvent::DataWritten { .. } => "data_written",
            SimEvent::DataRead { .. } => "data_read",
            SimEvent::DataDropped { .. } => "data_dropped",
            SimEvent::ThreadBegin { .. } => "thread_begin",
            SimEvent::ThreadEnd { .. } => "thread_end",
            SimEvent::ThreadIdle { .. } => "thread_idle",
            SimEvent::CoreBusy { .. } => "core_busy",
            SimEvent::CoreIdle { .. } => "core_idle",
        }
    }

    /// Module that reported the event.
    pub fn module(&self) -> &str {
        match self {
            SimEvent::CounterAdded { module, .. }
            | SimEvent::CounterRemoved { module, .. }
            | SimEvent::CounterUpdated { module, .. }
            | SimEvent::DataWritten { module, .. }
            | SimEvent::DataRead { module, .. }
            | SimEvent::DataDropped { module, .. }
            | SimEvent::ThreadBegin { module, .. }
            | SimEvent::ThreadEnd { module, .. }
            | SimEvent::ThreadIdle { module, .. }
            | SimEvent::CoreBusy { module, .. }
            | SimEvent::CoreIdle { module, .. } => module,
        }
    }

    pub fn time(&self) -> f64 {
        match self {
            SimEvent::CounterAdded { time, .. }
            | SimEvent::CounterRemoved { time, .. }
            | SimEvent::CounterUpdated { time, .. }
            | SimEvent::DataWritten { time, .. }
            | SimEvent::DataRead { time, .. }
            | SimEvent::DataDropped { time, .. }
            | SimEvent::ThreadBegin { time, .. }
            | SimEvent::ThreadEnd { time, .. }
            | SimEvent::ThreadIdle { time, .. }
            | SimEvent::CoreBusy { time, .. }
            | SimEvent::CoreIdle { time, .. } => *time,
        }
    }
}

impl fmt::Debug for SimEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimEvent")
            .field("kind", &self.kind())
            .field("module", &self.module())
            .field("time", &self.time())
            .finish()
    }
}

/// Receiver of trace values (counter, latency and throughput traces).
pub trait TraceSink: Send + Sync {
    fn update(&self, trace_id: TraceId, value: f64);
}

/// Writes trace values to the log.
#[derive(Debug, Default)]
pub struct LogTraceSink;

impl TraceSink for LogTraceSink {
    fn update(&self, trace_id: TraceId, value: f64) {
        tracing::debug!("Trace {} = {}", trace_id, value);
    }
}

/// Publishes trace values as a gauge labelled with the trace id.
#[derive(Debug, Default)]
pub struct MetricsTraceSink;

impl TraceSink for MetricsTraceSink {
    fn update(&self, trace_id: TraceId, value: f64) {
        metrics::set_trace_value(trace_id, value);
    }
}

/// Turns simulation events into debug-state updates and pauses.
pub struct DebugObserver {
    state: Arc<DebugState>,
    rendezvous: Arc<Rendezvous>,
    trace_sink: Arc<dyn TraceSink>,
}

impl DebugObserver {
    pub fn new(state: Arc<DebugState>, rendezvous: Arc<Rendezvous>) -> Self {
        Self {
            state,
            rendezvous,
            trace_sink: Arc::new(LogTraceSink),
        }
    }

    /// Send trace values to `sink` instead of the log.
    pub fn with_trace_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.trace_sink = sink;
        self
    }

    pub fn state(&self) -> &Arc<DebugState> {
        &self.state
    }

    /// Ingest one simulation event. May park the calling thread.
    ///
    /// Fails only when a counter is updated before it was added.
    pub fn observe(&self, event: SimEvent) -> Result<()> {
        let _span = tracing_ext::event_span(event.kind(), event.module(), event.time()).entered();

        match event {
            SimEvent::CounterAdded { counter, time, .. } => {
                self.state.add_counter(&counter);
                self.state.set_simulation_time(time);
            }
            SimEvent::CounterRemoved { counter, time, .. } => {
                self.state.remove_counter(&counter);
                self.state.set_simulation_time(time);
            }
            SimEvent::CounterUpdated {
                counter,
                value,
                time,
                ..
            } => self.counter_updated(&counter, value, time)?,
            SimEvent::DataWritten {
                module,
                payload,
                time,
            } => self.data_accessed(&module, payload.as_ref(), time, false),
            SimEvent::DataRead {
                module,
                payload,
                time,
            } => self.data_accessed(&module, payload.as_ref(), time, true),
            SimEvent::DataDropped {
                module,
                payload,
                reason,
                time,
            } => self.data_dropped(&module, payload.as_ref(), &reason, time),
            SimEvent::ThreadBegin { time, .. }
            | SimEvent::ThreadEnd { time, .. }
            | SimEvent::ThreadIdle { time, .. }
            | SimEvent::CoreBusy { time, .. }
            | SimEvent::CoreIdle { time, .. } => {
                self.state.set_simulation_time(time);
            }
        }

        Ok(())
    }

    fn counter_updated(&self, counter: &str, value: i64, time: f64) -> Result<()> {
        let old_value = self.state.counter_value(counter).unwrap_or(0);

        if let Some(trace_id) = self.state.counter_trace_id(counter) {
            self.trace_sink.update(trace_id, value as f64);
        }

        if let Err(e) = self.state.update_counter(counter, value) {
            tracing::error!("Counter update rejected: {}", e);
            metrics::record_error(metrics::error_type::COUNTER);
            return Err(e);
        }
        self.state.set_simulation_time(time);

        // Each watchpoint pauses on its own
        for wp in self.state.watchpoints_firing_on(counter) {
            metrics::record_watchpoint_hit();
            self.rendezvous.park(Reply::WatchpointHit {
                id: wp.id(),
                counter: counter.to_string(),
                old_value,
                new_value: value,
            });
        }

        Ok(())
    }

    fn data_accessed(&self, module: &str, payload: &dyn Payload, time: f64, read: bool) {
        if !payload.is_debuggable() {
            return;
        }

        let packet_id = payload.id();
        tracing::debug!(
            "{} {} packet {} ({}) @ {}",
            module,
            if read { "read" } else { "wrote" },
            packet_id,
            payload.data_type(),
            time
        );

        self.state.set_simulation_time(time);
        let updates = self
            .state
            .update_packet(packet_id, payload.debug_info(), module, time, read);
        self.forward(&updates);

        if self.state.is_ignored(module) {
            return;
        }

        let access = PacketAccess {
            module,
            packet_id,
            time,
            read,
        };

        let Some(hit) = self.state.check_breakpoints(&access) else {
            return;
        };

        metrics::record_breakpoint_hit(hit.is_stealth());
        let reply = if hit.is_stealth() {
            Reply::SimulationStopped {
                module: module.to_string(),
                packet_id,
                time,
                read,
            }
        } else {
            Reply::BreakpointHit {
                id: hit.id(),
                module: module.to_string(),
                packet_id,
                time,
                read,
            }
        };

        self.rendezvous.park(reply);
    }

    fn data_dropped(&self, module: &str, payload: &dyn Payload, reason: &str, time: f64) {
        if !payload.is_debuggable() {
            return;
        }

        let packet_id = payload.id();
        self.state.set_simulation_time(time);
        self.state.add_dropped_packet(packet_id, module, reason);
        metrics::record_packet_drop(module);

        if self.state.break_on_drop() {
            self.rendezvous.park(Reply::PacketDropped {
                packet_id,
                module: module.to_string(),
                reason: reason.to_string(),
            });
        }
    }

    fn forward(&self, updates: &[TraceUpdate]) {
        for update in updates {
            self.trace_sink.update(update.trace_id, update.value);
        }
    }
}
