//! Debug state shared by the simulation thread and the command thread.
//!
//! Every accessor takes the store's single lock for exactly one logical
//! operation. Queries return owned snapshots so nothing borrowed from the
//! store crosses the thread boundary.

mod traces;

pub use traces::{TraceId, TraceUpdate};

use crate::breakpoint::{Breakpoint, BreakpointId, IdAllocator, PacketAccess};
use crate::control_plane::{EntryHandle, TableEntry, TableShadow};
use crate::error::{DebugError, Result};
use crate::metrics;
use crate::packet::{
    DebugInfo, DroppedPacket, Header, PacketId, PacketLocation, PacketSummary, TrackedPacket,
};
use crate::watchpoint::{Watchpoint, WatchpointId};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use traces::TraceTriggers;

#[derive(Debug, Default)]
struct StateInner {
    counters: BTreeMap<String, i64>,
    traces: TraceTriggers,
    breakpoints: Vec<Breakpoint>,
    watchpoints: Vec<Watchpoint>,
    packets: BTreeMap<PacketId, TrackedPacket>,
    dropped: Vec<DroppedPacket>,
    ignored_modules: Vec<String>,
    whoami: Option<PacketId>,
    break_on_drop: bool,
    simulation_time: f64,
    tables: TableShadow,
}

/// Thread-safe store of everything the debugger knows about the simulation.
#[derive(Debug, Default)]
pub struct DebugState {
    inner: Mutex<StateInner>,
    breakpoint_ids: IdAllocator,
    watchpoint_ids: IdAllocator,
    trace_ids: IdAllocator,
}

impl DebugState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose breakpoint and watchpoint ids start at the given values.
    pub fn with_id_seeds(first_breakpoint: BreakpointId, first_watchpoint: WatchpointId) -> Self {
        Self {
            breakpoint_ids: IdAllocator::starting_at(first_breakpoint),
            watchpoint_ids: IdAllocator::starting_at(first_watchpoint),
            ..Self::default()
        }
    }

    // ========== Counters ==========

    /// Add a counter with value zero. An existing counter keeps its value.
    pub fn add_counter(&self, name: &str) {
        self.inner
            .lock()
            .counters
            .entry(name.to_string())
            .or_insert(0);
    }

    pub fn remove_counter(&self, name: &str) {
        self.inner.lock().counters.remove(name);
    }

    /// Set a counter's value. The counter must exist.
    pub fn update_counter(&self, name: &str, value: i64) -> Result<()> {
        let mut inner = self.inner.lock();
        match inner.counters.get_mut(name) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(DebugError::CounterNotFound(name.to_string())),
        }
    }

    pub fn counter_value(&self, name: &str) -> Option<i64> {
        self.inner.lock().counters.get(name).copied()
    }

    /// All counters ordered by name.
    pub fn counters(&self) -> Vec<(String, i64)> {
        self.inner
            .lock()
            .counters
            .iter()
            .map(|(name, value)| (name.clone(), *value))
            .collect()
    }

    // ========== Traces ==========

    /// Attach a trace to a counter.
    ///
    /// Fails with [`DebugError::CounterNotFound`] for unknown counters and
    /// [`DebugError::AlreadyTraced`] if the counter already has a trace.
    pub fn add_counter_trace(&self, name: &str) -> Result<TraceId> {
        let mut inner = self.inner.lock();

        if !inner.counters.contains_key(name) {
            return Err(DebugError::CounterNotFound(name.to_string()));
        }

        if inner.traces.has_counter_trace(name) {
            return Err(DebugError::AlreadyTraced(name.to_string()));
        }

        let id = self.trace_ids.next_id();
        inner.traces.add_counter_trace(name, id);
        Ok(id)
    }

    pub fn counter_trace_id(&self, name: &str) -> Option<TraceId> {
        self.inner.lock().traces.counter_trace(name)
    }

    /// Trace the time packets take from being read by `from_module` to being
    /// written by `to_module`.
    pub fn add_latency_trace(&self, from_module: &str, to_module: &str) -> TraceId {
        let mut inner = self.inner.lock();
        let id = self.trace_ids.next_id();
        inner.traces.add_latency_trace(from_module, to_module, id);
        id
    }

    /// Trace the rate at which `module` writes packets.
    pub fn add_throughput_trace(&self, module: &str) -> TraceId {
        let mut inner = self.inner.lock();
        let id = self.trace_ids.next_id();
        inner.traces.add_throughput_trace(module, id);
        id
    }

    // ========== Breakpoints ==========

    /// Fresh user breakpoint carrying the next id.
    pub fn new_breakpoint(&self) -> Breakpoint {
        Breakpoint::new(self.breakpoint_ids.next_id())
    }

    /// Add a breakpoint unless an equivalent one already exists.
    ///
    /// Returns whether the breakpoint was stored.
    pub fn add_breakpoint(&self, breakpoint: Breakpoint) -> bool {
        let mut inner = self.inner.lock();

        if inner
            .breakpoints
            .iter()
            .any(|existing| breakpoint.is_equivalent(existing))
        {
            tracing::debug!("Breakpoint {} duplicates an existing one", breakpoint.id());
            return false;
        }

        tracing::debug!(
            "Breakpoint {} added with {} condition(s)",
            breakpoint.id(),
            breakpoint.conditions().len()
        );
        inner.breakpoints.push(breakpoint);
        true
    }

    pub fn remove_breakpoint(&self, id: BreakpointId) {
        let mut inner = self.inner.lock();
        if let Some(index) = inner.breakpoints.iter().position(|bp| bp.id() == id) {
            inner.breakpoints.remove(index);
        }
    }

    /// Drop every stealth breakpoint.
    pub fn remove_stealth_breakpoints(&self) {
        self.inner
            .lock()
            .breakpoints
            .retain(|bp| !bp.is_stealth());
    }

    pub fn enable_breakpoint(&self, id: BreakpointId) {
        self.set_breakpoint_disabled(id, false);
    }

    pub fn disable_breakpoint(&self, id: BreakpointId) {
        self.set_breakpoint_disabled(id, true);
    }

    fn set_breakpoint_disabled(&self, id: BreakpointId, disabled: bool) {
        let mut inner = self.inner.lock();
        if let Some(bp) = inner.breakpoints.iter_mut().find(|bp| bp.id() == id) {
            bp.disabled = disabled;
        }
    }

    /// All breakpoints in insertion order, stealth ones included.
    pub fn breakpoints(&self) -> Vec<Breakpoint> {
        self.inner.lock().breakpoints.clone()
    }

    /// Breakpoints the client is allowed to see.
    pub fn user_breakpoints(&self) -> Vec<Breakpoint> {
        self.inner
            .lock()
            .breakpoints
            .iter()
            .filter(|bp| !bp.is_stealth())
            .cloned()
            .collect()
    }

    /// Find the first enabled breakpoint matching `access`.
    ///
    /// On a hit the access's packet becomes the focused packet, and a
    /// temporary user breakpoint is removed. Stealth breakpoints are left for
    /// their creator to remove.
    pub fn check_breakpoints(&self, access: &PacketAccess<'_>) -> Option<Breakpoint> {
        let mut inner = self.inner.lock();
        let now = inner.simulation_time;

        let index = inner
            .breakpoints
            .iter()
            .position(|bp| !bp.disabled && bp.matches(access, now))?;

        inner.whoami = Some(access.packet_id);

        let hit = if inner.breakpoints[index].temporary && !inner.breakpoints[index].is_stealth() {
            inner.breakpoints.remove(index)
        } else {
            inner.breakpoints[index].clone()
        };

        Some(hit)
    }

    // ========== Watchpoints ==========

    /// Fresh watchpoint on `counter` carrying the next id.
    pub fn new_watchpoint(&self, counter: &str) -> Watchpoint {
        Watchpoint::new(self.watchpoint_ids.next_id(), counter)
    }

    /// Add a watchpoint unless its counter is already watched.
    ///
    /// Returns whether the watchpoint was stored.
    pub fn add_watchpoint(&self, watchpoint: Watchpoint) -> bool {
        let mut inner = self.inner.lock();

        if inner
            .watchpoints
            .iter()
            .any(|wp| wp.counter() == watchpoint.counter())
        {
            return false;
        }

        inner.watchpoints.push(watchpoint);
        true
    }

    pub fn remove_watchpoint(&self, id: WatchpointId) {
        let mut inner = self.inner.lock();
        if let Some(index) = inner.watchpoints.iter().position(|wp| wp.id() == id) {
            inner.watchpoints.remove(index);
        }
    }

    pub fn enable_watchpoint(&self, id: WatchpointId) {
        self.set_watchpoint_disabled(id, false);
    }

    pub fn disable_watchpoint(&self, id: WatchpointId) {
        self.set_watchpoint_disabled(id, true);
    }

    fn set_watchpoint_disabled(&self, id: WatchpointId, disabled: bool) {
        let mut inner = self.inner.lock();
        if let Some(wp) = inner.watchpoints.iter_mut().find(|wp| wp.id() == id) {
            wp.disabled = disabled;
        }
    }

    pub fn watchpoints(&self) -> Vec<Watchpoint> {
        self.inner.lock().watchpoints.clone()
    }

    /// Enabled watchpoints on `counter`.
    pub fn watchpoints_firing_on(&self, counter: &str) -> Vec<Watchpoint> {
        self.inner
            .lock()
            .watchpoints
            .iter()
            .filter(|wp| wp.fires_on(counter))
            .cloned()
            .collect()
    }

    // ========== Packets ==========

    /// Record a packet being read (`read == true`) or written by `module`.
    ///
    /// Creates the packet on first sight and always refreshes its debug-info
    /// snapshot. Returns the trace values produced by the access.
    pub fn update_packet(
        &self,
        id: PacketId,
        debug_info: Option<Arc<dyn DebugInfo>>,
        module: &str,
        time: f64,
        read: bool,
    ) -> Vec<TraceUpdate> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let packet = inner
            .packets
            .entry(id)
            .or_insert_with(|| TrackedPacket::new(id, module, time));
        packet.set_debug_info(debug_info);

        let updates = if read {
            packet.enter(module, time);
            inner.traces.on_read(module, id, time);
            Vec::new()
        } else {
            packet.leave(module, time);
            inner.traces.on_write(module, id, time)
        };

        metrics::set_tracked_packets(inner.packets.len());
        updates
    }

    /// Forget a packet that left the simulation.
    pub fn remove_packet(&self, id: PacketId) {
        let mut inner = self.inner.lock();
        inner.packets.remove(&id);
        inner.traces.forget_packet(id);
        metrics::set_tracked_packets(inner.packets.len());
    }

    pub fn packet(&self, id: PacketId) -> Option<TrackedPacket> {
        self.inner.lock().packets.get(&id).cloned()
    }

    /// Summaries of tracked packets, ordered by id.
    ///
    /// Only packets located in `module` (when given) and not in an ignored
    /// module are listed.
    pub fn packet_list(&self, module: Option<&str>) -> Vec<PacketSummary> {
        let inner = self.inner.lock();
        inner
            .packets
            .values()
            .filter(|pk| module.map_or(true, |m| pk.location() == m))
            .filter(|pk| !inner.ignored_modules.iter().any(|m| m == pk.location()))
            .map(TrackedPacket::summary)
            .collect()
    }

    /// The packet's visits in order, or `None` if the packet is unknown.
    pub fn backtrace(&self, id: PacketId) -> Option<Vec<PacketLocation>> {
        self.inner
            .lock()
            .packets
            .get(&id)
            .map(|pk| pk.trace().to_vec())
    }

    /// Parsed headers of a tracked packet whose debug info is still valid.
    pub fn parsed_packet(&self, id: PacketId) -> Option<Vec<Header>> {
        let info = self
            .inner
            .lock()
            .packets
            .get(&id)
            .and_then(|pk| pk.debug_info().cloned())?;

        // The snapshot belongs to the simulator; read it outside the lock.
        Some(info.headers())
    }

    // ========== Focus ==========

    /// Packet the relative commands (`next`, default `backtrace`) refer to.
    pub fn whoami(&self) -> Option<PacketId> {
        self.inner.lock().whoami
    }

    pub fn set_whoami(&self, id: PacketId) {
        self.inner.lock().whoami = Some(id);
    }

    // ========== Ignored modules ==========

    pub fn add_ignore_module(&self, module: &str) {
        let mut inner = self.inner.lock();
        if !inner.ignored_modules.iter().any(|m| m == module) {
            inner.ignored_modules.push(module.to_string());
        }
    }

    pub fn remove_ignore_module(&self, module: &str) {
        self.inner.lock().ignored_modules.retain(|m| m != module);
    }

    pub fn is_ignored(&self, module: &str) -> bool {
        self.inner.lock().ignored_modules.iter().any(|m| m == module)
    }

    pub fn ignored_modules(&self) -> Vec<String> {
        self.inner.lock().ignored_modules.clone()
    }

    // ========== Dropped packets ==========

    pub fn add_dropped_packet(&self, id: PacketId, module: &str, reason: &str) {
        self.inner.lock().dropped.push(DroppedPacket {
            id,
            module: module.to_string(),
            reason: reason.to_string(),
        });
    }

    /// The drop log in the order drops were reported.
    pub fn dropped_packets(&self) -> Vec<DroppedPacket> {
        self.inner.lock().dropped.clone()
    }

    pub fn break_on_drop(&self) -> bool {
        self.inner.lock().break_on_drop
    }

    pub fn set_break_on_drop(&self, on: bool) {
        self.inner.lock().break_on_drop = on;
    }

    // ========== Simulation clock ==========

    pub fn simulation_time(&self) -> f64 {
        self.inner.lock().simulation_time
    }

    /// Advance the clock to `time_ns` if it is later than the current time.
    ///
    /// Returns the clock after the update.
    pub fn set_simulation_time(&self, time_ns: f64) -> f64 {
        let mut inner = self.inner.lock();
        if time_ns > inner.simulation_time {
            inner.simulation_time = time_ns;
        }
        inner.simulation_time
    }

    // ========== Control-plane shadow ==========

    pub fn add_table_entry(
        &self,
        table_name: &str,
        match_key: &str,
        action_name: &str,
        action_data: Vec<String>,
        handle: Option<EntryHandle>,
    ) {
        self.inner
            .lock()
            .tables
            .add_entry(table_name, match_key, action_name, action_data, handle);
    }

    pub fn update_handle(
        &self,
        table_name: &str,
        match_key: &str,
        action_name: &str,
        handle: EntryHandle,
    ) {
        self.inner
            .lock()
            .tables
            .update_handle(table_name, match_key, action_name, handle);
    }

    pub fn update_table_entry(
        &self,
        table_name: &str,
        handle: EntryHandle,
        action_name: &str,
        action_data: Vec<String>,
    ) {
        self.inner
            .lock()
            .tables
            .update_entry(table_name, handle, action_name, action_data);
    }

    pub fn delete_table_entry(&self, table_name: &str, handle: EntryHandle) {
        self.inner.lock().tables.delete_entry(table_name, handle);
    }

    pub fn confirm_update_entry(&self, table_name: &str, handle: EntryHandle) {
        self.inner.lock().tables.confirm_update(table_name, handle);
    }

    pub fn confirm_delete_entry(&self, table_name: &str, handle: EntryHandle) {
        self.inner.lock().tables.confirm_delete(table_name, handle);
    }

    pub fn table_entries(&self) -> Vec<TableEntry> {
        self.inner.lock().tables.entries()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakpoint::Condition;
    use crate::control_plane::TableEntryStatus;

    fn access(module: &str, packet_id: PacketId, read: bool) -> PacketAccess<'_> {
        PacketAccess {
            module,
            packet_id,
            time: 0.0,
            read,
        }
    }

    #[test]
    fn test_counter_lifecycle() {
        let state = DebugState::new();
        assert_eq!(state.counter_value("c"), None);

        state.add_counter("c");
        assert_eq!(state.counter_value("c"), Some(0));

        state.update_counter("c", 5).unwrap();
        state.update_counter("c", 9).unwrap();
        assert_eq!(state.counter_value("c"), Some(9));

        state.remove_counter("c");
        assert_eq!(state.counter_value("c"), None);
    }

    #[test]
    fn test_update_missing_counter_fails() {
        let state = DebugState::new();
        let result = state.update_counter("ghost", 1);
        assert!(matches!(result, Err(DebugError::CounterNotFound(name)) if name == "ghost"));
    }

    #[test]
    fn test_counters_sorted_by_name() {
        let state = DebugState::new();
        state.add_counter("b");
        state.add_counter("a");
        state.update_counter("b", 2).unwrap();

        assert_eq!(
            state.counters(),
            vec![("a".to_string(), 0), ("b".to_string(), 2)]
        );
    }

    #[test]
    fn test_counter_trace() {
        let state = DebugState::new();
        assert!(matches!(
            state.add_counter_trace("c"),
            Err(DebugError::CounterNotFound(_))
        ));

        state.add_counter("c");
        let id = state.add_counter_trace("c").unwrap();
        assert_eq!(state.counter_trace_id("c"), Some(id));

        assert!(matches!(
            state.add_counter_trace("c"),
            Err(DebugError::AlreadyTraced(_))
        ));
    }

    #[test]
    fn test_trace_ids_are_shared() {
        let state = DebugState::new();
        state.add_counter("c");
        let a = state.add_counter_trace("c").unwrap();
        let b = state.add_latency_trace("x", "y");
        let c = state.add_throughput_trace("y");
        assert_eq!((a, b, c), (0, 1, 2));
    }

    #[test]
    fn test_breakpoint_dedup() {
        let state = DebugState::new();
        let first = state
            .new_breakpoint()
            .with_condition(Condition::module_read("parser"));
        let second = state
            .new_breakpoint()
            .with_condition(Condition::module_read("parser"));

        assert!(state.add_breakpoint(first));
        assert!(!state.add_breakpoint(second));
        assert_eq!(state.breakpoints().len(), 1);
    }

    #[test]
    fn test_breakpoint_enable_disable_remove() {
        let state = DebugState::new();
        let bp = state
            .new_breakpoint()
            .with_condition(Condition::module_read("parser"));
        let id = bp.id();
        state.add_breakpoint(bp);

        state.disable_breakpoint(id);
        assert!(state.breakpoints()[0].disabled);
        assert!(state.check_breakpoints(&access("parser", 1, true)).is_none());

        state.enable_breakpoint(id);
        assert_eq!(
            state.check_breakpoints(&access("parser", 1, true)).map(|bp| bp.id()),
            Some(id)
        );

        state.remove_breakpoint(99);
        assert_eq!(state.breakpoints().len(), 1);
        state.remove_breakpoint(id);
        assert!(state.breakpoints().is_empty());
    }

    #[test]
    fn test_first_matching_breakpoint_wins() {
        let state = DebugState::new();
        let first = state
            .new_breakpoint()
            .with_condition(Condition::module_read("parser"));
        let second = state
            .new_breakpoint()
            .with_condition(Condition::packet_id(3));
        let first_id = first.id();
        state.add_breakpoint(first);
        state.add_breakpoint(second);

        let hit = state.check_breakpoints(&access("parser", 3, true)).unwrap();
        assert_eq!(hit.id(), first_id);
        assert_eq!(state.whoami(), Some(3));
    }

    #[test]
    fn test_temporary_breakpoint_removed_on_hit() {
        let state = DebugState::new();
        let bp = state
            .new_breakpoint()
            .with_condition(Condition::module_write("queue"))
            .temporary(true);
        state.add_breakpoint(bp);

        assert!(state.check_breakpoints(&access("queue", 1, false)).is_some());
        assert!(state.breakpoints().is_empty());
        assert!(state.check_breakpoints(&access("queue", 1, false)).is_none());
    }

    #[test]
    fn test_stealth_breakpoint_survives_hit() {
        let state = DebugState::new();
        state.add_breakpoint(
            Breakpoint::stealth()
                .with_condition(Condition::packet_id(5))
                .temporary(true),
        );

        let hit = state.check_breakpoints(&access("m", 5, true)).unwrap();
        assert!(hit.is_stealth());
        assert_eq!(state.breakpoints().len(), 1);
        assert!(state.user_breakpoints().is_empty());

        state.remove_stealth_breakpoints();
        assert!(state.breakpoints().is_empty());
    }

    #[test]
    fn test_at_time_uses_store_clock() {
        let state = DebugState::new();
        state.add_breakpoint(
            state
                .new_breakpoint()
                .with_condition(Condition::at_time(100.0)),
        );

        assert!(state.check_breakpoints(&access("m", 1, true)).is_none());
        state.set_simulation_time(100.0);
        assert!(state.check_breakpoints(&access("m", 1, true)).is_some());
    }

    #[test]
    fn test_watchpoint_dedup_by_counter() {
        let state = DebugState::new();
        let first = state.new_watchpoint("c");
        let first_id = first.id();
        assert!(state.add_watchpoint(first));
        assert!(!state.add_watchpoint(state.new_watchpoint("c")));

        let wps = state.watchpoints();
        assert_eq!(wps.len(), 1);
        assert_eq!(wps[0].id(), first_id);
    }

    #[test]
    fn test_watchpoints_firing_on() {
        let state = DebugState::new();
        let wp = state.new_watchpoint("c");
        let id = wp.id();
        state.add_watchpoint(wp);
        state.add_watchpoint(state.new_watchpoint("d"));

        assert_eq!(state.watchpoints_firing_on("c").len(), 1);

        state.disable_watchpoint(id);
        assert!(state.watchpoints_firing_on("c").is_empty());

        state.enable_watchpoint(id);
        assert_eq!(state.watchpoints_firing_on("c").len(), 1);

        state.remove_watchpoint(id);
        assert!(state.watchpoints_firing_on("c").is_empty());
        assert_eq!(state.watchpoints().len(), 1);
    }

    #[test]
    fn test_seeded_ids() {
        let state = DebugState::with_id_seeds(100, 200);
        assert_eq!(state.new_breakpoint().id(), 100);
        assert_eq!(state.new_watchpoint("c").id(), 200);
    }

    #[test]
    fn test_packet_trace_round_trip() {
        let state = DebugState::new();
        state.update_packet(42, None, "parser", 10.0, true);
        state.update_packet(42, None, "parser", 20.0, false);

        assert_eq!(
            state.backtrace(42).unwrap(),
            vec![PacketLocation {
                module: "parser".into(),
                read_time: Some(10.0),
                write_time: Some(20.0),
            }]
        );

        state.update_packet(42, None, "parser", 30.0, true);
        assert_eq!(state.backtrace(42).unwrap().len(), 2);

        state.remove_packet(42);
        assert!(state.backtrace(42).is_none());
    }

    #[test]
    fn test_packet_list_filters() {
        let state = DebugState::new();
        state.update_packet(1, None, "parser", 1.0, true);
        state.update_packet(2, None, "queue", 2.0, true);
        state.update_packet(3, None, "queue", 3.0, true);

        assert_eq!(state.packet_list(None).len(), 3);

        let in_queue: Vec<_> = state
            .packet_list(Some("queue"))
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(in_queue, vec![2, 3]);

        state.add_ignore_module("queue");
        let visible: Vec<_> = state.packet_list(None).into_iter().map(|p| p.id).collect();
        assert_eq!(visible, vec![1]);
    }

    #[test]
    fn test_write_produces_trace_updates() {
        let state = DebugState::new();
        let trace = state.add_latency_trace("in", "out");
        state.update_packet(1, None, "in", 10.0, true);

        let updates = state.update_packet(1, None, "out", 40.0, false);
        assert_eq!(updates, vec![TraceUpdate { trace_id: trace, value: 30.0 }]);
    }

    #[test]
    fn test_reused_packet_id_starts_fresh_latency() {
        let state = DebugState::new();
        state.add_latency_trace("parser", "deparser");
        state.update_packet(1, None, "parser", 10.0, true);
        state.remove_packet(1);

        // Same id, new packet that never went through the parser
        state.update_packet(1, None, "queue", 100.0, true);
        let updates = state.update_packet(1, None, "deparser", 110.0, false);
        assert!(updates.is_empty());
        assert_eq!(state.backtrace(1).map(|trace| trace.len()), Some(2));
    }

    #[test]
    fn test_ignore_modules() {
        let state = DebugState::new();
        state.add_ignore_module("a");
        state.add_ignore_module("a");
        state.add_ignore_module("b");
        assert_eq!(state.ignored_modules(), vec!["a", "b"]);
        assert!(state.is_ignored("a"));

        state.remove_ignore_module("a");
        assert!(!state.is_ignored("a"));
        assert_eq!(state.ignored_modules(), vec!["b"]);
    }

    #[test]
    fn test_dropped_packets_keep_order() {
        let state = DebugState::new();
        for id in 0..5 {
            state.add_dropped_packet(id, "queue", "full");
        }

        let ids: Vec<_> = state.dropped_packets().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_clock_never_goes_back() {
        let state = DebugState::new();
        assert_eq!(state.set_simulation_time(50.0), 50.0);
        assert_eq!(state.set_simulation_time(20.0), 50.0);
        assert_eq!(state.set_simulation_time(50.0), 50.0);
        assert_eq!(state.simulation_time(), 50.0);
    }

    #[test]
    fn test_whoami_and_drop_flag() {
        let state = DebugState::new();
        assert_eq!(state.whoami(), None);
        state.set_whoami(8);
        assert_eq!(state.whoami(), Some(8));

        assert!(!state.break_on_drop());
        state.set_break_on_drop(true);
        assert!(state.break_on_drop());
    }

    #[test]
    fn test_table_shadow_through_state() {
        let state = DebugState::new();
        state.add_table_entry("T", "k", "a", vec![], None);
        state.update_handle("T", "k", "a", 7);
        state.confirm_update_entry("T", 7);

        let entries = state.table_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].handle, Some(7));
        assert_eq!(entries[0].status, TableEntryStatus::Ok);

        state.delete_table_entry("T", 7);
        state.confirm_delete_entry("T", 7);
        assert!(state.table_entries().is_empty());
    }
}
