//! Requests sent by the debugger client and the replies it receives.
//!
//! Every request is answered by exactly one reply. Run, Continue and Next
//! are answered only once the simulation pauses again.

use crate::breakpoint::{Breakpoint, BreakpointId, Condition};
use crate::control_plane::TableEntry;
use crate::packet::{DroppedPacket, Header, PacketId, PacketLocation, PacketSummary};
use crate::watchpoint::{Watchpoint, WatchpointId};

/// A client request.
#[derive(Clone, Debug, PartialEq, bitcode::Encode, bitcode::Decode)]
pub enum Request {
    // Execution control
    /// Start the simulation, optionally pausing after `time_ns`.
    Run { time_ns: Option<f64> },
    /// Resume a paused simulation, optionally pausing after `time_ns`.
    Continue { time_ns: Option<f64> },
    /// Resume until the focused packet is accessed again.
    Next,

    // Counters
    GetCounter { name: String },
    GetAllCounters,

    // Breakpoints
    SetBreakpoint {
        conditions: Vec<Condition>,
        temporary: bool,
        disabled: bool,
    },
    RemoveBreakpoint { id: BreakpointId },
    EnableBreakpoint { id: BreakpointId },
    DisableBreakpoint { id: BreakpointId },
    GetAllBreakpoints,

    // Watchpoints
    SetWatchpoint { counter: String, disabled: bool },
    RemoveWatchpoint { id: WatchpointId },
    EnableWatchpoint { id: WatchpointId },
    DisableWatchpoint { id: WatchpointId },
    GetAllWatchpoints,

    // Packets
    WhoAmI,
    GetPacketList { module: Option<String> },
    /// Packet id as typed by the user; the focused packet when absent.
    Backtrace { packet_id: Option<String> },
    GetParsedPacket { id: PacketId },
    IgnoreModule { module: String, delete: bool },
    GetAllIgnoreModules,
    BreakOnPacketDrop { on: bool },
    GetDroppedPackets,

    GetSimulationTime,

    // Control plane
    CpCommand { command: String },
    GetTableEntries,
}

impl Request {
    /// Request name for logging and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Request::Run { .. } => "run",
            Request::Continue { .. } => "continue",
            Request::Next => "next",
            Request::GetCounter { .. } => "get_counter",
            Request::GetAllCounters => "get_all_counters",
            Request::SetBreakpoint { .. } => "set_breakpoint",
            Request::RemoveBreakpoint { .. } => "remove_breakpoint",
            Request::EnableBreakpoint { .. } => "enable_breakpoint",
            Request::DisableBreakpoint { .. } => "disable_breakpoint",
            Request::GetAllBreakpoints => "get_all_breakpoints",
            Request::SetWatchpoint { .. } => "set_watchpoint",
            Request::RemoveWatchpoint { .. } => "remove_watchpoint",
            Request::EnableWatchpoint { .. } => "enable_watchpoint",
            Request::DisableWatchpoint { .. } => "disable_watchpoint",
            Request::GetAllWatchpoints => "get_all_watchpoints",
            Request::WhoAmI => "whoami",
            Request::GetPacketList { .. } => "get_packet_list",
            Request::Backtrace { .. } => "backtrace",
            Request::GetParsedPacket { .. } => "get_parsed_packet",
            Request::IgnoreModule { .. } => "ignore_module",
            Request::GetAllIgnoreModules => "get_all_ignore_modules",
            Request::BreakOnPacketDrop { .. } => "break_on_packet_drop",
            Request::GetDroppedPackets => "get_dropped_packets",
            Request::GetSimulationTime => "get_simulation_time",
            Request::CpCommand { .. } => "cp_command",
            Request::GetTableEntries => "get_table_entries",
        }
    }

    /// Whether the request resumes the simulation and defers its reply.
    pub fn resumes(&self) -> bool {
        matches!(
            self,
            Request::Run { .. } | Request::Continue { .. } | Request::Next
        )
    }
}

/// Outcome of a request that carries no data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, bitcode::Encode, bitcode::Decode)]
pub enum AckStatus {
    Success,
    Failed,
}

/// Breakpoint entry as listed to the client.
#[derive(Clone, Debug, PartialEq, bitcode::Encode, bitcode::Decode)]
pub struct BreakpointInfo {
    pub id: BreakpointId,
    pub conditions: Vec<Condition>,
    pub temporary: bool,
    pub disabled: bool,
}

impl From<&Breakpoint> for BreakpointInfo {
    fn from(bp: &Breakpoint) -> Self {
        Self {
            id: bp.id(),
            conditions: bp.conditions().to_vec(),
            temporary: bp.temporary,
            disabled: bp.disabled,
        }
    }
}

/// A server reply.
#[derive(Clone, Debug, PartialEq, bitcode::Encode, bitcode::Decode)]
pub enum Reply {
    Ack(AckStatus),

    // Pause notifications
    BreakpointHit {
        id: BreakpointId,
        module: String,
        packet_id: PacketId,
        time: f64,
        read: bool,
    },
    WatchpointHit {
        id: WatchpointId,
        counter: String,
        old_value: i64,
        new_value: i64,
    },
    PacketDropped {
        packet_id: PacketId,
        module: String,
        reason: String,
    },
    /// Paused by an internal stop (timed run, `next`).
    SimulationStopped {
        module: String,
        packet_id: PacketId,
        time: f64,
        read: bool,
    },
    SimulationEnd,

    // Query results
    CounterValue { name: String, value: Option<i64> },
    AllCounterValues(Vec<(String, i64)>),
    AllBreakpoints(Vec<BreakpointInfo>),
    AllWatchpoints(Vec<Watchpoint>),
    WhoAmI { packet_id: Option<PacketId> },
    PacketList(Vec<PacketSummary>),
    Backtrace {
        packet_id: PacketId,
        trace: Vec<PacketLocation>,
    },
    ParsedPacket(Vec<Header>),
    AllIgnoreModules(Vec<String>),
    SimulationTime(f64),
    DroppedPackets(Vec<DroppedPacket>),
    TableEntries(Vec<TableEntry>),
}

impl Reply {
    pub fn success() -> Self {
        Reply::Ack(AckStatus::Success)
    }

    pub fn failed() -> Self {
        Reply::Ack(AckStatus::Failed)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Reply::Ack(AckStatus::Failed))
    }

    /// Reply name for logging and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Reply::Ack(AckStatus::Success) => "success",
            Reply::Ack(AckStatus::Failed) => "failed",
            Reply::BreakpointHit { .. } => "breakpoint_hit",
            Reply::WatchpointHit { .. } => "watchpoint_hit",
            Reply::PacketDropped { .. } => "packet_dropped",
            Reply::SimulationStopped { .. } => "simulation_stopped",
            Reply::SimulationEnd => "simulation_end",
            Reply::CounterValue { .. } => "counter_value",
            Reply::AllCounterValues(_) => "all_counter_values",
            Reply::AllBreakpoints(_) => "all_breakpoints",
            Reply::AllWatchpoints(_) => "all_watchpoints",
            Reply::WhoAmI { .. } => "whoami",
            Reply::PacketList(_) => "packet_list",
            Reply::Backtrace { .. } => "backtrace",
            Reply::ParsedPacket(_) => "parsed_packet",
            Reply::AllIgnoreModules(_) => "all_ignore_modules",
            Reply::SimulationTime(_) => "simulation_time",
            Reply::DroppedPackets(_) => "dropped_packets",
            Reply::TableEntries(_) => "table_entries",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resuming_requests() {
        assert!(Request::Run { time_ns: None }.resumes());
        assert!(Request::Continue { time_ns: Some(5.0) }.resumes());
        assert!(Request::Next.resumes());
        assert!(!Request::WhoAmI.resumes());
    }

    #[test]
    fn test_set_breakpoint_encoding() {
        let req = Request::SetBreakpoint {
            conditions: vec![
                Condition::module_read("parser"),
                Condition::packet_id(42),
            ],
            temporary: true,
            disabled: false,
        };

        let decoded: Request = bitcode::decode(&bitcode::encode(&req)).unwrap();
        assert_eq!(decoded, req);
    }

    #[test]
    fn test_ack_helpers() {
        assert!(Reply::failed().is_failure());
        assert!(!Reply::success().is_failure());
        assert_eq!(Reply::SimulationEnd.kind(), "simulation_end");
    }
}
