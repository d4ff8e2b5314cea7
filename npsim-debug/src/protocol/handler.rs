//! Request dispatch: one request in, one reply out.

use super::messages::{BreakpointInfo, Reply, Request};
use crate::breakpoint::{Breakpoint, Condition, ConditionKind};
use crate::control_plane::ControlPlane;
use crate::metrics;
use crate::packet::PacketId;
use crate::rendezvous::{Rendezvous, Resume};
use crate::state::DebugState;
use crate::tracing_ext;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Translates client requests into state queries, mutations and resumes.
pub struct CommandHandler {
    state: Arc<DebugState>,
    rendezvous: Arc<Rendezvous>,
    control_plane: RwLock<Option<Arc<dyn ControlPlane>>>,
    run_called: AtomicBool,
}

impl CommandHandler {
    pub fn new(state: Arc<DebugState>, rendezvous: Arc<Rendezvous>) -> Self {
        Self {
            state,
            rendezvous,
            control_plane: RwLock::new(None),
            run_called: AtomicBool::new(false),
        }
    }

    /// Route CpCommand requests to `control_plane`.
    pub fn register_control_plane(&self, control_plane: Arc<dyn ControlPlane>) {
        *self.control_plane.write() = Some(control_plane);
    }

    /// Handle one request.
    ///
    /// Run, Continue and Next block until the simulation pauses again.
    pub fn handle(&self, request: Request) -> Reply {
        let _span = tracing_ext::request_span(request.kind(), request.resumes()).entered();
        metrics::record_request(request.kind());
        if request.resumes() {
            tracing::debug!("Handling request: {} (reply deferred to next pause)", request.kind());
        } else {
            tracing::debug!("Handling request: {}", request.kind());
        }

        let state = &self.state;

        match request {
            Request::Run { time_ns } => self.run(time_ns),
            Request::Continue { time_ns } => self.resume(time_ns, None),
            Request::Next => self.resume(None, state.whoami()),

            Request::GetCounter { name } => {
                let value = state.counter_value(&name);
                Reply::CounterValue { name, value }
            }
            Request::GetAllCounters => Reply::AllCounterValues(state.counters()),

            Request::SetBreakpoint {
                conditions,
                temporary,
                disabled,
            } => self.set_breakpoint(conditions, temporary, disabled),
            Request::RemoveBreakpoint { id } => {
                state.remove_breakpoint(id);
                Reply::success()
            }
            Request::EnableBreakpoint { id } => {
                state.enable_breakpoint(id);
                Reply::success()
            }
            Request::DisableBreakpoint { id } => {
                state.disable_breakpoint(id);
                Reply::success()
            }
            Request::GetAllBreakpoints => Reply::AllBreakpoints(
                state
                    .user_breakpoints()
                    .iter()
                    .map(BreakpointInfo::from)
                    .collect(),
            ),

            Request::SetWatchpoint { counter, disabled } => {
                state.add_watchpoint(state.new_watchpoint(&counter).disabled(disabled));
                Reply::success()
            }
            Request::RemoveWatchpoint { id } => {
                state.remove_watchpoint(id);
                Reply::success()
            }
            Request::EnableWatchpoint { id } => {
                state.enable_watchpoint(id);
                Reply::success()
            }
            Request::DisableWatchpoint { id } => {
                state.disable_watchpoint(id);
                Reply::success()
            }
            Request::GetAllWatchpoints => Reply::AllWatchpoints(state.watchpoints()),

            Request::WhoAmI => Reply::WhoAmI {
                packet_id: state.whoami(),
            },
            Request::GetPacketList { module } => {
                Reply::PacketList(state.packet_list(module.as_deref()))
            }
            Request::Backtrace { packet_id } => self.backtrace(packet_id.as_deref()),
            Request::GetParsedPacket { id } => match state.parsed_packet(id) {
                Some(headers) => Reply::ParsedPacket(headers),
                None => Reply::failed(),
            },
            Request::IgnoreModule { module, delete } => {
                if delete {
                    state.remove_ignore_module(&module);
                } else {
                    state.add_ignore_module(&module);
                }
                Reply::success()
            }
            Request::GetAllIgnoreModules => Reply::AllIgnoreModules(state.ignored_modules()),
            Request::BreakOnPacketDrop { on } => {
                state.set_break_on_drop(on);
                Reply::success()
            }
            Request::GetDroppedPackets => Reply::DroppedPackets(state.dropped_packets()),
            Request::GetSimulationTime => Reply::SimulationTime(state.simulation_time()),

            Request::CpCommand { command } => self.cp_command(&command),
            Request::GetTableEntries => Reply::TableEntries(state.table_entries()),
        }
    }

    fn run(&self, time_ns: Option<f64>) -> Reply {
        if self.run_called.swap(true, Ordering::SeqCst) {
            tracing::warn!("Duplicate run request");
            return Reply::SimulationEnd;
        }

        tracing::info!("Starting simulation");
        self.install_timed_stop(time_ns);
        self.wait(Resume::Start)
    }

    /// Continue, or Next when `focus` is the packet to stop on.
    fn resume(&self, time_ns: Option<f64>, focus: Option<PacketId>) -> Reply {
        if !self.run_called.load(Ordering::SeqCst) {
            tracing::warn!("Resume requested before run");
            return Reply::failed();
        }

        self.install_timed_stop(time_ns);
        if let Some(packet_id) = focus {
            self.state.add_breakpoint(
                Breakpoint::stealth()
                    .with_condition(Condition::packet_id(packet_id))
                    .temporary(true),
            );
        }

        self.wait(Resume::Continue)
    }

    fn wait(&self, how: Resume) -> Reply {
        let reply = self.rendezvous.resume_and_wait(how);
        // Any pause ends the wait the stealth breakpoints were set up for
        self.state.remove_stealth_breakpoints();
        reply
    }

    fn install_timed_stop(&self, time_ns: Option<f64>) {
        let Some(duration) = time_ns else {
            return;
        };

        if !duration.is_finite() {
            tracing::warn!("Ignoring run duration {}", duration);
            return;
        }

        let break_time = self.state.simulation_time() + duration;
        tracing::debug!("Pausing at {} ns", break_time);
        self.state.add_breakpoint(
            Breakpoint::stealth()
                .with_condition(Condition::at_time(break_time))
                .temporary(true),
        );
    }

    fn set_breakpoint(&self, conditions: Vec<Condition>, temporary: bool, disabled: bool) -> Reply {
        if conditions.is_empty() {
            tracing::warn!("Rejecting breakpoint without conditions");
            return Reply::failed();
        }

        let mut bp = self.state.new_breakpoint().disabled(disabled);
        for condition in conditions {
            bp.add_condition(condition);
        }
        // A time threshold can only be crossed once
        bp.temporary = temporary || bp.has_condition(ConditionKind::AtTime);

        self.state.add_breakpoint(bp);
        Reply::success()
    }

    fn backtrace(&self, packet_id: Option<&str>) -> Reply {
        let id = match packet_id {
            Some(text) => match text.trim().parse::<PacketId>() {
                Ok(id) => Some(id),
                Err(e) => {
                    tracing::warn!("Bad backtrace packet id {:?}: {}", text, e);
                    return Reply::failed();
                }
            },
            None => self.state.whoami(),
        };

        let Some(id) = id else {
            return Reply::failed();
        };

        match self.state.backtrace(id) {
            Some(trace) => Reply::Backtrace {
                packet_id: id,
                trace,
            },
            None => Reply::failed(),
        }
    }

    fn cp_command(&self, command: &str) -> Reply {
        let control_plane = self.control_plane.read().clone();
        match control_plane {
            Some(cp) => {
                cp.do_command(command);
                Reply::success()
            }
            None => {
                tracing::warn!("No control plane registered for {:?}", command);
                Reply::failed()
            }
        }
    }
}
