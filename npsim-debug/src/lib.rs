//! Debugger backplane for discrete-event network-processor simulations.
//!
//! This crate lets an external debugger client pause a running simulation on
//! packet-level breakpoints and counter watchpoints, inspect packet traces,
//! counters and control-plane tables, and resume or single-step it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  simulation thread           command thread  │
//! │                                              │
//! │  ┌──────────────┐           ┌─────────────┐  │
//! │  │DebugObserver │           │CommandServer│◄─┼── Transport (TCP / channel)
//! │  └──────┬───────┘           └──────┬──────┘  │
//! │         │                          │         │
//! │         ▼                          ▼         │
//! │  ┌────────────┐  park/resume ┌──────────────┐│
//! │  │ Rendezvous │◄────────────►│CommandHandler││
//! │  └────────────┘              └──────┬───────┘│
//! │         │                           │        │
//! │         └──────────┐   ┌────────────┘        │
//! │                    ▼   ▼                     │
//! │                ┌──────────┐                  │
//! │                │DebugState│                  │
//! │                └──────────┘                  │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Within one event the observer updates the [`DebugState`], advances the
//! simulation clock, evaluates breakpoints and watchpoints, and only then may
//! park the simulation thread in the [`Rendezvous`].
//!
//! # Quick Start
//!
//! ```ignore
//! use npsim_debug::{DebugSession, DebuggerConfig, SimEvent};
//!
//! let session = DebugSession::bind(DebuggerConfig::from_env()?)?;
//! let observer = session.observer();
//!
//! // Nothing runs until the client sends Run
//! session.wait_for_run();
//!
//! observer.observe(SimEvent::CounterAdded {
//!     module: "parser".into(),
//!     counter: "packets_in".into(),
//!     time: 0.0,
//! })?;
//! // ... drive the simulation ...
//!
//! session.finish();
//! ```

pub mod breakpoint;
pub mod config;
pub mod control_plane;
pub mod error;
pub mod metrics;
pub mod observer;
pub mod packet;
pub mod protocol;
pub mod rendezvous;
pub mod server;
pub mod session;
pub mod state;
pub mod tracing_ext;
pub mod transport;
pub mod watchpoint;

// Re-export main types at crate root
pub use breakpoint::{Breakpoint, BreakpointId, Condition, ConditionKind, IdAllocator, PacketAccess};
pub use config::DebuggerConfig;
pub use control_plane::{ControlPlane, EntryHandle, TableEntry, TableEntryStatus, TableShadow};
pub use error::{DebugError, Result};
pub use observer::{DebugObserver, LogTraceSink, MetricsTraceSink, SimEvent, TraceSink};
pub use packet::{
    DebugInfo, DroppedPacket, Field, Header, PacketId, PacketLocation, PacketSummary, Payload,
    TrackedPacket,
};
pub use protocol::{AckStatus, BreakpointInfo, CommandHandler, Reply, Request};
pub use rendezvous::{Rendezvous, Resume};
pub use server::{CommandServer, ServerHandle};
pub use session::DebugSession;
pub use state::{DebugState, TraceId, TraceUpdate};
pub use transport::{ChannelTransport, DebugClient, TcpClient, TcpTransport, Transport};
pub use watchpoint::{Watchpoint, WatchpointId};
