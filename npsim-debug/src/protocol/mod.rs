//! Debugger client protocol.
//!
//! - [`messages`]: the request and reply vocabulary
//! - [`handler`]: dispatch of a request to the debug state and the rendezvous

pub mod handler;
pub mod messages;

pub use handler::CommandHandler;
pub use messages::{AckStatus, BreakpointInfo, Reply, Request};
