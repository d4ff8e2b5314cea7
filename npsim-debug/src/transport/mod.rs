//! Transport layer between the command server and the debugger client.
//!
//! Two implementations are provided:
//!
//! - [`TcpTransport`]: length-prefixed frames over TCP, for an out-of-process debugger
//! - [`ChannelTransport`]: in-memory channels, for tests and embedding

pub mod channel;
pub mod framing;
pub mod tcp;
pub mod traits;

pub use channel::{ChannelTransport, DebugClient};
pub use tcp::{TcpClient, TcpTransport};
pub use traits::Transport;
