//! Transport abstraction between the command server and the debugger client.

use crate::error::Result;
use crate::protocol::{Reply, Request};
use std::time::Duration;

/// Request/reply channel used by the command server.
///
/// Every received request must be answered with exactly one [`send`](Self::send)
/// before the next [`recv`](Self::recv). This trait allows different
/// transport implementations:
/// - TCP for a debugger running in another process
/// - In-memory channels for tests and embedding
pub trait Transport: Send + 'static {
    /// Wait up to `timeout` for the next request.
    ///
    /// Returns `Ok(None)` if nothing arrived in time.
    fn recv(&mut self, timeout: Duration) -> Result<Option<Request>>;

    /// Answer the last received request.
    fn send(&mut self, reply: &Reply) -> Result<()>;
}
