//! In-memory channel-based transport.
//!
//! This transport uses crossbeam channels instead of a socket, making it
//! ideal for tests and for debuggers embedded in the simulator process.

use crate::error::{DebugError, Result};
use crate::protocol::{Reply, Request};
use crate::transport::traits::Transport;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// Server end of an in-memory request/reply channel.
pub struct ChannelTransport {
    requests: Receiver<Request>,
    replies: Sender<Reply>,
}

impl ChannelTransport {
    /// Create a connected transport and client.
    pub fn pair() -> (Self, DebugClient) {
        let (request_tx, request_rx) = unbounded();
        let (reply_tx, reply_rx) = unbounded();

        let transport = Self {
            requests: request_rx,
            replies: reply_tx,
        };
        let client = DebugClient {
            requests: request_tx,
            replies: reply_rx,
        };

        (transport, client)
    }
}

impl Transport for ChannelTransport {
    fn recv(&mut self, timeout: Duration) -> Result<Option<Request>> {
        match self.requests.recv_timeout(timeout) {
            Ok(request) => Ok(Some(request)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(DebugError::Disconnected),
        }
    }

    fn send(&mut self, reply: &Reply) -> Result<()> {
        self.replies
            .send(reply.clone())
            .map_err(|_| DebugError::Disconnected)
    }
}

/// Client end of a [`ChannelTransport`].
#[derive(Clone)]
pub struct DebugClient {
    requests: Sender<Request>,
    replies: Receiver<Reply>,
}

impl DebugClient {
    /// Send a request and block until its reply arrives.
    pub fn request(&self, request: Request) -> Result<Reply> {
        self.submit(request)?;
        self.replies.recv().map_err(|_| DebugError::Disconnected)
    }

    /// Send a request and wait up to `timeout` for its reply.
    pub fn request_timeout(&self, request: Request, timeout: Duration) -> Result<Reply> {
        self.submit(request)?;
        self.reply_timeout(timeout)?
            .ok_or_else(|| DebugError::Transport(format!("no reply within {:?}", timeout)))
    }

    /// Send a request without waiting for the reply.
    pub fn submit(&self, request: Request) -> Result<()> {
        self.requests
            .send(request)
            .map_err(|_| DebugError::Disconnected)
    }

    /// Wait up to `timeout` for the reply to a submitted request.
    pub fn reply_timeout(&self, timeout: Duration) -> Result<Option<Reply>> {
        match self.replies.recv_timeout(timeout) {
            Ok(reply) => Ok(Some(reply)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(DebugError::Disconnected),
        }
    }
}
