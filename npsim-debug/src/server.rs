//! Command server: the thread that talks to the debugger client.
//!
//! The server polls its [`Transport`] on a short timeout so it can notice a
//! shutdown request between requests. Every request is answered with exactly
//! one reply, including requests that could not be decoded.

use crate::error::{DebugError, Result};
use crate::metrics;
use crate::protocol::{CommandHandler, Reply};
use crate::transport::Transport;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Handle for stopping a running [`CommandServer`].
///
/// Dropping the handle stops the server as well.
pub struct ServerHandle {
    kill: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl ServerHandle {
    /// Signal the server thread to stop and wait for it to exit.
    ///
    /// The thread notices the signal within one poll interval, unless it is
    /// blocked waiting for the simulation to pause.
    pub fn shutdown(mut self) {
        self.stop();
    }

    /// Check if shutdown has been requested.
    pub fn is_shutdown_requested(&self) -> bool {
        self.kill.load(Ordering::SeqCst)
    }

    /// Whether the server thread has exited.
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, |join| join.is_finished())
    }

    fn stop(&mut self) {
        self.kill.store(true, Ordering::SeqCst);

        if let Some(join) = self.join.take() {
            tracing::debug!("Waiting for command server to exit");
            if join.join().is_err() {
                tracing::error!("Command server thread panicked");
            }
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Receives requests, dispatches them and sends the replies.
pub struct CommandServer {
    transport: Box<dyn Transport>,
    handler: Arc<CommandHandler>,
    poll_interval: Duration,
    kill: Arc<AtomicBool>,
}

impl CommandServer {
    pub fn new(
        transport: Box<dyn Transport>,
        handler: Arc<CommandHandler>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            transport,
            handler,
            poll_interval,
            kill: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Run the server on a named thread.
    pub fn spawn(self, thread_name: &str) -> Result<ServerHandle> {
        let kill = self.kill.clone();
        let join = std::thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || self.run())?;

        Ok(ServerHandle {
            kill,
            join: Some(join),
        })
    }

    /// Serve requests until the kill flag is raised.
    pub fn run(mut self) {
        tracing::info!("Command server started");

        while !self.kill.load(Ordering::SeqCst) {
            match self.transport.recv(self.poll_interval) {
                Ok(Some(request)) => {
                    let reply = self.handler.handle(request);
                    self.reply(&reply);
                }
                Ok(None) => {}
                Err(e) => self.recv_failed(e),
            }
        }

        tracing::info!("Command server stopped");
    }

    fn recv_failed(&mut self, e: DebugError) {
        if e.is_protocol_error() {
            tracing::warn!("Rejecting request: {}", e);
            metrics::record_error(metrics::error_type::DECODE);
            self.reply(&Reply::failed());
        } else if e.is_connection_error() {
            tracing::debug!("Client connection error: {}", e);
            metrics::record_error(metrics::error_type::CONNECTION);
            std::thread::sleep(self.poll_interval);
        } else {
            tracing::error!("Command server error: {}", e);
            metrics::record_error(metrics::error_type::INTERNAL);
        }
    }

    fn reply(&mut self, reply: &Reply) {
        if let Err(e) = self.transport.send(reply) {
            tracing::warn!("Failed to send {} reply: {}", reply.kind(), e);
            metrics::record_error(metrics::error_type::CONNECTION);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Request;
    use crate::rendezvous::Rendezvous;
    use crate::state::DebugState;
    use crate::transport::ChannelTransport;
    use std::collections::VecDeque;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn handler() -> Arc<CommandHandler> {
        Arc::new(CommandHandler::new(
            Arc::new(DebugState::new()),
            Arc::new(Rendezvous::new()),
        ))
    }

    /// Replays scripted receive results and records the replies.
    struct ScriptedTransport {
        script: VecDeque<Result<Option<Request>>>,
        sent: Arc<parking_lot::Mutex<Vec<Reply>>>,
    }

    impl Transport for ScriptedTransport {
        fn recv(&mut self, _timeout: Duration) -> Result<Option<Request>> {
            self.script.pop_front().unwrap_or(Ok(None))
        }

        fn send(&mut self, reply: &Reply) -> Result<()> {
            self.sent.lock().push(reply.clone());
            Ok(())
        }
    }

    #[test]
    fn test_request_reply_over_channel() {
        let (transport, client) = ChannelTransport::pair();
        let handle = CommandServer::new(Box::new(transport), handler(), Duration::from_millis(5))
            .spawn("test-server")
            .unwrap();

        let reply = client
            .request_timeout(Request::GetSimulationTime, TIMEOUT)
            .unwrap();
        assert_eq!(reply, Reply::SimulationTime(0.0));

        let reply = client
            .request_timeout(Request::GetCounter { name: "c".into() }, TIMEOUT)
            .unwrap();
        assert_eq!(
            reply,
            Reply::CounterValue {
                name: "c".into(),
                value: None
            }
        );

        handle.shutdown();
    }

    #[test]
    fn test_undecodable_request_gets_failure() {
        let sent = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let transport = ScriptedTransport {
            script: VecDeque::from([
                Err(DebugError::Decode("garbage".into())),
                Err(DebugError::Disconnected),
                Ok(Some(Request::WhoAmI)),
            ]),
            sent: sent.clone(),
        };

        let handle = CommandServer::new(Box::new(transport), handler(), Duration::from_millis(1))
            .spawn("test-server")
            .unwrap();

        let deadline = std::time::Instant::now() + TIMEOUT;
        while sent.lock().len() < 2 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        handle.shutdown();

        assert_eq!(
            *sent.lock(),
            vec![Reply::failed(), Reply::WhoAmI { packet_id: None }]
        );
    }

    #[test]
    fn test_shutdown_stops_thread() {
        let (transport, _client) = ChannelTransport::pair();
        let handle = CommandServer::new(Box::new(transport), handler(), Duration::from_millis(5))
            .spawn("test-server")
            .unwrap();

        assert!(!handle.is_shutdown_requested());
        assert!(!handle.is_finished());
        handle.shutdown();
    }
}
