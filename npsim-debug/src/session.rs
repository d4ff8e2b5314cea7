//! Debug session: the state store, observer, rendezvous and command server
//! of one simulation run, wired together.

use crate::config::DebuggerConfig;
use crate::control_plane::ControlPlane;
use crate::error::Result;
use crate::observer::{DebugObserver, TraceSink};
use crate::protocol::CommandHandler;
use crate::rendezvous::Rendezvous;
use crate::server::{CommandServer, ServerHandle};
use crate::state::DebugState;
use crate::transport::{TcpTransport, Transport};
use std::sync::Arc;

/// A running debugger attached to one simulation.
///
/// The simulation thread reports events through [`observer`](Self::observer)
/// and calls [`finish`](Self::finish) when the simulation is done. Dropping
/// the session releases a parked simulation and stops the command server.
///
/// # Example
///
/// ```ignore
/// let session = DebugSession::bind(DebuggerConfig::from_env()?)?;
/// let observer = session.observer();
///
/// session.wait_for_run();
/// kernel.run(|event| observer.observe(event))?;
/// session.finish();
/// ```
pub struct DebugSession {
    state: Arc<DebugState>,
    rendezvous: Arc<Rendezvous>,
    handler: Arc<CommandHandler>,
    observer: Arc<DebugObserver>,
    server: Option<ServerHandle>,
}

impl DebugSession {
    /// Start a session serving clients on the configured TCP endpoint.
    pub fn bind(config: DebuggerConfig) -> Result<Self> {
        config.validate()?;
        let transport = TcpTransport::from_config(&config)?;
        Self::start(config, transport)
    }

    /// Start a session serving clients on `transport`.
    pub fn start(config: DebuggerConfig, transport: impl Transport) -> Result<Self> {
        Self::start_with_state(config, transport, DebugState::new())
    }

    /// Start a session around a pre-built state store, e.g. one with seeded id allocators.
    pub fn start_with_state(
        config: DebuggerConfig,
        transport: impl Transport,
        state: DebugState,
    ) -> Result<Self> {
        config.validate()?;

        let state = Arc::new(state);
        let rendezvous = Arc::new(Rendezvous::new());
        let handler = Arc::new(CommandHandler::new(state.clone(), rendezvous.clone()));
        let observer = Arc::new(DebugObserver::new(state.clone(), rendezvous.clone()));

        let server = CommandServer::new(Box::new(transport), handler.clone(), config.poll_interval)
            .spawn(&config.server_thread_name)?;

        tracing::info!(
            "Debug session started (server thread {})",
            config.server_thread_name
        );

        Ok(Self {
            state,
            rendezvous,
            handler,
            observer,
            server: Some(server),
        })
    }

    /// Observer the simulation kernel reports its events to.
    pub fn observer(&self) -> Arc<DebugObserver> {
        self.observer.clone()
    }

    /// Replace the trace sink of the observer.
    ///
    /// Must be called before the observer is handed to the simulation.
    pub fn with_trace_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        let observer = DebugObserver::new(self.state.clone(), self.rendezvous.clone())
            .with_trace_sink(sink);
        self.observer = Arc::new(observer);
        self
    }

    pub fn state(&self) -> &Arc<DebugState> {
        &self.state
    }

    pub fn rendezvous(&self) -> &Arc<Rendezvous> {
        &self.rendezvous
    }

    /// Forward CpCommand requests to `control_plane`.
    pub fn register_control_plane(&self, control_plane: Arc<dyn ControlPlane>) {
        self.handler.register_control_plane(control_plane);
    }

    /// Block the simulation thread until the client sends Run.
    pub fn wait_for_run(&self) {
        self.rendezvous.wait_for_start();
    }

    /// Report the end of the simulation.
    ///
    /// Parks once more so the client can inspect the final state; returns when
    /// the client resumes or the session is dropped.
    pub fn finish(&self) {
        self.rendezvous.finish();
    }

    /// Stop the command server and release the simulation.
    pub fn shutdown(mut self) {
        self.close();
    }

    fn close(&mut self) {
        self.rendezvous.close();
        if let Some(server) = self.server.take() {
            server.shutdown();
            tracing::info!("Debug session closed");
        }
    }
}

impl Drop for DebugSession {
    fn drop(&mut self) {
        self.close();
    }
}
