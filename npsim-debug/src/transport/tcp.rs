//! TCP-based transport implementation.
//!
//! The server side serves one debugger client at a time on the configured
//! endpoint. It owns a current-thread runtime and is driven synchronously
//! from the command thread; every wait is bounded so the thread can notice
//! a shutdown request.

use crate::config::DebuggerConfig;
use crate::error::{DebugError, Result};
use crate::protocol::{Reply, Request};
use crate::transport::{framing, Transport};
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::runtime::Runtime;
use tokio::time::{timeout, Duration};

/// Upper bound for receiving the rest of a frame once its first byte arrived.
const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

struct Connection {
    peer: SocketAddr,
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
}

impl Connection {
    fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        let (reader, writer) = stream.into_split();
        Self {
            peer,
            reader: BufReader::new(reader),
            writer: BufWriter::new(writer),
        }
    }
}

/// Command-server side of the TCP transport.
pub struct TcpTransport {
    runtime: Runtime,
    listener: TcpListener,
    connection: Option<Connection>,
    max_message_size: usize,
    /// The current connection lost frame sync and goes after the next reply.
    close_after_reply: bool,
}

impl TcpTransport {
    /// Bind to `addr`.
    pub fn bind(addr: &str, max_message_size: usize) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let std_listener = std::net::TcpListener::bind(addr)?;
        std_listener.set_nonblocking(true)?;

        let listener = {
            let _guard = runtime.enter();
            TcpListener::from_std(std_listener)?
        };

        tracing::info!("Debug server listening on {}", listener.local_addr()?);

        Ok(Self {
            runtime,
            listener,
            connection: None,
            max_message_size,
            close_after_reply: false,
        })
    }

    /// Bind to the configured endpoint.
    pub fn from_config(config: &DebuggerConfig) -> Result<Self> {
        Self::bind(&config.endpoint, config.max_message_size)
    }

    /// Address the server is listening on.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Whether a client is connected.
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    fn disconnect(&mut self) {
        if let Some(conn) = self.connection.take() {
            tracing::info!("Debugger client {} disconnected", conn.peer);
        }
        self.close_after_reply = false;
    }
}

impl Transport for TcpTransport {
    fn recv(&mut self, poll: Duration) -> Result<Option<Request>> {
        let max_message_size = self.max_message_size;

        let Some(conn) = self.connection.as_mut() else {
            let listener = &self.listener;
            let accepted = self
                .runtime
                .block_on(async { timeout(poll, listener.accept()).await });

            if let Ok(result) = accepted {
                let (stream, peer) = result?;
                stream.set_nodelay(true)?;
                tracing::info!("Debugger client connected from {}", peer);
                self.connection = Some(Connection::new(stream, peer));
            }
            return Ok(None);
        };

        let result: Result<Option<Request>> = self.runtime.block_on(async {
            // Cancel safe: buffered bytes survive the timeout
            match timeout(poll, conn.reader.fill_buf()).await {
                Err(_) => return Ok(None),
                Ok(Ok([])) => return Err(DebugError::Disconnected),
                Ok(Ok(_)) => {}
                Ok(Err(e)) => return Err(e.into()),
            }

            match timeout(FRAME_TIMEOUT, framing::read_frame(&mut conn.reader, max_message_size))
                .await
            {
                Ok(frame) => frame.map(Some),
                Err(_) => Err(DebugError::Transport("incomplete frame".to_string())),
            }
        });

        match result {
            Err(DebugError::Disconnected) => {
                self.disconnect();
                Ok(None)
            }
            Err(e @ DebugError::MessageTooLarge { .. }) => {
                self.close_after_reply = true;
                Err(e)
            }
            Err(e) if e.is_connection_error() => {
                tracing::warn!("Dropping debugger client: {}", e);
                self.disconnect();
                Err(e)
            }
            other => other,
        }
    }

    fn send(&mut self, reply: &Reply) -> Result<()> {
        let max_message_size = self.max_message_size;
        let Some(conn) = self.connection.as_mut() else {
            return Err(DebugError::Disconnected);
        };

        let result = self.runtime.block_on(framing::write_frame(
            &mut conn.writer,
            reply,
            max_message_size,
        ));

        if result.as_ref().is_err_and(|e| e.is_connection_error()) || self.close_after_reply {
            self.disconnect();
        }

        result
    }
}

/// Async debugger client for [`TcpTransport`].
pub struct TcpClient {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
    max_message_size: usize,
}

impl TcpClient {
    /// Connect to a debug server.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();

        Ok(Self {
            reader: BufReader::new(reader),
            writer: BufWriter::new(writer),
            max_message_size: crate::config::DEFAULT_MAX_MESSAGE_SIZE,
        })
    }

    /// Send a request and wait for its reply.
    pub async fn request(&mut self, request: &Request) -> Result<Reply> {
        framing::write_frame(&mut self.writer, request, self.max_message_size).await?;
        framing::read_frame(&mut self.reader, self.max_message_size).await
    }
}
