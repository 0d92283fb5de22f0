//! TCP server answering every connection with the fixed response.
//!
//! Connections are served strictly one at a time: accept, read once,
//! write the response, close, then accept the next. The request bytes
//! are logged and discarded.

use crate::config::{Config, ConfigError};
use crate::response::Response;
use socket2::{Domain, Protocol, Socket, Type};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, error, info, trace};

/// Server instance. Owns the listening socket; dropping it closes the socket.
pub struct Server {
    listener: TcpListener,
    response: Response,
    read_buffer: usize,
}

impl Server {
    /// Bind the listening socket described by `config`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn bind(config: &Config) -> Result<Self, ServerError> {
        let addr = config.listen_addr()?;
        let listener = bind_listener(addr, config.backlog)?;
        let listener = TcpListener::from_std(listener).map_err(ServerError::Register)?;

        let response = Response::new(&config.body);
        debug!(content_length = response.content_length(), "Response rendered");

        Ok(Server {
            listener,
            response,
            read_buffer: config.read_buffer,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept and serve connections until `shutdown` resolves.
    ///
    /// A connection in flight when `shutdown` resolves is dropped along
    /// with the listening socket.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            _ = self.run() => {}
            _ = shutdown => {
                debug!("Stopping accept loop");
            }
        }
    }

    /// Accept loop. Only returns by being dropped.
    pub async fn run(&self) {
        if let Ok(addr) = self.local_addr() {
            info!(address = %addr, "Server listening");
        }

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    debug!(peer = %peer, "New connection");
                    serve_connection(stream, &self.response, self.read_buffer).await;
                    trace!(peer = %peer, "Connection closed");
                }
                Err(e) => {
                    error!(error = %e, "Accept failed");
                }
            }
        }
    }
}

/// Serve one request/response exchange on `stream`, then close it.
///
/// Reads at most `read_buffer` bytes, which are discarded. Read and write
/// failures are logged and otherwise ignored.
pub async fn serve_connection<S>(mut stream: S, response: &Response, read_buffer: usize)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buffer = vec![0u8; read_buffer];

    match stream.read(&mut buffer).await {
        Ok(n) => {
            debug!(
                bytes = n,
                request = %String::from_utf8_lossy(&buffer[..n]),
                "Received request"
            );
        }
        Err(e) => {
            debug!(error = %e, "Read failed");
        }
    }

    if let Err(e) = stream.write_all(response.as_bytes()).await {
        debug!(error = %e, "Write failed");
        return;
    }
    if let Err(e) = stream.flush().await {
        debug!(error = %e, "Flush failed");
        return;
    }

    debug!(
        content_length = response.content_length(),
        body = %String::from_utf8_lossy(response.body()),
        "Sent response"
    );

    let _ = stream.shutdown().await;
}

/// Create a non-blocking TCP listener with address (and, on Unix, port) reuse.
pub fn bind_listener(addr: SocketAddr, backlog: i32) -> Result<std::net::TcpListener, ServerError> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
        .map_err(ServerError::Socket)?;

    socket
        .set_reuse_address(true)
        .map_err(ServerError::SetOption)?;
    #[cfg(all(unix, not(any(target_os = "solaris", target_os = "illumos"))))]
    socket.set_reuse_port(true).map_err(ServerError::SetOption)?;
    socket
        .set_nonblocking(true)
        .map_err(ServerError::SetOption)?;

    socket
        .bind(&addr.into())
        .map_err(|e| ServerError::Bind(addr, e))?;
    socket.listen(backlog).map_err(ServerError::Listen)?;

    Ok(socket.into())
}

/// Listener setup errors
#[derive(Debug)]
pub enum ServerError {
    Config(ConfigError),
    Socket(io::Error),
    SetOption(io::Error),
    Bind(SocketAddr, io::Error),
    Listen(io::Error),
    Register(io::Error),
}

impl From<ConfigError> for ServerError {
    fn from(e: ConfigError) -> Self {
        ServerError::Config(e)
    }
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerError::Config(e) => write!(f, "{}", e),
            ServerError::Socket(e) => write!(f, "Socket failed: {}", e),
            ServerError::SetOption(e) => write!(f, "Setsockopt failed: {}", e),
            ServerError::Bind(addr, e) => write!(f, "Bind failed on {}: {}", addr, e),
            ServerError::Listen(e) => write!(f, "Listen failed: {}", e),
            ServerError::Register(e) => write!(f, "Failed to register listener: {}", e),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerError::Config(e) => Some(e),
            ServerError::Socket(e)
            | ServerError::SetOption(e)
            | ServerError::Bind(_, e)
            | ServerError::Listen(e)
            | ServerError::Register(e) => Some(e),
        }
    }
}
