//! OS signal handling.
//!
//! SIGINT (Ctrl+C) and SIGTERM both request a graceful shutdown. Handlers
//! are installed before the listener is bound so a signal arriving during
//! startup is not lost to the default disposition.

use std::io;
use tracing::info;

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};

/// Installed shutdown signal handlers.
pub struct ShutdownSignal {
    #[cfg(unix)]
    interrupt: Signal,
    #[cfg(unix)]
    terminate: Signal,
}

impl ShutdownSignal {
    /// Install the handlers. Must be called from within a tokio runtime.
    #[cfg(unix)]
    pub fn install() -> io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(not(unix))]
    pub fn install() -> io::Result<Self> {
        Ok(Self {})
    }

    /// Wait for the first shutdown signal.
    #[cfg(unix)]
    pub async fn recv(mut self) {
        let name = tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        };
        info!(signal = name, "Shutdown signal received");
    }

    #[cfg(not(unix))]
    pub async fn recv(self) {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
        info!(signal = "ctrl-c", "Shutdown signal received");
    }
}
