//! OS signal handling.
//!
//! Ctrl-C is translated into a [`Shutdown`] trigger so the interactive
//! loop can finish the current command and exit cleanly.

use tokio::task::JoinHandle;

use crate::lifecycle::Shutdown;

/// Spawn a task that triggers `shutdown` on the first Ctrl-C.
pub fn spawn_ctrl_c_handler(shutdown: Shutdown) -> JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Received Ctrl-C, shutting down");
                shutdown.trigger();
            }
            Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl-C"),
        }
    })
}
