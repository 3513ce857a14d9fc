//! Adapter process abstraction
//!
//! The bridge never talks to the CEC bus directly. An [`Adapter`] runs the
//! one-shot scan and starts the long-lived process whose stdout lines feed
//! the session. `cec-client` is the production implementation; tests plug
//! in scripted adapters.

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::error::AdapterError;

pub mod cec_client;

pub use cec_client::CecClientAdapter;

/// Channels of a running adapter process
///
/// `lines` closes when the process stops producing output; `exit` then
/// carries the exit code, if the process reported one.
pub struct AdapterProcess {
    /// Output lines, newline stripped, in arrival order
    pub lines: mpsc::Receiver<String>,
    /// Commands to write, one per line (newline added by the adapter)
    pub input: mpsc::UnboundedSender<String>,
    /// Exit code once the process is gone
    pub exit: oneshot::Receiver<Option<i32>>,
    /// Asks the adapter to terminate the process
    pub kill: Option<oneshot::Sender<()>>,
}

impl AdapterProcess {
    /// Queue a command line; false if the process input is already closed
    pub fn send(&self, line: impl Into<String>) -> bool {
        self.input.send(line.into()).is_ok()
    }

    /// Terminate the process (best effort)
    pub fn kill(&mut self) {
        if let Some(kill) = self.kill.take() {
            let _ = kill.send(());
        }
    }
}

/// Adapter trait - all CEC adapter backends implement this
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Adapter name for logs (e.g., "cec-client")
    fn name(&self) -> &str;

    /// Run the one-shot bus scan and return its raw text output
    async fn scan(&self) -> Result<String, AdapterError>;

    /// Start the long-lived adapter process
    async fn spawn(&self) -> Result<AdapterProcess, AdapterError>;
}
