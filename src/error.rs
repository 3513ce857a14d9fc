//! Error types for the bridge
//!
//! Only session startup can fail. Everything after `ready` degrades to
//! `None` results or `Error` events instead of returning errors.

use thiserror::Error;

/// Errors raised by an [`Adapter`](crate::adapter::Adapter) implementation
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    Failed { program: String, status: String },

    #[error("adapter process has no {0} pipe")]
    MissingPipe(&'static str),

    #[error("adapter I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fatal session startup errors
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("CEC scan failed: {0}")]
    ScanFailed(#[source] AdapterError),

    #[error("CEC scan did not find any devices")]
    NoDevices,

    #[error("could not find this adapter (OSD name '{0}') among scanned devices")]
    SelfNotFound(String),

    #[error("failed to start the adapter process: {0}")]
    Spawn(#[source] AdapterError),

    #[error("adapter process exited before initialization (code: {})", display_code(.0))]
    ExitedBeforeInit(Option<i32>),

    #[error("bridge session is closed")]
    SessionClosed,
}

fn display_code(code: &Option<i32>) -> String {
    code.map(|c| c.to_string())
        .unwrap_or_else(|| "none".to_string())
}
