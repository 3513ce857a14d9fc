//! Commands sent from bridge handles to the session actor
//!
//! Fire-and-forget commands carry no response channel; queries carry a
//! oneshot sender the actor answers exactly once.

use tokio::sync::oneshot;

use crate::state::{ActiveSource, DeviceTable, PowerStatus};

#[derive(Debug)]
pub enum SessionCommand {
    /// Write one line to the adapter
    ///
    /// With `ack`, the sender is answered by the next adapter output line.
    Send {
        line: String,
        ack: Option<oneshot::Sender<Option<bool>>>,
    },

    /// Target a device and ask for its power status (`pow <addr>`)
    QueryPower {
        key: String,
        response: oneshot::Sender<Option<PowerStatus>>,
    },

    /// Target a device and ask whether it is the active source (`ad <addr>`)
    QueryActive {
        key: String,
        response: oneshot::Sender<Option<ActiveSource>>,
    },

    /// Copy of the current device table
    Snapshot {
        response: oneshot::Sender<DeviceTable>,
    },

    /// Stop the adapter and the actor
    Shutdown,
}
