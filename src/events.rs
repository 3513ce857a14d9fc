//! Caller-facing events emitted by a bridge session

use serde::Serialize;
use std::fmt;

use crate::keymap;
use crate::state::{ActiveSource, LogicalAddress, PowerStatus};

/// Decoded remote-control key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Key {
    /// Raw user-control code
    pub code: u8,
    /// Name from the key map (`unknown` when unmapped)
    pub name: &'static str,
}

impl Key {
    pub fn from_code(code: u8) -> Self {
        Self {
            code,
            name: keymap::key_name(code),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X})", self.name, self.code)
    }
}

/// Event broadcast to every subscriber, in adapter line order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum CecEvent {
    /// The adapter finished initializing and accepts commands
    Ready,
    /// Non-recoverable session failure
    Error { message: String },
    /// Power status of a device; `None` when a query timed out
    PowerStatus {
        address: LogicalAddress,
        status: Option<PowerStatus>,
    },
    /// Active-source flag of a device; `None` when a query timed out
    ActiveSource {
        address: LogicalAddress,
        active: Option<ActiveSource>,
    },
    /// Every `<User Control Pressed>` frame, repeats included
    KeyPress(Key),
    /// First press of a press episode
    KeyDown(Key),
    /// End of a press episode
    KeyUp(Key),
}

impl CecEvent {
    /// Event name in the `<address>:powerStatus` style used by the adapter
    /// bindings this bridge replaces
    pub fn name(&self) -> String {
        match self {
            CecEvent::Ready => "ready".to_string(),
            CecEvent::Error { .. } => "error".to_string(),
            CecEvent::PowerStatus { address, .. } => format!("{}:powerStatus", address),
            CecEvent::ActiveSource { address, .. } => format!("{}:activeSource", address),
            CecEvent::KeyPress(_) => "keypress".to_string(),
            CecEvent::KeyDown(_) => "keydown".to_string(),
            CecEvent::KeyUp(_) => "keyup".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        let addr = LogicalAddress::new(4).unwrap();
        let ev = CecEvent::PowerStatus {
            address: addr,
            status: None,
        };
        assert_eq!(ev.name(), "4:powerStatus");
        assert_eq!(CecEvent::KeyUp(Key::from_code(0)).name(), "keyup");
    }

    #[test]
    fn test_key_display() {
        assert_eq!(Key::from_code(0x01).to_string(), "UP (0x01)");
    }

    #[test]
    fn test_event_json_shape() {
        let ev = CecEvent::KeyDown(Key::from_code(0x01));
        assert_eq!(
            serde_json::to_value(&ev).unwrap(),
            serde_json::json!({"event": "keyDown", "code": 1, "name": "UP"})
        );

        let ev = CecEvent::PowerStatus {
            address: LogicalAddress::new(4).unwrap(),
            status: Some(PowerStatus::Standby),
        };
        assert_eq!(
            serde_json::to_value(&ev).unwrap(),
            serde_json::json!({"event": "powerStatus", "address": "4", "status": "standby"})
        );

        assert_eq!(
            serde_json::to_value(&CecEvent::Ready).unwrap(),
            serde_json::json!({"event": "ready"})
        );
    }
}
