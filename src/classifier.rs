//! Streaming classifier for adapter output
//!
//! `cec-client` writes free-form log text. The classifier recognizes the
//! handful of line shapes the bridge cares about and drops everything else.
//! It never fails on input it does not understand.

use tracing::trace;

use crate::events::Key;
use crate::state::{ActiveSource, LogicalAddress, PowerStatus};

/// Substring the adapter prints once it accepts commands
pub const READY_MARKER: &str = "waiting for input";

const POWER_PREFIX: &str = "power status:";
const ACTIVE_PREFIX: &str = "active source:";
const LOGICAL_ADDRESS_PREFIX: &str = "logical address";
const TRAFFIC_PREFIX: &str = "TRAFFIC:";
const INBOUND_MARKER: &str = ">>";

/// `<User Control Pressed>`
const OPCODE_USER_CONTROL_PRESSED: u8 = 0x44;
/// `<User Control Released>`
const OPCODE_USER_CONTROL_RELEASED: u8 = 0x8B;

/// Classifier phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initializing,
    Ready,
}

/// What a recognized line means
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    /// Initialization finished
    Ready,
    /// Power status of the currently targeted device
    PowerStatus(PowerStatus),
    /// Active-source flag of this adapter's own device
    ActiveSource(ActiveSource),
    /// A key was pressed (or is still held) on a remote addressed to us
    KeyPressed(Key),
    /// The remote reported a key release
    KeyReleased,
}

/// Line classifier state machine
#[derive(Debug, Clone)]
pub struct LineClassifier {
    phase: Phase,
    self_address: Option<LogicalAddress>,
}

impl LineClassifier {
    pub fn new(self_address: Option<LogicalAddress>) -> Self {
        Self {
            phase: Phase::Initializing,
            self_address,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Go back to waiting for the ready marker (new adapter process)
    pub fn reset(&mut self) {
        self.phase = Phase::Initializing;
    }

    /// Classify one line of adapter output
    pub fn classify(&mut self, line: &str) -> Option<Classified> {
        let line = line.trim_end_matches(&['\r', '\n'][..]);

        match self.phase {
            Phase::Initializing => {
                if self.self_address.is_some() && line.contains(READY_MARKER) {
                    self.phase = Phase::Ready;
                    return Some(Classified::Ready);
                }
                None
            }
            Phase::Ready => self.classify_ready(line),
        }
    }

    fn classify_ready(&self, line: &str) -> Option<Classified> {
        if line.starts_with(POWER_PREFIX) {
            return Some(Classified::PowerStatus(PowerStatus::from_adapter(
                last_value(line),
            )));
        }

        if line.starts_with(ACTIVE_PREFIX) {
            return Some(Classified::ActiveSource(ActiveSource::from_adapter(
                last_value(line),
            )));
        }

        if line.starts_with(LOGICAL_ADDRESS_PREFIX) && line.contains("active") {
            let active = !line.contains("not");
            return Some(Classified::ActiveSource(ActiveSource::from(active)));
        }

        if line.starts_with(TRAFFIC_PREFIX) && line.contains(INBOUND_MARKER) {
            return self.classify_traffic(line);
        }

        trace!("Unclassified line: {}", line);
        None
    }

    fn classify_traffic(&self, line: &str) -> Option<Classified> {
        let self_address = self.self_address?;
        let (_, frame) = line.split_once(INBOUND_MARKER)?;
        let bytes: Vec<&str> = frame.trim().split(':').map(str::trim).collect();

        let header = u8::from_str_radix(bytes.first()?, 16).ok()?;
        if header & 0x0F != self_address.value() {
            return None;
        }
        let opcode = u8::from_str_radix(bytes.get(1)?, 16).ok()?;

        match opcode {
            OPCODE_USER_CONTROL_PRESSED if bytes.len() >= 3 => {
                let value = last_value(line).to_uppercase();
                let code = u8::from_str_radix(&value, 16).ok()?;
                Some(Classified::KeyPressed(Key::from_code(code)))
            }
            OPCODE_USER_CONTROL_RELEASED => Some(Classified::KeyReleased),
            _ => None,
        }
    }
}

/// Text after the last colon, trimmed
fn last_value(line: &str) -> &str {
    line.rsplit(':').next().unwrap_or_default().trim()
}
