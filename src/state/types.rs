//! CEC device state type definitions
//!
//! Defines the core types for representing logical addresses, power and
//! active-source states, and the per-device record built by the bus scan.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Logical address of a device on the CEC bus (one hex digit, 0-F)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LogicalAddress(u8);

impl LogicalAddress {
    /// Broadcast / unregistered address
    pub const BROADCAST: LogicalAddress = LogicalAddress(0xF);

    /// Create an address from a nibble, rejecting anything above 0xF
    pub fn new(value: u8) -> Option<Self> {
        (value <= 0xF).then_some(Self(value))
    }

    /// Parse a single hex digit ("0".."F", case-insensitive)
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.len() != 1 {
            return None;
        }
        u8::from_str_radix(text, 16).ok().and_then(Self::new)
    }

    /// Raw nibble value
    pub fn value(self) -> u8 {
        self.0
    }

    /// Key used in the device table ("dev" + address)
    pub fn device_key(self) -> String {
        format!("dev{}", self)
    }
}

impl fmt::Display for LogicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}", self.0)
    }
}

impl TryFrom<String> for LogicalAddress {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid logical address '{}'", value))
    }
}

impl From<LogicalAddress> for String {
    fn from(value: LogicalAddress) -> Self {
        value.to_string()
    }
}

/// Power status reported by the adapter for a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerStatus {
    On,
    Standby,
    /// "in transition from standby to on" and friends
    InTransition,
    Unknown,
}

impl PowerStatus {
    /// Interpret the value text of a `power status:` line
    pub fn from_adapter(text: &str) -> Self {
        let text = text.trim().to_ascii_lowercase();
        match text.as_str() {
            "on" => PowerStatus::On,
            "standby" => PowerStatus::Standby,
            t if t.starts_with("in transition") => PowerStatus::InTransition,
            _ => PowerStatus::Unknown,
        }
    }

    /// Command word that drives a device into this state, if any
    pub fn command(&self) -> Option<&'static str> {
        match self {
            PowerStatus::On => Some("on"),
            PowerStatus::Standby => Some("standby"),
            _ => None,
        }
    }
}

impl fmt::Display for PowerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerStatus::On => write!(f, "on"),
            PowerStatus::Standby => write!(f, "standby"),
            PowerStatus::InTransition => write!(f, "in transition"),
            PowerStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Active-source flag of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActiveSource {
    Yes,
    No,
    Unknown,
}

impl ActiveSource {
    /// Interpret a `yes` / `no` value from the adapter
    pub fn from_adapter(text: &str) -> Self {
        match text.trim().to_ascii_lowercase().as_str() {
            "yes" => ActiveSource::Yes,
            "no" => ActiveSource::No,
            _ => ActiveSource::Unknown,
        }
    }
}

impl From<bool> for ActiveSource {
    fn from(active: bool) -> Self {
        if active {
            ActiveSource::Yes
        } else {
            ActiveSource::No
        }
    }
}

impl fmt::Display for ActiveSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActiveSource::Yes => write!(f, "yes"),
            ActiveSource::No => write!(f, "no"),
            ActiveSource::Unknown => write!(f, "Unknown"),
        }
    }
}

/// One device discovered by the bus scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub logical_address: LogicalAddress,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub osd_string: Option<String>,
    /// Remaining `key: value` lines of the scan chunk (camelCase keys)
    pub attributes: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_status: Option<PowerStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_source: Option<ActiveSource>,
}

impl DeviceRecord {
    /// Create an empty record for an address
    pub fn new(logical_address: LogicalAddress, name: impl Into<String>) -> Self {
        Self {
            logical_address,
            name: name.into(),
            osd_string: None,
            attributes: BTreeMap::new(),
            power_status: None,
            active_source: None,
        }
    }

    /// Store a scanned attribute, lifting the ones that have typed fields
    pub fn set_attribute(&mut self, key: String, value: String) {
        match key.as_str() {
            "osdString" => self.osd_string = Some(value.clone()),
            "powerStatus" => self.power_status = Some(PowerStatus::from_adapter(&value)),
            "activeSource" => self.active_source = Some(ActiveSource::from_adapter(&value)),
            _ => {}
        }
        self.attributes.insert(key, value);
    }

    /// Table key for this record
    pub fn key(&self) -> String {
        self.logical_address.device_key()
    }

    /// Whether this device gets the source-switch capability
    pub fn is_tv(&self) -> bool {
        self.name == "TV"
    }
}
