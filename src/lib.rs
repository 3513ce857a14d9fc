//! CEC Bridge
//!
//! Supervises a `cec-client` process: scans the HDMI-CEC bus, keeps a table
//! of devices, turns the adapter's text output into typed events and offers
//! correlated queries ("is the TV on?") that always settle, with `None` when
//! the bus stays silent.

pub mod adapter;
pub mod classifier;
pub mod config;
pub mod device;
pub mod error;
pub mod events;
pub mod keymap;
pub mod keys;
pub mod scan;
pub mod session;
pub mod state;

pub use adapter::{Adapter, AdapterProcess, CecClientAdapter};
pub use config::BridgeConfig;
pub use device::{Device, DeviceHandle, TvDevice};
pub use error::{AdapterError, BridgeError};
pub use events::{CecEvent, Key};
pub use session::CecBridge;
pub use state::{ActiveSource, DeviceRecord, DeviceTable, LogicalAddress, PowerStatus};
