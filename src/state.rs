//! State management module - per-device CEC state
//!
//! Holds the device records discovered by the bus scan and the table the
//! session actor mutates as adapter output arrives.

mod table;
mod types;

pub use table::DeviceTable;
pub use types::{ActiveSource, DeviceRecord, LogicalAddress, PowerStatus};
