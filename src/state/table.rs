//! Device table - the shared mapping from device key to device record
//!
//! Owned by the session actor. The classifier writes through it, the
//! correlator reads from it; both run on the actor's single timeline.

use serde::Serialize;
use std::collections::BTreeMap;

use super::types::{ActiveSource, DeviceRecord, LogicalAddress, PowerStatus};

/// Key targeted before any query has been issued
const DEFAULT_TARGET: &str = "dev0";

/// Table of scanned devices plus the "self" and "targeted" pointers
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceTable {
    devices: BTreeMap<String, DeviceRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    self_key: Option<String>,
    targeted_key: Option<String>,
}

impl DeviceTable {
    pub fn new() -> Self {
        Self {
            devices: BTreeMap::new(),
            self_key: None,
            targeted_key: Some(DEFAULT_TARGET.to_string()),
        }
    }

    /// Insert a record, keyed from its own address
    ///
    /// A later record for the same address replaces the earlier one.
    pub fn insert(&mut self, record: DeviceRecord) {
        self.devices.insert(record.key(), record);
    }

    pub fn get(&self, key: &str) -> Option<&DeviceRecord> {
        self.devices.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &DeviceRecord)> {
        self.devices.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.devices.keys()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Designate the session's own device
    ///
    /// Returns false (and changes nothing) if self is already set to a
    /// different key or the key is not in the table.
    pub fn set_self(&mut self, key: &str) -> bool {
        if !self.devices.contains_key(key) {
            return false;
        }
        match &self.self_key {
            Some(existing) => existing == key,
            None => {
                self.self_key = Some(key.to_string());
                true
            }
        }
    }

    pub fn self_key(&self) -> Option<&str> {
        self.self_key.as_deref()
    }

    pub fn self_record(&self) -> Option<&DeviceRecord> {
        self.self_key.as_deref().and_then(|k| self.devices.get(k))
    }

    pub fn self_address(&self) -> Option<LogicalAddress> {
        self.self_record().map(|r| r.logical_address)
    }

    /// Point the next `power status:` line at this device
    pub fn set_targeted(&mut self, key: &str) {
        self.targeted_key = Some(key.to_string());
    }

    pub fn targeted_key(&self) -> Option<&str> {
        self.targeted_key.as_deref()
    }

    /// Record a power status on the targeted device
    ///
    /// Returns the address it was applied to, or None when the targeted key
    /// does not name a scanned device.
    pub fn apply_power_to_targeted(&mut self, status: PowerStatus) -> Option<LogicalAddress> {
        let key = self.targeted_key.clone()?;
        self.set_power(&key, status)
    }

    /// Record the active-source flag on self
    pub fn apply_active_to_self(&mut self, active: ActiveSource) -> Option<LogicalAddress> {
        let key = self.self_key.clone()?;
        self.set_active(&key, active)
    }

    pub fn set_power(&mut self, key: &str, status: PowerStatus) -> Option<LogicalAddress> {
        let record = self.devices.get_mut(key)?;
        record.power_status = Some(status);
        Some(record.logical_address)
    }

    pub fn set_active(&mut self, key: &str, active: ActiveSource) -> Option<LogicalAddress> {
        let record = self.devices.get_mut(key)?;
        record.active_source = Some(active);
        Some(record.logical_address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(addr: u8, name: &str) -> DeviceRecord {
        DeviceRecord::new(LogicalAddress::new(addr).unwrap(), name)
    }

    #[test]
    fn test_insert_keys_by_address() {
        let mut table = DeviceTable::new();
        table.insert(record(0, "TV"));
        table.insert(record(4, "Playback 1"));

        assert_eq!(table.len(), 2);
        let rec = table.get("dev4").unwrap();
        assert_eq!(rec.key(), "dev4");
        assert_eq!(rec.name, "Playback 1");
    }

    #[test]
    fn test_self_is_set_once() {
        let mut table = DeviceTable::new();
        table.insert(record(0, "TV"));
        table.insert(record(1, "Recorder 1"));

        assert!(!table.set_self("dev9"));
        assert!(table.set_self("dev1"));
        assert!(table.set_self("dev1"));
        assert!(!table.set_self("dev0"));
        assert_eq!(table.self_key(), Some("dev1"));
    }

    #[test]
    fn test_power_goes_to_targeted_device() {
        let mut table = DeviceTable::new();
        table.insert(record(0, "TV"));
        table.insert(record(5, "Audio"));

        // defaults to dev0
        let addr = table.apply_power_to_targeted(PowerStatus::On).unwrap();
        assert_eq!(addr.value(), 0);

        table.set_targeted("dev5");
        let addr = table.apply_power_to_targeted(PowerStatus::Standby).unwrap();
        assert_eq!(addr.value(), 5);
        assert_eq!(table.get("dev5").unwrap().power_status, Some(PowerStatus::Standby));
        assert_eq!(table.get("dev0").unwrap().power_status, Some(PowerStatus::On));
    }

    #[test]
    fn test_active_without_self_is_dropped() {
        let mut table = DeviceTable::new();
        table.insert(record(0, "TV"));
        assert_eq!(table.apply_active_to_self(ActiveSource::Yes), None);
    }
}
