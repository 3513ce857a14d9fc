//! Bus scan parsing
//!
//! Turns the one-shot output of `echo scan | cec-client -s ...` into a
//! [`DeviceTable`] and locates the adapter's own entry in it.
//!
//! A scan block looks like:
//!
//! ```text
//! device #0: TV
//! address:       0.0.0.0
//! active source: no
//! vendor:        Samsung
//! osd string:    TV
//! CEC version:   1.4
//! power status:  on
//! language:      eng
//! ```

use tracing::{debug, trace};

use crate::state::{DeviceRecord, DeviceTable, LogicalAddress};

/// Token that starts every device chunk
const DEVICE_DELIMITER: &str = "device #";

/// Parse a complete scan output into a device table
///
/// Chunks without a name or without a valid one-digit address are skipped.
pub fn parse_scan_output(output: &str) -> DeviceTable {
    let mut table = DeviceTable::new();

    for chunk in output.split(DEVICE_DELIMITER) {
        match parse_chunk(chunk) {
            Some(record) => {
                debug!(
                    "Scanned device {}: '{}' ({} attributes)",
                    record.logical_address,
                    record.name,
                    record.attributes.len()
                );
                table.insert(record);
            }
            None => trace!("Skipping non-device scan chunk"),
        }
    }

    table
}

fn parse_chunk(chunk: &str) -> Option<DeviceRecord> {
    let mut lines = chunk.split('\n');
    let first = lines.next()?;

    let (address, name) = first.split_once(':')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let address = LogicalAddress::parse(address)?;

    let mut record = DeviceRecord::new(address, name);

    for line in lines {
        let parts: Vec<&str> = line.split(':').collect();
        if parts.len() != 2 {
            break;
        }
        let key = normalize_key(parts[0]);
        if key.is_empty() {
            break;
        }
        record.set_attribute(key, parts[1].trim().to_string());
    }

    Some(record)
}

/// Lower camel case: `CEC version` -> `cecVersion`, `osd string` -> `osdString`
pub fn normalize_key(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let mut key = String::with_capacity(lowered.len());

    for (idx, word) in lowered.split_whitespace().enumerate() {
        if idx == 0 {
            key.push_str(word);
            continue;
        }
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            key.extend(first.to_uppercase());
            key.push_str(chars.as_str());
        }
    }

    key
}

/// Find the key of the first device advertising our OSD name
pub fn resolve_self(table: &DeviceTable, osd_string: &str) -> Option<String> {
    table
        .iter()
        .find(|(_, record)| record.osd_string.as_deref() == Some(osd_string))
        .map(|(key, _)| key.clone())
}
