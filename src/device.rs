//! Per-device facades handed out by [`CecBridge::devices`]

use crate::session::CecBridge;
use crate::state::{ActiveSource, DeviceRecord, LogicalAddress, PowerStatus};

/// Any scanned device
#[derive(Clone)]
pub struct DeviceHandle {
    bridge: CecBridge,
    record: DeviceRecord,
}

impl DeviceHandle {
    pub fn key(&self) -> String {
        self.record.key()
    }

    pub fn address(&self) -> LogicalAddress {
        self.record.logical_address
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub async fn turn_on(&self) -> Option<PowerStatus> {
        self.bridge.change_power(&self.key(), PowerStatus::On).await
    }

    pub async fn turn_off(&self) -> Option<PowerStatus> {
        self.bridge
            .change_power(&self.key(), PowerStatus::Standby)
            .await
    }

    pub async fn status(&self) -> Option<PowerStatus> {
        self.bridge.get_status(&self.key()).await
    }

    pub async fn active(&self) -> Option<ActiveSource> {
        self.bridge.get_active(&self.key()).await
    }
}

/// A device named `TV`, which can also switch its HDMI input
#[derive(Clone)]
pub struct TvDevice {
    device: DeviceHandle,
}

impl TvDevice {
    /// Switch to `port`, or to the next port in the rotation when `None`/0
    ///
    /// Resolves with the coarse command acknowledgement only; the TV does not
    /// confirm the switch.
    pub async fn change_source(&self, port: Option<u8>) -> Option<bool> {
        self.device
            .bridge
            .change_source(self.device.address(), port)
            .await
    }
}

impl std::ops::Deref for TvDevice {
    type Target = DeviceHandle;

    fn deref(&self) -> &DeviceHandle {
        &self.device
    }
}

#[derive(Clone)]
pub enum Device {
    Generic(DeviceHandle),
    Tv(TvDevice),
}

impl Device {
    pub(crate) fn new(bridge: CecBridge, record: DeviceRecord) -> Self {
        let is_tv = record.is_tv();
        let device = DeviceHandle { bridge, record };
        if is_tv {
            Device::Tv(TvDevice { device })
        } else {
            Device::Generic(device)
        }
    }

    pub fn handle(&self) -> &DeviceHandle {
        match self {
            Device::Generic(device) => device,
            Device::Tv(tv) => &tv.device,
        }
    }

    pub fn as_tv(&self) -> Option<&TvDevice> {
        match self {
            Device::Tv(tv) => Some(tv),
            Device::Generic(_) => None,
        }
    }

    pub fn key(&self) -> String {
        self.handle().key()
    }

    pub fn name(&self) -> &str {
        self.handle().name()
    }

    pub async fn turn_on(&self) -> Option<PowerStatus> {
        self.handle().turn_on().await
    }

    pub async fn turn_off(&self) -> Option<PowerStatus> {
        self.handle().turn_off().await
    }
}
