//! CecBridge - public API of a running session
//!
//! A cheap, cloneable handle over the session actor's command channel.
//! Fire-and-forget writes go straight to the actor; queries wait on a
//! oneshot answer that the actor guarantees to send exactly once.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use super::actor::SessionActor;
use super::commands::SessionCommand;
use super::poll::poll_until;
use crate::adapter::{Adapter, CecClientAdapter};
use crate::config::{BridgeConfig, MAX_HDMI_PORTS};
use crate::device::Device;
use crate::error::BridgeError;
use crate::events::CecEvent;
use crate::scan::{parse_scan_output, resolve_self};
use crate::state::{ActiveSource, DeviceTable, LogicalAddress, PowerStatus};

/// Buffered events per subscriber before the slowest one starts lagging
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Opcode of `<Routing Change>` used for HDMI input switching
const ROUTING_CHANGE_OPCODE: &str = "82";

/// Handle for a connected CEC session
///
/// # Operations
/// - `command` / `command_to` - raw adapter commands with a coarse ack
/// - `get_status` / `get_active` - correlated queries with a deadline
/// - `change_power` / `change_active` - drive a state and wait for it
/// - `devices` / `device` - per-device facades from the scan
/// - `subscribe` - typed event stream
#[derive(Clone)]
pub struct CecBridge {
    cmd_tx: mpsc::UnboundedSender<SessionCommand>,
    events: broadcast::Sender<CecEvent>,
    shared: Arc<Shared>,
}

struct Shared {
    config: BridgeConfig,
    /// Table as scanned at startup
    roster: DeviceTable,
    self_key: String,
    self_address: LogicalAddress,
    /// Last port picked by source rotation (0 = none yet)
    source_port: Mutex<u8>,
}

impl CecBridge {
    /// Scan the bus, start the adapter process and wait until it is ready
    ///
    /// The first `Ready` event is sent before this returns, so subscribers
    /// only see `Ready` again after a restart.
    pub async fn connect(
        config: BridgeConfig,
        adapter: Arc<dyn Adapter>,
    ) -> Result<Self, BridgeError> {
        info!("Scanning CEC bus with {}", adapter.name());
        let output = adapter.scan().await.map_err(BridgeError::ScanFailed)?;

        let mut table = parse_scan_output(&output);
        if table.is_empty() {
            return Err(BridgeError::NoDevices);
        }
        info!("Found {} CEC device(s)", table.len());

        let self_key = resolve_self(&table, &config.osd_string)
            .ok_or_else(|| BridgeError::SelfNotFound(config.osd_string.clone()))?;
        table.set_self(&self_key);
        let self_address = table
            .self_address()
            .ok_or_else(|| BridgeError::SelfNotFound(config.osd_string.clone()))?;
        debug!("This adapter is {} ({})", self_key, config.osd_string);

        let process = adapter.spawn().await.map_err(BridgeError::Spawn)?;

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (cmd_tx, ready_rx) = SessionActor::spawn(
            adapter,
            &config,
            table.clone(),
            process,
            events.clone(),
        );

        match ready_rx.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(BridgeError::SessionClosed),
        }

        Ok(Self {
            cmd_tx,
            events,
            shared: Arc::new(Shared {
                config,
                roster: table,
                self_key,
                self_address,
                source_port: Mutex::new(0),
            }),
        })
    }

    /// [`connect`](Self::connect) with the `cec-client` adapter
    pub async fn connect_cec_client(config: BridgeConfig) -> Result<Self, BridgeError> {
        let adapter = Arc::new(CecClientAdapter::new(&config));
        Self::connect(config, adapter).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CecEvent> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.shared.config
    }

    pub fn self_key(&self) -> &str {
        &self.shared.self_key
    }

    pub fn self_address(&self) -> LogicalAddress {
        self.shared.self_address
    }

    /// Whether the session actor is still running
    pub fn is_alive(&self) -> bool {
        !self.cmd_tx.is_closed()
    }

    /// Current device table, or None once the session has ended
    pub async fn table(&self) -> Option<DeviceTable> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(SessionCommand::Snapshot { response: tx })
            .ok()?;
        rx.await.ok()
    }

    /// Facades for every scanned device, in key order
    pub fn devices(&self) -> Vec<Device> {
        self.shared
            .roster
            .iter()
            .map(|(_, record)| Device::new(self.clone(), record.clone()))
            .collect()
    }

    pub fn device(&self, key: &str) -> Option<Device> {
        self.shared
            .roster
            .get(key)
            .map(|record| Device::new(self.clone(), record.clone()))
    }

    // =========================================================================
    // Raw commands
    // =========================================================================

    /// Write a raw adapter command
    ///
    /// Resolves `Some(true)` on the next adapter output line, whatever it
    /// says. Empty text resolves `None` without writing anything.
    pub async fn command(&self, text: &str) -> Option<bool> {
        self.send_command(text, None).await
    }

    /// Write a raw command suffixed with a target address
    pub async fn command_to(&self, text: &str, address: LogicalAddress) -> Option<bool> {
        self.send_command(text, Some(address)).await
    }

    async fn send_command(&self, text: &str, target: Option<LogicalAddress>) -> Option<bool> {
        let text = text.trim();
        if text.is_empty() {
            debug!("Ignoring empty command");
            return None;
        }

        let line = match target {
            Some(address) => format!("{} {}", text, address),
            None => text.to_string(),
        };

        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(SessionCommand::Send {
                line,
                ack: Some(tx),
            })
            .ok()?;
        rx.await.ok().flatten()
    }

    /// Write without waiting for any acknowledgement
    fn write(&self, line: String) {
        let _ = self.cmd_tx.send(SessionCommand::Send { line, ack: None });
    }

    pub async fn volume_up(&self) -> Option<bool> {
        self.command("volup").await
    }

    pub async fn volume_down(&self) -> Option<bool> {
        self.command("voldown").await
    }

    pub async fn mute(&self) -> Option<bool> {
        self.command("mute").await
    }

    // =========================================================================
    // Correlated queries
    // =========================================================================

    /// Ask a device for its power status
    ///
    /// `None` when the device is unknown, no answer arrives within the query
    /// timeout (the record then reads `Unknown`) or the session is gone.
    pub async fn get_status(&self, key: &str) -> Option<PowerStatus> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(SessionCommand::QueryPower {
                key: key.to_string(),
                response: tx,
            })
            .ok()?;
        rx.await.ok().flatten()
    }

    /// Ask whether a device is the active source
    pub async fn get_active(&self, key: &str) -> Option<ActiveSource> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(SessionCommand::QueryActive {
                key: key.to_string(),
                response: tx,
            })
            .ok()?;
        rx.await.ok().flatten()
    }

    /// Drive a device to `On` or `Standby` and wait until it reports it
    pub async fn change_power(&self, key: &str, desired: PowerStatus) -> Option<PowerStatus> {
        let Some(action) = desired.command() else {
            warn!("Cannot drive {} to power status {}", key, desired);
            return None;
        };
        let address = self.shared.roster.get(key)?.logical_address;

        let current = self.get_status(key).await?;
        if current == desired {
            return Some(current);
        }

        debug!("Changing power of {} from {} to {}", key, current, desired);
        self.write(format!("{} {}", action, address));

        let timing = &self.shared.config.timing;
        poll_until(
            timing.power_change_timeout(),
            timing.poll_interval(),
            move || self.get_status(key),
            |status| *status == desired,
        )
        .await
    }

    /// Make this adapter the active source (or give it up) and wait for it
    pub async fn change_active(&self, active: bool) -> Option<ActiveSource> {
        let desired = ActiveSource::from(active);
        let key = self.self_key();

        let current = self.get_active(key).await?;
        if current == desired {
            return Some(current);
        }

        debug!("Changing active source flag from {} to {}", current, desired);
        self.write(if active { "as" } else { "is" }.to_string());

        let timing = &self.shared.config.timing;
        poll_until(
            timing.active_change_timeout(),
            timing.poll_interval(),
            move || self.get_active(key),
            |flag| *flag == desired,
        )
        .await
    }

    pub async fn set_active(&self) -> Option<ActiveSource> {
        self.change_active(true).await
    }

    pub async fn set_inactive(&self) -> Option<ActiveSource> {
        self.change_active(false).await
    }

    // =========================================================================
    // Source switching
    // =========================================================================

    /// Port to switch to: the given one, or the next in the rotation
    ///
    /// None for ports that do not fit the physical-address nibble.
    pub(crate) fn next_source_port(&self, port: Option<u8>) -> Option<u8> {
        match port {
            Some(port) if port > MAX_HDMI_PORTS => None,
            Some(port) if port > 0 => Some(port),
            _ => {
                let mut current = self.shared.source_port.lock();
                *current = rotate_port(*current, self.shared.config.hdmi_ports);
                Some(*current)
            }
        }
    }

    /// Send a routing change towards `tv` for the given (or next) HDMI port
    pub(crate) async fn change_source(
        &self,
        tv: LogicalAddress,
        port: Option<u8>,
    ) -> Option<bool> {
        let Some(port) = self.next_source_port(port) else {
            warn!("HDMI port {:?} out of range 1-{}", port, MAX_HDMI_PORTS);
            return None;
        };
        let dest = if self.shared.config.broadcast {
            LogicalAddress::BROADCAST
        } else {
            tv
        };
        info!("Switching TV input to HDMI {}", port);
        self.command(&source_frame(self.shared.self_address, dest, port))
            .await
    }

    /// Stop the adapter process and the session actor
    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(SessionCommand::Shutdown);
    }
}

/// Port after `current` in 1..=ports, with `ports` capped to the nibble range
fn rotate_port(current: u8, ports: u8) -> u8 {
    let ports = ports.clamp(1, MAX_HDMI_PORTS);
    if current < ports {
        current + 1
    } else {
        1
    }
}

/// `tx` frame for a routing change to `port` (physical address `port.0.0.0`)
fn source_frame(from: LogicalAddress, to: LogicalAddress, port: u8) -> String {
    format!(
        "tx {}{}:{}:{:X}0:00",
        from, to, ROUTING_CHANGE_OPCODE, port
    )
}
