//! Configuration management for CEC Bridge
//!
//! Handles loading, parsing, normalizing and validating the YAML
//! configuration file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, warn};

/// Longest OSD name the adapter accepts is 12 characters
const MAX_OSD_LEN: usize = 12;
/// HDMI ports are the top nibble of a physical address
pub const MAX_HDMI_PORTS: u8 = 15;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct BridgeConfig {
    /// Name this adapter advertises on the bus; also used to find "self"
    #[serde(default = "default_osd_string")]
    pub osd_string: String,
    /// cec-client device type (`p` playback, `r` recorder, `t` tuner, `a` audio)
    #[serde(default = "default_device_type")]
    pub device_type: String,
    /// Number of HDMI inputs the TV source rotation cycles through
    #[serde(default = "default_hdmi_ports")]
    pub hdmi_ports: u8,
    /// Send routing changes to everyone instead of only the TV
    #[serde(default = "default_true")]
    pub broadcast: bool,
    #[serde(default)]
    pub adapter: AdapterConfig,
    #[serde(default)]
    pub timing: TimingConfig,
}

/// Adapter process configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AdapterConfig {
    #[serde(default = "default_program")]
    pub program: String,
    /// `-d` log level for the one-shot scan
    #[serde(default = "default_scan_log_level")]
    pub scan_log_level: u8,
    /// `-d` log level for the long-lived process (8 = traffic)
    #[serde(default = "default_monitor_log_level")]
    pub monitor_log_level: u8,
    /// Respawn attempts after an unexpected exit before giving up
    #[serde(default = "default_max_restarts")]
    pub max_restarts: u32,
}

/// Deadlines and intervals, all in milliseconds
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TimingConfig {
    #[serde(default = "default_query_timeout")]
    pub query_timeout_ms: u64,
    #[serde(default = "default_power_change_timeout")]
    pub power_change_timeout_ms: u64,
    #[serde(default = "default_active_change_timeout")]
    pub active_change_timeout_ms: u64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_key_release")]
    pub key_release_ms: u64,
    #[serde(default = "default_ack_timeout")]
    pub ack_timeout_ms: u64,
}

impl TimingConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn power_change_timeout(&self) -> Duration {
        Duration::from_millis(self.power_change_timeout_ms)
    }

    pub fn active_change_timeout(&self) -> Duration {
        Duration::from_millis(self.active_change_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn key_release(&self) -> Duration {
        Duration::from_millis(self.key_release_ms)
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }
}

impl BridgeConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: BridgeConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML config: {}", path))?;

        let config = config.normalized();
        config.validate()?;

        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to defaults
    pub async fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path).await
        } else {
            debug!("Config file {} not found, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Replace out-of-range user values with defaults
    ///
    /// The adapter silently truncates long OSD names, which would break
    /// self-resolution, so those fall back to the default name.
    pub fn normalized(mut self) -> Self {
        if self.osd_string.is_empty() || self.osd_string.chars().count() > MAX_OSD_LEN {
            warn!(
                "OSD string '{}' must be 1-{} characters, using '{}'",
                self.osd_string,
                MAX_OSD_LEN,
                default_osd_string()
            );
            self.osd_string = default_osd_string();
        }

        self.device_type = match self.device_type.chars().next() {
            Some(c) => c.to_string(),
            None => default_device_type(),
        };

        if self.hdmi_ports == 0 {
            self.hdmi_ports = default_hdmi_ports();
        }

        self
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        if self.adapter.program.trim().is_empty() {
            anyhow::bail!("adapter.program cannot be empty");
        }

        if self.hdmi_ports == 0 || self.hdmi_ports > MAX_HDMI_PORTS {
            anyhow::bail!(
                "hdmi_ports must be between 1 and {}, got {}",
                MAX_HDMI_PORTS,
                self.hdmi_ports
            );
        }

        let timing = &self.timing;
        for (name, value) in [
            ("query_timeout_ms", timing.query_timeout_ms),
            ("power_change_timeout_ms", timing.power_change_timeout_ms),
            ("active_change_timeout_ms", timing.active_change_timeout_ms),
            ("key_release_ms", timing.key_release_ms),
            ("ack_timeout_ms", timing.ack_timeout_ms),
        ] {
            if value == 0 {
                anyhow::bail!("timing.{} must be greater than zero", name);
            }
        }

        Ok(())
    }

    /// Device type as the single character cec-client expects
    pub fn device_type_code(&self) -> char {
        self.device_type.chars().next().unwrap_or('p')
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            osd_string: default_osd_string(),
            device_type: default_device_type(),
            hdmi_ports: default_hdmi_ports(),
            broadcast: true,
            adapter: AdapterConfig::default(),
            timing: TimingConfig::default(),
        }
    }
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            scan_log_level: default_scan_log_level(),
            monitor_log_level: default_monitor_log_level(),
            max_restarts: default_max_restarts(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            query_timeout_ms: default_query_timeout(),
            power_change_timeout_ms: default_power_change_timeout(),
            active_change_timeout_ms: default_active_change_timeout(),
            poll_interval_ms: default_poll_interval(),
            key_release_ms: default_key_release(),
            ack_timeout_ms: default_ack_timeout(),
        }
    }
}

// Default value functions
fn default_osd_string() -> String { "CEC-Control".to_string() }
fn default_device_type() -> String { "p".to_string() }
fn default_hdmi_ports() -> u8 { 3 }
fn default_true() -> bool { true }
fn default_program() -> String { "cec-client".to_string() }
fn default_scan_log_level() -> u8 { 1 }
fn default_monitor_log_level() -> u8 { 8 }
fn default_max_restarts() -> u32 { 10 }
fn default_query_timeout() -> u64 { 10_000 }
fn default_power_change_timeout() -> u64 { 40_000 }
fn default_active_change_timeout() -> u64 { 15_000 }
fn default_poll_interval() -> u64 { 250 }
fn default_key_release() -> u64 { 600 }
fn default_ack_timeout() -> u64 { 10_000 }
