// Input Filter Settings Module
// Startup configuration loaded from TOML

use crate::device::{
    DecoyLocator, DeviceDescriptor, NodeLocator, SysnameLocator, DEFAULT_DEVICE_NAME, KEY_CNT,
};
use crate::gate::{FlagFileGate, OpenGate, SafetyGate, DEFAULT_FLAG_FILE};
use crate::matcher::{CapturedKeySet, Control};
use crate::notify::{DatagramNotifier, LogNotifier, Notifier, NotifyError};
use evdev::BusType;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Settings for the filter, fixed for the lifetime of the process
///
/// Loaded from a TOML file (default: ~/.config/input-filter/settings.toml);
/// every key is optional and falls back to the head unit defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub device: DeviceSettings,
    pub capture: CaptureSettings,
    pub gate: GateSettings,
    pub notify: NotifySettings,
}

/// Errors that can occur when loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Invalid setting value: {0}")]
    InvalidValue(String),
}

/// How the virtual keyboard's node path is discovered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocatorKind {
    /// Pre-allocate node indices with throwaway devices
    #[default]
    Decoy,
    /// Ask the kernel via UI_GET_SYSNAME (Linux 3.15+)
    Sysname,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceSettings {
    /// Physical keyboard to take over
    pub source: PathBuf,
    /// Node the virtual keyboard is expected to appear at (decoy locator)
    pub target: PathBuf,
    pub name: String,
    pub bus_type: u16,
    pub vendor: u16,
    pub product: u16,
    pub version: u16,
    /// Exclusive upper bound of the declared key codes
    pub key_range_end: u16,
    pub decoys: usize,
    pub settle_ms: u64,
    pub locator: LocatorKind,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            source: PathBuf::from("/dev/input/event1"),
            target: PathBuf::from("/dev/input/event6"),
            name: DEFAULT_DEVICE_NAME.to_string(),
            bus_type: BusType::BUS_USB.0,
            vendor: 0x1234,
            product: 0xfedc,
            version: 1,
            key_range_end: 199,
            decoys: 3,
            settle_ms: 1000,
            locator: LocatorKind::Decoy,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureSettings {
    /// Control names to capture; every known control when absent
    pub controls: Option<Vec<String>>,
    /// Start with interception enabled instead of waiting for SIGUSR1
    pub start_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GateSettings {
    pub flag_file: PathBuf,
    /// Skip the gate entirely
    pub skip: bool,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            flag_file: PathBuf::from(DEFAULT_FLAG_FILE),
            skip: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotifySettings {
    /// Unix datagram socket of the bridge; log-only when unset
    pub socket: Option<PathBuf>,
}

impl Settings {
    /// Create settings with every default
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load settings from TOML string
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        toml::from_str(content).map_err(|e| SettingsError::TomlParse(e.to_string()))
    }

    /// Get the default settings path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("input-filter").join("settings.toml"))
    }

    /// Load from default location (~/.config/input-filter/settings.toml)
    pub fn load_default() -> Result<Self, SettingsError> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::from_file(path);
            }
        }
        // Return default settings if file doesn't exist
        Ok(Self::new())
    }

    /// Check the settings hang together
    pub fn validate(&self) -> Result<(), SettingsError> {
        let keys = self.captured_keys()?;
        if keys.is_empty() {
            return Err(SettingsError::InvalidValue(
                "capture.controls must name at least one control".to_string(),
            ));
        }

        if self.device.key_range_end > KEY_CNT {
            return Err(SettingsError::InvalidValue(format!(
                "device.key_range_end = {} is beyond the kernel's key code limit {}",
                self.device.key_range_end, KEY_CNT
            )));
        }

        if let Err(code) = self.descriptor().covers(&keys) {
            return Err(SettingsError::InvalidValue(format!(
                "device.key_range_end = {} does not cover captured key code {}",
                self.device.key_range_end, code
            )));
        }

        if self.device.name.is_empty() {
            return Err(SettingsError::InvalidValue("device.name is empty".to_string()));
        }

        if self.device.source == self.device.target {
            return Err(SettingsError::InvalidValue(
                "device.source and device.target are the same path".to_string(),
            ));
        }

        if self.device.locator == LocatorKind::Decoy && self.device.decoys == 0 {
            return Err(SettingsError::InvalidValue(
                "device.decoys must be at least 1 with the decoy locator".to_string(),
            ));
        }
        Ok(())
    }

    /// Capture set named by `capture.controls`
    pub fn captured_keys(&self) -> Result<CapturedKeySet, SettingsError> {
        let Some(names) = &self.capture.controls else {
            return Ok(CapturedKeySet::all());
        };

        let controls = names
            .iter()
            .map(|name| {
                Control::from_str(name)
                    .map_err(|_| SettingsError::InvalidValue(format!("Unknown control '{}'", name)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CapturedKeySet::from_controls(controls))
    }

    pub fn descriptor(&self) -> DeviceDescriptor {
        let device = &self.device;
        DeviceDescriptor::new(device.name.clone())
            .with_identity(BusType(device.bus_type), device.vendor, device.product, device.version)
            .with_key_range(0..device.key_range_end)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.device.settle_ms)
    }

    pub fn locator(&self) -> Box<dyn NodeLocator> {
        match self.device.locator {
            LocatorKind::Decoy => Box::new(DecoyLocator::new(self.device.decoys, self.device.target.clone())),
            LocatorKind::Sysname => Box::new(SysnameLocator::new(self.settle())),
        }
    }

    pub fn gate(&self) -> Box<dyn SafetyGate> {
        if self.gate.skip {
            Box::new(OpenGate)
        } else {
            Box::new(FlagFileGate::new(self.gate.flag_file.clone()))
        }
    }

    pub fn notifier(&self) -> Result<Arc<dyn Notifier>, NotifyError> {
        match &self.notify.socket {
            Some(path) => Ok(Arc::new(DatagramNotifier::new(path)?)),
            None => Ok(Arc::new(LogNotifier)),
        }
    }
}

/// Create default settings content for a new installation
pub fn default_settings_content() -> &'static str {
    r#"# Input Filter Settings
# Place this file at: ~/.config/input-filter/settings.toml

[device]
source = "/dev/input/event1"
# Where the virtual keyboard is expected to appear (decoy locator)
target = "/dev/input/event6"
name = "Virtual Keyboard"
key_range_end = 199
decoys = 3
settle_ms = 1000
# "decoy" or "sysname"
locator = "decoy"

[capture]
# Defaults to every known control
# controls = ["steering_talk", "next_track", "prev_track"]
start_enabled = false

[gate]
flag_file = "/tmp/mnt/data/enable_input_filter"

[notify]
# socket = "/tmp/input-filter-bridge.sock"
"#
}
