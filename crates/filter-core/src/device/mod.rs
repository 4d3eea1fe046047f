// Input Filter Device Layer
// Virtual keyboard creation and node substitution

mod descriptor;
mod error;
pub mod locator;
mod source;
pub mod substitution;
mod uinput;

pub use descriptor::{DeviceDescriptor, DEFAULT_DEVICE_NAME, DEFAULT_KEY_RANGE, DEFAULT_LEDS, KEY_CNT};
pub use error::{SetupError, SetupResult};
pub use locator::{DecoyLocator, LocatedDevice, NodeLocator, SysnameLocator};
pub use source::SourceDevice;
pub use substitution::{
    replace_node, verify_node, StageTracker, Substituted, SubstitutionManager, SubstitutionPlan,
    SubstitutionStage,
};
pub use uinput::{VirtualKeyboard, UINPUT_PATH};

/// Device information for listing devices
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    /// Device index
    pub index: usize,
    /// Device name
    pub name: String,
    /// Device path (if available)
    pub path: Option<String>,
    /// Whether the device reports key events
    pub has_keys: bool,
}

/// List every evdev device visible to this process
///
/// This is what `--list-devices` prints, to help pick the source path.
pub fn list_input_devices() -> Vec<DeviceInfo> {
    let mut devices: Vec<(std::path::PathBuf, evdev::Device)> = evdev::enumerate().collect();
    devices.sort_by(|a, b| a.0.cmp(&b.0));

    devices
        .into_iter()
        .enumerate()
        .map(|(index, (path, device))| DeviceInfo {
            index,
            name: device.name().unwrap_or("Unknown").to_string(),
            path: path.to_str().map(|s| s.to_string()),
            has_keys: device.supported_events().contains(evdev::EventType::KEY),
        })
        .collect()
}
