// Input Filter Node Locators
// Create the virtual keyboard and find out which /dev/input node it got

use super::descriptor::DeviceDescriptor;
use super::error::{SetupError, SetupResult};
use super::uinput::VirtualKeyboard;
use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Freshly created virtual keyboard and the node it landed on
#[derive(Debug)]
pub struct LocatedDevice {
    pub keyboard: VirtualKeyboard,
    pub node: PathBuf,
}

/// Strategy for learning the device node of a new uinput device
///
/// The kernel offers no portable way to ask for this, so the strategy is
/// kept behind one interface and can be swapped without touching the
/// substitution steps around it.
pub trait NodeLocator {
    fn name(&self) -> &'static str;

    /// Runs before the real device is created
    fn prepare(&mut self, descriptor: &DeviceDescriptor) -> SetupResult<()>;

    /// Create the virtual keyboard and return it with its node path
    fn allocate_and_locate(&mut self, descriptor: &DeviceDescriptor) -> SetupResult<LocatedDevice>;

    /// Drop anything `prepare` created
    fn release(&mut self) -> SetupResult<()>;
}

/// Burns node indices with throwaway devices so the real one lands on a
/// known path.
///
/// This is a heuristic: it assumes nothing else creates input devices
/// in between and that indices are handed out sequentially.
pub struct DecoyLocator {
    count: usize,
    expected: PathBuf,
    decoys: Vec<VirtualDevice>,
}

impl DecoyLocator {
    pub fn new(count: usize, expected: impl Into<PathBuf>) -> Self {
        Self {
            count,
            expected: expected.into(),
            decoys: Vec::new(),
        }
    }

    pub fn expected(&self) -> &Path {
        &self.expected
    }

    pub fn decoy_count(&self) -> usize {
        self.decoys.len()
    }
}

impl NodeLocator for DecoyLocator {
    fn name(&self) -> &'static str {
        "decoy"
    }

    fn prepare(&mut self, descriptor: &DeviceDescriptor) -> SetupResult<()> {
        for index in 0..self.count {
            let name = format!("decoy{}", index);
            let decoy = VirtualDeviceBuilder::new()
                .and_then(|builder| builder.name(&name).input_id(descriptor.input_id()).build())
                .map_err(|source| SetupError::Decoy { index, source })?;
            log::debug!("Created decoy device '{}'", name);
            self.decoys.push(decoy);
        }
        Ok(())
    }

    fn allocate_and_locate(&mut self, descriptor: &DeviceDescriptor) -> SetupResult<LocatedDevice> {
        if self.expected.exists() {
            return Err(SetupError::TargetPreexisting(self.expected.clone()));
        }

        let keyboard = VirtualKeyboard::create(descriptor).map_err(SetupError::CreateDevice)?;

        if !self.expected.exists() {
            return Err(SetupError::NodeMissing(self.expected.clone()));
        }

        Ok(LocatedDevice {
            keyboard,
            node: self.expected.clone(),
        })
    }

    fn release(&mut self) -> SetupResult<()> {
        let count = self.decoys.len();
        // Closing a uinput descriptor destroys its device.
        self.decoys.clear();
        log::debug!("Destroyed {} decoy device(s)", count);
        Ok(())
    }
}

/// Sysfs directory holding uinput-created devices
pub const SYS_VIRTUAL_INPUT: &str = "/sys/devices/virtual/input";

/// Directory holding evdev nodes
pub const DEV_INPUT: &str = "/dev/input";

/// Asks the kernel for the device's sysname and follows sysfs to its
/// `eventN` node. Requires Linux 3.15+.
pub struct SysnameLocator {
    sys_root: PathBuf,
    dev_root: PathBuf,
    timeout: Duration,
}

impl SysnameLocator {
    pub fn new(timeout: Duration) -> Self {
        Self::with_roots(SYS_VIRTUAL_INPUT, DEV_INPUT, timeout)
    }

    pub fn with_roots(sys_root: impl Into<PathBuf>, dev_root: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            sys_root: sys_root.into(),
            dev_root: dev_root.into(),
            timeout,
        }
    }

    /// Wait up to the configured timeout for `sysname`'s event node to appear
    pub fn wait_for_node(&self, sysname: &str) -> SetupResult<PathBuf> {
        let sys_dir = self.sys_root.join(sysname);
        let deadline = Instant::now() + self.timeout;
        loop {
            match event_node(&sys_dir, &self.dev_root) {
                Ok(Some(node)) => return Ok(node),
                Ok(None) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(SetupError::Locate(format!("{}: {}", sys_dir.display(), e))),
            }
            if Instant::now() >= deadline {
                return Err(SetupError::Locate(format!(
                    "no event node under {} after {:?}",
                    sys_dir.display(),
                    self.timeout
                )));
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }
}

impl NodeLocator for SysnameLocator {
    fn name(&self) -> &'static str {
        "sysname"
    }

    fn prepare(&mut self, _descriptor: &DeviceDescriptor) -> SetupResult<()> {
        Ok(())
    }

    fn allocate_and_locate(&mut self, descriptor: &DeviceDescriptor) -> SetupResult<LocatedDevice> {
        let keyboard = VirtualKeyboard::create(descriptor).map_err(SetupError::CreateDevice)?;
        let sysname = keyboard
            .sysname()
            .map_err(|e| SetupError::Locate(format!("UI_GET_SYSNAME failed: {}", e)))?;
        log::debug!("Virtual keyboard registered as {}", sysname);

        let node = self.wait_for_node(&sysname)?;
        Ok(LocatedDevice { keyboard, node })
    }

    fn release(&mut self) -> SetupResult<()> {
        Ok(())
    }
}

/// Find the `eventN` child of a sysfs input device and map it into `dev_root`.
///
/// Returns `None` until both the sysfs entry and the device node exist.
pub fn event_node(sys_dir: &Path, dev_root: &Path) -> io::Result<Option<PathBuf>> {
    for entry in std::fs::read_dir(sys_dir)? {
        let name = entry?.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let is_event = name
            .strip_prefix("event")
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()));
        if !is_event {
            continue;
        }

        let node = dev_root.join(name);
        if node.exists() {
            return Ok(Some(node));
        }
    }
    Ok(None)
}
