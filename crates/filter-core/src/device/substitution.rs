// Input Filter Device Substitution
// Put a virtual keyboard at the physical keyboard's path

use super::descriptor::DeviceDescriptor;
use super::error::{SetupError, SetupResult};
use super::locator::NodeLocator;
use super::source::SourceDevice;
use super::uinput::VirtualKeyboard;
use evdev::{Device, EventType, Key};
use std::path::{Path, PathBuf};
use std::time::Duration;
use strum_macros::Display;

/// Progress through the substitution; only ever moves forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SubstitutionStage {
    Uninitialized,
    DecoysCreated,
    VirtualDeviceCreated,
    NodeVerified,
    DecoysDestroyed,
    SourceReplaced,
    Aborted,
}

impl SubstitutionStage {
    /// The only stage reachable on success from `self`
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Uninitialized => Some(Self::DecoysCreated),
            Self::DecoysCreated => Some(Self::VirtualDeviceCreated),
            Self::VirtualDeviceCreated => Some(Self::NodeVerified),
            Self::NodeVerified => Some(Self::DecoysDestroyed),
            Self::DecoysDestroyed => Some(Self::SourceReplaced),
            Self::SourceReplaced | Self::Aborted => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::SourceReplaced | Self::Aborted)
    }
}

/// Forward-only stage tracker
#[derive(Debug)]
pub struct StageTracker {
    stage: SubstitutionStage,
}

impl StageTracker {
    pub fn new() -> Self {
        Self {
            stage: SubstitutionStage::Uninitialized,
        }
    }

    pub fn stage(&self) -> SubstitutionStage {
        self.stage
    }

    pub fn advance(&mut self, to: SubstitutionStage) -> SetupResult<()> {
        if self.stage.next() != Some(to) {
            return Err(SetupError::StageOrder { from: self.stage, to });
        }
        log::info!("Substitution: {} -> {}", self.stage, to);
        self.stage = to;
        Ok(())
    }

    /// Record a failure; there is no way back from here
    pub fn abort(&mut self, error: &SetupError) {
        log::error!("Substitution aborted during {}: {}", self.stage, error);
        self.stage = SubstitutionStage::Aborted;
    }
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Inputs to a substitution run
#[derive(Debug, Clone)]
pub struct SubstitutionPlan {
    pub source: PathBuf,
    pub descriptor: DeviceDescriptor,
    /// Time allowed for udev to finish with the new node
    pub settle: Duration,
}

/// A completed substitution
///
/// `keyboard` now lives at `source.path()`; the physical device is only
/// reachable through the descriptor held in `source`.
#[derive(Debug)]
pub struct Substituted {
    pub source: SourceDevice,
    pub keyboard: VirtualKeyboard,
}

/// Runs the substitution steps once, in order, aborting on the first failure
pub struct SubstitutionManager<'a> {
    plan: SubstitutionPlan,
    locator: &'a mut dyn NodeLocator,
    tracker: StageTracker,
}

impl<'a> SubstitutionManager<'a> {
    pub fn new(plan: SubstitutionPlan, locator: &'a mut dyn NodeLocator) -> Self {
        Self {
            plan,
            locator,
            tracker: StageTracker::new(),
        }
    }

    pub fn stage(&self) -> SubstitutionStage {
        self.tracker.stage()
    }

    /// Run every step once; afterwards `stage()` is `SourceReplaced` or `Aborted`
    pub fn run(&mut self) -> SetupResult<Substituted> {
        match self.steps() {
            Ok(done) => Ok(done),
            Err(e) => {
                self.tracker.abort(&e);
                Err(e)
            }
        }
    }

    fn steps(&mut self) -> SetupResult<Substituted> {
        let plan = &self.plan;
        log::info!(
            "Substituting {} using the {} locator",
            plan.source.display(),
            self.locator.name()
        );

        let source = SourceDevice::open(&plan.source).map_err(|source| SetupError::OpenSource {
            path: plan.source.clone(),
            source,
        })?;

        self.locator.prepare(&plan.descriptor)?;
        self.tracker.advance(SubstitutionStage::DecoysCreated)?;

        let located = self.locator.allocate_and_locate(&plan.descriptor)?;
        self.tracker.advance(SubstitutionStage::VirtualDeviceCreated)?;
        log::info!("Virtual keyboard created at {}", located.node.display());

        verify_node(&located.node, &plan.descriptor)?;
        self.tracker.advance(SubstitutionStage::NodeVerified)?;

        if !plan.settle.is_zero() {
            log::debug!("Waiting {:?} for udev to settle", plan.settle);
            std::thread::sleep(plan.settle);
        }

        self.locator.release()?;
        self.tracker.advance(SubstitutionStage::DecoysDestroyed)?;

        replace_node(&plan.source, &located.node)?;
        self.tracker.advance(SubstitutionStage::SourceReplaced)?;
        log::info!("{} now refers to the virtual keyboard", plan.source.display());

        Ok(Substituted {
            source,
            keyboard: located.keyboard,
        })
    }
}

/// Open `node` and confirm it is the device `descriptor` describes
pub fn verify_node(node: &Path, descriptor: &DeviceDescriptor) -> SetupResult<()> {
    let fail = |reason: String| SetupError::Verification {
        path: node.to_path_buf(),
        reason,
    };

    let device = Device::open(node).map_err(|e| fail(format!("cannot open: {}", e)))?;
    check_capabilities(
        device.name(),
        |code| device.supported_keys().is_some_and(|keys| keys.contains(Key::new(code))),
        device.supported_events().contains(EventType::LED),
        descriptor,
    )
    .map_err(fail)
}

/// Compare what a device reports with what was declared
pub fn check_capabilities(
    name: Option<&str>,
    has_key: impl Fn(u16) -> bool,
    has_led: bool,
    descriptor: &DeviceDescriptor,
) -> Result<(), String> {
    if name != Some(descriptor.name()) {
        return Err(format!(
            "name is {:?}, expected {:?}",
            name.unwrap_or(""),
            descriptor.name()
        ));
    }

    // The kernel clears KEY_RESERVED from every registered device
    if let Some(code) = descriptor
        .key_range()
        .filter(|code| *code != Key::KEY_RESERVED.code())
        .find(|code| !has_key(*code))
    {
        return Err(format!("key code {} is not advertised", code));
    }

    if !has_led {
        return Err("LED events are not advertised".to_string());
    }
    Ok(())
}

/// Unlink `original`, then move `new_node` into its place.
///
/// Between the two calls the original path does not exist; nothing can
/// close that window, and a failure inside it is not rolled back.
pub fn replace_node(original: &Path, new_node: &Path) -> SetupResult<()> {
    std::fs::remove_file(original).map_err(|source| SetupError::Unlink {
        path: original.to_path_buf(),
        source,
    })?;

    std::fs::rename(new_node, original).map_err(|source| SetupError::Rename {
        from: new_node.to_path_buf(),
        to: original.to_path_buf(),
        source,
    })
}
