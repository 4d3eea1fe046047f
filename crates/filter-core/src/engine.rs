// Input Filter Engine
// Startup sequence and the running filter

use crate::device::{
    NodeLocator, SetupError, SetupResult, SourceDevice, Substituted, SubstitutionManager,
    SubstitutionPlan, VirtualKeyboard,
};
use crate::event::{EventLoop, EventLoopResult, Interceptor};
use crate::gate::SafetyGate;
use crate::matcher::{CapturedKeySet, KeyCaptureMatcher, MatcherRegistry};
use crate::mode::{InterceptMode, ShutdownToken};
use crate::notify::Notifier;
use crate::settings::Settings;
use std::sync::Arc;

/// A substituted source device with its filter attached
///
/// Dropping the engine destroys the virtual keyboard. The source path keeps
/// pointing at the dead node; restoring it is left to the next boot.
pub struct FilterEngine {
    source: SourceDevice,
    keyboard: VirtualKeyboard,
    interceptor: Interceptor,
}

impl FilterEngine {
    /// Gate, validate and substitute according to `settings`
    pub fn start(
        settings: &Settings,
        gate: &dyn SafetyGate,
        notifier: Arc<dyn Notifier>,
        mode: InterceptMode,
    ) -> SetupResult<Self> {
        check_gate(gate)?;

        settings
            .validate()
            .map_err(|e| SetupError::Settings(e.to_string()))?;
        let keys = settings
            .captured_keys()
            .map_err(|e| SetupError::Settings(e.to_string()))?;

        let plan = SubstitutionPlan {
            source: settings.device.source.clone(),
            descriptor: settings.descriptor(),
            settle: settings.settle(),
        };
        let mut locator = settings.locator();

        Self::start_with(plan, locator.as_mut(), keys, notifier, mode)
    }

    /// Substitute with an explicit plan and locator; the gate is the caller's job
    pub fn start_with(
        plan: SubstitutionPlan,
        locator: &mut dyn NodeLocator,
        keys: CapturedKeySet,
        notifier: Arc<dyn Notifier>,
        mode: InterceptMode,
    ) -> SetupResult<Self> {
        if let Err(code) = plan.descriptor.covers(&keys) {
            return Err(SetupError::Settings(format!(
                "captured key code {} is outside the virtual keyboard's key range",
                code
            )));
        }

        let Substituted { source, keyboard } = SubstitutionManager::new(plan, locator).run()?;

        let registry = MatcherRegistry::new().with(KeyCaptureMatcher::new(keys, notifier));
        log::info!(
            "Filter ready on {} (interception {})",
            source.path().display(),
            if mode.is_enabled() { "enabled" } else { "disabled" }
        );

        Ok(Self {
            source,
            keyboard,
            interceptor: Interceptor::new(registry, mode),
        })
    }

    pub fn mode(&self) -> &InterceptMode {
        self.interceptor.mode()
    }

    pub fn source(&self) -> &SourceDevice {
        &self.source
    }

    pub fn keyboard(&self) -> &VirtualKeyboard {
        &self.keyboard
    }

    /// Pump events until `shutdown` is cancelled, then tear down
    pub fn run(self, shutdown: &ShutdownToken) -> EventLoopResult<()> {
        let Self {
            source,
            mut keyboard,
            interceptor,
        } = self;
        let result = EventLoop::new(source, &mut keyboard, &interceptor).run(shutdown);
        if let Err(ref e) = result {
            log::error!("Event loop failed: {}", e);
        }
        result
    }
}

/// Refuse to start unless `gate` permits interception
pub fn check_gate(gate: &dyn SafetyGate) -> SetupResult<()> {
    if gate.permits() {
        log::debug!("Safety gate passed ({})", gate.describe());
        Ok(())
    } else {
        log::warn!("Safety gate refused ({})", gate.describe());
        Err(SetupError::NotPermitted(gate.describe()))
    }
}
