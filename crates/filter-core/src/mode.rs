// Input Filter Mode Controller
// Interception on/off flag and cooperative shutdown, driven by signals

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Process-wide interception flag
///
/// Cloning shares the same cell. The event loop reads it once per batch,
/// so a toggle takes effect from the next batch onward.
#[derive(Debug, Clone, Default)]
pub struct InterceptMode(Arc<AtomicBool>);

impl InterceptMode {
    /// Create a flag, disabled unless `enabled` is set
    pub fn new(enabled: bool) -> Self {
        Self(Arc::new(AtomicBool::new(enabled)))
    }

    pub fn enable(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn disable(&self) {
        self.0.store(false, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Cancellation token checked by the event loop between waits
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken(Arc<AtomicBool>);

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The external control surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    /// SIGUSR1
    Enable,
    /// SIGUSR2
    Disable,
    /// SIGINT or SIGTERM
    Terminate,
}

impl ControlSignal {
    /// Raw signal numbers to subscribe to
    pub const RAW: [libc::c_int; 4] = [libc::SIGUSR1, libc::SIGUSR2, libc::SIGINT, libc::SIGTERM];

    pub fn from_raw(signal: libc::c_int) -> Option<Self> {
        match signal {
            libc::SIGUSR1 => Some(Self::Enable),
            libc::SIGUSR2 => Some(Self::Disable),
            libc::SIGINT | libc::SIGTERM => Some(Self::Terminate),
            _ => None,
        }
    }
}

/// Applies control signals to the shared mode and shutdown cells
#[derive(Debug, Clone)]
pub struct ModeController {
    mode: InterceptMode,
    shutdown: ShutdownToken,
}

impl ModeController {
    pub fn new(mode: InterceptMode, shutdown: ShutdownToken) -> Self {
        Self { mode, shutdown }
    }

    pub fn mode(&self) -> &InterceptMode {
        &self.mode
    }

    pub fn shutdown(&self) -> &ShutdownToken {
        &self.shutdown
    }

    pub fn handle(&self, signal: ControlSignal) {
        match signal {
            ControlSignal::Enable => {
                self.mode.enable();
                log::info!("Interception enabled");
            }
            ControlSignal::Disable => {
                self.mode.disable();
                log::info!("Interception disabled");
            }
            ControlSignal::Terminate => {
                log::info!("Termination requested");
                self.shutdown.cancel();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_defaults_to_disabled() {
        assert!(!InterceptMode::default().is_enabled());
        assert!(InterceptMode::new(true).is_enabled());
    }

    #[test]
    fn test_mode_clones_share_state() {
        let mode = InterceptMode::default();
        let other = mode.clone();
        other.enable();
        assert!(mode.is_enabled());
        other.disable();
        assert!(!mode.is_enabled());
    }

    #[test]
    fn test_signal_mapping() {
        assert_eq!(ControlSignal::from_raw(libc::SIGUSR1), Some(ControlSignal::Enable));
        assert_eq!(ControlSignal::from_raw(libc::SIGUSR2), Some(ControlSignal::Disable));
        assert_eq!(ControlSignal::from_raw(libc::SIGINT), Some(ControlSignal::Terminate));
        assert_eq!(ControlSignal::from_raw(libc::SIGTERM), Some(ControlSignal::Terminate));
        assert_eq!(ControlSignal::from_raw(libc::SIGHUP), None);
    }

    #[test]
    fn test_controller_applies_signals() {
        let controller = ModeController::new(InterceptMode::default(), ShutdownToken::new());
        controller.handle(ControlSignal::Enable);
        assert!(controller.mode().is_enabled());
        controller.handle(ControlSignal::Disable);
        assert!(!controller.mode().is_enabled());
        assert!(!controller.shutdown().is_cancelled());
        controller.handle(ControlSignal::Terminate);
        assert!(controller.shutdown().is_cancelled());
    }
}
