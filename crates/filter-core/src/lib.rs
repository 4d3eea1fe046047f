// Input Filter Core Library
// Keyboard substitution and key capture for a single evdev source

pub mod device;
pub mod engine;
pub mod event;
pub mod gate;
pub mod matcher;
pub mod mode;
pub mod notify;
pub mod settings;

pub use device::{
    list_input_devices, DecoyLocator, DeviceDescriptor, DeviceInfo, NodeLocator, SetupError,
    SetupResult, SourceDevice, SubstitutionManager, SubstitutionPlan, SubstitutionStage,
    SysnameLocator, VirtualKeyboard,
};
pub use engine::{check_gate, FilterEngine};
pub use event::{
    EventLoop, EventLoopError, EventLoopResult, EventSink, Interceptor, RawEvent,
};
pub use gate::{FlagFileGate, OpenGate, SafetyGate};
pub use matcher::{CapturedKeySet, Control, KeyCaptureMatcher, Matcher, MatcherRegistry, Verdict};
pub use mode::{ControlSignal, InterceptMode, ModeController, ShutdownToken};
pub use notify::{
    DatagramNotifier, KeyNotification, LogNotifier, MemoryNotifier, Notifier, NotifyError,
};
pub use settings::{default_settings_content, LocatorKind, Settings, SettingsError};
