// Input Filter Device Descriptor
// Identity and capabilities advertised by the virtual keyboard

use crate::matcher::CapturedKeySet;
use evdev::{BusType, EventType, InputId, LedType};
use std::ops::Range;

/// Name the virtual keyboard registers under
pub const DEFAULT_DEVICE_NAME: &str = "Virtual Keyboard";

/// One past the highest key code the kernel accepts
pub const KEY_CNT: u16 = 0x300;

/// Key codes declared by default; covers everything the head unit keyboard sends.
pub const DEFAULT_KEY_RANGE: Range<u16> = 0..199;

/// LEDs the downstream consumers toggle on the keyboard
pub const DEFAULT_LEDS: [LedType; 5] = [
    LedType::LED_NUML,
    LedType::LED_CAPSL,
    LedType::LED_SCROLLL,
    LedType::LED_COMPOSE,
    LedType::LED_KANA,
];

/// Everything the kernel needs to create the virtual keyboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    name: String,
    bus_type: BusType,
    vendor: u16,
    product: u16,
    version: u16,
    key_range: Range<u16>,
    leds: Vec<LedType>,
}

impl DeviceDescriptor {
    /// Descriptor with the stock identity (USB 1234:fedc v1)
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bus_type: BusType::BUS_USB,
            vendor: 0x1234,
            product: 0xfedc,
            version: 1,
            key_range: DEFAULT_KEY_RANGE,
            leds: DEFAULT_LEDS.to_vec(),
        }
    }

    pub fn with_identity(mut self, bus_type: BusType, vendor: u16, product: u16, version: u16) -> Self {
        self.bus_type = bus_type;
        self.vendor = vendor;
        self.product = product;
        self.version = version;
        self
    }

    pub fn with_key_range(mut self, key_range: Range<u16>) -> Self {
        self.key_range = key_range;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input_id(&self) -> InputId {
        InputId::new(self.bus_type, self.vendor, self.product, self.version)
    }

    /// Event kinds the device declares
    pub fn event_kinds(&self) -> [EventType; 3] {
        [EventType::SYNCHRONIZATION, EventType::KEY, EventType::LED]
    }

    pub fn key_range(&self) -> Range<u16> {
        self.key_range.clone()
    }

    pub fn leds(&self) -> &[LedType] {
        &self.leds
    }

    pub fn advertises_key(&self, code: u16) -> bool {
        self.key_range.contains(&code)
    }

    /// Check every captured code is declared; returns the first missing code.
    ///
    /// The kernel silently drops events for undeclared codes.
    pub fn covers(&self, keys: &CapturedKeySet) -> Result<(), u16> {
        match keys.codes().find(|code| !self.advertises_key(*code)) {
            Some(code) => Err(code),
            None => Ok(()),
        }
    }

    /// The legacy `uinput_user_dev` setup record, name truncated to fit
    pub(crate) fn user_dev(&self) -> libc::uinput_user_dev {
        // SAFETY: uinput_user_dev is plain old data; all-zero is its empty value.
        let mut dev: libc::uinput_user_dev = unsafe { std::mem::zeroed() };
        let max = libc::UINPUT_MAX_NAME_SIZE - 1;
        for (dst, src) in dev.name.iter_mut().zip(self.name.bytes().take(max)) {
            *dst = src as libc::c_char;
        }
        dev.id = libc::input_id {
            bustype: self.bus_type.0,
            vendor: self.vendor,
            product: self.product,
            version: self.version,
        };
        dev
    }
}

impl Default for DeviceDescriptor {
    fn default() -> Self {
        Self::new(DEFAULT_DEVICE_NAME)
    }
}
