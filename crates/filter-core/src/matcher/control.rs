// Input Filter Captured Controls
// Steering-wheel and commander controls and the key codes they send

use evdev::Key;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// A physical control on the head unit's input surface
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Control {
    SteeringTalk,
    NextTrack,
    PrevTrack,
    Music,
    Home,
    Nav,
    Back,
    Favourite,
    CommanderPress,
    CommanderLeft,
    CommanderUp,
    CommanderRight,
    CommanderDown,
    CommanderRotateLeft,
    CommanderRotateRight,
}

impl Control {
    /// Key code the keyboard device reports for this control
    pub fn key(self) -> Key {
        match self {
            Control::SteeringTalk => Key::KEY_G,
            Control::NextTrack => Key::KEY_LEFTBRACE,
            Control::PrevTrack => Key::KEY_RIGHTBRACE,
            Control::Music => Key::KEY_E,
            Control::Home => Key::KEY_HOME,
            Control::Nav => Key::KEY_R,
            Control::Back => Key::KEY_BACKSPACE,
            Control::Favourite => Key::KEY_T,
            Control::CommanderPress => Key::KEY_ENTER,
            Control::CommanderLeft => Key::KEY_LEFT,
            Control::CommanderUp => Key::KEY_UP,
            Control::CommanderRight => Key::KEY_RIGHT,
            Control::CommanderDown => Key::KEY_DOWN,
            Control::CommanderRotateLeft => Key::KEY_N,
            Control::CommanderRotateRight => Key::KEY_M,
        }
    }

    pub fn from_key(key: Key) -> Option<Self> {
        Control::iter().find(|control| control.key() == key)
    }
}

/// Key codes considered interceptable, fixed at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedKeySet {
    keys: BTreeMap<u16, Control>,
}

impl CapturedKeySet {
    /// Every known control
    pub fn all() -> Self {
        Self::from_controls(Control::iter())
    }

    pub fn from_controls(controls: impl IntoIterator<Item = Control>) -> Self {
        Self {
            keys: controls
                .into_iter()
                .map(|control| (control.key().code(), control))
                .collect(),
        }
    }

    pub fn contains(&self, code: u16) -> bool {
        self.keys.contains_key(&code)
    }

    pub fn control_for(&self, code: u16) -> Option<Control> {
        self.keys.get(&code).copied()
    }

    /// Captured key codes in ascending order
    pub fn codes(&self) -> impl Iterator<Item = u16> + '_ {
        self.keys.keys().copied()
    }

    pub fn controls(&self) -> impl Iterator<Item = Control> + '_ {
        self.keys.values().copied()
    }

    pub fn max_code(&self) -> Option<u16> {
        self.keys.keys().next_back().copied()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl Default for CapturedKeySet {
    fn default() -> Self {
        Self::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_controls_have_distinct_keys() {
        let set = CapturedKeySet::all();
        assert_eq!(set.len(), Control::iter().count());
    }

    #[test]
    fn test_control_names_round_trip_through_strum() {
        assert_eq!(Control::SteeringTalk.to_string(), "steering_talk");
        assert_eq!(
            Control::from_str("commander_rotate_left").unwrap(),
            Control::CommanderRotateLeft
        );
        assert!(Control::from_str("horn").is_err());
    }

    #[test]
    fn test_from_key() {
        assert_eq!(Control::from_key(Key::KEY_G), Some(Control::SteeringTalk));
        assert_eq!(Control::from_key(Key::KEY_M), Some(Control::CommanderRotateRight));
        assert_eq!(Control::from_key(Key::KEY_A), None);
    }

    #[test]
    fn test_subset() {
        let set = CapturedKeySet::from_controls([Control::Home, Control::Back]);
        assert!(set.contains(Key::KEY_HOME.code()));
        assert!(set.contains(Key::KEY_BACKSPACE.code()));
        assert!(!set.contains(Key::KEY_G.code()));
        assert_eq!(set.control_for(Key::KEY_HOME.code()), Some(Control::Home));
        assert_eq!(set.max_code(), Some(Key::KEY_HOME.code()));
    }

    #[test]
    fn test_default_set_fits_in_standard_key_range() {
        // KEY_DOWN (108) is the highest default code
        assert_eq!(CapturedKeySet::all().max_code(), Some(Key::KEY_DOWN.code()));
    }
}
