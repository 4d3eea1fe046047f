// Input Filter Key Capture
// Consumes captured key events and hands them to the notifier

use super::{CapturedKeySet, Matcher, Verdict};
use crate::event::RawEvent;
use crate::notify::{KeyNotification, Notifier};
use std::sync::Arc;

/// Consumes EV_KEY events whose code is in the captured set
pub struct KeyCaptureMatcher {
    keys: CapturedKeySet,
    notifier: Arc<dyn Notifier>,
}

impl KeyCaptureMatcher {
    pub fn new(keys: CapturedKeySet, notifier: Arc<dyn Notifier>) -> Self {
        Self { keys, notifier }
    }

    pub fn keys(&self) -> &CapturedKeySet {
        &self.keys
    }
}

impl Matcher for KeyCaptureMatcher {
    fn name(&self) -> &str {
        "key-capture"
    }

    fn try_consume(&self, event: &RawEvent) -> Verdict {
        if !event.is_key() {
            return Verdict::Passed;
        }
        let Some(control) = self.keys.control_for(event.code()) else {
            return Verdict::Passed;
        };

        log::debug!("Captured {} ({:?}) value={}", control, event, event.value());
        self.notifier.notify(&KeyNotification::new(control, event));
        Verdict::Consumed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::Control;
    use crate::notify::MemoryNotifier;
    use evdev::{EventType, Key};

    fn matcher() -> (KeyCaptureMatcher, Arc<MemoryNotifier>) {
        let notifier = Arc::new(MemoryNotifier::new());
        let matcher = KeyCaptureMatcher::new(CapturedKeySet::all(), notifier.clone());
        (matcher, notifier)
    }

    #[test]
    fn test_captured_key_is_consumed_and_notified() {
        let (matcher, notifier) = matcher();
        let ev = RawEvent::with_time(EventType::KEY, Key::KEY_G.code(), 1, 3, 4);
        assert_eq!(matcher.try_consume(&ev), Verdict::Consumed);

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].control, Control::SteeringTalk);
        assert_eq!(sent[0].code, Key::KEY_G.code());
        assert_eq!(sent[0].value, 1);
    }

    #[test]
    fn test_other_keys_pass_silently() {
        let (matcher, notifier) = matcher();
        assert_eq!(matcher.try_consume(&RawEvent::key(Key::KEY_A, 1)), Verdict::Passed);
        assert!(notifier.is_empty());
    }

    #[test]
    fn test_non_key_event_with_captured_code_passes() {
        // LED code 34 must not be mistaken for KEY_G
        let (matcher, notifier) = matcher();
        let led = RawEvent::new(EventType::LED, Key::KEY_G.code(), 1);
        assert_eq!(matcher.try_consume(&led), Verdict::Passed);
        assert_eq!(matcher.try_consume(&RawEvent::sync()), Verdict::Passed);
        assert!(notifier.is_empty());
    }

    #[test]
    fn test_release_and_repeat_are_captured_too() {
        let (matcher, notifier) = matcher();
        for value in [1, 2, 0] {
            assert!(matcher.try_consume(&RawEvent::key(Key::KEY_ENTER, value)).is_consumed());
        }
        let values: Vec<i32> = notifier.sent().iter().map(|n| n.value).collect();
        assert_eq!(values, vec![1, 2, 0]);
    }
}
