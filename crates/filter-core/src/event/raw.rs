// Input Filter Raw Events
// Kernel input_event records, copied through the filter unchanged

use evdev::{EventType, Key};
use std::fmt;
use std::mem;

/// Size in bytes of one kernel `struct input_event`.
pub const RAW_EVENT_SIZE: usize = mem::size_of::<libc::input_event>();

/// One record exactly as the kernel produced it.
///
/// The wrapped `input_event` is never modified after it is read, so
/// events that pass the filter are written back byte-for-byte.
#[derive(Clone, Copy)]
#[repr(transparent)]
pub struct RawEvent(libc::input_event);

impl RawEvent {
    /// Create an event with a zero timestamp
    pub fn new(kind: EventType, code: u16, value: i32) -> Self {
        Self::with_time(kind, code, value, 0, 0)
    }

    /// Create an event with an explicit timestamp
    pub fn with_time(kind: EventType, code: u16, value: i32, sec: i64, usec: i64) -> Self {
        Self(libc::input_event {
            time: libc::timeval {
                tv_sec: sec as libc::time_t,
                tv_usec: usec as libc::suseconds_t,
            },
            type_: kind.0,
            code,
            value,
        })
    }

    /// SYN_REPORT marker
    pub fn sync() -> Self {
        Self::new(EventType::SYNCHRONIZATION, 0, 0)
    }

    /// EV_KEY event for `key` with the given state (0 release, 1 press, 2 repeat)
    pub fn key(key: Key, value: i32) -> Self {
        Self::new(EventType::KEY, key.code(), value)
    }

    pub fn kind(&self) -> EventType {
        EventType(self.0.type_)
    }

    pub fn code(&self) -> u16 {
        self.0.code
    }

    pub fn value(&self) -> i32 {
        self.0.value
    }

    /// Timestamp as (seconds, microseconds)
    pub fn timestamp(&self) -> (i64, i64) {
        (self.0.time.tv_sec as i64, self.0.time.tv_usec as i64)
    }

    pub fn is_key(&self) -> bool {
        self.kind() == EventType::KEY
    }

    pub fn is_sync(&self) -> bool {
        self.kind() == EventType::SYNCHRONIZATION
    }

    pub fn as_raw(&self) -> &libc::input_event {
        &self.0
    }

    /// View the record as the bytes the kernel handed us
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: input_event is plain old data with no padding-sensitive invariants.
        unsafe {
            std::slice::from_raw_parts(&self.0 as *const libc::input_event as *const u8, RAW_EVENT_SIZE)
        }
    }

    /// Decode one record from exactly `RAW_EVENT_SIZE` bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != RAW_EVENT_SIZE {
            return None;
        }
        // SAFETY: length checked above; read_unaligned tolerates any alignment.
        let raw = unsafe { std::ptr::read_unaligned(bytes.as_ptr() as *const libc::input_event) };
        Some(Self(raw))
    }
}

impl From<libc::input_event> for RawEvent {
    fn from(raw: libc::input_event) -> Self {
        Self(raw)
    }
}

impl Default for RawEvent {
    fn default() -> Self {
        Self::new(EventType::SYNCHRONIZATION, 0, 0)
    }
}

impl PartialEq for RawEvent {
    fn eq(&self, other: &Self) -> bool {
        self.0.type_ == other.0.type_
            && self.0.code == other.0.code
            && self.0.value == other.0.value
            && self.timestamp() == other.timestamp()
    }
}

impl Eq for RawEvent {}

impl fmt::Debug for RawEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (sec, usec) = self.timestamp();
        let mut s = f.debug_struct("RawEvent");
        s.field("kind", &self.kind());
        if self.is_key() {
            s.field("code", &Key::new(self.code()));
        } else {
            s.field("code", &self.code());
        }
        s.field("value", &self.value())
            .field("time", &format_args!("{}.{:06}", sec, usec))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_size_matches_kernel_layout() {
        // timeval + u16 + u16 + i32
        assert_eq!(RAW_EVENT_SIZE, mem::size_of::<libc::timeval>() + 8);
    }

    #[test]
    fn test_accessors() {
        let ev = RawEvent::with_time(EventType::KEY, Key::KEY_G.code(), 1, 12, 345);
        assert!(ev.is_key());
        assert!(!ev.is_sync());
        assert_eq!(ev.code(), 34);
        assert_eq!(ev.value(), 1);
        assert_eq!(ev.timestamp(), (12, 345));
    }

    #[test]
    fn test_bytes_are_preserved() {
        let ev = RawEvent::with_time(EventType::LED, 1, 1, 99, 7);
        let bytes = ev.as_bytes().to_vec();
        let back = RawEvent::from_bytes(&bytes).unwrap();
        assert_eq!(back, ev);
        assert_eq!(back.as_bytes(), &bytes[..]);
    }

    #[test]
    fn test_from_bytes_rejects_partial_record() {
        let ev = RawEvent::sync();
        assert!(RawEvent::from_bytes(&ev.as_bytes()[..RAW_EVENT_SIZE - 1]).is_none());
    }

    #[test]
    fn test_equality_includes_timestamp() {
        let a = RawEvent::with_time(EventType::KEY, 30, 1, 1, 0);
        let b = RawEvent::with_time(EventType::KEY, 30, 1, 2, 0);
        assert_ne!(a, b);
    }
}
