// Input Filter Notifications
// Best-effort delivery of captured key events to the external bridge

use crate::event::RawEvent;
use crate::matcher::Control;
use parking_lot::Mutex;
use serde::Serialize;
use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};

/// Message name carried by every notification
pub const KEY_EVENT_SIGNAL: &str = "KeyEvent";

/// Structured form of one captured event
///
/// Serialized as
/// `{"signal":"KeyEvent","control":"steering_talk","type":1,"code":34,"value":1,"sec":..,"usec":..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyNotification {
    pub signal: &'static str,
    pub control: Control,
    #[serde(rename = "type")]
    pub kind: u16,
    pub code: u16,
    pub value: i32,
    pub sec: i64,
    pub usec: i64,
}

impl KeyNotification {
    pub fn new(control: Control, event: &RawEvent) -> Self {
        let (sec, usec) = event.timestamp();
        Self {
            signal: KEY_EVENT_SIGNAL,
            control,
            kind: event.kind().0,
            code: event.code(),
            value: event.value(),
            sec,
            usec,
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>, NotifyError> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Errors raised while setting up or sending notifications
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Outbound channel for captured events
///
/// Fire-and-forget: implementations must not block and must not fail the
/// caller. Delivery problems are logged and dropped.
pub trait Notifier {
    fn notify(&self, notification: &KeyNotification);
}

/// Writes notifications to the log only
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &KeyNotification) {
        log::info!(
            "{} {} value={}",
            notification.signal,
            notification.control,
            notification.value
        );
    }
}

/// Sends each notification as one JSON datagram to a unix socket
#[derive(Debug)]
pub struct DatagramNotifier {
    socket: UnixDatagram,
    target: PathBuf,
}

impl DatagramNotifier {
    /// Create an unbound, non-blocking sender for `target`
    ///
    /// The receiving socket does not need to exist yet.
    pub fn new<P: AsRef<Path>>(target: P) -> Result<Self, NotifyError> {
        let socket = UnixDatagram::unbound()?;
        socket.set_nonblocking(true)?;
        Ok(Self {
            socket,
            target: target.as_ref().to_path_buf(),
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    fn send(&self, notification: &KeyNotification) -> Result<(), NotifyError> {
        let payload = notification.to_json()?;
        self.socket.send_to(&payload, &self.target)?;
        Ok(())
    }
}

impl Notifier for DatagramNotifier {
    fn notify(&self, notification: &KeyNotification) {
        if let Err(e) = self.send(notification) {
            log::warn!(
                "Dropped {} notification for {} to {}: {}",
                notification.signal,
                notification.control,
                self.target.display(),
                e
            );
        }
    }
}

/// Collects notifications in memory
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<KeyNotification>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<KeyNotification> {
        self.sent.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.lock().is_empty()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: &KeyNotification) {
        self.sent.lock().push(notification.clone());
    }
}
