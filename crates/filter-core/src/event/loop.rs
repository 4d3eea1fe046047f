// Input Filter Event Loop
// Wait on the source device, filter each batch, re-emit what is left

use super::batch::{batch_config, EventBatch};
use super::intercept::{BatchOutcome, Interceptor};
use super::io::{read_records, ReadError};
use super::raw::RawEvent;
use crate::mode::ShutdownToken;
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};

/// Result type for event loop operations
pub type EventLoopResult<T> = Result<T, EventLoopError>;

/// Errors that stop the event loop
///
/// None of these are retried: a skipped or reordered write would leave the
/// virtual device reporting a state the hardware never had.
#[derive(Debug, thiserror::Error)]
pub enum EventLoopError {
    #[error("Wait on source device failed: {0}")]
    Wait(#[source] io::Error),

    #[error("Source device reported an error condition")]
    Hangup,

    #[error("Source device read failed: {0}")]
    Read(#[from] ReadError),

    #[error("Virtual device write failed: {0}")]
    Write(#[source] io::Error),
}

/// Destination for events that survive filtering
pub trait EventSink {
    /// Write `events` in order as one unit.
    fn write_batch(&mut self, events: &[RawEvent]) -> io::Result<()>;
}

impl<T: EventSink + ?Sized> EventSink for &mut T {
    fn write_batch(&mut self, events: &[RawEvent]) -> io::Result<()> {
        (**self).write_batch(events)
    }
}

/// What one call to [`EventLoop::pump`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pumped {
    /// Timed out or interrupted before data arrived
    Idle,
    /// A batch was read, filtered and written
    Batch(BatchOutcome),
}

/// Single-source pump from the physical device to the virtual one
pub struct EventLoop<'a, S, W> {
    source: S,
    sink: W,
    interceptor: &'a Interceptor,
    buffer: [RawEvent; batch_config::READ_BATCH],
    retained: EventBatch<RawEvent>,
}

impl<'a, S: AsRawFd, W: EventSink> EventLoop<'a, S, W> {
    pub fn new(source: S, sink: W, interceptor: &'a Interceptor) -> Self {
        Self {
            source,
            sink,
            interceptor,
            buffer: [RawEvent::default(); batch_config::READ_BATCH],
            retained: EventBatch::new(),
        }
    }

    /// Pump until `shutdown` is cancelled or an error occurs
    pub fn run(&mut self, shutdown: &ShutdownToken) -> EventLoopResult<()> {
        log::info!(
            "Event loop running ({} matcher(s), interception {})",
            self.interceptor.registry().len(),
            if self.interceptor.mode().is_enabled() { "enabled" } else { "disabled" }
        );

        while !shutdown.is_cancelled() {
            self.pump(batch_config::POLL_TIMEOUT_MS)?;
        }

        log::info!("Event loop stopped");
        Ok(())
    }

    /// Wait up to `timeout_ms` for the source and process at most one batch
    pub fn pump(&mut self, timeout_ms: i32) -> EventLoopResult<Pumped> {
        let fd = self.source.as_raw_fd();
        if !wait_readable(fd, timeout_ms)? {
            return Ok(Pumped::Idle);
        }

        let count = read_records(fd, &mut self.buffer)?;
        self.retained.clear();
        let outcome = self
            .interceptor
            .filter_batch(&self.buffer[..count], &mut self.retained);

        if !self.retained.is_empty() {
            self.sink
                .write_batch(self.retained.as_slice())
                .map_err(EventLoopError::Write)?;
        }

        log::trace!(
            "Batch: read={} consumed={} written={}",
            outcome.read,
            outcome.consumed,
            self.retained.len()
        );
        Ok(Pumped::Batch(outcome))
    }

    pub fn sink(&self) -> &W {
        &self.sink
    }

    pub fn into_parts(self) -> (S, W) {
        (self.source, self.sink)
    }
}

/// Block in `poll(2)` until `fd` is readable.
///
/// Returns `false` on timeout or EINTR; both simply mean "check the
/// shutdown token and wait again".
fn wait_readable(fd: RawFd, timeout_ms: i32) -> EventLoopResult<bool> {
    let mut pollfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };

    let ready = unsafe { libc::poll(&mut pollfd, 1, timeout_ms) };
    if ready < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            return Ok(false);
        }
        return Err(EventLoopError::Wait(err));
    }

    if ready == 0 {
        return Ok(false);
    }

    if pollfd.revents & libc::POLLIN != 0 {
        return Ok(true);
    }

    // POLLERR, POLLHUP or POLLNVAL with nothing to read
    Err(EventLoopError::Hangup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::io::write_records;
    use crate::matcher::{CapturedKeySet, KeyCaptureMatcher, MatcherRegistry};
    use crate::mode::InterceptMode;
    use crate::notify::MemoryNotifier;
    use evdev::Key;
    use std::io::Write;
    use std::os::unix::net::UnixStream;
    use std::sync::Arc;

    #[derive(Default)]
    struct RecordingSink {
        writes: Vec<Vec<RawEvent>>,
    }

    impl EventSink for RecordingSink {
        fn write_batch(&mut self, events: &[RawEvent]) -> io::Result<()> {
            self.writes.push(events.to_vec());
            Ok(())
        }
    }

    struct FailingSink;

    impl EventSink for FailingSink {
        fn write_batch(&mut self, _events: &[RawEvent]) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "device gone"))
        }
    }

    fn interceptor(enabled: bool) -> (Interceptor, Arc<MemoryNotifier>) {
        let notifier = Arc::new(MemoryNotifier::new());
        let registry =
            MatcherRegistry::new().with(KeyCaptureMatcher::new(CapturedKeySet::all(), notifier.clone()));
        (Interceptor::new(registry, InterceptMode::new(enabled)), notifier)
    }

    #[test]
    fn test_pump_times_out_without_data() {
        let (interceptor, _) = interceptor(true);
        let (source, _feed) = UnixStream::pair().unwrap();
        let mut event_loop = EventLoop::new(source, RecordingSink::default(), &interceptor);

        assert_eq!(event_loop.pump(10).unwrap(), Pumped::Idle);
        assert!(event_loop.sink().writes.is_empty());
    }

    #[test]
    fn test_pump_filters_one_batch_into_one_write() {
        let (interceptor, notifier) = interceptor(true);
        let (source, feed) = UnixStream::pair().unwrap();
        let batch = [RawEvent::sync(), RawEvent::key(Key::KEY_G, 1), RawEvent::sync()];
        write_records(feed.as_raw_fd(), &batch).unwrap();

        let mut event_loop = EventLoop::new(source, RecordingSink::default(), &interceptor);
        match event_loop.pump(1000).unwrap() {
            Pumped::Batch(outcome) => {
                assert_eq!(outcome.read, 3);
                assert_eq!(outcome.consumed, 1);
            }
            Pumped::Idle => panic!("expected a batch"),
        }

        assert_eq!(
            event_loop.sink().writes,
            vec![vec![RawEvent::sync(), RawEvent::sync()]]
        );
        assert_eq!(notifier.len(), 1);
    }

    #[test]
    fn test_fully_consumed_batch_writes_nothing() {
        let (interceptor, notifier) = interceptor(true);
        let (source, feed) = UnixStream::pair().unwrap();
        write_records(feed.as_raw_fd(), &[RawEvent::key(Key::KEY_M, 1)]).unwrap();

        let mut event_loop = EventLoop::new(source, RecordingSink::default(), &interceptor);
        event_loop.pump(1000).unwrap();
        assert!(event_loop.sink().writes.is_empty());
        assert_eq!(notifier.len(), 1);
    }

    #[test]
    fn test_partial_record_is_fatal() {
        let (interceptor, _) = interceptor(false);
        let (source, mut feed) = UnixStream::pair().unwrap();
        feed.write_all(&[1, 2, 3]).unwrap();

        let mut event_loop = EventLoop::new(source, RecordingSink::default(), &interceptor);
        assert!(matches!(
            event_loop.pump(1000),
            Err(EventLoopError::Read(ReadError::Short { bytes: 3 }))
        ));
        assert!(event_loop.sink().writes.is_empty());
    }

    #[test]
    fn test_closed_source_is_fatal() {
        let (interceptor, _) = interceptor(false);
        let (source, feed) = UnixStream::pair().unwrap();
        drop(feed);

        let mut event_loop = EventLoop::new(source, RecordingSink::default(), &interceptor);
        let err = event_loop.pump(1000).unwrap_err();
        assert!(matches!(
            err,
            EventLoopError::Read(ReadError::Short { bytes: 0 }) | EventLoopError::Hangup
        ));
    }

    #[test]
    fn test_write_failure_is_fatal() {
        let (interceptor, _) = interceptor(false);
        let (source, feed) = UnixStream::pair().unwrap();
        write_records(feed.as_raw_fd(), &[RawEvent::key(Key::KEY_A, 1)]).unwrap();

        let mut event_loop = EventLoop::new(source, FailingSink, &interceptor);
        assert!(matches!(event_loop.pump(1000), Err(EventLoopError::Write(_))));
    }

    #[test]
    fn test_run_returns_once_cancelled() {
        let (interceptor, _) = interceptor(false);
        let (source, _feed) = UnixStream::pair().unwrap();
        let shutdown = ShutdownToken::new();
        shutdown.cancel();

        let mut event_loop = EventLoop::new(source, RecordingSink::default(), &interceptor);
        event_loop.run(&shutdown).unwrap();
    }
}
