// Input Filter Record I/O
// Whole-record reads and single vectored writes on raw descriptors

use super::raw::{RawEvent, RAW_EVENT_SIZE};
use smallvec::SmallVec;
use std::io;
use std::os::unix::io::RawFd;

use super::batch::batch_config;

/// Read failure that leaves the stream in an unknown state
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("read failed: {0}")]
    Io(#[from] io::Error),

    /// Zero bytes, or a byte count that is not a whole number of records.
    #[error("short read of {bytes} bytes (record size {record})", record = RAW_EVENT_SIZE)]
    Short { bytes: usize },
}

/// Read as many whole records as the kernel has ready, in one `read(2)`.
///
/// Returns the number of records written into `buf`.
pub fn read_records(fd: RawFd, buf: &mut [RawEvent]) -> Result<usize, ReadError> {
    let wanted = buf.len() * RAW_EVENT_SIZE;
    // SAFETY: RawEvent is repr(transparent) over input_event, so the buffer is
    // `wanted` bytes of plain old data.
    let bytes = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut libc::c_void, wanted) };
    if bytes < 0 {
        return Err(ReadError::Io(io::Error::last_os_error()));
    }

    let bytes = bytes as usize;
    if bytes == 0 || bytes % RAW_EVENT_SIZE != 0 {
        return Err(ReadError::Short { bytes });
    }
    Ok(bytes / RAW_EVENT_SIZE)
}

/// Write `events` with a single `writev(2)`, one iovec per record.
///
/// Consumers rely on seeing a group of events and its SYN_REPORT together,
/// so a partial write is reported as an error rather than resumed.
pub fn write_records(fd: RawFd, events: &[RawEvent]) -> io::Result<()> {
    if events.is_empty() {
        return Ok(());
    }

    let iovecs: SmallVec<[libc::iovec; batch_config::READ_BATCH]> = events
        .iter()
        .map(|event| libc::iovec {
            iov_base: event as *const RawEvent as *mut libc::c_void,
            iov_len: RAW_EVENT_SIZE,
        })
        .collect();

    // SAFETY: every iovec points at a live RawEvent borrowed from `events`.
    let written = unsafe { libc::writev(fd, iovecs.as_ptr(), iovecs.len() as libc::c_int) };
    if written < 0 {
        return Err(io::Error::last_os_error());
    }

    let expected = events.len() * RAW_EVENT_SIZE;
    if written as usize != expected {
        return Err(io::Error::new(
            io::ErrorKind::WriteZero,
            format!("short write: {} of {} bytes", written, expected),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use evdev::{EventType, Key};
    use std::io::{Read, Write};
    use std::os::unix::io::AsRawFd;
    use std::os::unix::net::UnixStream;

    #[test]
    fn test_write_then_read_preserves_records() {
        let (reader, writer) = UnixStream::pair().unwrap();
        let events = [
            RawEvent::with_time(EventType::KEY, Key::KEY_A.code(), 1, 5, 10),
            RawEvent::with_time(EventType::SYNCHRONIZATION, 0, 0, 5, 11),
        ];
        write_records(writer.as_raw_fd(), &events).unwrap();

        let mut buf = [RawEvent::default(); 8];
        let n = read_records(reader.as_raw_fd(), &mut buf).unwrap();
        assert_eq!(n, 2);
        assert_eq!(&buf[..n], &events);
    }

    #[test]
    fn test_empty_write_is_a_no_op() {
        let (mut reader, writer) = UnixStream::pair().unwrap();
        write_records(writer.as_raw_fd(), &[]).unwrap();
        reader.set_nonblocking(true).unwrap();
        let mut byte = [0u8; 1];
        let err = reader.read(&mut byte).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
    }

    #[test]
    fn test_partial_record_is_short_read() {
        let (reader, mut writer) = UnixStream::pair().unwrap();
        writer.write_all(&[0u8; 5]).unwrap();

        let mut buf = [RawEvent::default(); 4];
        match read_records(reader.as_raw_fd(), &mut buf) {
            Err(ReadError::Short { bytes }) => assert_eq!(bytes, 5),
            other => panic!("expected short read, got {:?}", other),
        }
    }

    #[test]
    fn test_end_of_stream_is_short_read() {
        let (reader, writer) = UnixStream::pair().unwrap();
        drop(writer);

        let mut buf = [RawEvent::default(); 4];
        assert!(matches!(
            read_records(reader.as_raw_fd(), &mut buf),
            Err(ReadError::Short { bytes: 0 })
        ));
    }
}
