// Input Filter Source Device
// The physical keyboard, opened read-only for the lifetime of the process

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};

/// Read side of the physical device
///
/// The descriptor stays valid after the device's path is unlinked, which is
/// what lets the event loop keep reading once the virtual keyboard owns
/// the path.
#[derive(Debug)]
pub struct SourceDevice {
    file: File,
    path: PathBuf,
}

impl SourceDevice {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).open(path.as_ref())?;
        Ok(Self {
            file,
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Path the device was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AsRawFd for SourceDevice {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_device() {
        let err = SourceDevice::open("/dev/input/input-filter-missing").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_open_keeps_path() {
        let path = std::env::temp_dir().join(format!("input-filter-source-{}", std::process::id()));
        std::fs::write(&path, b"").unwrap();
        let source = SourceDevice::open(&path).unwrap();
        assert_eq!(source.path(), path.as_path());
        assert!(source.as_raw_fd() >= 0);
        let _ = std::fs::remove_file(&path);
    }
}
