// Input Filter uinput Output Layer
// The virtual keyboard that takes over the physical device's node

use super::descriptor::DeviceDescriptor;
use crate::event::{write_records, EventSink, RawEvent};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::Path;

/// Control node for creating virtual input devices
pub const UINPUT_PATH: &str = "/dev/uinput";

/// uinput ioctl requests (asm-generic encoding, `'U'` = 0x55)
mod ioctl {
    pub const UI_DEV_CREATE: u32 = 0x5501;
    pub const UI_DEV_DESTROY: u32 = 0x5502;
    pub const UI_SET_EVBIT: u32 = 0x4004_5564;
    pub const UI_SET_KEYBIT: u32 = 0x4004_5565;
    pub const UI_SET_LEDBIT: u32 = 0x4004_5569;

    /// Buffer length passed to UI_GET_SYSNAME
    pub const SYSNAME_LEN: usize = 64;

    /// `_IOC(_IOC_READ, 'U', 44, SYSNAME_LEN)`
    pub const UI_GET_SYSNAME: u32 = (2 << 30) | ((SYSNAME_LEN as u32) << 16) | (0x55 << 8) | 44;
}

/// A created uinput keyboard
///
/// Dropping it destroys the kernel device, which is the only teardown the
/// process guarantees on every exit path.
#[derive(Debug)]
pub struct VirtualKeyboard {
    file: File,
    name: String,
}

impl VirtualKeyboard {
    /// Create the device described by `descriptor` via `/dev/uinput`
    pub fn create(descriptor: &DeviceDescriptor) -> io::Result<Self> {
        Self::create_at(UINPUT_PATH, descriptor)
    }

    /// Create the device through an explicit uinput control node
    pub fn create_at<P: AsRef<Path>>(uinput: P, descriptor: &DeviceDescriptor) -> io::Result<Self> {
        let mut file = OpenOptions::new().write(true).open(uinput)?;
        let fd = file.as_raw_fd();

        for kind in descriptor.event_kinds() {
            set_bit(fd, ioctl::UI_SET_EVBIT, kind.0)?;
        }
        for code in descriptor.key_range() {
            set_bit(fd, ioctl::UI_SET_KEYBIT, code)?;
        }
        for led in descriptor.leds() {
            set_bit(fd, ioctl::UI_SET_LEDBIT, led.0)?;
        }

        let dev = descriptor.user_dev();
        // SAFETY: uinput_user_dev is plain old data.
        let bytes = unsafe {
            std::slice::from_raw_parts(
                &dev as *const libc::uinput_user_dev as *const u8,
                std::mem::size_of::<libc::uinput_user_dev>(),
            )
        };
        file.write_all(bytes)?;

        // SAFETY: fd is an open uinput descriptor.
        if unsafe { libc::ioctl(fd, ioctl::UI_DEV_CREATE as _) } != 0 {
            return Err(io::Error::last_os_error());
        }

        log::debug!("Created uinput device '{}'", descriptor.name());
        Ok(Self {
            file,
            name: descriptor.name().to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kernel name of the device (`inputN`), as reported by UI_GET_SYSNAME
    ///
    /// Needs Linux 3.15 or newer.
    pub fn sysname(&self) -> io::Result<String> {
        let mut buf = [0u8; ioctl::SYSNAME_LEN];
        // SAFETY: the kernel writes at most SYSNAME_LEN bytes into buf.
        let rc = unsafe {
            libc::ioctl(
                self.file.as_raw_fd(),
                ioctl::UI_GET_SYSNAME as _,
                buf.as_mut_ptr() as *mut libc::c_char,
            )
        };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }

        let end = buf.iter().position(|b| *b == 0).unwrap_or(buf.len());
        Ok(String::from_utf8_lossy(&buf[..end]).into_owned())
    }
}

impl EventSink for VirtualKeyboard {
    fn write_batch(&mut self, events: &[RawEvent]) -> io::Result<()> {
        write_records(self.file.as_raw_fd(), events)
    }
}

impl AsRawFd for VirtualKeyboard {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

impl Drop for VirtualKeyboard {
    fn drop(&mut self) {
        // SAFETY: the descriptor is still open; closing it follows when `file` drops.
        let rc = unsafe { libc::ioctl(self.file.as_raw_fd(), ioctl::UI_DEV_DESTROY as _) };
        if rc != 0 {
            log::warn!(
                "Failed to destroy uinput device '{}': {}",
                self.name,
                io::Error::last_os_error()
            );
        } else {
            log::info!("Destroyed uinput device '{}'", self.name);
        }
    }
}

fn set_bit(fd: RawFd, request: u32, bit: u16) -> io::Result<()> {
    // SAFETY: the UI_SET_*BIT requests take an int argument by value.
    if unsafe { libc::ioctl(fd, request as _, bit as libc::c_int) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
