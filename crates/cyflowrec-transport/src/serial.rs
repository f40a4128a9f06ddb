use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::{poll_readable, ByteChannel};

/// Line parameters applied to the serial device.
///
/// The line always runs raw with 8 data bits and no parity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSettings {
    /// Baud rate. Default: 9600.
    pub baud_rate: u32,
    /// Two stop bits instead of one. Default: true.
    pub two_stop_bits: bool,
    /// `VMIN`: characters a blocking read waits for. Default: 128.
    pub min_chars: u8,
    /// `VTIME`: inter-character timeout in deciseconds. Default: 5.
    pub inter_char_timeout_ds: u8,
}

impl Default for LineSettings {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            two_stop_bits: true,
            min_chars: 128,
            inter_char_timeout_ds: 5,
        }
    }
}

/// An open serial device.
pub struct SerialPort {
    file: File,
    path: PathBuf,
}

impl SerialPort {
    /// Open the device read/write without making it the controlling terminal.
    ///
    /// The line settings are left untouched; see [`SerialPort::configure`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(&path)
            .map_err(|source| TransportError::Open {
                path: path.clone(),
                source,
            })?;

        debug!(?path, "opened serial device");
        Ok(Self { file, path })
    }

    /// Open the device and apply `settings`.
    pub fn open_configured(path: impl AsRef<Path>, settings: &LineSettings) -> Result<Self> {
        let port = Self::open(path)?;
        port.configure(settings)?;
        Ok(port)
    }

    /// Put the line into raw mode with the given settings.
    pub fn configure(&self, settings: &LineSettings) -> Result<()> {
        let speed = baud_constant(settings.baud_rate)?;
        let fd = self.file.as_raw_fd();

        // SAFETY: termios is a plain C struct; all-zero is a valid value and
        // it is fully overwritten by tcgetattr before use.
        let mut tty: libc::termios = unsafe { std::mem::zeroed() };

        // SAFETY: `fd` is an open descriptor owned by `self.file` and `tty`
        // is a valid writable termios.
        if unsafe { libc::tcgetattr(fd, &mut tty) } != 0 {
            return Err(self.configure_error());
        }

        // SAFETY: `tty` is a valid termios obtained from tcgetattr.
        unsafe {
            libc::cfsetospeed(&mut tty, speed);
            libc::cfsetispeed(&mut tty, speed);
        }

        tty.c_cflag = (tty.c_cflag & !libc::CSIZE) | libc::CS8;
        tty.c_cflag &= !(libc::PARENB | libc::PARODD);
        if settings.two_stop_bits {
            tty.c_cflag |= libc::CSTOPB;
        } else {
            tty.c_cflag &= !libc::CSTOPB;
        }
        // Ignore modem control lines, enable the receiver.
        tty.c_cflag |= libc::CLOCAL | libc::CREAD;

        tty.c_lflag = 0;
        tty.c_iflag &= !(libc::IXON | libc::IXOFF | libc::IXANY);
        tty.c_iflag &= !(libc::IGNBRK
            | libc::BRKINT
            | libc::PARMRK
            | libc::ISTRIP
            | libc::INLCR
            | libc::IGNCR
            | libc::ICRNL);
        tty.c_oflag = 0;

        tty.c_cc[libc::VMIN] = settings.min_chars;
        tty.c_cc[libc::VTIME] = settings.inter_char_timeout_ds;

        // SAFETY: `fd` is open and `tty` is a fully initialised termios.
        if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &tty) } != 0 {
            return Err(self.configure_error());
        }

        info!(
            path = ?self.path,
            baud = settings.baud_rate,
            stop_bits = if settings.two_stop_bits { 2 } else { 1 },
            "serial line configured"
        );
        Ok(())
    }

    /// The device path this port was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn configure_error(&self) -> TransportError {
        TransportError::Configure {
            path: self.path.clone(),
            source: std::io::Error::last_os_error(),
        }
    }
}

fn baud_constant(rate: u32) -> Result<libc::speed_t> {
    let speed = match rate {
        1200 => libc::B1200,
        2400 => libc::B2400,
        4800 => libc::B4800,
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115200 => libc::B115200,
        other => return Err(TransportError::UnsupportedBaudRate(other)),
    };
    Ok(speed)
}

impl Read for SerialPort {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for SerialPort {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()
    }
}

impl AsFd for SerialPort {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

impl ByteChannel for SerialPort {
    fn wait_readable(&mut self, timeout: Option<Duration>) -> Result<bool> {
        poll_readable(self.file.as_fd(), timeout)
    }
}

impl std::fmt::Debug for SerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPort")
            .field("path", &self.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("cyflowrec-serial-{tag}-{}", std::process::id()))
    }

    #[test]
    fn default_line_settings_are_9600_8n2() {
        let settings = LineSettings::default();
        assert_eq!(settings.baud_rate, 9600);
        assert!(settings.two_stop_bits);
        assert_eq!(settings.min_chars, 128);
        assert_eq!(settings.inter_char_timeout_ds, 5);
    }

    #[test]
    fn open_missing_device_fails() {
        let path = temp_path("missing");
        let err = SerialPort::open(&path).unwrap_err();
        assert!(matches!(err, TransportError::Open { .. }));
    }

    #[test]
    fn configure_rejects_non_terminal() {
        let path = temp_path("regular");
        std::fs::write(&path, b"not a tty").unwrap();

        let port = SerialPort::open(&path).unwrap();
        let err = port.configure(&LineSettings::default()).unwrap_err();
        assert!(matches!(err, TransportError::Configure { .. }));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn unsupported_baud_rate_is_rejected_before_touching_device() {
        let path = temp_path("baud");
        std::fs::write(&path, b"").unwrap();

        let port = SerialPort::open(&path).unwrap();
        let settings = LineSettings {
            baud_rate: 12345,
            ..LineSettings::default()
        };
        let err = port.configure(&settings).unwrap_err();
        assert!(matches!(err, TransportError::UnsupportedBaudRate(12345)));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn regular_file_reads_through_channel() {
        let path = temp_path("read");
        std::fs::write(&path, b"[FILENAME]").unwrap();

        let mut port = SerialPort::open(&path).unwrap();
        assert!(port.wait_readable(Some(Duration::from_millis(100))).unwrap());
        let mut buf = [0u8; 16];
        let n = port.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"[FILENAME]");
        assert_eq!(port.path(), path.as_path());

        let _ = std::fs::remove_file(&path);
    }
}
