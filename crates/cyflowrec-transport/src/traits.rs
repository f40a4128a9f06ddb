use std::io::{Read, Write};
use std::time::Duration;

use crate::error::Result;

/// A duplex byte channel that can wait for incoming data.
///
/// The serial device implements this, as does a Unix stream so a receiver can
/// be driven over a socket pair.
pub trait ByteChannel: Read + Write {
    /// Block until the channel is readable or `timeout` elapses.
    ///
    /// `None` waits indefinitely. Returns `Ok(false)` when the timeout expired
    /// and no data arrived. A hang-up counts as readable so the following read
    /// observes end-of-stream.
    fn wait_readable(&mut self, timeout: Option<Duration>) -> Result<bool>;
}

#[cfg(unix)]
impl ByteChannel for std::os::unix::net::UnixStream {
    fn wait_readable(&mut self, timeout: Option<Duration>) -> Result<bool> {
        use std::os::fd::AsFd;

        poll_readable(self.as_fd(), timeout)
    }
}

/// Wait with `poll(2)` until `fd` is readable.
///
/// `POLLERR` and `POLLNVAL` are reported as [`TransportError::DeviceFault`].
/// An interrupted wait restarts with the full timeout.
///
/// [`TransportError::DeviceFault`]: crate::TransportError::DeviceFault
#[cfg(unix)]
pub fn poll_readable(fd: std::os::fd::BorrowedFd<'_>, timeout: Option<Duration>) -> Result<bool> {
    use std::os::fd::AsRawFd;

    use crate::error::TransportError;

    let timeout_ms: libc::c_int = match timeout {
        None => -1,
        Some(timeout) => timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int,
    };

    let mut fds = libc::pollfd {
        fd: fd.as_raw_fd(),
        events: libc::POLLIN,
        revents: 0,
    };

    loop {
        fds.revents = 0;
        // SAFETY: `fds` is a valid, writable pollfd array of length 1 and the
        // descriptor is kept open by the `BorrowedFd` lifetime.
        let rc = unsafe { libc::poll(&mut fds, 1, timeout_ms) };
        if rc == -1 {
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::Interrupted {
                continue;
            }
            return Err(TransportError::Poll(err));
        }
        if rc == 0 {
            return Ok(false);
        }
        if fds.revents & (libc::POLLERR | libc::POLLNVAL) != 0 {
            return Err(TransportError::DeviceFault {
                revents: fds.revents,
            });
        }
        if fds.revents & (libc::POLLIN | libc::POLLHUP) != 0 {
            return Ok(true);
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::io::{Read, Write};
    use std::os::unix::net::UnixStream;
    use std::time::{Duration, Instant};

    use super::*;

    #[test]
    fn times_out_without_data() {
        let (_left, mut right) = UnixStream::pair().unwrap();

        let start = Instant::now();
        let ready = right
            .wait_readable(Some(Duration::from_millis(30)))
            .unwrap();

        assert!(!ready);
        assert!(start.elapsed() >= Duration::from_millis(25));
    }

    #[test]
    fn readable_after_write() {
        let (mut left, mut right) = UnixStream::pair().unwrap();
        left.write_all(b"[").unwrap();

        assert!(right.wait_readable(Some(Duration::from_secs(1))).unwrap());
        let mut buf = [0u8; 1];
        assert_eq!(right.read(&mut buf).unwrap(), 1);
        assert_eq!(&buf, b"[");
    }

    #[test]
    fn infinite_wait_returns_once_data_arrives() {
        let (mut left, mut right) = UnixStream::pair().unwrap();
        let writer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            left.write_all(b"x").unwrap();
            left
        });

        assert!(right.wait_readable(None).unwrap());
        let _left = writer.join().unwrap();
    }

    #[test]
    fn hangup_is_reported_as_readable() {
        let (left, mut right) = UnixStream::pair().unwrap();
        drop(left);

        assert!(right.wait_readable(Some(Duration::from_secs(1))).unwrap());
        let mut buf = [0u8; 4];
        assert_eq!(right.read(&mut buf).unwrap(), 0);
    }
}
