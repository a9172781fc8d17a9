use std::fs::File;
use std::io;
use std::os::fd::AsFd;
use std::time::Duration;

use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};

use crate::error::PinError;
use crate::gpio::EdgeWait;

/// Real edge wait: `poll(2)` on the value handle for priority readiness,
/// which is how sysfs signals a configured edge.
pub struct PollEdgeWait;

impl EdgeWait for PollEdgeWait {
    fn wait_edge(&self, pin: u32, value: &File, timeout: Duration) -> Result<bool, PinError> {
        let mut fds = [PollFd::new(
            value.as_fd(),
            PollFlags::POLLPRI | PollFlags::POLLERR,
        )];
        let timeout_ms = timeout.as_millis().min(u16::MAX as u128) as u16;

        match poll(&mut fds, PollTimeout::from(timeout_ms)) {
            Ok(0) => Ok(false),
            Ok(_) => {
                let revents = fds[0].revents().unwrap_or(PollFlags::empty());
                Ok(revents.intersects(PollFlags::POLLPRI))
            }
            // A signal landing mid-wait is not an edge; the monitor retries.
            Err(Errno::EINTR) => Ok(false),
            Err(e) => Err(PinError::Io(
                format!("edge wait on pin {pin}"),
                io::Error::from_raw_os_error(e as i32),
            )),
        }
    }
}
