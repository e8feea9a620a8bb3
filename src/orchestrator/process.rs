//! Platform seam for child-process control.
//!
//! Pause/resume map onto the OS suspend/continue signal pair; platforms
//! without native process suspension get a warn-and-noop fallback so the
//! state machine contract is unchanged elsewhere.

use std::io;
use std::process::ExitStatus;

#[cfg(unix)]
fn send_signal(pid: u32, signal: libc::c_int) -> io::Result<()> {
    let rc = unsafe { libc::kill(pid as libc::pid_t, signal) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(unix)]
pub(crate) fn suspend(pid: u32) -> io::Result<()> {
    send_signal(pid, libc::SIGSTOP)
}

#[cfg(unix)]
pub(crate) fn resume(pid: u32) -> io::Result<()> {
    send_signal(pid, libc::SIGCONT)
}

#[cfg(unix)]
pub(crate) fn terminate(pid: u32) -> io::Result<()> {
    send_signal(pid, libc::SIGKILL)
}

#[cfg(not(unix))]
fn unsupported(what: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        format!("{what} is not supported on this platform"),
    )
}

#[cfg(not(unix))]
pub(crate) fn suspend(_pid: u32) -> io::Result<()> {
    Err(unsupported("process suspension"))
}

#[cfg(not(unix))]
pub(crate) fn resume(_pid: u32) -> io::Result<()> {
    Err(unsupported("process continuation"))
}

#[cfg(not(unix))]
pub(crate) fn terminate(_pid: u32) -> io::Result<()> {
    Err(unsupported("forced termination"))
}

/// Signal number a child died from, if any.
pub(crate) fn exit_signal(status: &ExitStatus) -> Option<i32> {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        status.signal()
    }
    #[cfg(not(unix))]
    {
        let _ = status;
        None
    }
}
