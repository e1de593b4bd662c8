//! Explicit fork + exec + waitpid backend.
//!
//! The child reports a failed exec to the parent over a close-on-exec pipe:
//! a successful exec closes the write end and the parent reads EOF, a failed
//! one writes the errno (4 bytes, big endian) and exits with
//! [`EXEC_FAILURE_EXIT_CODE`]. Between fork and exec/exit the child only
//! calls async-signal-safe functions on memory prepared before the fork.

use crate::validation::exec_argv;
use crate::wait::Termination;
use forkexec_common::{LaunchError, EXEC_FAILURE_EXIT_CODE};
use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{fork, ForkResult, Pid};
use std::ffi::CStr;
use std::fs::File;
use std::io::{self, Read};
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const POLL_INITIAL: Duration = Duration::from_millis(1);
const POLL_MAX: Duration = Duration::from_millis(50);

/// A child created by [`fork_exec`].
#[derive(Debug)]
pub(crate) struct ForkedChild {
    pid: Pid,
    status: Option<Termination>,
}

impl ForkedChild {
    fn new(pid: Pid) -> Self {
        Self { pid, status: None }
    }

    pub(crate) fn pid(&self) -> u32 {
        self.pid.as_raw() as u32
    }

    /// Blocking `waitpid` on this child only.
    pub(crate) fn wait(&mut self) -> io::Result<Termination> {
        if let Some(status) = self.status {
            return Ok(status);
        }

        loop {
            match waitpid(self.pid, None) {
                Ok(status) => {
                    if let Some(termination) = termination_from(status) {
                        self.status = Some(termination);
                        return Ok(termination);
                    }
                }
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Non-blocking reap attempt.
    pub(crate) fn try_wait(&mut self) -> io::Result<Option<Termination>> {
        if let Some(status) = self.status {
            return Ok(Some(status));
        }

        match waitpid(self.pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(status) => {
                let termination = termination_from(status);
                self.status = termination;
                Ok(termination)
            }
            Err(Errno::EINTR) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Poll with backoff until the child ends or `timeout` elapses.
    ///
    /// A timeout too large to represent as an `Instant` is an unbounded wait.
    pub(crate) fn wait_timeout(&mut self, timeout: Duration) -> io::Result<Option<Termination>> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self.wait().map(Some);
        };
        let mut pause = POLL_INITIAL;

        loop {
            if let Some(termination) = self.try_wait()? {
                return Ok(Some(termination));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }

            std::thread::sleep(pause.min(deadline - now));
            pause = (pause * 2).min(POLL_MAX);
        }
    }
}

fn termination_from(status: WaitStatus) -> Option<Termination> {
    match status {
        WaitStatus::Exited(_, code) => Some(Termination::Exited(code)),
        WaitStatus::Signaled(_, signal, core_dumped) => Some(Termination::Signaled {
            signal: signal as i32,
            core_dumped,
        }),
        // Stop/continue reports and StillAlive are not terminations.
        _ => None,
    }
}

/// Fork, exec `command` with `args` in the child, and return the running child.
///
/// A failed exec is reaped here and returned as
/// [`LaunchError::ImageReplacementFailed`].
pub(crate) fn fork_exec<S: AsRef<str>>(
    command: &str,
    args: &[S],
) -> Result<ForkedChild, LaunchError> {
    let (program, argv) = exec_argv(command, args)?;

    let mut argv_ptrs: Vec<*const libc::c_char> = argv.iter().map(|arg| arg.as_ptr()).collect();
    argv_ptrs.push(std::ptr::null());

    let (err_read, err_write) = cloexec_pipe().map_err(|errno| {
        LaunchError::creation_failed(command, io::Error::from(errno).to_string(), Some(errno as i32))
    })?;

    // SAFETY: the child branch only runs `exec_child`, which touches the
    // pre-built argv and raw fd and calls execvp/write/_exit.
    match unsafe { fork() } {
        Err(errno) => Err(LaunchError::creation_failed(
            command,
            io::Error::from(errno).to_string(),
            Some(errno as i32),
        )),
        Ok(ForkResult::Child) => unsafe { exec_child(&program, &argv_ptrs, err_write.as_raw_fd()) },
        Ok(ForkResult::Parent { child }) => {
            drop(err_write);
            let mut forked = ForkedChild::new(child);
            debug!(pid = child.as_raw(), "Forked child, awaiting exec report");

            match read_exec_report(err_read) {
                Ok(None) => Ok(forked),
                Ok(Some(errno)) => {
                    if let Err(e) = forked.wait() {
                        warn!(pid = child.as_raw(), "Failed to reap child after exec failure: {}", e);
                    }
                    Err(LaunchError::image_replacement_failed(
                        command,
                        io::Error::from_raw_os_error(errno).to_string(),
                        Some(errno),
                    ))
                }
                Err(e) => {
                    // The child exists either way; let the wait classify it.
                    warn!(pid = child.as_raw(), "Could not read exec report: {}", e);
                    Ok(forked)
                }
            }
        }
    }
}

/// Child side after fork. Never returns.
unsafe fn exec_child(program: &CStr, argv: &[*const libc::c_char], err_fd: RawFd) -> ! {
    libc::execvp(program.as_ptr(), argv.as_ptr());

    let bytes = (Errno::last() as i32).to_be_bytes();
    let mut written = 0;
    while written < bytes.len() {
        let n = libc::write(
            err_fd,
            bytes[written..].as_ptr().cast(),
            bytes.len() - written,
        );
        if n > 0 {
            written += n as usize;
        } else if n < 0 && Errno::last() == Errno::EINTR {
            continue;
        } else {
            break;
        }
    }

    libc::_exit(EXEC_FAILURE_EXIT_CODE)
}

/// `Ok(None)` on EOF (exec succeeded), `Ok(Some(errno))` if the child reported.
fn read_exec_report(read_end: OwnedFd) -> io::Result<Option<i32>> {
    let mut file = File::from(read_end);
    let mut buf = [0u8; 4];
    let mut filled = 0;

    while filled < buf.len() {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    match filled {
        0 => Ok(None),
        4 => Ok(Some(i32::from_be_bytes(buf))),
        n => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("short exec report ({} bytes)", n),
        )),
    }
}

#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "illumos",
    target_os = "solaris"
))]
fn cloexec_pipe() -> nix::Result<(OwnedFd, OwnedFd)> {
    nix::unistd::pipe2(nix::fcntl::OFlag::O_CLOEXEC)
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "illumos",
    target_os = "solaris"
)))]
fn cloexec_pipe() -> nix::Result<(OwnedFd, OwnedFd)> {
    use nix::fcntl::{fcntl, FcntlArg, FdFlag};

    let (read_end, write_end) = nix::unistd::pipe()?;
    for fd in [&read_end, &write_end] {
        fcntl(fd.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))?;
    }
    Ok((read_end, write_end))
}
