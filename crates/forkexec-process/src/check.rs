//! Process existence checking.
//!
//! Used to verify that an executed child has been reaped: a zombie still
//! answers `kill(pid, 0)`, a reaped process does not.

use forkexec_common::{ProcessError, ProcessResult};

/// Check if a process with the given PID exists (zombies included).
///
/// Uses `kill(pid, 0)`, which sends no signal but checks for existence.
///
/// # Returns
///
/// * `Ok(true)` - Process exists (possibly as a zombie)
/// * `Ok(false)` - Process does not exist
/// * `Err(_)` - The check itself failed
///
/// # Examples
///
/// ```rust,no_run
/// use forkexec_process::process_exists;
///
/// assert!(process_exists(std::process::id()).unwrap());
/// ```
pub fn process_exists(pid: u32) -> ProcessResult<bool> {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let raw = match i32::try_from(pid) {
        Ok(raw) if raw > 0 => raw,
        _ => return Ok(false),
    };

    match kill(Pid::from_raw(raw), None) {
        Ok(_) => Ok(true),
        Err(nix::errno::Errno::ESRCH) => Ok(false),
        // Exists but belongs to someone else
        Err(nix::errno::Errno::EPERM) => Ok(true),
        Err(e) => Err(ProcessError::configuration(
            pid.to_string(),
            format!("Failed to check process: {}", e),
        )),
    }
}

/// Check if a process has terminated but not been reaped.
///
/// Reads the state field of `/proc/<pid>/stat`; a missing entry means the
/// process is gone, which is not a zombie.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub fn is_zombie(pid: u32) -> ProcessResult<bool> {
    let path = format!("/proc/{}/stat", pid);
    let stat = match std::fs::read_to_string(&path) {
        Ok(stat) => stat,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => {
            return Err(ProcessError::configuration(
                pid.to_string(),
                format!("Failed to read {}: {}", path, e),
            ))
        }
    };

    // The command name is parenthesised and may itself contain spaces.
    let state = stat
        .rfind(')')
        .and_then(|end| stat[end + 1..].split_whitespace().next());

    Ok(state == Some("Z"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_process_exists() {
        assert!(process_exists(std::process::id()).unwrap());
    }

    #[test]
    fn test_invalid_pids_do_not_exist() {
        assert!(!process_exists(0).unwrap());
        assert!(!process_exists(u32::MAX).unwrap());
    }

    #[test]
    fn test_reaped_child_is_gone() {
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();
        assert!(!process_exists(pid).unwrap());
    }

    #[test]
    #[cfg(any(target_os = "linux", target_os = "android"))]
    fn test_unreaped_child_is_zombie() {
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = child.id();

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while !is_zombie(pid).unwrap() {
            assert!(std::time::Instant::now() < deadline, "child never exited");
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        assert!(process_exists(pid).unwrap());

        child.wait().unwrap();
        assert!(!is_zombie(pid).unwrap());
        assert!(!is_zombie(std::process::id()).unwrap());
    }
}
