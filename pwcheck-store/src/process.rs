/// Reports whether a process with the given PID is still running.
///
/// Used to judge whether a lock file left behind by another process is stale. When
/// the answer is ambiguous (for example the process exists but belongs to another
/// user) the process is reported alive, so a lock is never stolen from a live holder.
#[cfg(unix)]
pub fn is_process_alive(pid: u32) -> bool {
    if pid == 0 {
        return false;
    }
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };

    // SAFETY: signal 0 performs permission and existence checks only, nothing is delivered.
    let rc = unsafe { libc::kill(pid, 0) };
    if rc == 0 {
        return true;
    }

    // EPERM and anything else: assume alive
    std::io::Error::last_os_error().raw_os_error() != Some(libc::ESRCH)
}

/// Fallback for platforms without a cheap liveness probe: any real PID counts as alive.
#[cfg(not(unix))]
pub fn is_process_alive(pid: u32) -> bool {
    pid != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_process_is_alive() {
        assert!(is_process_alive(std::process::id()));
    }

    #[test]
    fn test_pid_zero_is_not_alive() {
        assert!(!is_process_alive(0));
    }

    #[cfg(unix)]
    #[test]
    fn test_exited_process_is_not_alive() {
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();

        assert!(!is_process_alive(pid));
    }
}
