//! Process Lifecycle Module
//!
//! PID file handling for `start` and `stop`: the running server records its
//! PID, and `stop` signals the process found there. When the PID file is
//! missing or stale, `stop` falls back to a `pgrep -f` lookup.

use std::fs;
use std::io;
use std::path::Path;
use std::process::Command;

use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("PID file error: {0}")]
    Io(#[from] io::Error),

    #[error("PID file {path} does not contain a process id: {content:?}")]
    InvalidPid { path: String, content: String },

    #[error("Server already running with PID {0}")]
    AlreadyRunning(i32),

    #[error("Failed to signal process {pid}: {reason}")]
    Signal { pid: i32, reason: String },

    #[error("No unique server process matching {pattern:?}, candidates: {candidates:?}")]
    NoServerProcess {
        pattern: String,
        candidates: Vec<i32>,
    },
}

/// Records the current process id in `path`.
///
/// Refuses when the file names a process that is still alive.
pub fn write_pid_file(path: &Path) -> Result<u32, LifecycleError> {
    if let Ok(pid) = read_pid_file(path) {
        if is_running(pid) && pid != current_pid() {
            return Err(LifecycleError::AlreadyRunning(pid));
        }
        warn!("Replacing stale PID file {} (pid {})", path.display(), pid);
    }

    let pid = std::process::id();
    fs::write(path, pid.to_string())?;
    Ok(pid)
}

/// Reads the PID recorded in the first line of `path`.
pub fn read_pid_file(path: &Path) -> Result<i32, LifecycleError> {
    let content = fs::read_to_string(path)?;
    let first_line = content.lines().next().unwrap_or("").trim();
    first_line
        .parse::<i32>()
        .ok()
        .filter(|pid| *pid > 0)
        .ok_or_else(|| LifecycleError::InvalidPid {
            path: path.display().to_string(),
            content: first_line.to_string(),
        })
}

/// Deletes the PID file; a missing file is not an error.
pub fn remove_pid_file(path: &Path) -> Result<(), LifecycleError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// Signals the server recorded in `path` to stop: SIGTERM, or SIGKILL when
/// `force` is set. Returns the signalled PID.
///
/// If the PID file is unusable or names a dead process, the server is looked
/// up by `process_pattern` instead and signalled only when exactly one
/// process matches.
pub fn stop_server(
    path: &Path,
    force: bool,
    process_pattern: &str,
) -> Result<i32, LifecycleError> {
    let (pid, stale_file) = match read_pid_file(path) {
        Ok(pid) if is_running(pid) => (pid, false),
        Ok(pid) => {
            warn!("PID file {} names stopped process {}", path.display(), pid);
            (find_server_process(process_pattern)?, true)
        }
        Err(err) => {
            warn!("Cannot use PID file {}: {}", path.display(), err);
            (find_server_process(process_pattern)?, true)
        }
    };

    send_stop_signal(pid, force)?;
    info!("Sent stop signal to server process {}", pid);

    // A killed process cannot clean up after itself
    if force || stale_file {
        remove_pid_file(path)?;
    }
    Ok(pid)
}

/// The single process whose command line matches `pattern`, excluding this
/// process and its parent.
fn find_server_process(pattern: &str) -> Result<i32, LifecycleError> {
    let excluded = [current_pid(), parent_pid()];
    let candidates: Vec<i32> = matching_processes(pattern)
        .into_iter()
        .filter(|pid| !excluded.contains(pid))
        .collect();

    match candidates.as_slice() {
        [pid] => {
            info!("Found server process {} matching {:?}", pid, pattern);
            Ok(*pid)
        }
        _ => {
            debug!("Server process candidates for {:?}: {:?}", pattern, candidates);
            Err(LifecycleError::NoServerProcess {
                pattern: pattern.to_string(),
                candidates,
            })
        }
    }
}

fn matching_processes(pattern: &str) -> Vec<i32> {
    match Command::new("pgrep").arg("-f").arg(pattern).output() {
        Ok(output) => parse_pids(&String::from_utf8_lossy(&output.stdout)),
        Err(err) => {
            debug!("Process lookup unavailable: {}", err);
            Vec::new()
        }
    }
}

fn parse_pids(text: &str) -> Vec<i32> {
    text.split_whitespace()
        .filter_map(|token| token.parse::<i32>().ok())
        .filter(|pid| *pid > 0)
        .collect()
}

fn current_pid() -> i32 {
    i32::try_from(std::process::id()).unwrap_or(i32::MAX)
}

#[cfg(unix)]
fn parent_pid() -> i32 {
    nix::unistd::getppid().as_raw()
}

#[cfg(not(unix))]
fn parent_pid() -> i32 {
    0
}

#[cfg(unix)]
fn is_running(pid: i32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    kill(Pid::from_raw(pid), None).is_ok()
}

#[cfg(not(unix))]
fn is_running(_pid: i32) -> bool {
    false
}

#[cfg(unix)]
fn send_stop_signal(pid: i32, force: bool) -> Result<(), LifecycleError> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let signal = if force { Signal::SIGKILL } else { Signal::SIGTERM };
    kill(Pid::from_raw(pid), signal).map_err(|errno| LifecycleError::Signal {
        pid,
        reason: errno.to_string(),
    })
}

#[cfg(not(unix))]
fn send_stop_signal(pid: i32, _force: bool) -> Result<(), LifecycleError> {
    Err(LifecycleError::Signal {
        pid,
        reason: "signals are only supported on unix".to_string(),
    })
}
