//! Child-process lifecycle: spawn, poll, wait with timeout, exit code, close.
//!
//! The OS work is done by exactly one backend, picked at build time:
//! process_posix (fork/exec/waitpid) or process_win (CreateProcess and
//! WaitForSingleObject).  This module is the shared surface over it.
//!
//! The library assumes it has exclusive reaping rights over the children it
//! spawns.  If something else in the process reaps them (e.g. a SIGCHLD
//! handler calling wait()), later waits report a SysError (ECHILD).

#[cfg(unix)]
use crate::process_posix as imp;
#[cfg(windows)]
use crate::process_win as imp;

use crate::status::{Result, Status};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How to start a child.
#[derive(Debug, Clone)]
pub struct SpawnConfig {
    /// Directory the child starts in.  None or an empty path inherits ours.
    pub workdir: Option<PathBuf>,
    /// On Windows, don't allocate a console window for the child.
    /// Ignored elsewhere.
    pub create_no_window: bool,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        SpawnConfig {
            workdir: None,
            create_no_window: true,
        }
    }
}

impl SpawnConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    pub fn create_no_window(mut self, on: bool) -> Self {
        self.create_no_window = on;
        self
    }

    pub(crate) fn effective_workdir(&self) -> Option<&Path> {
        match &self.workdir {
            Some(dir) if !dir.as_os_str().is_empty() => Some(dir),
            _ => None,
        }
    }
}

/// A spawned child, owned by whoever holds it.
///
/// Dropping it releases the OS references to the child without waiting for
/// or killing it.
#[derive(Debug)]
pub struct Process {
    child: imp::Child,
}

impl Process {
    /// Starts `program` with `args` (not including argv[0]; the program path
    /// becomes the child's argv[0]), inheriting our environment.
    pub fn spawn<S: AsRef<str>>(program: &str, args: &[S], config: &SpawnConfig) -> Result<Self> {
        if program.is_empty() {
            return Err(Status::invalid_arg("empty program path"));
        }
        let args: Vec<&str> = args.iter().map(|a| a.as_ref()).collect();
        let child = imp::Child::spawn(program, &args, config)?;
        Ok(Process { child })
    }

    /// The OS process id.
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Non-blocking liveness check.  Records the termination status if this
    /// is the first call to observe it.
    pub fn is_running(&mut self) -> bool {
        self.child.is_running()
    }

    /// Blocks until the child terminates or `timeout` elapses.
    /// None waits indefinitely.
    pub fn wait(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.child.wait(timeout)
    }

    /// The child's exit code, or a Running status if it hasn't terminated.
    /// Never blocks.
    ///
    /// On POSIX, death by signal K is reported as 128+K.
    pub fn exit_code(&mut self) -> Result<i32> {
        self.child.exit_code()
    }

    /// Releases the OS references to the child.  Same as dropping it.
    pub fn close(self) {}
}

/// Converts a millisecond timeout where negative means "forever".
pub fn timeout_from_ms(timeout_ms: i64) -> Option<Duration> {
    if timeout_ms < 0 {
        None
    } else {
        Some(Duration::from_millis(timeout_ms as u64))
    }
}

pub fn spawn<S: AsRef<str>>(program: &str, args: &[S], config: &SpawnConfig) -> Result<Process> {
    Process::spawn(program, args, config)
}

/// Like Process::is_running, but an unset handle is simply not running.
pub fn is_running(process: Option<&mut Process>) -> bool {
    match process {
        None => false,
        Some(p) => p.is_running(),
    }
}

/// Like Process::wait, with a millisecond timeout (negative waits forever).
pub fn wait(process: Option<&mut Process>, timeout_ms: i64) -> Result<()> {
    match process {
        None => Err(Status::not_started()),
        Some(p) => p.wait(timeout_from_ms(timeout_ms)),
    }
}

pub fn exit_code(process: Option<&mut Process>) -> Result<i32> {
    match process {
        None => Err(Status::not_started()),
        Some(p) => p.exit_code(),
    }
}

/// Releases the handle and leaves `process` unset.  No-op if already unset.
pub fn close(process: &mut Option<Process>) {
    if let Some(p) = process.take() {
        p.close();
    }
}

/// Spawns, waits without bound, and returns the exit code.  The handle is
/// released on every path.
pub fn run_and_wait<S: AsRef<str>>(program: &str, args: &[S], config: &SpawnConfig) -> Result<i32> {
    let mut process = Some(spawn(program, args, config)?);
    let result = wait(process.as_mut(), -1).and_then(|()| exit_code(process.as_mut()));
    close(&mut process);
    result
}
