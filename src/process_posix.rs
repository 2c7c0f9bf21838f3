//! Implements the process lifecycle on posix using fork/execvp/waitpid.
//!
//! waitpid() has no timeout parameter, so bounded waits poll with WNOHANG
//! and sleep between polls.

use crate::process::SpawnConfig;
use crate::status::{Result, Status};
use std::ffi::CString;
use std::fs::File;
use std::io::Read;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::{AsRawFd, FromRawFd};
use std::time::{Duration, Instant};

/// How long a bounded wait sleeps between polls.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Exit status of a child that failed to chdir or exec.
const CHILD_FAILED: libc::c_int = 127;

// Child-side step that failed, as reported over the error pipe.
const STEP_CHDIR: u8 = 1;
const STEP_EXEC: u8 = 2;

fn errno() -> i32 {
    std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

fn cstring(what: &str, bytes: &[u8]) -> Result<CString> {
    CString::new(bytes).map_err(|_| Status::invalid_arg(format!("{} contains a NUL byte", what)))
}

/// Creates a pipe with both ends closed on exec.  Returns (read, write).
#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly"
))]
fn cloexec_pipe() -> Result<(File, File)> {
    let mut fds: [libc::c_int; 2] = [0; 2];
    unsafe {
        if libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) < 0 {
            return Err(Status::last_os_error("pipe2"));
        }
        Ok((File::from_raw_fd(fds[0]), File::from_raw_fd(fds[1])))
    }
}

/// Creates a pipe with both ends closed on exec.  Returns (read, write).
/// A concurrent fork() on another thread can inherit these ends before the
/// flags are set; that only delays our read until its child execs or exits.
#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly"
)))]
fn cloexec_pipe() -> Result<(File, File)> {
    let mut fds: [libc::c_int; 2] = [0; 2];
    unsafe {
        if libc::pipe(fds.as_mut_ptr()) < 0 {
            return Err(Status::last_os_error("pipe"));
        }
        // Owned from here on, so both ends close on the error path.
        let pipe = (File::from_raw_fd(fds[0]), File::from_raw_fd(fds[1]));
        for fd in fds {
            if libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC) < 0 {
                return Err(Status::last_os_error("fcntl"));
            }
        }
        Ok(pipe)
    }
}

/// Runs in the forked child.  Never returns: either the image is replaced or
/// the child reports the failing step on `err_fd` and exits with 127.
///
/// Safety: only async-signal-safe calls, on memory prepared before fork().
unsafe fn exec_child(
    program: &CString,
    argv: &[*const libc::c_char],
    workdir: Option<&CString>,
    err_fd: libc::c_int,
) -> ! {
    if let Some(dir) = workdir {
        if libc::chdir(dir.as_ptr()) != 0 {
            report_and_exit(err_fd, STEP_CHDIR);
        }
    }
    libc::execvp(program.as_ptr(), argv.as_ptr());
    report_and_exit(err_fd, STEP_EXEC)
}

unsafe fn report_and_exit(err_fd: libc::c_int, step: u8) -> ! {
    let code = errno().to_ne_bytes();
    let msg = [step, code[0], code[1], code[2], code[3]];
    // Nothing useful to do if this fails; the exit status still says 127.
    libc::write(err_fd, msg.as_ptr() as *const libc::c_void, msg.len());
    libc::_exit(CHILD_FAILED)
}

/// waitpid(), retrying on EINTR.  With WNOHANG, a returned pid of 0 means
/// the child is still running.
fn waitpid(pid: libc::pid_t, flags: libc::c_int) -> Result<(libc::pid_t, libc::c_int)> {
    loop {
        let mut status: libc::c_int = 0;
        let ret = unsafe { libc::waitpid(pid, &mut status, flags) };
        if ret >= 0 {
            return Ok((ret, status));
        }
        let code = errno();
        if code != libc::EINTR {
            return Err(Status::sys_error("waitpid", code));
        }
    }
}

/// Maps a raw wait status to an exit code; death by signal K becomes 128+K.
fn decode_status(status: libc::c_int) -> Result<i32> {
    if libc::WIFEXITED(status) {
        Ok(libc::WEXITSTATUS(status))
    } else if libc::WIFSIGNALED(status) {
        Ok(128 + libc::WTERMSIG(status))
    } else {
        Err(Status::sys_error_msg(format!(
            "unrecognized wait status {:#x}",
            status
        )))
    }
}

#[derive(Debug)]
pub struct Child {
    pid: libc::pid_t,
    /// Raw wait status, set once when termination is first observed.
    status: Option<libc::c_int>,
}

impl Child {
    pub fn spawn(program: &str, args: &[&str], config: &SpawnConfig) -> Result<Self> {
        // Everything the child touches is allocated before fork().
        let program_c = cstring("program path", program.as_bytes())?;
        let args_c = args
            .iter()
            .map(|arg| cstring("argument", arg.as_bytes()))
            .collect::<Result<Vec<_>>>()?;
        let workdir = match config.effective_workdir() {
            Some(dir) => Some(cstring("workdir", dir.as_os_str().as_bytes())?),
            None => None,
        };
        let mut argv: Vec<*const libc::c_char> = Vec::with_capacity(args_c.len() + 2);
        argv.push(program_c.as_ptr());
        argv.extend(args_c.iter().map(|arg| arg.as_ptr()));
        argv.push(std::ptr::null());

        let (mut err_read, err_write) = cloexec_pipe()?;

        let pid = unsafe { libc::fork() };
        if pid < 0 {
            return Err(Status::last_os_error("fork"));
        }
        if pid == 0 {
            // Safety: we are the child; exec_child never returns.
            unsafe { exec_child(&program_c, &argv, workdir.as_ref(), err_write.as_raw_fd()) }
        }

        // Our copy of the write end must be gone for the read to see EOF,
        // which arrives once the child execs (close-on-exec) or exits.
        drop(err_write);
        let mut report = Vec::new();
        if err_read.read_to_end(&mut report).is_err() {
            // The child exists either way; a failed exec still shows up as
            // exit code 127.
            report.clear();
        }

        match *report.as_slice() {
            [step, b0, b1, b2, b3] => {
                let func = if step == STEP_CHDIR { "chdir" } else { "execvp" };
                let status = Status::sys_error(func, i32::from_ne_bytes([b0, b1, b2, b3]));
                // Reap it so no zombie is left behind.  The child-side error
                // stays the primary one.
                match waitpid(pid, 0) {
                    Ok(_) => Err(status),
                    Err(reap) => Err(status.with_detail(format!("reaping child: {}", reap))),
                }
            }
            _ => Ok(Child { pid, status: None }),
        }
    }

    pub fn id(&self) -> u32 {
        self.pid as u32
    }

    /// One non-blocking check.  Returns the wait status if terminated.
    fn poll(&mut self) -> Result<Option<libc::c_int>> {
        if let Some(status) = self.status {
            return Ok(Some(status));
        }
        let (pid, status) = waitpid(self.pid, libc::WNOHANG)?;
        if pid == 0 {
            return Ok(None);
        }
        self.status = Some(status);
        Ok(Some(status))
    }

    pub fn is_running(&mut self) -> bool {
        matches!(self.poll(), Ok(None))
    }

    pub fn wait(&mut self, timeout: Option<Duration>) -> Result<()> {
        if self.status.is_some() {
            return Ok(());
        }
        let timeout = match timeout {
            None => {
                let (_, status) = waitpid(self.pid, 0)?;
                self.status = Some(status);
                return Ok(());
            }
            Some(timeout) => timeout,
        };
        let start = Instant::now();
        loop {
            if self.poll()?.is_some() {
                return Ok(());
            }
            if start.elapsed() >= timeout {
                return Err(Status::timeout());
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    pub fn exit_code(&mut self) -> Result<i32> {
        match self.poll()? {
            None => Err(Status::running()),
            Some(status) => decode_status(status),
        }
    }
}
