//! Implements the process lifecycle on Windows using native Windows calls.
//!
//! CreateProcessW takes a single command line rather than an argv, so the
//! program and arguments are quoted here and parsed back by the child's
//! runtime.

use crate::process::SpawnConfig;
use crate::status::{Result, Status};
use std::os::windows::ffi::OsStrExt;
use std::time::Duration;
use windows_sys::Win32::{Foundation::*, System::Threading::*};

/// Wraps a HANDLE, in particular to implement Drop.
#[derive(Debug)]
struct Handle(HANDLE);

impl Drop for Handle {
    fn drop(&mut self) {
        unsafe { CloseHandle(self.0) };
    }
}

fn push_backslashes(cmdline: &mut String, n: usize) {
    cmdline.extend(std::iter::repeat('\\').take(n));
}

/// Appends `arg` so the MSVC runtime and CommandLineToArgvW parse it back
/// unchanged.  Arguments that need it are wrapped in double quotes, where
/// backslashes are literal unless they precede a quote: 2n of them plus the
/// quote become 2n+1 backslashes plus the quote.
fn append_quoted(cmdline: &mut String, arg: &str) {
    let needs_quotes = arg.is_empty() || arg.contains(&[' ', '\t', '\n', '\x0b', '"'][..]);
    if !needs_quotes {
        cmdline.push_str(arg);
        return;
    }
    cmdline.push('"');
    let mut backslashes = 0;
    for c in arg.chars() {
        match c {
            '\\' => backslashes += 1,
            '"' => {
                push_backslashes(cmdline, backslashes * 2 + 1);
                cmdline.push('"');
                backslashes = 0;
            }
            _ => {
                push_backslashes(cmdline, backslashes);
                backslashes = 0;
                cmdline.push(c);
            }
        }
    }
    // Don't let trailing backslashes escape the closing quote.
    push_backslashes(cmdline, backslashes * 2);
    cmdline.push('"');
}

/// Builds the NUL-terminated UTF-16 command line.
fn make_cmdline(program: &str, args: &[&str]) -> Result<Vec<u16>> {
    // argv[0] is parsed without backslash escapes, so it is quoted as-is.
    if program.contains('"') {
        return Err(Status::invalid_arg("program path contains a quote"));
    }
    let mut cmdline = format!("\"{}\"", program);
    for arg in args {
        cmdline.push(' ');
        append_quoted(&mut cmdline, arg);
    }
    if cmdline.contains('\0') {
        return Err(Status::invalid_arg("command line contains a NUL"));
    }
    Ok(cmdline.encode_utf16().chain(std::iter::once(0)).collect())
}

fn to_wide_path(dir: &std::path::Path) -> Result<Vec<u16>> {
    let wide: Vec<u16> = dir.as_os_str().encode_wide().collect();
    if wide.contains(&0) {
        return Err(Status::invalid_arg("workdir contains a NUL"));
    }
    Ok(wide.into_iter().chain(std::iter::once(0)).collect())
}

/// Converts a timeout to WaitForSingleObject milliseconds, staying below
/// INFINITE for finite timeouts.
fn timeout_millis(timeout: Option<Duration>) -> u32 {
    match timeout {
        None => INFINITE,
        Some(dur) => dur.as_millis().min((INFINITE - 1) as u128) as u32,
    }
}

#[derive(Debug)]
pub struct Child {
    process: Handle,
    /// Unused, but held until close like the process handle.
    _thread: Handle,
    pid: u32,
    /// Set once when termination is first observed.
    exit_code: Option<u32>,
}

impl Child {
    pub fn spawn(program: &str, args: &[&str], config: &SpawnConfig) -> Result<Self> {
        let mut cmdline = make_cmdline(program, args)?;
        let workdir = match config.effective_workdir() {
            Some(dir) => Some(to_wide_path(dir)?),
            None => None,
        };

        let mut flags = CREATE_NEW_PROCESS_GROUP;
        if config.create_no_window {
            flags |= CREATE_NO_WINDOW;
        }

        unsafe {
            let mut startup_info: STARTUPINFOW = std::mem::zeroed();
            startup_info.cb = std::mem::size_of::<STARTUPINFOW>() as u32;
            let mut process_info: PROCESS_INFORMATION = std::mem::zeroed();

            if CreateProcessW(
                std::ptr::null(),
                cmdline.as_mut_ptr(),
                std::ptr::null(),
                std::ptr::null(),
                /* inherit handles = */ 0,
                flags,
                std::ptr::null(),
                workdir.as_ref().map_or(std::ptr::null(), |dir| dir.as_ptr()),
                &startup_info,
                &mut process_info,
            ) == 0
            {
                return Err(Status::last_os_error("CreateProcessW"));
            }

            Ok(Child {
                process: Handle(process_info.hProcess),
                _thread: Handle(process_info.hThread),
                pid: process_info.dwProcessId,
                exit_code: None,
            })
        }
    }

    pub fn id(&self) -> u32 {
        self.pid
    }

    /// WaitForSingleObject on the process; true if it has terminated.
    fn wait_object(&self, millis: u32) -> Result<bool> {
        match unsafe { WaitForSingleObject(self.process.0, millis) } {
            WAIT_OBJECT_0 => Ok(true),
            WAIT_TIMEOUT => Ok(false),
            _ => Err(Status::last_os_error("WaitForSingleObject")),
        }
    }

    /// One non-blocking check.  Returns the exit code if terminated.
    ///
    /// Termination is checked by waiting rather than by comparing
    /// GetExitCodeProcess against STILL_ACTIVE, since a child may exit
    /// with 259 itself.
    fn poll(&mut self) -> Result<Option<u32>> {
        if let Some(code) = self.exit_code {
            return Ok(Some(code));
        }
        if !self.wait_object(0)? {
            return Ok(None);
        }
        let mut code: u32 = 0;
        if unsafe { GetExitCodeProcess(self.process.0, &mut code) } == 0 {
            return Err(Status::last_os_error("GetExitCodeProcess"));
        }
        self.exit_code = Some(code);
        Ok(Some(code))
    }

    pub fn is_running(&mut self) -> bool {
        matches!(self.poll(), Ok(None))
    }

    pub fn wait(&mut self, timeout: Option<Duration>) -> Result<()> {
        if self.exit_code.is_some() {
            return Ok(());
        }
        if !self.wait_object(timeout_millis(timeout))? {
            return Err(Status::timeout());
        }
        self.poll()?;
        Ok(())
    }

    /// Returned as-is; NTSTATUS codes like 0xC000013A come out negative.
    pub fn exit_code(&mut self) -> Result<i32> {
        match self.poll()? {
            None => Err(Status::running()),
            Some(code) => Ok(code as i32),
        }
    }
}
