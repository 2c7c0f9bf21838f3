//! Outcome taxonomy shared by every process operation.

use std::fmt;

/// The kind of outcome of a single operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    Ok,
    /// A bounded wait gave up before the child terminated.
    Timeout,
    /// The child has not terminated yet.
    Running,
    /// The operation needs a successfully spawned process.
    NotStarted,
    /// The caller passed something unusable; no OS call was made.
    InvalidArg,
    /// An OS primitive failed.
    SysError,
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ResultKind::Ok => "Ok",
            ResultKind::Timeout => "Timeout",
            ResultKind::Running => "Running",
            ResultKind::NotStarted => "NotStarted",
            ResultKind::InvalidArg => "InvalidArg",
            ResultKind::SysError => "SysError",
        };
        f.write_str(name)
    }
}

/// A non-Ok outcome: the kind, the raw platform error code if the OS was
/// involved, and a human-readable message.
///
/// Successful operations return `Ok(..)` instead, so a `Status` with kind
/// `Ok` never carries a code or message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    kind: ResultKind,
    sys_code: Option<i32>,
    message: String,
}

pub type Result<T> = std::result::Result<T, Status>;

impl Status {
    fn new(kind: ResultKind, message: impl Into<String>) -> Self {
        Status {
            kind,
            sys_code: None,
            message: message.into(),
        }
    }

    pub fn timeout() -> Self {
        Status::new(ResultKind::Timeout, "timeout")
    }

    pub fn running() -> Self {
        Status::new(ResultKind::Running, "still running")
    }

    pub fn not_started() -> Self {
        Status::new(ResultKind::NotStarted, "process not started")
    }

    pub fn invalid_arg(message: impl Into<String>) -> Self {
        Status::new(ResultKind::InvalidArg, message)
    }

    /// A SysError without a platform code, e.g. an undecodable wait status.
    pub fn sys_error_msg(message: impl Into<String>) -> Self {
        Status::new(ResultKind::SysError, message)
    }

    /// A SysError for the OS primitive `func` failing with `code`.
    pub fn sys_error(func: &str, code: i32) -> Self {
        let err = std::io::Error::from_raw_os_error(code);
        Status {
            kind: ResultKind::SysError,
            sys_code: Some(code),
            message: format!("{}: {}", func, err),
        }
    }

    /// A SysError for `func` using the calling thread's last OS error.
    pub fn last_os_error(func: &str) -> Self {
        Status::from_os_code(func, std::io::Error::last_os_error().raw_os_error())
    }

    /// A zero or missing code means the OS didn't say what went wrong, so
    /// no code is recorded rather than one that reads as success.
    fn from_os_code(func: &str, code: Option<i32>) -> Self {
        match code {
            Some(code) if code != 0 => Status::sys_error(func, code),
            _ => Status::sys_error_msg(format!("{}: unknown OS error", func)),
        }
    }

    /// Appends a secondary failure to the message, keeping kind and code.
    pub fn with_detail(mut self, detail: impl fmt::Display) -> Self {
        self.message = format!("{}; {}", self.message, detail);
        self
    }

    pub fn kind(&self) -> ResultKind {
        self.kind
    }

    pub fn sys_code(&self) -> Option<i32> {
        self.sys_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if !self.message.is_empty() {
            write!(f, " ({})", self.message)?;
        }
        if let Some(code) = self.sys_code {
            write!(f, " [sys={}]", code)?;
        }
        Ok(())
    }
}

impl std::error::Error for Status {}

/// Flattens an operation's result back into the closed taxonomy.
pub fn kind_of<T>(result: &Result<T>) -> ResultKind {
    match result {
        Ok(_) => ResultKind::Ok,
        Err(status) => status.kind(),
    }
}
