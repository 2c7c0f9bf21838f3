pub mod process;
#[cfg(unix)]
mod process_posix;
#[cfg(windows)]
mod process_win;
pub mod run;
mod status;
pub mod trace;

pub use process::{
    close, exit_code, is_running, run_and_wait, spawn, timeout_from_ms, wait, Process,
    SpawnConfig,
};
pub use status::{kind_of, Result, ResultKind, Status};
