//! Support code for e2e tests, which run procrun as a binary.

mod basic;
mod options;

pub fn procrun_command(args: Vec<&str>) -> std::process::Command {
    let mut cmd = std::process::Command::new(env!("CARGO_BIN_EXE_procrun"));
    cmd.args(args);
    cmd
}

fn print_output(out: &std::process::Output) {
    // Gross: use print! instead of writing to stdout so Rust test
    // framework can capture it.
    print!("{}", String::from_utf8_lossy(&out.stdout));
    print!("{}", String::from_utf8_lossy(&out.stderr));
}

pub fn assert_output_contains(out: &std::process::Output, text: &str) {
    let stdout = String::from_utf8_lossy(&out.stdout);
    if !stdout.contains(text) {
        print_output(out);
        panic!(
            "assertion failed; expected output to contain {:?} but got:\n{}",
            text, stdout
        );
    }
}

pub fn assert_stderr_contains(out: &std::process::Output, text: &str) {
    let stderr = String::from_utf8_lossy(&out.stderr);
    if !stderr.contains(text) {
        print_output(out);
        panic!(
            "assertion failed; expected stderr to contain {:?} but got:\n{}",
            text, stderr
        );
    }
}

/// Manages a temporary directory for invoking procrun.
pub struct TestSpace {
    dir: tempfile::TempDir,
}
impl TestSpace {
    pub fn new() -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        Ok(TestSpace { dir })
    }

    pub fn path(&self) -> &std::path::Path {
        self.dir.path()
    }

    /// Write a file into the working space.
    pub fn write(&self, path: &str, content: &str) -> std::io::Result<()> {
        std::fs::write(self.dir.path().join(path), content)
    }

    /// Read a file from the working space.
    pub fn read(&self, path: &str) -> std::io::Result<Vec<u8>> {
        std::fs::read(self.dir.path().join(path))
    }

    /// Invoke procrun, returning process output.
    pub fn run(&self, cmd: &mut std::process::Command) -> std::io::Result<std::process::Output> {
        cmd.current_dir(self.dir.path()).output()
    }

    /// Like run, but also print output if procrun itself failed.
    pub fn run_expect(
        &self,
        cmd: &mut std::process::Command,
    ) -> anyhow::Result<std::process::Output> {
        let out = self.run(cmd)?;
        if !out.status.success() {
            print_output(&out);
            anyhow::bail!("procrun failed, status {}", out.status);
        }
        Ok(out)
    }
}

// Child commands, spelled per platform so tests read the same everywhere.
// They follow "--" so procrun doesn't parse their flags.

#[cfg(unix)]
pub const ECHO_HELLO: &[&str] = &["--", "/bin/echo", "hello"];

#[cfg(windows)]
pub const ECHO_HELLO: &[&str] = &["--", "cmd", "/c", "echo hello"];

#[cfg(unix)]
pub const EXIT_3: &[&str] = &["--", "/bin/sh", "-c", "exit 3"];

#[cfg(windows)]
pub const EXIT_3: &[&str] = &["--", "cmd", "/c", "exit 3"];

#[cfg(unix)]
pub const SLEEP_1: &[&str] = &["--", "/bin/sleep", "1"];

#[cfg(windows)]
pub const SLEEP_1: &[&str] = &["--", "ping", "-n", "2", "127.0.0.1"];

#[cfg(unix)]
pub const HAS_MARKER: &[&str] = &["--", "/bin/sh", "-c", "test -f marker"];

#[cfg(windows)]
pub const HAS_MARKER: &[&str] = &["--", "cmd", "/c", "if exist marker (exit 0) else (exit 1)"];

/// Builds a procrun argument list: flags first, then a child command.
pub fn with_flags<'a>(flags: &[&'a str], command: &[&'a str]) -> Vec<&'a str> {
    flags.iter().chain(command.iter()).copied().collect()
}
