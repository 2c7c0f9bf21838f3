//! The procrun command-line driver: runs one program through the whole
//! lifecycle and reports each step.

use crate::process::{timeout_from_ms, Process, SpawnConfig};
use crate::status::ResultKind;
use crate::trace;
use argh::FromArgs;

/// Spawn a program, wait for it, and report its exit code.
#[derive(FromArgs)]
struct Args {
    /// milliseconds to wait before reporting a timeout; negative waits
    /// forever [default=-1]
    #[argh(option, default = "-1")]
    timeout_ms: i64,

    /// directory to start the program in [default=current]
    #[argh(option)]
    workdir: Option<String>,

    /// on Windows, let the program allocate a console window
    #[argh(switch)]
    show_window: bool,

    /// don't wait: print the program's process id and release it
    #[argh(switch)]
    detach: bool,

    /// debugging tools, "-d list" to list
    #[argh(option, short = 'd')]
    debug: Option<String>,

    /// program to run, followed by its arguments
    #[argh(positional, greedy)]
    command: Vec<String>,
}

fn print_usage() {
    println!("examples:");
    if cfg!(windows) {
        println!("  procrun cmd /c echo hello");
        println!("  procrun --timeout-ms 1000 cmd /c timeout /t 3");
    } else {
        println!("  procrun /bin/echo hello");
        println!("  procrun --timeout-ms 1000 /bin/sleep 3");
    }
}

/// Prints a step's outcome to stderr.
fn report<T>(result: &crate::Result<T>) {
    match result {
        Ok(_) => eprintln!("status: {}", ResultKind::Ok),
        Err(status) => eprintln!("status: {}", status),
    }
}

fn is_timeout(result: &crate::Result<()>) -> bool {
    matches!(result, Err(status) if status.kind() == ResultKind::Timeout)
}

fn run_impl(args: Args) -> anyhow::Result<i32> {
    if let Some(debug) = &args.debug {
        match debug.as_str() {
            "list" => {
                println!("debug tools:");
                println!("  trace  generate json trace of process lifecycle calls");
                return Ok(1);
            }
            "trace" => trace::open("trace.json")?,
            _ => anyhow::bail!("unknown -d {:?}, use -d list to list", debug),
        }
    }

    let (program, program_args) = match args.command.split_first() {
        None => {
            print_usage();
            return Ok(0);
        }
        Some(split) => split,
    };

    let mut config = SpawnConfig::new().create_no_window(!args.show_window);
    if let Some(dir) = &args.workdir {
        config = config.workdir(dir);
    }

    let spawned = trace::scope_status("spawn", || Process::spawn(program, program_args, &config));
    report(&spawned);
    let mut process = spawned?;

    if args.detach {
        println!("spawned, pid={}", process.id());
        trace::scope("close", || process.close());
        return Ok(0);
    }

    let running = trace::scope("is_running", || process.is_running());
    println!("spawned, running={}", if running { "yes" } else { "no" });

    let timeout = timeout_from_ms(args.timeout_ms);
    let mut waited = trace::scope_status("wait", || process.wait(timeout));
    report(&waited);
    if is_timeout(&waited) {
        println!("still running, waiting...");
        waited = trace::scope_status("wait", || process.wait(None));
        report(&waited);
    }
    waited?;

    let code = trace::scope_status("exit_code", || process.exit_code());
    report(&code);
    let code = code?;
    trace::scope("close", || process.close());

    println!("exit code: {}", code);
    Ok(code)
}

pub fn run() -> anyhow::Result<i32> {
    let args: Args = argh::from_env();
    let res = run_impl(args);
    trace::close()?;
    res
}
