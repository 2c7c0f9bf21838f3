//! Chrome trace output of lifecycle calls, for `-d trace`.
//!
//! Load the resulting trace.json in chrome://tracing or Perfetto.

use crate::status::{kind_of, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::Mutex;
use std::time::Instant;

static TRACE: Mutex<Option<Trace>> = Mutex::new(None);

struct Event {
    name: &'static str,
    start: Instant,
    end: Instant,
    /// Outcome of the traced call, if it has one.
    outcome: Option<String>,
}

struct Trace {
    start: Instant,
    w: BufWriter<File>,
}

impl Trace {
    fn new(path: &str) -> std::io::Result<Self> {
        let mut w = BufWriter::new(File::create(path)?);
        writeln!(w, "[")?;
        Ok(Trace {
            start: Instant::now(),
            w,
        })
    }

    fn write_event(&mut self, event: &Event) -> std::io::Result<()> {
        write!(
            self.w,
            "{{ \"pid\": 0, \"tid\": 0, \"name\": {:?}, \"ts\": {}, \"ph\": \"X\", \"dur\": {}",
            event.name,
            event.start.duration_since(self.start).as_micros(),
            event.end.duration_since(event.start).as_micros(),
        )?;
        if let Some(outcome) = &event.outcome {
            write!(self.w, ", \"args\": {{ \"status\": {:?} }}", outcome)?;
        }
        write!(self.w, " }}")
    }

    fn close(&mut self) -> std::io::Result<()> {
        self.write_event(&Event {
            name: "main",
            start: self.start,
            end: Instant::now(),
            outcome: None,
        })?;
        writeln!(self.w, "\n]")?;
        self.w.flush()
    }
}

fn record(event: Event) {
    if let Ok(mut guard) = TRACE.lock() {
        if let Some(trace) = guard.as_mut() {
            // Write errors resurface when the buffer is flushed in close().
            let _ = trace
                .write_event(&event)
                .and_then(|()| writeln!(trace.w, ","));
        }
    }
}

fn enabled() -> bool {
    matches!(TRACE.lock().as_deref(), Ok(Some(_)))
}

pub fn open(path: &str) -> std::io::Result<()> {
    let trace = Trace::new(path)?;
    if let Ok(mut guard) = TRACE.lock() {
        *guard = Some(trace);
    }
    Ok(())
}

/// Runs `f`, recording how long it took.
pub fn scope<T>(name: &'static str, f: impl FnOnce() -> T) -> T {
    if !enabled() {
        return f();
    }
    let start = Instant::now();
    let result = f();
    record(Event {
        name,
        start,
        end: Instant::now(),
        outcome: None,
    });
    result
}

/// Like scope(), and also records the call's outcome kind.
pub fn scope_status<T>(name: &'static str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    if !enabled() {
        return f();
    }
    let start = Instant::now();
    let result = f();
    record(Event {
        name,
        start,
        end: Instant::now(),
        outcome: Some(kind_of(&result).to_string()),
    });
    result
}

/// Finishes the trace file, if one was opened.
pub fn close() -> std::io::Result<()> {
    let trace = match TRACE.lock() {
        Ok(mut guard) => guard.take(),
        Err(_) => None,
    };
    match trace {
        Some(mut t) => t.close(),
        None => Ok(()),
    }
}
