//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use console_host::process::{MemoryLauncher, MemoryProcess};

/// Poll `cond` for up to two seconds.
pub fn wait_for(cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}

/// In-memory stand-in for evcxr.
///
/// Greets, then answers each line the way a REPL under a PTY does: the
/// echoed input, the result, and a `>> ` prompt. Integer sums are added up,
/// `:quit` exits with code 0, anything else is printed back.
pub fn scripted_repl() -> Arc<MemoryLauncher> {
    let launcher = MemoryLauncher::new().with_line_handler(answer);
    launcher.on_launch(|process| process.send_output(b"Welcome to the scripted REPL\r\n>> "));
    Arc::new(launcher)
}

fn answer(line: &str, process: &MemoryProcess) {
    if line.trim() == ":quit" {
        process.send_output(format!("{line}\r\n").as_bytes());
        process.exit(0);
        return;
    }

    let sum: Option<i64> = line
        .split('+')
        .map(|part| part.trim().parse::<i64>().ok())
        .sum();
    let result = match sum {
        Some(sum) => sum.to_string(),
        None => line.to_string(),
    };
    process.send_output(format!("{line}\r\n{result}\r\n>> ").as_bytes());
}
