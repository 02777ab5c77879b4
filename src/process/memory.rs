//! In-memory processes driven by the caller.
//!
//! [`MemoryLauncher`] hands out processes whose output is whatever the
//! caller sends through a [`MemoryProcess`] handle. Input lines can be
//! answered by a line handler, which is enough to stand in for a REPL.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{LaunchSpec, LaunchedProcess, ProcessControl, ProcessLauncher};
use crate::error::ConsoleError;
use crate::Result;

/// Exit code reported after [`ProcessControl::kill`].
pub const KILLED_EXIT_CODE: i32 = 137;

type LineHandler = Arc<dyn Fn(&str, &MemoryProcess) + Send + Sync>;
type LaunchHook = Box<dyn Fn(&MemoryProcess) + Send + Sync>;

/// Launcher for [`MemoryProcess`]es.
#[derive(Default)]
pub struct MemoryLauncher {
    failing: AtomicBool,
    launches: AtomicUsize,
    kills: Arc<AtomicUsize>,
    on_line: Option<LineHandler>,
    on_launch: Mutex<Option<LaunchHook>>,
    current: Mutex<Option<MemoryProcess>>,
}

impl MemoryLauncher {
    /// Launcher whose processes only produce what the caller sends.
    pub fn new() -> Self {
        Self::default()
    }

    /// Launcher that fails every launch until [`set_failing`](Self::set_failing)
    /// clears it.
    pub fn failing() -> Self {
        let launcher = Self::new();
        launcher.set_failing(true);
        launcher
    }

    /// Answer every complete input line with `handler`.
    pub fn with_line_handler(
        mut self,
        handler: impl Fn(&str, &MemoryProcess) + Send + Sync + 'static,
    ) -> Self {
        self.on_line = Some(Arc::new(handler));
        self
    }

    /// Run `hook` inside each successful `launch()`, before it returns.
    pub fn on_launch(&self, hook: impl Fn(&MemoryProcess) + Send + Sync + 'static) {
        *lock(&self.on_launch) = Some(Box::new(hook));
    }

    /// Make subsequent launches fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Launch attempts so far, failed ones included.
    pub fn launch_count(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    /// Kills across all processes from this launcher.
    pub fn kill_count(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }

    /// The most recently launched process.
    pub fn process(&self) -> Option<MemoryProcess> {
        lock(&self.current).clone()
    }
}

impl ProcessLauncher for MemoryLauncher {
    fn launch(&self, spec: &LaunchSpec) -> Result<LaunchedProcess> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ConsoleError::SessionStart(format!(
                "{}: launch refused",
                spec.program
            )));
        }

        let (tx, rx) = mpsc::channel();
        let process = MemoryProcess {
            state: Arc::new(ProcessState {
                output: Mutex::new(Some(tx)),
                input: Mutex::new(Vec::new()),
                exit: Mutex::new(None),
                kills: Arc::clone(&self.kills),
            }),
        };
        *lock(&self.current) = Some(process.clone());

        if let Some(hook) = lock(&self.on_launch).as_ref() {
            hook(&process);
        }

        Ok(LaunchedProcess {
            pid: None,
            reader: Box::new(ChannelReader {
                rx,
                pending: Vec::new(),
            }),
            writer: Box::new(LineWriter {
                process: process.clone(),
                line: Vec::new(),
                on_line: self.on_line.clone(),
            }),
            control: Box::new(process),
        })
    }
}

struct ProcessState {
    output: Mutex<Option<mpsc::Sender<Vec<u8>>>>,
    input: Mutex<Vec<u8>>,
    exit: Mutex<Option<i32>>,
    kills: Arc<AtomicUsize>,
}

/// Handle to one in-memory process.
#[derive(Clone)]
pub struct MemoryProcess {
    state: Arc<ProcessState>,
}

impl MemoryProcess {
    /// Emit `bytes` as process output. Ignored once the process has exited.
    pub fn send_output(&self, bytes: &[u8]) {
        if let Some(tx) = lock(&self.state.output).as_ref() {
            let _ = tx.send(bytes.to_vec());
        }
    }

    /// End the process with `code`, closing its output stream.
    pub fn exit(&self, code: i32) {
        let mut exit = lock(&self.state.exit);
        if exit.is_none() {
            *exit = Some(code);
        }
        lock(&self.state.output).take();
    }

    /// Everything written to the process's input so far.
    pub fn input(&self) -> Vec<u8> {
        lock(&self.state.input).clone()
    }

    /// Exit code, once exited.
    pub fn exit_code(&self) -> Option<i32> {
        *lock(&self.state.exit)
    }
}

impl ProcessControl for MemoryProcess {
    fn kill(&mut self) -> std::io::Result<()> {
        self.state.kills.fetch_add(1, Ordering::SeqCst);
        self.exit(KILLED_EXIT_CODE);
        Ok(())
    }

    fn try_wait(&mut self) -> std::io::Result<Option<i32>> {
        Ok(self.exit_code())
    }
}

struct ChannelReader {
    rx: mpsc::Receiver<Vec<u8>>,
    pending: Vec<u8>,
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.pending.is_empty() {
            match self.rx.recv() {
                Ok(chunk) => self.pending = chunk,
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

struct LineWriter {
    process: MemoryProcess,
    line: Vec<u8>,
    on_line: Option<LineHandler>,
}

impl Write for LineWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        lock(&self.process.state.input).extend_from_slice(buf);

        for &byte in buf {
            if byte != b'\n' {
                self.line.push(byte);
                continue;
            }
            let line = String::from_utf8_lossy(&self.line).into_owned();
            self.line.clear();
            if let Some(handler) = &self.on_line {
                handler(&line, &self.process);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(reader: &mut dyn Read) -> String {
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn test_output_until_exit() {
        let launcher = MemoryLauncher::new();
        let mut launched = launcher.launch(&LaunchSpec::new("repl")).unwrap();
        let process = launcher.process().unwrap();

        process.send_output(b"hello ");
        process.send_output(b"world");
        process.exit(0);
        process.send_output(b"ignored");

        assert_eq!(read_all(&mut launched.reader), "hello world");
        assert_eq!(launched.control.try_wait().unwrap(), Some(0));
        assert_eq!(launched.pid, None);
    }

    #[test]
    fn test_line_handler_answers_input() {
        let launcher = MemoryLauncher::new().with_line_handler(|line, process| {
            process.send_output(format!("<{line}>").as_bytes());
            if line == "bye" {
                process.exit(0);
            }
        });
        let mut launched = launcher.launch(&LaunchSpec::new("repl")).unwrap();

        launched.writer.write_all(b"one\ntw").unwrap();
        launched.writer.write_all(b"o\nbye\n").unwrap();

        assert_eq!(read_all(&mut launched.reader), "<one><two><bye>");
        assert_eq!(launcher.process().unwrap().input(), b"one\ntwo\nbye\n");
    }

    #[test]
    fn test_kill_closes_output() {
        let launcher = MemoryLauncher::new();
        let mut launched = launcher.launch(&LaunchSpec::new("repl")).unwrap();

        launched.control.kill().unwrap();

        assert_eq!(read_all(&mut launched.reader), "");
        assert_eq!(launched.control.try_wait().unwrap(), Some(KILLED_EXIT_CODE));
        assert_eq!(launcher.kill_count(), 1);
    }

    #[test]
    fn test_failing_counts_attempts() {
        let launcher = MemoryLauncher::failing();
        assert!(matches!(
            launcher.launch(&LaunchSpec::new("repl")),
            Err(ConsoleError::SessionStart(_))
        ));
        assert_eq!(launcher.launch_count(), 1);
        assert!(launcher.process().is_none());

        launcher.set_failing(false);
        assert!(launcher.launch(&LaunchSpec::new("repl")).is_ok());
        assert_eq!(launcher.launch_count(), 2);
    }
}
