//! Console process launching.
//!
//! A [`ProcessLauncher`] turns a [`LaunchSpec`] into a running process with
//! blocking reader/writer ends. Sessions only hold the returned handles; the
//! process itself runs out-of-line.

mod memory;
mod pty;

pub use memory::{MemoryLauncher, MemoryProcess, KILLED_EXIT_CODE};
pub use pty::PtyLauncher;

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::PathBuf;

/// Size of a PTY in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PtySize {
    /// Number of rows (height).
    pub rows: u16,
    /// Number of columns (width).
    pub cols: u16,
}

impl PtySize {
    /// Create a new PtySize with the given dimensions.
    pub fn new(rows: u16, cols: u16) -> Self {
        Self { rows, cols }
    }
}

impl Default for PtySize {
    fn default() -> Self {
        Self { rows: 24, cols: 80 }
    }
}

/// Everything needed to spawn one console process.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchSpec {
    /// Executable to run.
    pub program: String,
    /// Arguments passed to the executable.
    pub args: Vec<String>,
    /// Working directory; inherits the host's when unset.
    pub working_dir: Option<PathBuf>,
    /// Extra environment variables.
    pub env: HashMap<String, String>,
    /// Terminal size.
    pub size: PtySize,
}

impl LaunchSpec {
    /// Create a spec for `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: HashMap::new(),
            size: PtySize::default(),
        }
    }

    /// Append an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set the working directory.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Set the terminal size.
    pub fn size(mut self, size: PtySize) -> Self {
        self.size = size;
        self
    }

    /// Render as a single command line, for logs.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Control over a spawned process.
pub trait ProcessControl: Send {
    /// Forcefully stop the process.
    fn kill(&mut self) -> std::io::Result<()>;

    /// Poll for exit without blocking. Returns the exit code once exited.
    fn try_wait(&mut self) -> std::io::Result<Option<i32>>;
}

/// A freshly spawned console process.
pub struct LaunchedProcess {
    /// Process ID, when the platform reports one.
    pub pid: Option<u32>,
    /// Blocking reader for process output.
    pub reader: Box<dyn Read + Send>,
    /// Blocking writer for process input.
    pub writer: Box<dyn Write + Send>,
    /// Kill/poll handle.
    pub control: Box<dyn ProcessControl>,
}

impl std::fmt::Debug for LaunchedProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LaunchedProcess")
            .field("pid", &self.pid)
            .finish_non_exhaustive()
    }
}

/// Spawns console processes.
///
/// Implementations may block for the duration of the spawn; callers that
/// must stay responsive run them off their own thread.
pub trait ProcessLauncher: Send + Sync {
    /// Spawn the process described by `spec`.
    fn launch(&self, spec: &LaunchSpec) -> crate::Result<LaunchedProcess>;
}
