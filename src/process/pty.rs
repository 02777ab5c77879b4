//! PTY-backed launcher using portable-pty.

use portable_pty::{native_pty_system, ChildKiller, CommandBuilder, PtySize as NativePtySize};
use tracing::debug;

use super::{LaunchSpec, LaunchedProcess, ProcessControl, ProcessLauncher};
use crate::error::ConsoleError;
use crate::Result;

/// Spawns console processes inside a native pseudo-terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct PtyLauncher;

impl PtyLauncher {
    /// Create a launcher backed by the platform's PTY system.
    pub fn new() -> Self {
        Self
    }
}

impl ProcessLauncher for PtyLauncher {
    fn launch(&self, spec: &LaunchSpec) -> Result<LaunchedProcess> {
        let native_size = NativePtySize {
            rows: spec.size.rows,
            cols: spec.size.cols,
            pixel_width: 0,
            pixel_height: 0,
        };

        let pair = native_pty_system()
            .openpty(native_size)
            .map_err(|e| ConsoleError::Pty(e.to_string()))?;

        let mut cmd = CommandBuilder::new(&spec.program);
        cmd.args(&spec.args);
        if let Some(dir) = &spec.working_dir {
            cmd.cwd(dir);
        }
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| ConsoleError::SessionStart(format!("{}: {}", spec.program, e)))?;

        // The slave end belongs to the child now; keeping it open would hide EOF.
        drop(pair.slave);

        let pid = child.process_id();
        debug!(pid = ?pid, command = %spec.command_line(), "spawned console process");

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| ConsoleError::Pty(e.to_string()))?;

        let writer = pair
            .master
            .take_writer()
            .map_err(|e| ConsoleError::Pty(e.to_string()))?;

        Ok(LaunchedProcess {
            pid,
            reader,
            writer,
            control: Box::new(PtyChild {
                _master: pair.master,
                child,
            }),
        })
    }
}

/// Child process plus the PTY master that keeps its terminal alive.
struct PtyChild {
    _master: Box<dyn portable_pty::MasterPty + Send>,
    child: Box<dyn portable_pty::Child + Send + Sync>,
}

impl ProcessControl for PtyChild {
    fn kill(&mut self) -> std::io::Result<()> {
        self.child.kill()
    }

    fn try_wait(&mut self) -> std::io::Result<Option<i32>> {
        Ok(self
            .child
            .try_wait()?
            .map(|status| status.exit_code() as i32))
    }
}
