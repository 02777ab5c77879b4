//! Session creation for the activation controller.

use std::sync::Arc;

use crate::process::{LaunchSpec, ProcessLauncher, PtyLauncher};
use crate::session::{ConsoleSession, OutputOptions, SharedSession};
use crate::Result;

/// Creates new, not-yet-started console sessions.
pub trait SessionFactory: Send + Sync {
    /// Build a session labelled `display_name`.
    fn create_session(&self, display_name: &str) -> Result<SharedSession>;
}

/// Factory producing sessions from a fixed launch spec.
pub struct ConsoleFactory {
    spec: LaunchSpec,
    launcher: Arc<dyn ProcessLauncher>,
    output: OutputOptions,
}

impl ConsoleFactory {
    /// Factory launching `spec` through `launcher`.
    pub fn new(spec: LaunchSpec, launcher: Arc<dyn ProcessLauncher>) -> Self {
        Self {
            spec,
            launcher,
            output: OutputOptions::default(),
        }
    }

    /// Factory launching `spec` in a native PTY.
    pub fn pty(spec: LaunchSpec) -> Self {
        Self::new(spec, Arc::new(PtyLauncher::new()))
    }

    /// Use `output` for every session created.
    pub fn with_output_options(mut self, output: OutputOptions) -> Self {
        self.output = output;
        self
    }
}

impl SessionFactory for ConsoleFactory {
    fn create_session(&self, display_name: &str) -> Result<SharedSession> {
        Ok(Arc::new(ConsoleSession::with_output_options(
            display_name,
            self.spec.clone(),
            Arc::clone(&self.launcher),
            self.output.clone(),
        )))
    }
}
