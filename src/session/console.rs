//! A single interactive console process bound to one rendering surface.

use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{pump, SessionId, SessionState};
use crate::error::ConsoleError;
use crate::output::{OutputBuffer, OutputKind, OutputSink, PromptTracker};
use crate::process::{LaunchSpec, ProcessControl, ProcessLauncher};
use crate::Result;

/// Sessions are shared between the registry, host entries and callers.
pub type SharedSession = Arc<ConsoleSession>;

/// How a session treats process output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputOptions {
    /// Bytes retained while no sink is attached.
    pub buffer_limit: usize,
    /// Strip ANSI escape sequences before hand-off.
    pub strip_ansi: bool,
    /// Write a system line when the process exits.
    pub report_exit: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            buffer_limit: crate::output::DEFAULT_BUFFER_LIMIT,
            strip_ansi: true,
            report_exit: true,
        }
    }
}

/// One interactive console: a process, its input, and where its output goes.
///
/// All methods take `&self`; the session is meant to be held in an
/// [`Arc`] ([`SharedSession`]). Output is read off the caller's thread by a
/// background pump and delivered to at most one sink at a time.
pub struct ConsoleSession {
    id: SessionId,
    display_name: String,
    spec: LaunchSpec,
    launcher: Arc<dyn ProcessLauncher>,
    shared: Arc<Shared>,
}

impl ConsoleSession {
    /// Create a session in the `Created` state with default output options.
    pub fn new(
        display_name: impl Into<String>,
        spec: LaunchSpec,
        launcher: Arc<dyn ProcessLauncher>,
    ) -> Self {
        Self::with_output_options(display_name, spec, launcher, OutputOptions::default())
    }

    /// Create a session with explicit output options.
    pub fn with_output_options(
        display_name: impl Into<String>,
        spec: LaunchSpec,
        launcher: Arc<dyn ProcessLauncher>,
        options: OutputOptions,
    ) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Created);
        let inner = Inner {
            state: SessionState::Created,
            starting: false,
            sink: None,
            buffer: OutputBuffer::new(options.buffer_limit),
            writer: None,
            control: None,
            pid: None,
            exit_code: None,
            prompt: PromptTracker::new(),
        };

        Self {
            id: SessionId::new(),
            display_name: display_name.into(),
            spec,
            launcher,
            shared: Arc::new(Shared {
                inner: Mutex::new(inner),
                state_tx,
                options,
            }),
        }
    }

    /// Unique identifier.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Label shown by the host; also the registry key.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// The launch parameters this session was created with.
    pub fn launch_spec(&self) -> &LaunchSpec {
        &self.spec
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.shared.lock().state
    }

    /// Subscribe to lifecycle transitions.
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.shared.state_tx.subscribe()
    }

    /// Process ID of the running console, if known.
    pub fn pid(&self) -> Option<u32> {
        self.shared.lock().pid
    }

    /// Exit code, once the process has exited.
    pub fn exit_code(&self) -> Option<i32> {
        self.shared.lock().exit_code
    }

    /// Whether submitted input is still being evaluated.
    pub fn is_executing(&self) -> bool {
        self.shared.lock().prompt.is_executing()
    }

    /// Spawn the console process. `Created -> Running`.
    ///
    /// The launcher runs without the session lock held, so `dispose()` may
    /// be called while the spawn is in flight. In that case the freshly
    /// spawned process is killed and `SessionDisposed` is returned.
    pub fn start(&self) -> Result<()> {
        {
            let mut inner = self.shared.lock();
            match inner.state {
                SessionState::Created if inner.starting => return Err(ConsoleError::AlreadyStarting),
                SessionState::Created => inner.starting = true,
                SessionState::Disposed => return Err(ConsoleError::SessionDisposed),
                other => {
                    return Err(ConsoleError::InvalidStateTransition {
                        from: other,
                        to: SessionState::Running,
                    })
                }
            }
        }

        debug!(session = %self.id, command = %self.spec.command_line(), "starting console");
        let launched = self.launcher.launch(&self.spec);

        let mut inner = self.shared.lock();
        inner.starting = false;

        let mut process = match launched {
            Ok(process) => process,
            Err(e) => {
                warn!(session = %self.id, error = %e, "console failed to start");
                return Err(match e {
                    ConsoleError::SessionStart(_) => e,
                    other => ConsoleError::SessionStart(other.to_string()),
                });
            }
        };

        if inner.state == SessionState::Disposed {
            drop(inner);
            info!(session = %self.id, "disposed while starting, stopping new process");
            if let Err(e) = process.control.kill() {
                warn!(session = %self.id, error = %e, "failed to stop abandoned process");
            }
            return Err(ConsoleError::SessionDisposed);
        }

        self.shared.transition(&mut inner, SessionState::Running)?;
        inner.pid = process.pid;
        inner.writer = Some(process.writer);
        inner.control = Some(process.control);
        drop(inner);

        pump::spawn(self.id, process.reader, Arc::clone(&self.shared));
        info!(session = %self.id, name = %self.display_name, pid = ?process.pid, "console started");
        Ok(())
    }

    /// Route output to `sink`, detaching any previous sink first.
    ///
    /// Output buffered while no sink was attached is flushed into the new
    /// sink before anything else. The session keeps only a weak reference.
    pub fn attach_output(&self, sink: &Arc<dyn OutputSink>) {
        let mut inner = self.shared.lock();
        if inner.state == SessionState::Disposed {
            debug!(session = %self.id, "ignoring sink for disposed session");
            return;
        }

        if inner.sink.take().is_some() {
            debug!(session = %self.id, "detached previous output sink");
        }
        let dropped = inner.buffer.dropped();
        if dropped > 0 {
            debug!(session = %self.id, dropped, "output was truncated while detached");
        }
        for (text, kind) in inner.buffer.drain() {
            sink.write(&text, kind);
        }
        inner.sink = Some(Arc::downgrade(sink));
    }

    /// Stop delivering output; subsequent output is buffered.
    pub fn detach_output(&self) {
        self.shared.lock().sink = None;
    }

    /// Submit one line of input to the console.
    pub fn execute(&self, line: &str) -> Result<()> {
        let mut inner = self.shared.lock();
        if !inner.state.is_running() {
            return Err(ConsoleError::ConsoleNotEnabled);
        }

        inner.prompt.on_execution_begin();
        let writer = inner
            .writer
            .as_mut()
            .ok_or(ConsoleError::ConsoleNotEnabled)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    /// Stop the console process. `Running -> Terminated`.
    ///
    /// Calling it again once terminated (or disposed) is a no-op.
    pub fn terminate(&self) -> Result<()> {
        let mut inner = self.shared.lock();
        match inner.state {
            SessionState::Terminated | SessionState::Disposed => Ok(()),
            SessionState::Created => Err(ConsoleError::NotRunning(SessionState::Created)),
            SessionState::Running => {
                if let Some(control) = inner.control.as_mut() {
                    if let Err(e) = control.kill() {
                        warn!(session = %self.id, error = %e, "failed to kill console process");
                    }
                }
                inner.writer = None;
                self.shared.transition(&mut inner, SessionState::Terminated)?;
                info!(session = %self.id, "console terminated");
                Ok(())
            }
        }
    }

    /// Release the output sink, buffered output and process handles.
    ///
    /// Valid from any state and idempotent. This never stops a running
    /// process by itself; call [`terminate`](Self::terminate) for that.
    pub fn dispose(&self) {
        let mut inner = self.shared.lock();
        if inner.state == SessionState::Disposed {
            return;
        }

        inner.sink = None;
        inner.buffer.clear();
        inner.writer = None;
        if inner.control.take().is_some() {
            debug!(session = %self.id, "released process handle");
        }

        if let Err(e) = self.shared.transition(&mut inner, SessionState::Disposed) {
            warn!(session = %self.id, error = %e, "dispose transition failed");
        }
        debug!(session = %self.id, name = %self.display_name, "console disposed");
    }
}

impl std::fmt::Debug for ConsoleSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleSession")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("state", &self.state())
            .finish()
    }
}

/// State shared between a session and its output pump.
pub(super) struct Shared {
    inner: Mutex<Inner>,
    state_tx: watch::Sender<SessionState>,
    options: OutputOptions,
}

struct Inner {
    state: SessionState,
    starting: bool,
    sink: Option<Weak<dyn OutputSink>>,
    buffer: OutputBuffer,
    writer: Option<Box<dyn Write + Send>>,
    control: Option<Box<dyn ProcessControl>>,
    pid: Option<u32>,
    exit_code: Option<i32>,
    prompt: PromptTracker,
}

impl Inner {
    /// Hand text to the live sink, or buffer it.
    ///
    /// Runs with the session lock held so chunks keep their order across a
    /// sink swap.
    fn emit(&mut self, text: &str, kind: OutputKind) {
        match self.sink.as_ref().and_then(Weak::upgrade) {
            Some(sink) => sink.write(text, kind),
            None => self.buffer.push(text, kind),
        }
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn transition(&self, inner: &mut Inner, target: SessionState) -> Result<()> {
        let from = inner.state;
        inner.state.transition_to(target)?;
        self.state_tx.send_replace(target);
        debug!(?from, to = ?target, "session state changed");
        Ok(())
    }

    pub(super) fn options(&self) -> &OutputOptions {
        &self.options
    }

    /// Deliver decoded process output. Returns `false` once the session is
    /// disposed and the pump should stop.
    pub(super) fn deliver(&self, text: &str) -> bool {
        let mut inner = self.lock();
        if inner.state == SessionState::Disposed {
            return false;
        }

        let text = inner.prompt.process_text(text);
        if !text.is_empty() {
            inner.emit(&text, OutputKind::Stdout);
        }
        true
    }

    /// Poll the process for its exit code without holding the lock between
    /// attempts.
    pub(super) fn poll_exit(&self) -> Option<i32> {
        let mut inner = self.lock();
        if let Some(code) = inner.exit_code {
            return Some(code);
        }
        match inner.control.as_mut()?.try_wait() {
            Ok(code) => code,
            Err(e) => {
                debug!(error = %e, "try_wait failed");
                None
            }
        }
    }

    /// The output stream closed: the process is gone.
    pub(super) fn on_output_closed(&self, id: SessionId, exit_code: Option<i32>) {
        let mut inner = self.lock();
        if inner.state == SessionState::Disposed {
            return;
        }

        if exit_code.is_some() {
            inner.exit_code = exit_code;
        }
        if inner.state == SessionState::Running {
            inner.writer = None;
            if let Err(e) = self.transition(&mut inner, SessionState::Terminated) {
                warn!(session = %id, error = %e, "failed to mark console terminated");
            }
            info!(session = %id, exit_code = ?inner.exit_code, "console process exited");
        }

        if self.options.report_exit {
            let message = match inner.exit_code {
                Some(code) => format!("\nProcess finished with exit code {}\n", code),
                None => "\nProcess finished\n".to_string(),
            };
            inner.emit(&message, OutputKind::System);
        }
    }
}
