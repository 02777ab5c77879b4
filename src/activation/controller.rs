//! Binds sessions into the host container and respawns them on demand.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tracing::{debug, error, info, trace, warn};

use super::SessionFactory;
use crate::error::ConsoleError;
use crate::host::{DisposalHook, Entry, HostBridge, HostContainer, SubscriptionId};
use crate::session::{title, SessionRegistry, SharedSession};
use crate::Result;

/// Default display name for consoles.
pub const DEFAULT_TITLE: &str = "Rust REPL";

/// Whether one-time setup against the host container has happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// Nothing has been bound yet.
    Uninitialized,
    /// Visibility subscription registered; never reverts.
    Bound,
}

/// Tunables for [`ActivationController`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationSettings {
    /// Base display name for new consoles.
    pub title: String,
    /// Spawn a console when the container is shown empty.
    pub auto_respawn: bool,
    /// Ask the host to hide the container once its last entry closes.
    pub hide_when_empty: bool,
}

impl Default for ActivationSettings {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            auto_respawn: true,
            hide_when_empty: true,
        }
    }
}

enum Phase {
    Uninitialized,
    Bound { subscription: SubscriptionId },
}

/// Owns the session registry for one console scope and reacts to host
/// visibility changes.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ActivationController {
    inner: Arc<Inner>,
}

struct Inner {
    bridge: Arc<dyn HostBridge>,
    factory: Arc<dyn SessionFactory>,
    registry: SessionRegistry,
    settings: ActivationSettings,
    phase: Mutex<Phase>,
}

impl ActivationController {
    /// Controller with default settings.
    pub fn new(bridge: Arc<dyn HostBridge>, factory: Arc<dyn SessionFactory>) -> Self {
        Self::with_settings(bridge, factory, ActivationSettings::default())
    }

    /// Controller with explicit settings.
    pub fn with_settings(
        bridge: Arc<dyn HostBridge>,
        factory: Arc<dyn SessionFactory>,
        settings: ActivationSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                bridge,
                factory,
                registry: SessionRegistry::new(),
                settings,
                phase: Mutex::new(Phase::Uninitialized),
            }),
        }
    }

    /// Current phase of the one-time setup.
    pub fn state(&self) -> ControllerState {
        match *self.inner.phase() {
            Phase::Uninitialized => ControllerState::Uninitialized,
            Phase::Bound { .. } => ControllerState::Bound,
        }
    }

    /// Whether the first bind has happened.
    pub fn is_bound(&self) -> bool {
        self.state() == ControllerState::Bound
    }

    /// Sessions installed by this controller, keyed by display name.
    pub fn registry(&self) -> &SessionRegistry {
        &self.inner.registry
    }

    /// Install `session` into `container` and select it.
    ///
    /// Content is refreshed on every call. The first call additionally
    /// subscribes to visibility changes and enables hide-when-empty; later
    /// calls skip that.
    pub fn bind(
        &self,
        container: &Arc<dyn HostContainer>,
        session: SharedSession,
    ) -> Result<Arc<Entry>> {
        self.inner.bind(container, session)
    }

    /// Bind `session` into the container the bridge reports.
    pub fn show(&self, session: SharedSession) -> Result<Arc<Entry>> {
        let container = self
            .inner
            .bridge
            .container()
            .ok_or(ConsoleError::ContainerUnavailable)?;
        self.inner.bind(&container, session)
    }

    /// Create, start and bind a new console.
    pub fn launch_new(&self) -> Result<SharedSession> {
        let container = self
            .inner
            .bridge
            .container()
            .ok_or(ConsoleError::ContainerUnavailable)?;
        self.inner.launch_into(&container)
    }

    /// The session behind the host's selected entry.
    pub fn selected_session(&self) -> Option<SharedSession> {
        self.inner.bridge.container()?.selected_entry()?.session()
    }

    /// Sessions of all entries in the container. Entries without a bound
    /// session are skipped.
    pub fn all_sessions(&self) -> Vec<SharedSession> {
        self.inner
            .bridge
            .container()
            .map(|c| c.entries().iter().filter_map(|e| e.session()).collect())
            .unwrap_or_default()
    }

    /// Display name the next console would get.
    pub fn next_title(&self) -> Option<String> {
        let container = self.inner.bridge.container()?;
        Some(self.inner.next_title(&container))
    }
}

impl Inner {
    fn phase(&self) -> MutexGuard<'_, Phase> {
        self.phase
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn bind(
        self: &Arc<Self>,
        container: &Arc<dyn HostContainer>,
        session: SharedSession,
    ) -> Result<Arc<Entry>> {
        let entry = self.install_content(container, &session)?;

        let mut phase = self.phase();
        if let Phase::Uninitialized = *phase {
            if self.settings.hide_when_empty {
                container.set_auto_hide_when_empty(true);
            }
            let weak = Arc::downgrade(self);
            let subscription = container.subscribe_visibility_changed(Arc::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.on_visibility_changed();
                }
            }));
            *phase = Phase::Bound { subscription };
            info!(?subscription, "console controller bound to host container");
        }

        Ok(entry)
    }

    fn install_content(
        self: &Arc<Self>,
        container: &Arc<dyn HostContainer>,
        session: &SharedSession,
    ) -> Result<Arc<Entry>> {
        self.registry.install(Arc::clone(session))?;

        let name = session.display_name();
        let entry = match container.find_entry(name) {
            Some(entry) => {
                if let Some(previous) = entry.bind(Arc::clone(session)) {
                    if !Arc::ptr_eq(&previous, session) {
                        previous.dispose();
                    }
                }
                debug!(name = %name, session = %session.id(), "refreshed existing entry");
                entry
            }
            None => {
                let entry = Arc::new(Entry::new(name, container.create_surface(name)));
                entry.bind(Arc::clone(session));
                container.add_entry(Arc::clone(&entry));
                debug!(name = %name, session = %session.id(), "added new entry");
                entry
            }
        };

        entry.set_disposal_hook(self.disposal_hook());
        session.attach_output(entry.surface());
        container.set_selected(&entry);
        Ok(entry)
    }

    /// Hook run when the host closes an entry: stop its console and drop it.
    fn disposal_hook(self: &Arc<Self>) -> DisposalHook {
        let weak: Weak<Self> = Arc::downgrade(self);
        Box::new(move |entry: &Entry| {
            let Some(session) = entry.session() else {
                return;
            };
            if let Err(e) = session.terminate() {
                debug!(session = %session.id(), error = %e, "closed entry had no running console");
            }

            let Some(inner) = weak.upgrade() else {
                session.dispose();
                return;
            };
            match inner.registry.find(entry.display_name()) {
                Ok(Some(registered)) if Arc::ptr_eq(&registered, &session) => {
                    if let Err(e) = inner.registry.remove(entry.display_name()) {
                        warn!(error = %e, "failed to remove closed console");
                        session.dispose();
                    }
                }
                _ => session.dispose(),
            }
        })
    }

    fn next_title(&self, container: &Arc<dyn HostContainer>) -> String {
        let entries = container.entries();
        title::make_title(
            &self.settings.title,
            entries.iter().map(|e| e.display_name()),
        )
    }

    fn launch_into(self: &Arc<Self>, container: &Arc<dyn HostContainer>) -> Result<SharedSession> {
        let name = self.next_title(container);
        let session = self.factory.create_session(&name)?;

        if let Err(e) = session.start() {
            session.dispose();
            return Err(e);
        }

        self.bind(container, Arc::clone(&session))?;
        Ok(session)
    }

    /// Spawn a console when the container is visible and empty.
    ///
    /// Never propagates failures into the host's dispatcher.
    fn on_visibility_changed(self: &Arc<Self>) {
        if !self.settings.auto_respawn {
            return;
        }
        let Some(container) = self.bridge.container() else {
            return;
        };

        let visible = container.is_visible();
        let count = container.content_count();
        if !visible || count != 0 {
            trace!(visible, count, "visibility change ignored");
            return;
        }

        info!("console container shown empty, starting a new console");
        match catch_unwind(AssertUnwindSafe(|| self.launch_into(&container))) {
            Ok(Ok(session)) => {
                info!(session = %session.id(), name = %session.display_name(), "console respawned")
            }
            Ok(Err(e)) => error!(error = %e, "failed to respawn console"),
            Err(_) => error!("console respawn panicked"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::ConsoleFactory;
    use crate::host::headless::{HeadlessBridge, HeadlessContainer};
    use crate::process::{LaunchSpec, MemoryLauncher, ProcessLauncher};
    use crate::session::{ConsoleSession, SessionState};

    struct Fixture {
        launcher: Arc<MemoryLauncher>,
        container: Arc<HeadlessContainer>,
        controller: ActivationController,
    }

    impl Fixture {
        fn new() -> Self {
            let launcher = Arc::new(MemoryLauncher::new());
            let container = Arc::new(HeadlessContainer::new());
            let bridge = Arc::new(HeadlessBridge::with_container(Arc::clone(&container)));
            let dyn_launcher: Arc<dyn ProcessLauncher> = launcher.clone();
            let factory = Arc::new(ConsoleFactory::new(LaunchSpec::new("evcxr"), dyn_launcher));
            let controller = ActivationController::new(bridge, factory);
            Self {
                launcher,
                container,
                controller,
            }
        }

        fn dyn_container(&self) -> Arc<dyn HostContainer> {
            self.container.clone()
        }

        fn session(&self, name: &str) -> SharedSession {
            let launcher: Arc<dyn ProcessLauncher> = self.launcher.clone();
            Arc::new(ConsoleSession::new(name, LaunchSpec::new("evcxr"), launcher))
        }
    }

    #[test]
    fn test_first_bind_does_setup_once() {
        let fx = Fixture::new();
        let container = fx.dyn_container();
        assert_eq!(fx.controller.state(), ControllerState::Uninitialized);

        for _ in 0..3 {
            fx.controller
                .bind(&container, fx.session("Rust REPL"))
                .unwrap();
        }

        assert_eq!(fx.controller.state(), ControllerState::Bound);
        assert_eq!(fx.container.subscription_count(), 1);
        assert!(fx.container.auto_hide_when_empty());
        assert_eq!(fx.container.content_count(), 1);
    }

    #[test]
    fn test_bind_refreshes_existing_entry() {
        let fx = Fixture::new();
        let container = fx.dyn_container();
        let a = fx.session("console");
        let b = fx.session("console");

        let first = fx.controller.bind(&container, Arc::clone(&a)).unwrap();
        let second = fx.controller.bind(&container, Arc::clone(&b)).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(a.state(), SessionState::Disposed);
        assert!(Arc::ptr_eq(&second.session().unwrap(), &b));
        let found = fx.controller.registry().find("console").unwrap().unwrap();
        assert!(Arc::ptr_eq(&found, &b));
    }

    #[test]
    fn test_rebinding_same_session_keeps_it_alive() {
        let fx = Fixture::new();
        let container = fx.dyn_container();
        let a = fx.session("console");
        a.start().unwrap();

        fx.controller.bind(&container, Arc::clone(&a)).unwrap();
        fx.controller.bind(&container, Arc::clone(&a)).unwrap();

        assert_eq!(a.state(), SessionState::Running);
    }

    #[test]
    fn test_respawn_only_when_visible_and_empty() {
        let fx = Fixture::new();
        let container = fx.dyn_container();
        let initial = fx.session("Rust REPL");
        initial.start().unwrap();
        fx.controller.bind(&container, initial).unwrap();
        assert_eq!(fx.launcher.launch_count(), 1);

        // Visible with content: nothing to do.
        fx.container.set_visible(true);
        assert_eq!(fx.launcher.launch_count(), 1);

        // User closes the only console: container auto-hides.
        fx.container.remove_entry("Rust REPL");
        assert!(!fx.container.is_visible());
        assert_eq!(fx.launcher.launch_count(), 1);

        // Shown again while empty: exactly one new console.
        fx.container.set_visible(true);
        assert_eq!(fx.launcher.launch_count(), 2);
        assert_eq!(fx.container.content_count(), 1);

        let sessions = fx.controller.all_sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].state(), SessionState::Running);
    }

    #[test]
    fn test_closing_entry_stops_console() {
        let fx = Fixture::new();
        let container = fx.dyn_container();
        let session = fx.session("Rust REPL");
        session.start().unwrap();
        fx.controller.bind(&container, Arc::clone(&session)).unwrap();

        fx.container.remove_entry("Rust REPL");

        assert!(fx.launcher.kill_count() > 0);
        assert_eq!(session.state(), SessionState::Disposed);
        assert_eq!(fx.controller.registry().count(), 0);
    }

    #[test]
    fn test_respawn_failure_leaves_container_empty() {
        let fx = Fixture::new();
        let container = fx.dyn_container();
        fx.controller
            .bind(&container, fx.session("Rust REPL"))
            .unwrap();
        fx.container.remove_entry("Rust REPL");

        fx.launcher.set_failing(true);
        fx.container.set_visible(true);
        assert_eq!(fx.container.content_count(), 0);
        assert_eq!(fx.launcher.launch_count(), 1);

        // Not retried until the next visibility change.
        fx.launcher.set_failing(false);
        fx.container.set_visible(true);
        assert_eq!(fx.container.content_count(), 1);
    }

    #[test]
    fn test_selected_and_all_sessions() {
        let fx = Fixture::new();
        let container = fx.dyn_container();
        assert!(fx.controller.selected_session().is_none());

        let a = fx.session("a");
        let b = fx.session("b");
        fx.controller.bind(&container, Arc::clone(&a)).unwrap();
        fx.controller.bind(&container, Arc::clone(&b)).unwrap();

        let selected = fx.controller.selected_session().unwrap();
        assert!(Arc::ptr_eq(&selected, &b));

        // A foreign entry with no session is skipped.
        container.add_entry(Arc::new(Entry::new("foreign", container.create_surface("foreign"))));
        assert_eq!(container.content_count(), 3);
        assert_eq!(fx.controller.all_sessions().len(), 2);
    }

    #[test]
    fn test_launch_new_generates_titles() {
        let fx = Fixture::new();

        let first = fx.controller.launch_new().unwrap();
        let second = fx.controller.launch_new().unwrap();

        assert_eq!(first.display_name(), "Rust REPL");
        assert_eq!(second.display_name(), "Rust REPL (2)");
        assert_eq!(first.state(), SessionState::Running);
        assert_eq!(fx.controller.next_title().unwrap(), "Rust REPL (3)");
    }

    /// Factory whose first `create_session` panics.
    struct PanicsOnce {
        panicked: std::sync::atomic::AtomicBool,
        inner: ConsoleFactory,
    }

    impl SessionFactory for PanicsOnce {
        fn create_session(&self, display_name: &str) -> Result<SharedSession> {
            if !self.panicked.swap(true, std::sync::atomic::Ordering::SeqCst) {
                panic!("factory blew up");
            }
            self.inner.create_session(display_name)
        }
    }

    #[test]
    fn test_respawn_panic_is_contained() {
        let launcher = Arc::new(MemoryLauncher::new());
        let dyn_launcher: Arc<dyn ProcessLauncher> = launcher.clone();
        let container = Arc::new(HeadlessContainer::new());
        let bridge = Arc::new(HeadlessBridge::with_container(Arc::clone(&container)));
        let factory = Arc::new(PanicsOnce {
            panicked: std::sync::atomic::AtomicBool::new(false),
            inner: ConsoleFactory::new(LaunchSpec::new("evcxr"), Arc::clone(&dyn_launcher)),
        });
        let controller = ActivationController::new(bridge, factory);

        let dyn_container: Arc<dyn HostContainer> = container.clone();
        let first = Arc::new(ConsoleSession::new(
            "Rust REPL",
            LaunchSpec::new("evcxr"),
            dyn_launcher,
        ));
        controller.bind(&dyn_container, first).unwrap();
        container.remove_entry("Rust REPL");

        // The panicking respawn must not escape the host's notification.
        container.set_visible(true);
        assert_eq!(container.content_count(), 0);
        assert_eq!(launcher.launch_count(), 0);

        // The subscription survives and the next change respawns.
        container.set_visible(true);
        assert_eq!(container.content_count(), 1);
        assert_eq!(launcher.launch_count(), 1);
        assert_eq!(
            controller.selected_session().unwrap().state(),
            SessionState::Running
        );
    }

    #[test]
    fn test_missing_container() {
        let launcher: Arc<dyn ProcessLauncher> = Arc::new(MemoryLauncher::new());
        let controller = ActivationController::new(
            Arc::new(HeadlessBridge::new()),
            Arc::new(ConsoleFactory::new(LaunchSpec::new("evcxr"), launcher)),
        );

        assert!(matches!(
            controller.launch_new(),
            Err(ConsoleError::ContainerUnavailable)
        ));
        assert!(controller.selected_session().is_none());
        assert!(controller.all_sessions().is_empty());
    }
}
