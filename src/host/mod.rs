//! Contract between the console core and the surrounding host shell.
//!
//! The host owns windows, tabs and rendering. The core only needs a
//! container it can put [`Entry`] slots into, a visibility signal, and a
//! way to create output surfaces. [`headless`] provides an in-memory
//! implementation used by the binary and by tests.

pub mod headless;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::output::OutputSink;
use crate::session::SharedSession;

/// Callback invoked on every visibility or content-count change.
pub type VisibilityCallback = Arc<dyn Fn() + Send + Sync>;

/// Hook run once when the host removes an entry.
pub type DisposalHook = Box<dyn FnOnce(&Entry) + Send>;

/// Handle for a visibility subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Locates the console container inside the host shell.
pub trait HostBridge: Send + Sync {
    /// The container for this feature, if the shell has created it.
    fn container(&self) -> Option<Arc<dyn HostContainer>>;
}

/// A host-side container (tool window, panel, dock) holding console entries.
pub trait HostContainer: Send + Sync {
    /// Number of entries currently shown.
    fn content_count(&self) -> usize;

    /// Whether the container is currently visible.
    fn is_visible(&self) -> bool;

    /// Find an entry by display name.
    fn find_entry(&self, display_name: &str) -> Option<Arc<Entry>>;

    /// Add an entry.
    fn add_entry(&self, entry: Arc<Entry>);

    /// Remove an entry, running its disposal hook.
    fn remove_entry(&self, display_name: &str) -> Option<Arc<Entry>>;

    /// Make `entry` the selected one.
    fn set_selected(&self, entry: &Arc<Entry>);

    /// The selected entry, if any.
    fn selected_entry(&self) -> Option<Arc<Entry>>;

    /// All entries, in display order.
    fn entries(&self) -> Vec<Arc<Entry>>;

    /// Create the rendering surface for a new entry.
    fn create_surface(&self, display_name: &str) -> Arc<dyn OutputSink>;

    /// Hide the container automatically once its last entry is removed.
    fn set_auto_hide_when_empty(&self, hide: bool);

    /// Register for visibility/content-count notifications.
    ///
    /// Delivery happens on the host's UI thread, in event order, without
    /// coalescing.
    fn subscribe_visibility_changed(&self, callback: VisibilityCallback) -> SubscriptionId;
}

/// A visual slot in a host container.
///
/// Holds a strong reference to its session for rendering only. Lifecycle
/// decisions stay with the activation controller, which installs the
/// disposal hook.
pub struct Entry {
    display_name: String,
    surface: Arc<dyn OutputSink>,
    session: Mutex<Option<SharedSession>>,
    on_dispose: Mutex<Option<DisposalHook>>,
}

impl Entry {
    /// Create an empty entry rendering into `surface`.
    pub fn new(display_name: impl Into<String>, surface: Arc<dyn OutputSink>) -> Self {
        Self {
            display_name: display_name.into(),
            surface,
            session: Mutex::new(None),
            on_dispose: Mutex::new(None),
        }
    }

    /// Label shown by the host.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// The surface this entry renders into.
    pub fn surface(&self) -> &Arc<dyn OutputSink> {
        &self.surface
    }

    /// The bound session, if any.
    pub fn session(&self) -> Option<SharedSession> {
        lock(&self.session).clone()
    }

    /// Bind `session`, returning the previously bound one.
    pub fn bind(&self, session: SharedSession) -> Option<SharedSession> {
        lock(&self.session).replace(session)
    }

    /// Install the hook run when the host removes this entry.
    pub fn set_disposal_hook(&self, hook: DisposalHook) {
        *lock(&self.on_dispose) = Some(hook);
    }

    /// Run the disposal hook (once) and unbind the session.
    ///
    /// Hosts call this when the entry is removed.
    pub fn dispose(&self) {
        let hook = lock(&self.on_dispose).take();
        if let Some(hook) = hook {
            hook(self);
        }
        if lock(&self.session).take().is_some() {
            debug!(entry = %self.display_name, "entry released its session");
        }
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("display_name", &self.display_name)
            .field("session", &self.session().map(|s| s.id()))
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
