//! In-memory host shell.
//!
//! Behaves like a single tool window: entries are kept in insertion order,
//! visibility is toggled explicitly, and notifications are delivered
//! synchronously on the calling thread with no locks held.

use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::trace;

use super::{Entry, HostBridge, HostContainer, SubscriptionId, VisibilityCallback};
use crate::output::{OutputKind, OutputSink};

type SurfaceFactory = Box<dyn Fn(&str) -> Arc<dyn OutputSink> + Send + Sync>;

#[derive(Default)]
struct ContainerState {
    entries: Vec<Arc<Entry>>,
    selected: Option<String>,
    visible: bool,
    auto_hide: bool,
}

/// Container kept entirely in memory.
pub struct HeadlessContainer {
    state: Mutex<ContainerState>,
    callbacks: Mutex<Vec<(SubscriptionId, VisibilityCallback)>>,
    next_subscription: AtomicU64,
    surfaces: SurfaceSource,
}

enum SurfaceSource {
    Memory(Mutex<HashMap<String, Arc<MemorySurface>>>),
    Custom(SurfaceFactory),
}

impl HeadlessContainer {
    /// Hidden, empty container whose entries render into [`MemorySurface`]s.
    pub fn new() -> Self {
        Self::with_source(SurfaceSource::Memory(Mutex::new(HashMap::new())))
    }

    /// Hidden, empty container using `factory` to create surfaces.
    pub fn with_surface_factory(
        factory: impl Fn(&str) -> Arc<dyn OutputSink> + Send + Sync + 'static,
    ) -> Self {
        Self::with_source(SurfaceSource::Custom(Box::new(factory)))
    }

    fn with_source(surfaces: SurfaceSource) -> Self {
        Self {
            state: Mutex::new(ContainerState::default()),
            callbacks: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
            surfaces,
        }
    }

    /// Show or hide the container, notifying subscribers.
    pub fn set_visible(&self, visible: bool) {
        lock(&self.state).visible = visible;
        self.notify();
    }

    /// Whether the container hides itself once empty.
    pub fn auto_hide_when_empty(&self) -> bool {
        lock(&self.state).auto_hide
    }

    /// Number of registered visibility callbacks.
    pub fn subscription_count(&self) -> usize {
        lock(&self.callbacks).len()
    }

    /// The memory surface created for `display_name`, when using memory
    /// surfaces.
    pub fn memory_surface(&self, display_name: &str) -> Option<Arc<MemorySurface>> {
        match &self.surfaces {
            SurfaceSource::Memory(map) => lock(map).get(display_name).cloned(),
            SurfaceSource::Custom(_) => None,
        }
    }

    fn notify(&self) {
        let callbacks: Vec<VisibilityCallback> = lock(&self.callbacks)
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        trace!(subscribers = callbacks.len(), "visibility changed");
        for callback in callbacks {
            callback();
        }
    }
}

impl Default for HeadlessContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl HostContainer for HeadlessContainer {
    fn content_count(&self) -> usize {
        lock(&self.state).entries.len()
    }

    fn is_visible(&self) -> bool {
        lock(&self.state).visible
    }

    fn find_entry(&self, display_name: &str) -> Option<Arc<Entry>> {
        lock(&self.state)
            .entries
            .iter()
            .find(|e| e.display_name() == display_name)
            .cloned()
    }

    fn add_entry(&self, entry: Arc<Entry>) {
        lock(&self.state).entries.push(entry);
        self.notify();
    }

    fn remove_entry(&self, display_name: &str) -> Option<Arc<Entry>> {
        let removed = {
            let mut state = lock(&self.state);
            let pos = state
                .entries
                .iter()
                .position(|e| e.display_name() == display_name)?;
            let removed = state.entries.remove(pos);
            if state.selected.as_deref() == Some(display_name) {
                state.selected = state
                    .entries
                    .last()
                    .map(|e| e.display_name().to_string());
            }
            if state.entries.is_empty() && state.auto_hide {
                state.visible = false;
            }
            removed
        };

        removed.dispose();
        self.notify();
        Some(removed)
    }

    fn set_selected(&self, entry: &Arc<Entry>) {
        lock(&self.state).selected = Some(entry.display_name().to_string());
    }

    fn selected_entry(&self) -> Option<Arc<Entry>> {
        let state = lock(&self.state);
        let selected = state.selected.as_deref()?;
        state
            .entries
            .iter()
            .find(|e| e.display_name() == selected)
            .cloned()
    }

    fn entries(&self) -> Vec<Arc<Entry>> {
        lock(&self.state).entries.clone()
    }

    fn create_surface(&self, display_name: &str) -> Arc<dyn OutputSink> {
        match &self.surfaces {
            SurfaceSource::Memory(map) => {
                let surface = Arc::new(MemorySurface::default());
                lock(map).insert(display_name.to_string(), Arc::clone(&surface));
                surface as Arc<dyn OutputSink>
            }
            SurfaceSource::Custom(factory) => factory(display_name),
        }
    }

    fn set_auto_hide_when_empty(&self, hide: bool) {
        lock(&self.state).auto_hide = hide;
    }

    fn subscribe_visibility_changed(&self, callback: VisibilityCallback) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        lock(&self.callbacks).push((id, callback));
        id
    }
}

/// Bridge over an optional [`HeadlessContainer`].
#[derive(Default)]
pub struct HeadlessBridge {
    container: Mutex<Option<Arc<HeadlessContainer>>>,
}

impl HeadlessBridge {
    /// Bridge with no container yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bridge over an existing container.
    pub fn with_container(container: Arc<HeadlessContainer>) -> Self {
        Self {
            container: Mutex::new(Some(container)),
        }
    }

    /// Make `container` the one this bridge reports.
    pub fn install(&self, container: Arc<HeadlessContainer>) {
        *lock(&self.container) = Some(container);
    }
}

impl HostBridge for HeadlessBridge {
    fn container(&self) -> Option<Arc<dyn HostContainer>> {
        lock(&self.container)
            .clone()
            .map(|c| c as Arc<dyn HostContainer>)
    }
}

/// Surface that records everything written to it.
#[derive(Debug, Default)]
pub struct MemorySurface {
    chunks: Mutex<Vec<(String, OutputKind)>>,
}

impl MemorySurface {
    /// All chunks received, in order.
    pub fn chunks(&self) -> Vec<(String, OutputKind)> {
        lock(&self.chunks).clone()
    }

    /// Concatenated text of every chunk.
    pub fn contents(&self) -> String {
        lock(&self.chunks)
            .iter()
            .map(|(text, _)| text.as_str())
            .collect()
    }
}

impl OutputSink for MemorySurface {
    fn write(&self, text: &str, kind: OutputKind) {
        lock(&self.chunks).push((text.to_string(), kind));
    }
}

/// Surface that prints to the process's stdout (stderr for error output).
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSurface;

impl OutputSink for StdoutSurface {
    fn write(&self, text: &str, kind: OutputKind) {
        let result = match kind {
            OutputKind::Stderr => {
                let mut err = std::io::stderr().lock();
                err.write_all(text.as_bytes()).and_then(|_| err.flush())
            }
            OutputKind::Stdout | OutputKind::System => {
                let mut out = std::io::stdout().lock();
                out.write_all(text.as_bytes()).and_then(|_| out.flush())
            }
        };
        if let Err(e) = result {
            trace!(error = %e, "stdout surface write failed");
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
