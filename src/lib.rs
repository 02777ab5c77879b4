//! # console-host
//!
//! Embeddable host for interactive REPL consoles.
//!
//! A [`ConsoleSession`] owns one external REPL process (evcxr by default),
//! feeds it input and hands its output to whatever surface the host shell
//! gives it. A [`SessionRegistry`] keeps at most one session per display
//! name, and the [`ActivationController`] binds sessions into the host's
//! container and spawns a fresh console whenever the container is shown
//! empty.
//!
//! The host shell is reached only through the [`HostBridge`] and
//! [`HostContainer`] traits; [`host::headless`] implements them in memory.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use console_host::host::headless::{HeadlessBridge, HeadlessContainer};
//! use console_host::{ActivationController, ConsoleFactory, LaunchSpec};
//!
//! fn main() -> console_host::Result<()> {
//!     console_host::logging::try_init().ok();
//!
//!     let container = Arc::new(HeadlessContainer::new());
//!     let bridge = Arc::new(HeadlessBridge::with_container(Arc::clone(&container)));
//!     let factory = Arc::new(ConsoleFactory::pty(
//!         LaunchSpec::new("evcxr").arg("--disable-readline"),
//!     ));
//!
//!     let controller = ActivationController::new(bridge, factory);
//!     let session = controller.launch_new()?;
//!     session.execute("1 + 2")?;
//!
//!     Ok(())
//! }
//! ```

pub mod activation;
pub mod cli;
pub mod config;
pub mod error;
pub mod host;
pub mod logging;
pub mod output;
pub mod process;
pub mod session;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use activation::{ActivationController, ConsoleFactory, ControllerState, SessionFactory};
pub use error::{ConsoleError, Result};
pub use host::{Entry, HostBridge, HostContainer};
pub use output::{OutputKind, OutputSink};
pub use process::{LaunchSpec, ProcessLauncher, PtyLauncher, PtySize};
pub use session::{ConsoleSession, SessionId, SessionRegistry, SessionState, SharedSession};
