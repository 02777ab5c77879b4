//! Wiring between console sessions and the host container.
//!
//! [`ActivationController`] installs sessions into entries, keeps exactly
//! one visibility subscription per controller, and spawns a fresh console
//! when the container becomes visible with nothing in it.

mod controller;
mod factory;

pub use controller::{ActivationController, ActivationSettings, ControllerState, DEFAULT_TITLE};
pub use factory::{ConsoleFactory, SessionFactory};
