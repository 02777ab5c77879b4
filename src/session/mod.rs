//! Console session management.
//!
//! This module provides the session lifecycle ([`ConsoleSession`]), its
//! state machine, identification, and the name-keyed [`SessionRegistry`].

mod console;
mod id;
mod pump;
mod registry;
mod state;
pub mod title;

pub use console::{ConsoleSession, OutputOptions, SharedSession};
pub use id::SessionId;
pub use registry::SessionRegistry;
pub use state::SessionState;
