//! Output processing and hand-off.
//!
//! This module provides the pieces between a console process and whatever
//! renders its output:
//! - [`OutputSink`]: the host-provided, write-only rendering surface
//! - [`OutputBuffer`]: bounded retention while no sink is attached
//! - [`OutputSanitizer`]: ANSI escape code stripping
//! - [`PromptTracker`]: REPL echo and prompt handling
//!
//! # Example
//!
//! ```
//! use console_host::output::{OutputSanitizer, PromptTracker};
//!
//! let clean = OutputSanitizer::strip_ansi(b"\x1b[0K>> ");
//! let mut tracker = PromptTracker::new();
//! tracker.on_execution_begin();
//! assert_eq!(tracker.process_text("1 + 2\n3\n>> "), "3\n");
//! assert!(!tracker.is_executing());
//! assert_eq!(clean, ">> ");
//! ```

mod buffer;
mod decoder;
mod prompt;
mod sanitizer;
mod sink;

pub use buffer::{OutputBuffer, DEFAULT_BUFFER_LIMIT};
pub use decoder::Utf8Decoder;
pub use prompt::{PromptTracker, PROMPT};
pub use sanitizer::OutputSanitizer;
pub use sink::{OutputKind, OutputSink};
