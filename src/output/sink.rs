//! Rendering surface contract.

use std::fmt;

/// Category of a piece of console output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputKind {
    /// Regular process output.
    Stdout,
    /// Error output.
    Stderr,
    /// Messages produced by the host itself (exit notices and the like).
    System,
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputKind::Stdout => f.write_str("stdout"),
            OutputKind::Stderr => f.write_str("stderr"),
            OutputKind::System => f.write_str("system"),
        }
    }
}

/// Write-only handle a session pushes rendered output into.
///
/// Sinks are owned by the host; sessions only keep a weak reference, so a
/// sink that the host drops silently stops receiving output.
pub trait OutputSink: Send + Sync {
    /// Render a piece of text.
    fn write(&self, text: &str, kind: OutputKind);
}
