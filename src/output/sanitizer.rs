//! ANSI escape stripping for console output.

use vte::{Params, Parser, Perform};

/// Streaming escape-sequence stripper built on the VTE parser.
///
/// Console REPLs running under a PTY emit bracketed-paste toggles, cursor
/// reports and line clears around every prompt. The parser state survives
/// between [`feed`](Self::feed) calls, so a sequence split across two reads
/// is still removed.
pub struct OutputSanitizer {
    parser: Parser,
    text: TextCollector,
}

impl OutputSanitizer {
    /// Create a sanitizer in the ground state.
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
            text: TextCollector::default(),
        }
    }

    /// Feed raw process bytes and return the printable text they contain.
    pub fn feed(&mut self, bytes: &[u8]) -> String {
        self.parser.advance(&mut self.text, bytes);
        std::mem::take(&mut self.text.out)
    }

    /// Strip escape sequences from a complete buffer.
    pub fn strip_ansi(input: &[u8]) -> String {
        Self::new().feed(input)
    }
}

impl Default for OutputSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OutputSanitizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputSanitizer").finish_non_exhaustive()
    }
}

#[derive(Default)]
struct TextCollector {
    out: String,
}

impl Perform for TextCollector {
    fn print(&mut self, c: char) {
        self.out.push(c);
    }

    fn execute(&mut self, byte: u8) {
        if matches!(byte, b'\n' | b'\r' | b'\t') {
            self.out.push(byte as char);
        }
    }

    fn hook(&mut self, _params: &Params, _intermediates: &[u8], _ignore: bool, _action: char) {}

    fn put(&mut self, _byte: u8) {}

    fn unhook(&mut self) {}

    fn osc_dispatch(&mut self, _params: &[&[u8]], _bell_terminated: bool) {}

    fn csi_dispatch(
        &mut self,
        _params: &Params,
        _intermediates: &[u8],
        _ignore: bool,
        _action: char,
    ) {
    }

    fn esc_dispatch(&mut self, _intermediates: &[u8], _ignore: bool, _byte: u8) {}
}
