//! REPL echo and prompt handling.

/// Prompt printed by the console process when it is ready for input.
pub const PROMPT: &str = ">> ";

/// Tracks whether the console is busy and cleans up REPL chatter.
///
/// A PTY echoes submitted input back, and the REPL prints its own prompt
/// after every evaluation. The host renders both itself, so the tracker
/// removes the echoed line after [`on_execution_begin`](Self::on_execution_begin)
/// and strips a trailing prompt line, which also marks the execution done.
#[derive(Debug, Default, Clone)]
pub struct PromptTracker {
    executing: bool,
    echo_skipped: bool,
}

impl PromptTracker {
    /// Create an idle tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark that input was just submitted.
    pub fn on_execution_begin(&mut self) {
        self.executing = true;
        self.echo_skipped = false;
    }

    /// Whether submitted input is still being evaluated.
    pub fn is_executing(&self) -> bool {
        self.executing
    }

    /// Filter one piece of decoded output.
    pub fn process_text(&mut self, text: &str) -> String {
        let mut text: String = text.chars().filter(|&c| c != '\r').collect();

        if self.executing && !self.echo_skipped {
            match text.find('\n') {
                Some(pos) => {
                    text.drain(..=pos);
                    self.echo_skipped = true;
                }
                None => return String::new(),
            }
        }

        let last_line_start = text.rfind('\n').map(|pos| pos + 1).unwrap_or(0);
        if &text[last_line_start..] == PROMPT {
            text.truncate(last_line_start);
            self.executing = false;
        }

        text
    }
}
