//! Helpers shared by unit tests.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::output::{OutputKind, OutputSink};

/// Poll `cond` for up to two seconds.
pub(crate) fn wait_for(cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}

/// Sink that records every write.
#[derive(Default)]
pub(crate) struct RecordingSink {
    chunks: Mutex<Vec<(String, OutputKind)>>,
}

impl RecordingSink {
    pub(crate) fn text(&self) -> String {
        self.collect(|kind| kind != OutputKind::System)
    }

    pub(crate) fn system_text(&self) -> String {
        self.collect(|kind| kind == OutputKind::System)
    }

    fn collect(&self, keep: impl Fn(OutputKind) -> bool) -> String {
        self.chunks
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, kind)| keep(*kind))
            .map(|(text, _)| text.as_str())
            .collect()
    }
}

impl OutputSink for RecordingSink {
    fn write(&self, text: &str, kind: OutputKind) {
        self.chunks.lock().unwrap().push((text.to_string(), kind));
    }
}
