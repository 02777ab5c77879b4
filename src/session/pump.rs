//! Background reader that moves process output into a session.

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, trace};

use super::console::Shared;
use super::SessionId;
use crate::output::{OutputSanitizer, Utf8Decoder};

const READ_BUFFER_SIZE: usize = 4096;

/// How long to wait for an exit status after the output stream closes.
const EXIT_POLL_ATTEMPTS: u32 = 50;
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Start pumping `reader` into the session.
///
/// Uses the tokio blocking pool when called inside a runtime and a plain
/// named thread otherwise. Either way the caller is never blocked.
pub(super) fn spawn(id: SessionId, reader: Box<dyn Read + Send>, shared: Arc<Shared>) {
    let task = move || run(id, reader, shared);

    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn_blocking(task);
        }
        Err(_) => {
            let spawned = std::thread::Builder::new()
                .name(format!("{}-output", id))
                .spawn(task);
            if let Err(e) = spawned {
                error!(session = %id, error = %e, "failed to spawn output thread");
            }
        }
    }
}

enum Decode {
    Sanitize(OutputSanitizer),
    Raw(Utf8Decoder),
}

impl Decode {
    fn feed(&mut self, bytes: &[u8]) -> String {
        match self {
            Decode::Sanitize(sanitizer) => sanitizer.feed(bytes),
            Decode::Raw(decoder) => decoder.decode(bytes),
        }
    }

    fn finish(&mut self) -> String {
        match self {
            Decode::Sanitize(_) => String::new(),
            Decode::Raw(decoder) => decoder.finish(),
        }
    }
}

fn run(id: SessionId, mut reader: Box<dyn Read + Send>, shared: Arc<Shared>) {
    let mut decode = if shared.options().strip_ansi {
        Decode::Sanitize(OutputSanitizer::new())
    } else {
        Decode::Raw(Utf8Decoder::new())
    };
    let mut buf = vec![0u8; READ_BUFFER_SIZE];

    loop {
        match reader.read(&mut buf) {
            Ok(0) => {
                debug!(session = %id, "output: EOF");
                break;
            }
            Ok(n) => {
                trace!(session = %id, "output: read {} bytes", n);
                let text = decode.feed(&buf[..n]);
                if !text.is_empty() && !shared.deliver(&text) {
                    debug!(session = %id, "output: session disposed, stopping");
                    return;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                // EIO on Unix means the PTY slave side is gone.
                #[cfg(unix)]
                if e.raw_os_error() == Some(libc::EIO) {
                    debug!(session = %id, "output: PTY closed (EIO)");
                    break;
                }

                debug!(session = %id, error = %e, "output: read failed");
                break;
            }
        }
    }

    let rest = decode.finish();
    if !rest.is_empty() && !shared.deliver(&rest) {
        return;
    }

    let mut exit_code = None;
    for _ in 0..EXIT_POLL_ATTEMPTS {
        exit_code = shared.poll_exit();
        if exit_code.is_some() {
            break;
        }
        std::thread::sleep(EXIT_POLL_INTERVAL);
    }

    shared.on_output_closed(id, exit_code);
}
