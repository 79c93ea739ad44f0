use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::time::Duration;

/// Aborts the test binary if a blocking test is still running after `limit`
///
/// A broken admission or drain hangs instead of failing. Dropping the
/// watchdog closes its channel, which releases the watcher thread at once.
pub struct Watchdog {
    _disarm: Sender<()>,
}

impl Watchdog {
    pub fn arm(test: &'static str, limit: Duration) -> Self {
        let (disarm, armed) = mpsc::channel::<()>();
        std::thread::spawn(move || {
            if let Err(RecvTimeoutError::Timeout) = armed.recv_timeout(limit) {
                eprintln!("{test}: worker group still blocked after {limit:?}, aborting");
                std::process::abort();
            }
        });
        Self { _disarm: disarm }
    }
}
