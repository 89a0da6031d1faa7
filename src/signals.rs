//! Process signal wiring.
//!
//! SIGTERM and SIGINT are the only shutdown paths: a dedicated watcher
//! thread blocks on the signal iterator and fires the shared cancellation
//! token, which wakes every interruptible wait in the worker loops. The
//! watcher thread is detached; it ends with the process.

use anyhow::{Context, Result};
use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;

use crate::cancel::CancelToken;

/// Install the termination-signal watcher. Returns once the watcher thread
/// is running.
pub fn setup_signal_handler(token: CancelToken) -> Result<()> {
    let mut signals =
        Signals::new([SIGTERM, SIGINT]).context("failed to register signal handlers")?;

    std::thread::Builder::new()
        .name("signal-watcher".into())
        .spawn(move || {
            for signal in signals.forever() {
                log_block_start!("Received signal {signal}, shutting down...");
                token.cancel();
                // Level-triggered: one shutdown request is enough, further
                // signals are harmless repeats.
            }
        })
        .context("failed to spawn signal watcher thread")?;

    Ok(())
}
