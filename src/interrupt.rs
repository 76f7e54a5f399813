//! SIGINT handling for the read loop.
//!
//! The handler only records that an interrupt happened and echoes a newline.
//! It is installed without `SA_RESTART`, so a blocked `read(2)` on the
//! terminal fails with `EINTR`; the line reader then calls [`take_pending`]
//! and restarts the loop with a fresh prompt.

use std::sync::atomic::{AtomicBool, Ordering};

use nix::errno::Errno;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};

static PENDING: AtomicBool = AtomicBool::new(false);

/// Serializes tests that touch the process-wide flag.
#[cfg(test)]
pub(crate) static FLAG_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

extern "C" fn on_sigint(_: libc::c_int) {
    mark_pending();
    // SAFETY: write(2) is async-signal-safe and the buffer is a static byte.
    unsafe {
        libc::write(libc::STDERR_FILENO, b"\n".as_ptr().cast(), 1);
    }
}

pub fn install() -> Result<(), Errno> {
    let action = SigAction::new(SigHandler::Handler(on_sigint), SaFlags::empty(), SigSet::empty());
    // SAFETY: the handler only touches an atomic and calls write(2).
    unsafe { signal::sigaction(Signal::SIGINT, &action) }?;
    Ok(())
}

/// Record an interrupt as if SIGINT had been delivered.
pub fn mark_pending() {
    PENDING.store(true, Ordering::SeqCst);
}

/// Consume the pending interrupt, if any.
pub fn take_pending() -> bool {
    PENDING.swap(false, Ordering::SeqCst)
}

/// Signals a spawned stage must see with their default disposition.
pub const JOB_SIGNALS: [Signal; 5] = [
    Signal::SIGINT,
    Signal::SIGQUIT,
    Signal::SIGTSTP,
    Signal::SIGTTIN,
    Signal::SIGTTOU,
];

/// Reset job-control signals to their defaults. Called in a forked child before exec.
pub fn restore_defaults() {
    let action = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    for sig in JOB_SIGNALS {
        // SAFETY: installing SIG_DFL has no handler to race with.
        let _ = unsafe { signal::sigaction(sig, &action) };
    }
}
