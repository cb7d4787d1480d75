//! Signal plumbing: the interactive SIGINT handler and the SIGALRM-driven
//! foreground timeout.
//!
//! All shared state lives in a single [`SupervisorContext`] of atomics. The
//! handlers themselves only touch the context and make async-signal-safe
//! calls (`kill`, `write`); every other piece of bookkeeping — reporting the
//! expiry, resetting flags for the next command — happens on the normal
//! control-flow side after the blocking wait returns.

use nix::libc;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::unistd::{Pid, alarm};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

/// Shared state between the supervisor and the signal handlers.
///
/// The interpreter never waits on two unrelated foreground processes at
/// once, so a single pid slot suffices. `-1` means no foreground child.
pub struct SupervisorContext {
    fg_pid: AtomicI32,
    alarm_fired: AtomicBool,
    got_sigint: AtomicBool,
}

static CONTEXT: SupervisorContext = SupervisorContext {
    fg_pid: AtomicI32::new(-1),
    alarm_fired: AtomicBool::new(false),
    got_sigint: AtomicBool::new(false),
};

/// The process-wide context the handlers are bound to.
pub fn context() -> &'static SupervisorContext {
    &CONTEXT
}

impl SupervisorContext {
    /// Record `pid` as the foreground child and start the wall-clock alarm.
    /// Called immediately before the blocking wait.
    pub fn arm(&self, pid: Pid, secs: u32) {
        self.alarm_fired.store(false, Ordering::SeqCst);
        self.fg_pid.store(pid.as_raw(), Ordering::SeqCst);
        let _ = alarm::set(secs);
    }

    /// Cancel the alarm and clear the foreground slot, regardless of why the
    /// wait returned. Reports and resets the expiry flag: `true` when the
    /// deadline elapsed while armed.
    pub fn disarm(&self) -> bool {
        let _ = alarm::cancel();
        self.fg_pid.store(-1, Ordering::SeqCst);
        self.alarm_fired.swap(false, Ordering::SeqCst)
    }

    /// Read and reset the interrupt flag.
    pub fn take_sigint(&self) -> bool {
        self.got_sigint.swap(false, Ordering::SeqCst)
    }
}

extern "C" fn on_sigint(_: libc::c_int) {
    // Only flag the interrupt and acknowledge it with a newline; the
    // foreground pid slot is never touched, so interrupting the shell does
    // not kill a running child.
    CONTEXT.got_sigint.store(true, Ordering::SeqCst);
    unsafe {
        libc::write(libc::STDOUT_FILENO, b"\n".as_ptr().cast(), 1);
    }
}

extern "C" fn on_sigalrm(_: libc::c_int) {
    let pid = CONTEXT.fg_pid.load(Ordering::SeqCst);
    if pid > 0 {
        let _ = signal::kill(Pid::from_raw(pid), Signal::SIGKILL);
    }
    CONTEXT.alarm_fired.store(true, Ordering::SeqCst);
}

/// Install the SIGINT and SIGALRM handlers for the interpreter's lifetime.
pub fn install() -> nix::Result<()> {
    let on_int = SigAction::new(
        SigHandler::Handler(on_sigint),
        SaFlags::empty(),
        SigSet::empty(),
    );
    let on_alrm = SigAction::new(
        SigHandler::Handler(on_sigalrm),
        SaFlags::empty(),
        SigSet::empty(),
    );
    unsafe {
        signal::sigaction(Signal::SIGINT, &on_int)?;
        signal::sigaction(Signal::SIGALRM, &on_alrm)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disarm_reports_expiry_exactly_once() {
        let _guard = crate::env::process_state_lock();
        let ctx = context();
        ctx.arm(Pid::from_raw(-2), 60); // pid slot only; no real child
        ctx.alarm_fired.store(true, Ordering::SeqCst);
        assert!(ctx.disarm());
        // Flag was reset by the first disarm.
        assert!(!ctx.disarm());
    }

    #[test]
    fn sigint_flag_is_read_and_reset() {
        let _guard = crate::env::process_state_lock();
        let ctx = context();
        ctx.got_sigint.store(true, Ordering::SeqCst);
        assert!(ctx.take_sigint());
        assert!(!ctx.take_sigint());
    }
}
