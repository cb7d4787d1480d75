//! Process spawning and supervision: fork/exec of external commands, pipe
//! wiring between pipeline stages, file redirections, and the foreground
//! wait with its wall-clock timeout.

use crate::parser::{self, RedirSpec};
use crate::signals;
use anyhow::{Context, Result, bail};
use nix::fcntl::{OFlag, open};
use nix::libc;
use nix::sys::signal::{self, SigHandler, Signal};
use nix::sys::stat::Mode;
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, close, dup2, execvp, fork, pipe};
use std::ffi::CString;
use std::os::fd::{IntoRawFd, RawFd};

/// Exit status a child reserves for its own setup failures: a redirection
/// target that cannot be opened, or an executable that cannot be launched.
pub const EXIT_CHILD_FAILURE: i32 = 127;

/// How one launch attempt ended, as seen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The (last) child exited on its own, with this status code.
    Exited(i32),
    /// The (last) child was terminated by this signal.
    Signaled(i32),
    /// The foreground deadline expired and the child was forcibly killed.
    TimedOut,
    /// Launched without waiting; carries the child's pid.
    Background(i32),
}

/// One fully resolved pipeline stage.
///
/// The exec vector and redirection paths are converted to `CString`s before
/// any fork, so the post-fork child path performs no allocation.
pub struct Stage {
    exec: Vec<CString>,
    input: Option<CString>,
    output: Option<CString>,
}

impl Stage {
    /// Pull the `<`/`>` operators out of `argv` and build the stage.
    ///
    /// Fails — without anything having been spawned — on a dangling
    /// redirection operator, an empty command, or a token with an interior
    /// NUL byte.
    pub fn resolve(mut argv: Vec<String>) -> Result<Self> {
        let RedirSpec { input, output } = parser::extract_redirections(&mut argv)?;
        if argv.is_empty() {
            bail!("missing command");
        }
        let exec = argv
            .into_iter()
            .map(|arg| CString::new(arg).context("argument contains a NUL byte"))
            .collect::<Result<Vec<_>>>()?;
        let input = input
            .map(|p| CString::new(p).context("redirection path contains a NUL byte"))
            .transpose()?;
        let output = output
            .map(|p| CString::new(p).context("redirection path contains a NUL byte"))
            .transpose()?;
        Ok(Self {
            exec,
            input,
            output,
        })
    }
}

/// Turns resolved argument vectors into running children and collects their
/// outcome. Single foreground commands are subject to the wall-clock
/// timeout; pipelines and background launches are not.
pub struct Supervisor {
    timeout_secs: u32,
}

impl Supervisor {
    pub fn new(timeout_secs: u32) -> Self {
        Self { timeout_secs }
    }

    /// Seconds a foreground command may run before it is killed.
    pub fn timeout_secs(&self) -> u32 {
        self.timeout_secs
    }

    /// Launch one command or one pipeline, one argument vector per stage.
    ///
    /// Redirections are resolved for every stage before the first fork; a
    /// syntax error anywhere means nothing is spawned. A pipeline always
    /// waits for all of its stages and ignores the background marker,
    /// matching the single-pipe design this shell supports.
    pub fn run(&self, stages: Vec<Vec<String>>, background: bool) -> Result<Outcome> {
        let mut resolved = Vec::with_capacity(stages.len());
        for argv in stages {
            resolved.push(Stage::resolve(argv)?);
        }
        if resolved.len() == 1 {
            let stage = resolved.remove(0);
            if background {
                self.spawn_background(stage)
            } else {
                self.run_foreground(stage)
            }
        } else {
            self.run_pipeline(resolved)
        }
    }

    fn spawn_background(&self, stage: Stage) -> Result<Outcome> {
        let child = spawn(&stage, None, None, &[])?;
        Ok(Outcome::Background(child.as_raw()))
    }

    /// The foreground-wait protocol: arm the deadline atomically with
    /// recording the child pid, block in `waitpid`, then disarm and clear
    /// the slot no matter how the wait returned.
    fn run_foreground(&self, stage: Stage) -> Result<Outcome> {
        let child = spawn(&stage, None, None, &[])?;
        let ctx = signals::context();
        ctx.arm(child, self.timeout_secs);
        let waited = waitpid(child, None);
        let expired = ctx.disarm();
        if expired {
            // The handler's SIGKILL may have interrupted the wait itself
            // (EINTR); reap the killed child before reporting.
            if waited.is_err() {
                let _ = waitpid(child, None);
            }
            return Ok(Outcome::TimedOut);
        }
        let status = waited.context("waitpid failed")?;
        Ok(classify(status))
    }

    /// An ordered list of stages connected by anonymous pipes. The splitter
    /// only ever produces two stages, but the loop does not care.
    fn run_pipeline(&self, stages: Vec<Stage>) -> Result<Outcome> {
        let mut pipes: Vec<(RawFd, RawFd)> = Vec::with_capacity(stages.len() - 1);
        for _ in 0..stages.len() - 1 {
            let (r, w) = pipe().context("pipe failed")?;
            pipes.push((r.into_raw_fd(), w.into_raw_fd()));
        }
        // Every child inherits every pipe fd and closes them all after its
        // own dup2 calls; the parent closes its copies after the last fork.
        let all_fds: Vec<RawFd> = pipes.iter().flat_map(|&(r, w)| [r, w]).collect();

        let mut children = Vec::with_capacity(stages.len());
        for (i, stage) in stages.iter().enumerate() {
            let stdin_fd = (i > 0).then(|| pipes[i - 1].0);
            let stdout_fd = (i < stages.len() - 1).then(|| pipes[i].1);
            match spawn(stage, stdin_fd, stdout_fd, &all_fds) {
                Ok(pid) => children.push(pid),
                Err(e) => {
                    // Release the channel so already-forked stages see EOF,
                    // then reap them before giving up.
                    for fd in &all_fds {
                        let _ = close(*fd);
                    }
                    for pid in children {
                        let _ = waitpid(pid, None);
                    }
                    return Err(e);
                }
            }
        }

        // The parent never reads or writes the channel; holding a write end
        // open would leave the reader blocked forever.
        for fd in all_fds {
            let _ = close(fd);
        }

        // Wait for every stage; statuses are collected but only the last
        // one is surfaced. Pipelines are not subject to the timeout.
        let mut last = Outcome::Exited(0);
        for pid in children {
            match waitpid(pid, None) {
                Ok(status) => last = classify(status),
                Err(e) => eprintln!("minish: waitpid: {e}"),
            }
        }
        Ok(last)
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new(10)
    }
}

fn classify(status: WaitStatus) -> Outcome {
    match status {
        WaitStatus::Exited(_, code) => Outcome::Exited(code),
        WaitStatus::Signaled(_, sig, _) => Outcome::Signaled(sig as i32),
        // Stop/continue tracking is not requested from waitpid.
        _ => Outcome::Exited(EXIT_CHILD_FAILURE),
    }
}

/// Fork and run `stage` in the child; returns the child pid to the parent.
fn spawn(
    stage: &Stage,
    stdin_fd: Option<RawFd>,
    stdout_fd: Option<RawFd>,
    inherited: &[RawFd],
) -> Result<Pid> {
    match unsafe { fork() }.context("fork failed")? {
        ForkResult::Child => child_exec(stage, stdin_fd, stdout_fd, inherited),
        ForkResult::Parent { child } => Ok(child),
    }
}

/// Everything the child does between fork and exec. Must stay allocation
/// free: the parent may be multi-threaded (tests), so only async-signal-safe
/// calls are allowed here. Never returns.
fn child_exec(
    stage: &Stage,
    stdin_fd: Option<RawFd>,
    stdout_fd: Option<RawFd>,
    inherited: &[RawFd],
) -> ! {
    // The child must be interruptible from the terminal again; the shell's
    // own SIGINT handler stops at the fork boundary.
    unsafe {
        let _ = signal::signal(Signal::SIGINT, SigHandler::SigDfl);
    }
    if let Some(fd) = stdin_fd {
        let _ = dup2(fd, libc::STDIN_FILENO);
    }
    if let Some(fd) = stdout_fd {
        let _ = dup2(fd, libc::STDOUT_FILENO);
    }
    for fd in inherited {
        let _ = close(*fd);
    }
    // Explicit redirections are applied after the pipe wiring, so `>` on a
    // piped stage overrides the pipe connection (last one wins).
    if apply_redirections(stage).is_err() {
        child_abort(b"minish: cannot open redirection target\n");
    }
    let _ = execvp(stage.exec[0].as_c_str(), &stage.exec);
    // Only reached when the image replacement failed.
    child_abort(b"minish: cannot execute command\n");
}

fn apply_redirections(stage: &Stage) -> nix::Result<()> {
    if let Some(path) = &stage.input {
        let fd = open(path.as_c_str(), OFlag::O_RDONLY, Mode::empty())?;
        dup2(fd, libc::STDIN_FILENO)?;
        close(fd)?;
    }
    if let Some(path) = &stage.output {
        let fd = open(
            path.as_c_str(),
            OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
            Mode::from_bits_truncate(0o666),
        )?;
        dup2(fd, libc::STDOUT_FILENO)?;
        close(fd)?;
    }
    Ok(())
}

/// Report a setup failure on stderr and leave with the reserved status,
/// without unwinding through the parent's logic.
fn child_abort(msg: &[u8]) -> ! {
    unsafe {
        libc::write(libc::STDERR_FILENO, msg.as_ptr().cast(), msg.len());
        libc::_exit(EXIT_CHILD_FAILURE)
    }
}
