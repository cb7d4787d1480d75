use crate::env::Environment;
use anyhow::Result;
use std::io::{Read, Write};

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure,
/// mirroring the convention used by POSIX shells.
pub type ExitCode = i32;

/// Object-safe trait for any command the shell runs in-process.
pub trait ExecutableCommand {
    /// Executes the command using the provided IO streams and environment.
    fn execute(
        self: Box<Self>,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode>;
}

/// Factory that tries to create a command from a name and its arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`; the
/// interpreter then treats the line as an external program launch.
pub trait CommandFactory {
    /// Attempt to create a command instance for the provided name and arguments.
    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn ExecutableCommand>>;
}
