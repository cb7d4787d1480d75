//! A small interactive shell.
//!
//! Each input line is split into whitespace-separated tokens with `$NAME`
//! environment expansion, then either dispatched to an in-process builtin
//! (`cd`, `pwd`, `echo`, `env`, `setenv`, `exit`) or launched as an external
//! program via fork/exec. External commands support `<`/`>` file
//! redirection, a single `|` pipe between two programs, a trailing `&` for
//! non-blocking launch, and a wall-clock timeout that forcibly terminates
//! runaway foreground processes.
//!
//! The main entry point is [`Interpreter`]; [`Supervisor`] exposes the
//! process-launching engine on its own for embedding and tests.

mod builtin;
pub mod command;
pub mod env;
mod interpreter;
mod lexer;
mod parser;
mod signals;
mod supervisor;

/// Convenient re-export of the interactive command runner.
pub use interpreter::Interpreter;
/// The process-supervision engine and its launch outcomes.
pub use supervisor::{Outcome, Supervisor};
