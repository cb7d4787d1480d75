use std::env as stdenv;
use std::path::PathBuf;

/// Mutable, user-level view of the process environment used by the interpreter.
///
/// Variables are process-wide state: reads go straight to the real
/// environment (so forked children inherit every binding without any copying)
/// and `setenv` mutates it in place. The environment additionally tracks the
/// working directory so the prompt can render it without a syscall per line.
#[derive(Debug, Clone)]
pub struct Environment {
    /// The current working directory, mirrored from the process state.
    pub current_dir: PathBuf,
}

impl Environment {
    /// Capture the current process state into a new `Environment` instance.
    pub fn new() -> Self {
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self { current_dir }
    }

    /// Get the value of an environment variable, `None` when unbound.
    pub fn get_var(&self, key: &str) -> Option<String> {
        stdenv::var(key).ok()
    }

    /// Set or override a process environment variable.
    pub fn set_var(&mut self, key: impl AsRef<str>, val: impl AsRef<str>) {
        // The interpreter is single-threaded; the process environment is
        // never mutated concurrently with a read.
        unsafe { stdenv::set_var(key.as_ref(), val.as_ref()) };
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializes tests that touch process-global state (environment variables,
/// the working directory, the foreground-wait slot).
#[cfg(test)]
pub(crate) fn process_state_lock() -> std::sync::MutexGuard<'static, ()> {
    use std::sync::{Mutex, OnceLock};
    static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
    MUTEX
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_set_and_get_var() {
        let _guard = process_state_lock();
        let mut env = Environment::new();

        // initially absent
        assert_eq!(env.get_var("MINISH_ENV_TEST_VAR_12345"), None);

        env.set_var("MINISH_ENV_TEST_VAR_12345", "VALUE");
        assert_eq!(
            env.get_var("MINISH_ENV_TEST_VAR_12345"),
            Some("VALUE".to_string())
        );
    }

    #[test]
    fn test_env_reads_from_process_env() {
        let env = Environment::new();
        assert!(env.get_var("PATH").is_some());
    }
}
