//! Tokenization and variable expansion for a single input line.

use crate::env::Environment;

/// Hard cap on the number of tokens produced from one input line.
/// Anything beyond the cap is silently dropped; the shell never treats an
/// over-long line as an error.
pub const MAX_TOKENS: usize = 128;

/// Split a raw input line into argument tokens on runs of whitespace
/// (space, tab, carriage return, newline), expanding each token as it is
/// produced. Every token is a fresh owned `String`; nothing borrows `line`.
pub fn tokenize(line: &str, env: &Environment) -> Vec<String> {
    line.split([' ', '\t', '\r', '\n'])
        .filter(|t| !t.is_empty())
        .take(MAX_TOKENS)
        .map(|tok| expand(tok, env))
        .collect()
}

/// Expand a single token: `$NAME` becomes the value bound to `NAME` in the
/// process environment, or the empty string when unbound. A bare `$`, or any
/// token not starting with `$`, passes through unchanged.
fn expand(token: &str, env: &Environment) -> String {
    match token.strip_prefix('$') {
        Some(name) if !name.is_empty() => env.get_var(name).unwrap_or_default(),
        _ => token.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::process_state_lock;

    #[test]
    fn whitespace_only_line_yields_no_tokens() {
        let env = Environment::new();
        assert!(tokenize("", &env).is_empty());
        assert!(tokenize("   \t  \r\n", &env).is_empty());
    }

    #[test]
    fn splits_on_mixed_whitespace_runs() {
        let env = Environment::new();
        assert_eq!(
            tokenize("ls\t-l   /tmp\r\n", &env),
            vec!["ls", "-l", "/tmp"]
        );
    }

    #[test]
    fn expands_bound_variable() {
        let _guard = process_state_lock();
        let mut env = Environment::new();
        env.set_var("MINISH_LEXER_TEST_BOUND", "expanded");
        assert_eq!(
            tokenize("echo $MINISH_LEXER_TEST_BOUND", &env),
            vec!["echo", "expanded"]
        );
    }

    #[test]
    fn unbound_variable_expands_to_empty_string() {
        let _guard = process_state_lock();
        let env = Environment::new();
        assert_eq!(
            tokenize("echo $MINISH_LEXER_TEST_UNBOUND_98765", &env),
            vec!["echo", ""]
        );
    }

    #[test]
    fn bare_dollar_passes_through() {
        let env = Environment::new();
        assert_eq!(tokenize("echo $", &env), vec!["echo", "$"]);
    }

    #[test]
    fn truncates_at_token_cap() {
        let env = Environment::new();
        let line = vec!["x"; MAX_TOKENS + 10].join(" ");
        assert_eq!(tokenize(&line, &env).len(), MAX_TOKENS);
    }
}
