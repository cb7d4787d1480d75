//! Structural analysis of a tokenized line: the background marker, the
//! pipeline split, and redirection extraction.

use std::fmt;

/// Input/output redirection targets pulled out of one argument vector.
///
/// The spec is per command (or per pipeline stage) and is not kept beyond
/// the launch it describes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RedirSpec {
    /// Path the stage reads its standard input from, set by `<`.
    pub input: Option<String>,
    /// Path the stage writes its standard output to, set by `>`.
    pub output: Option<String>,
}

/// A redirection operator appeared as the last token, with no path after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    operator: String,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "syntax error near `{}`", self.operator)
    }
}

impl std::error::Error for SyntaxError {}

/// Scan `argv` left to right, consuming every `<`/`>` operator together with
/// the token after it and compacting the vector in place (relative order of
/// the remaining tokens is preserved).
///
/// A repeated operator overwrites the previously recorded path: last one
/// wins. An operator with no following token is a [`SyntaxError`] and the
/// caller must not spawn anything for this vector.
pub fn extract_redirections(argv: &mut Vec<String>) -> Result<RedirSpec, SyntaxError> {
    let mut spec = RedirSpec::default();
    let mut kept = Vec::with_capacity(argv.len());
    let mut i = 0;
    while i < argv.len() {
        let is_input = argv[i] == "<";
        if is_input || argv[i] == ">" {
            if i + 1 >= argv.len() {
                return Err(SyntaxError {
                    operator: std::mem::take(&mut argv[i]),
                });
            }
            let path = std::mem::take(&mut argv[i + 1]);
            if is_input {
                spec.input = Some(path);
            } else {
                spec.output = Some(path);
            }
            i += 2;
        } else {
            kept.push(std::mem::take(&mut argv[i]));
            i += 1;
        }
    }
    *argv = kept;
    Ok(spec)
}

/// Split at the FIRST token equal to `|`. Returns one element when no pipe
/// is present, two otherwise. Neither half is re-scanned for further pipes;
/// only a single pipe stage is supported.
pub fn split_pipeline(argv: Vec<String>) -> Vec<Vec<String>> {
    match argv.iter().position(|t| t == "|") {
        Some(cut) => {
            let mut left = argv;
            let right = left.split_off(cut + 1);
            left.pop(); // drop the `|` itself
            vec![left, right]
        }
        None => vec![argv],
    }
}

/// Remove a trailing `&` token, reporting whether it was present. Runs
/// before builtin dispatch and before the pipeline split.
pub fn strip_background(argv: &mut Vec<String>) -> bool {
    if argv.last().is_some_and(|t| t == "&") {
        argv.pop();
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn extracts_input_and_output_paths() {
        let mut v = argv(&["sort", "<", "in.txt", "-r", ">", "out.txt"]);
        let spec = extract_redirections(&mut v).unwrap();
        assert_eq!(spec.input.as_deref(), Some("in.txt"));
        assert_eq!(spec.output.as_deref(), Some("out.txt"));
        assert_eq!(v, argv(&["sort", "-r"]));
    }

    #[test]
    fn no_operators_leaves_vector_untouched() {
        let mut v = argv(&["ls", "-l"]);
        let spec = extract_redirections(&mut v).unwrap();
        assert_eq!(spec, RedirSpec::default());
        assert_eq!(v, argv(&["ls", "-l"]));
    }

    #[test]
    fn trailing_operator_is_a_syntax_error() {
        let mut v = argv(&["cat", "<"]);
        let err = extract_redirections(&mut v).unwrap_err();
        assert_eq!(err.to_string(), "syntax error near `<`");

        let mut v = argv(&["cat", "x", ">"]);
        assert!(extract_redirections(&mut v).is_err());
    }

    #[test]
    fn repeated_operator_last_one_wins() {
        let mut v = argv(&["cmd", ">", "first", ">", "second"]);
        let spec = extract_redirections(&mut v).unwrap();
        assert_eq!(spec.output.as_deref(), Some("second"));
        assert_eq!(v, argv(&["cmd"]));
    }

    #[test]
    fn splits_on_first_pipe_only() {
        let stages = split_pipeline(argv(&["a", "1", "|", "b", "|", "c"]));
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0], argv(&["a", "1"]));
        // The right half keeps any further `|` verbatim.
        assert_eq!(stages[1], argv(&["b", "|", "c"]));
    }

    #[test]
    fn no_pipe_yields_single_stage() {
        let stages = split_pipeline(argv(&["ls", "-l"]));
        assert_eq!(stages, vec![argv(&["ls", "-l"])]);
    }

    #[test]
    fn strips_trailing_background_marker() {
        let mut v = argv(&["sleep", "5", "&"]);
        assert!(strip_background(&mut v));
        assert_eq!(v, argv(&["sleep", "5"]));

        let mut v = argv(&["sleep", "5"]);
        assert!(!strip_background(&mut v));
        assert_eq!(v, argv(&["sleep", "5"]));
    }

    #[test]
    fn interior_ampersand_is_not_a_marker() {
        let mut v = argv(&["echo", "&", "x"]);
        assert!(!strip_background(&mut v));
        assert_eq!(v, argv(&["echo", "&", "x"]));
    }
}
