// src/exec/command_line.rs

//! Splitting of a configured `exec` string into program + arguments.
//!
//! Splitting is purely on whitespace. There is no shell involved, so quotes,
//! globs, pipes and variables are passed through literally. Commands that
//! need a shell should say so: `exec = "sh -c make-and-test.sh"`.

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    /// Returns `None` when `exec` contains no words.
    pub fn parse(exec: &str) -> Option<Self> {
        let mut words = exec.split_whitespace().map(str::to_string);
        let program = words.next()?;
        Some(Self {
            program,
            args: words.collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_any_whitespace() {
        let line = CommandLine::parse("  go   build\t./... ").unwrap();
        assert_eq!(line.program, "go");
        assert_eq!(line.args, vec!["build", "./..."]);
    }

    #[test]
    fn quotes_are_not_interpreted() {
        let line = CommandLine::parse("echo \"a b\"").unwrap();
        assert_eq!(line.args, vec!["\"a", "b\""]);
    }

    #[test]
    fn blank_is_none() {
        assert_eq!(CommandLine::parse(" \t "), None);
    }
}
