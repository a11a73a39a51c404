use thiserror::Error;

pub type SubtreeResult<T> = Result<T, SubtreeError>;

/// Problems in a subtree pattern
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubtreeError {
    #[error("No subtree given")]
    NoSubtree,

    #[error("Subtree has more than one root")]
    MultipleRoots,

    #[error("Subtree rows form a cycle")]
    Cycle,

    #[error("Invalid regular expression on line {line}: {message}")]
    InvalidRegex { line: usize, message: String },
}

impl SubtreeError {
    pub fn invalid_regex(line: usize, error: &regex::Error) -> Self {
        Self::InvalidRegex {
            line,
            message: error
                .to_string()
                .lines()
                .last()
                .unwrap_or_default()
                .trim()
                .to_string(),
        }
    }
}
