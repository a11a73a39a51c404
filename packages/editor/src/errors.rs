//! Error types for the editor

use thiserror::Error;
use treebank_conllu::{EditError, FormatError};
use treebank_pattern::SubtreeError;
use treebank_query::{EvalError, ParseError};

/// Coarse classification used by callers to decide how to report an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    Validation,
    Conflict,
    Io,
}

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("CoNLL error: {0}")]
    Format(#[from] FormatError),

    #[error("{0}")]
    Edit(#[from] EditError),

    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("{0}")]
    Eval(#[from] EvalError),

    #[error("{0}")]
    Subtree(#[from] SubtreeError),

    #[error("Bad regular expression: {0}")]
    Regex(#[from] regex::Error),

    #[error("Cannot save file: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("NO editing in browse mode")]
    ReadOnly,
}

impl EditorError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn stale(observed: u64, current: u64) -> Self {
        Self::Conflict(format!(
            "Sentence has been modified by another client (observed {}, current {})",
            observed, current
        ))
    }

    /// An edit sent without the counter the client last saw
    pub fn missing_counter(current: u64) -> Self {
        Self::Conflict(format!(
            "Sentence modification counter missing (current {}), read the sentence before editing",
            current
        ))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EditorError::Format(_)
            | EditorError::Parse(_)
            | EditorError::Subtree(_)
            | EditorError::Regex(_) => ErrorKind::Parse,
            EditorError::Edit(e) if e.is_conflict() => ErrorKind::Conflict,
            EditorError::Conflict(_) => ErrorKind::Conflict,
            EditorError::Io(_) => ErrorKind::Io,
            EditorError::Edit(_)
            | EditorError::Eval(_)
            | EditorError::Validation(_)
            | EditorError::ReadOnly => ErrorKind::Validation,
        }
    }
}
