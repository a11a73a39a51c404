use thiserror::Error;

pub type FormatResult<T> = Result<T, FormatError>;
pub type EditResult<T> = Result<T, EditError>;

/// Errors raised while reading tabular sentence annotations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    #[error("invalid line: {line} '{content}'")]
    InvalidLine { line: usize, content: String },

    #[error("empty {column}. Use '_' in line ({line})")]
    EmptyColumn { line: usize, column: String },

    #[error("invalid id '{value}' in line {line}")]
    InvalidId { line: usize, value: String },

    #[error("non-contiguous id '{value}' in line {line}, expected {expected}")]
    NonContiguous {
        line: usize,
        value: String,
        expected: String,
    },

    #[error("head id must be a number in line ({line})")]
    InvalidHead { line: usize },

    #[error("head id must be different from word id in line ({line})")]
    SelfHead { line: usize },

    #[error("head id is greater than sentence length: {head} > {len}")]
    HeadOutOfRange { head: u32, len: usize },

    #[error("Invalid enhanced dependency '{value}' in line {line}")]
    InvalidEnhancedDep { line: usize, value: String },

    #[error("Contracted word must not have columns filled after position 2 in line ({line})")]
    MultiwordColumns { line: usize },

    #[error("invalid multiword range '{value}' in line {line}")]
    InvalidRange { line: usize, value: String },

    #[error("invalid columns declaration: {0}")]
    InvalidSchema(String),
}

impl FormatError {
    pub fn invalid_line(line: usize, content: impl Into<String>) -> Self {
        Self::InvalidLine {
            line,
            content: content.into(),
        }
    }

    pub fn empty_column(line: usize, column: impl Into<String>) -> Self {
        Self::EmptyColumn {
            line,
            column: column.into(),
        }
    }

    pub fn invalid_id(line: usize, value: impl Into<String>) -> Self {
        Self::InvalidId {
            line,
            value: value.into(),
        }
    }
}

/// Rejections from structural editing operations.
///
/// A rejected edit leaves the sentence exactly as it was.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    #[error("INVALID id")]
    InvalidId(String),

    #[error("Cannot join last word")]
    JoinLast,

    #[error("Cannot delete last word")]
    DeleteLast,

    #[error("INVALID complen (to big)")]
    ComposeTooLong,

    #[error("INVALID complen (must be at least 2)")]
    ComposeTooShort,

    #[error("word {0} is already part of a multiword token")]
    AlreadyInMultiword(u32),

    #[error("no multiword token starts at {0}")]
    NoMultiword(u32),

    #[error("a multiword token needs at least two forms")]
    TooFewForms,

    #[error("empty nodes cannot be head/dependant in basic dependencies")]
    EmptyNodeInBasic,

    #[error("INVALID new head id")]
    SelfHead,

    #[error("cannot make {head} head of {dep}")]
    Cycle { head: u32, dep: u32 },

    #[error("ED does not exist")]
    NoEnhancedEdge,

    #[error("Invalid extracolumn for this sentence: {0}")]
    InvalidExtraColumn(String),

    #[error("Invalid enhanced dependency '{0}'")]
    InvalidEnhancedDep(String),

    #[error("Invalid translation line '{0}'")]
    InvalidTranslation(String),

    #[error("No next sentence to join")]
    NoNextSentence,

    #[error("INVALID sentence split position {0}")]
    InvalidSplit(u32),

    #[error("empty value for {0}")]
    EmptyValue(String),

    #[error("invalid feature '{0}', expected Key=Value")]
    InvalidFeature(String),
}

impl EditError {
    pub fn invalid_id(id: impl ToString) -> Self {
        Self::InvalidId(id.to_string())
    }

    /// True for rejections caused by the current tree shape rather than by a
    /// malformed request.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            EditError::SelfHead | EditError::Cycle { .. }
        )
    }
}
