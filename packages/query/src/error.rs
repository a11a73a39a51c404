use thiserror::Error;
use treebank_conllu::{EditError, TokenRef};

/// Result type for parsing operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Syntax errors of the condition, replacement and pattern languages.
///
/// Positions are 0-based character offsets into the parsed text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token at {pos}: expected {expected}, found {found}")]
    UnexpectedToken {
        pos: usize,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of input at {pos}: expected {expected}")]
    UnexpectedEof { pos: usize, expected: String },

    #[error("Unbalanced parenthesis at {pos}")]
    UnbalancedParenthesis { pos: usize },

    #[error("Missing operator at {pos}: expected 'and' or 'or', found {found}")]
    MissingOperator { pos: usize, found: String },

    #[error("Invalid negation at {pos}: '!' must be followed by a condition")]
    InvalidNegation { pos: usize },

    #[error("Invalid absolute head id at {pos}: '{value}'")]
    InvalidAbsoluteHead { pos: usize, value: String },

    #[error("Invalid relative head id at {pos}: '{value}'")]
    InvalidRelativeHead { pos: usize, value: String },

    #[error("Unknown field at {pos}: '{name}'")]
    UnknownField { pos: usize, name: String },

    #[error("Invalid regular expression at {pos}: {message}")]
    InvalidRegex { pos: usize, message: String },

    #[error("Unrecognized input at {pos}: '{text}'")]
    Unrecognized { pos: usize, text: String },

    #[error("Identifier {name} not found")]
    UndeclaredIdentifier { name: String },

    #[error("Inconsistent declarations for node {name}: {message}")]
    InconsistentDeclaration { name: String, message: String },

    #[error("Line {line}: {source}")]
    AtLine {
        line: usize,
        source: Box<ParseError>,
    },
}

impl ParseError {
    pub fn unexpected_token(
        pos: usize,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::UnexpectedToken {
            pos,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn unexpected_eof(pos: usize, expected: impl Into<String>) -> Self {
        Self::UnexpectedEof {
            pos,
            expected: expected.into(),
        }
    }

    pub fn invalid_regex(pos: usize, error: &regex::Error) -> Self {
        Self::InvalidRegex {
            pos,
            message: error.to_string().lines().last().unwrap_or_default().trim().to_string(),
        }
    }

    pub fn at_line(self, line: usize) -> Self {
        Self::AtLine {
            line,
            source: Box::new(self),
        }
    }

    /// Character offset of the error, when it points into the source.
    pub fn offset(&self) -> Option<usize> {
        match self {
            ParseError::UnexpectedToken { pos, .. }
            | ParseError::UnexpectedEof { pos, .. }
            | ParseError::UnbalancedParenthesis { pos }
            | ParseError::MissingOperator { pos, .. }
            | ParseError::InvalidNegation { pos }
            | ParseError::InvalidAbsoluteHead { pos, .. }
            | ParseError::InvalidRelativeHead { pos, .. }
            | ParseError::UnknownField { pos, .. }
            | ParseError::InvalidRegex { pos, .. }
            | ParseError::Unrecognized { pos, .. } => Some(*pos),
            ParseError::AtLine { source, .. } => source.offset(),
            ParseError::UndeclaredIdentifier { .. }
            | ParseError::InconsistentDeclaration { .. } => None,
        }
    }

    /// Moves the reported position right by `by` characters. Used when a
    /// fragment was parsed out of a longer line.
    pub fn shifted(self, by: usize) -> Self {
        match self {
            ParseError::UnexpectedToken {
                pos,
                expected,
                found,
            } => ParseError::UnexpectedToken {
                pos: pos + by,
                expected,
                found,
            },
            ParseError::UnexpectedEof { pos, expected } => ParseError::UnexpectedEof {
                pos: pos + by,
                expected,
            },
            ParseError::UnbalancedParenthesis { pos } => {
                ParseError::UnbalancedParenthesis { pos: pos + by }
            }
            ParseError::MissingOperator { pos, found } => ParseError::MissingOperator {
                pos: pos + by,
                found,
            },
            ParseError::InvalidNegation { pos } => ParseError::InvalidNegation { pos: pos + by },
            ParseError::InvalidAbsoluteHead { pos, value } => ParseError::InvalidAbsoluteHead {
                pos: pos + by,
                value,
            },
            ParseError::InvalidRelativeHead { pos, value } => ParseError::InvalidRelativeHead {
                pos: pos + by,
                value,
            },
            ParseError::UnknownField { pos, name } => ParseError::UnknownField {
                pos: pos + by,
                name,
            },
            ParseError::InvalidRegex { pos, message } => ParseError::InvalidRegex {
                pos: pos + by,
                message,
            },
            ParseError::Unrecognized { pos, text } => ParseError::Unrecognized {
                pos: pos + by,
                text,
            },
            other => other,
        }
    }

    fn label(&self) -> String {
        match self {
            ParseError::UnexpectedToken { expected, .. }
            | ParseError::UnexpectedEof { expected, .. } => format!("expected {}", expected),
            ParseError::AtLine { source, .. } => source.label(),
            other => other.to_string(),
        }
    }
}

/// Converts a byte offset into a character offset.
pub fn char_offset(source: &str, byte: usize) -> usize {
    let byte = byte.min(source.len());
    source
        .char_indices()
        .take_while(|(index, _)| *index < byte)
        .count()
}

/// Pretty-prints an error with source context using ariadne
#[cfg(feature = "pretty-errors")]
pub fn render_error(source: &str, filename: &str, error: &ParseError) -> String {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let line_start: usize = match error {
        ParseError::AtLine { line, .. } => source
            .lines()
            .take(line.saturating_sub(1))
            .map(|l| l.chars().count() + 1)
            .sum(),
        _ => 0,
    };
    let offset = line_start + error.offset().unwrap_or(0);
    let end = (offset + 1).min(source.chars().count()).max(offset);

    let mut output = Vec::new();
    let report = Report::build(ReportKind::Error, filename, offset)
        .with_message(error.to_string())
        .with_label(
            Label::new((filename, offset..end))
                .with_color(Color::Red)
                .with_message(error.label()),
        )
        .finish();
    if report
        .write((filename, Source::from(source)), &mut output)
        .is_err()
    {
        return error.to_string();
    }
    String::from_utf8(output).unwrap_or_else(|_| error.to_string())
}

/// Per-token problems met while applying a rule. They are collected and
/// reported, never fatal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("token {token} has no head")]
    NoHead { token: TokenRef },

    #[error("empty value for {field} of token {token}")]
    EmptyValue { token: TokenRef, field: String },

    #[error("cannot update token {token}: {source}")]
    Edit { token: TokenRef, source: EditError },
}
