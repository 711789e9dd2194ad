//! Parse and load error types.

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::ast::Span;

/// An error that occurred during parsing.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}")]
pub struct ParseError {
    /// The kind of error.
    pub kind: ParseErrorKind,
    /// The location in the source where the error occurred.
    pub span: Span,
}

impl ParseError {
    /// Creates a new parse error.
    pub fn new(kind: ParseErrorKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// The kind of parse error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    /// An unexpected token was encountered.
    #[error("unexpected token: expected {expected}, found {found}")]
    UnexpectedToken {
        /// What was expected.
        expected: String,
        /// What was found.
        found: String,
    },

    /// A line is indented deeper than its parent allows.
    #[error("inconsistent indentation: expected {expected} columns, found {found}")]
    InconsistentIndentation {
        /// The indentation of the sibling lines.
        expected: usize,
        /// The indentation of the offending line.
        found: usize,
    },

    /// A node that cannot own children has an indented block.
    #[error("{node} cannot have nested content")]
    UnexpectedChildren {
        /// The node kind.
        node: String,
    },

    /// An `else` without a preceding `if`.
    #[error("`else` must follow an `if` or `unless` block")]
    OrphanElse,

    /// A `when` or `default` outside a `case`.
    #[error("`{keyword}` is only allowed inside a `case` block")]
    OrphanWhen {
        /// `when` or `default`.
        keyword: String,
    },

    /// A `case` child that is neither `when` nor `default`.
    #[error("`case` may only contain `when` and `default` branches")]
    InvalidCaseChild,

    /// A malformed `each` header.
    #[error("invalid `each` header: {message}")]
    InvalidEach {
        /// A description of the problem.
        message: String,
    },

    /// `each ... else` is not supported.
    #[error("`else` after `each` is not supported")]
    UnsupportedEachElse,

    /// A bracket or string was never closed.
    #[error("unclosed delimiter `{delimiter}`")]
    UnclosedDelimiter {
        /// The opening delimiter.
        delimiter: char,
    },

    /// A malformed mixin declaration or call.
    #[error("invalid mixin: {message}")]
    InvalidMixin {
        /// A description of the problem.
        message: String,
    },

    /// A generic syntax error.
    #[error("{message}")]
    SyntaxError {
        /// A description of the error.
        message: String,
    },
}

impl ParseErrorKind {
    pub(crate) fn syntax_message(message: impl Into<String>) -> Self {
        ParseErrorKind::SyntaxError {
            message: message.into(),
        }
    }
}

/// An error that occurred while loading a template tree from disk.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The file that failed.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file does not parse.
    #[error("failed to parse {path}: {}", first_message(errors))]
    Parse {
        /// The file that failed.
        path: Utf8PathBuf,
        /// The source text, kept for diagnostic rendering.
        source_text: String,
        /// All parse errors in the file.
        errors: Vec<ParseError>,
    },

    /// An `include` or `extends` target does not exist.
    #[error("{from}: cannot resolve `{reference}` (looked for {candidate})")]
    UnresolvedReference {
        /// The file containing the reference.
        from: Utf8PathBuf,
        /// The path as written.
        reference: String,
        /// The path that was tried.
        candidate: Utf8PathBuf,
        /// The span of the referencing statement.
        span: Span,
    },
}

fn first_message(errors: &[ParseError]) -> String {
    match errors {
        [] => "unknown error".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{first} (and {} more)", rest.len()),
    }
}
