//! Transform and batch conversion errors.

use camino::Utf8PathBuf;
use pug_parser::{LoadError, Span};
use smol_str::SmolStr;
use thiserror::Error;

/// A fatal error for the file being transformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    /// A node kind with no translation rule.
    #[error("unsupported pug node type: {kind}")]
    UnsupportedNodeKind {
        /// The node kind name.
        kind: SmolStr,
        /// The node location.
        span: Span,
    },

    /// An attribute value or code snippet is not valid JavaScript.
    #[error("invalid embedded JavaScript `{snippet}`: {message}")]
    EmbeddedExpressionSyntax {
        /// The snippet as written.
        snippet: String,
        /// The parser message.
        message: String,
        /// The snippet location in the template.
        span: Span,
    },
}

impl TransformError {
    /// Returns the template location of the error.
    pub fn span(&self) -> Span {
        match self {
            TransformError::UnsupportedNodeKind { span, .. }
            | TransformError::EmbeddedExpressionSyntax { span, .. } => *span,
        }
    }
}

/// A per-file failure in a batch conversion.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The file or one of its references could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// The file loaded but could not be transformed.
    #[error("{message}")]
    Transform {
        /// The underlying error.
        #[source]
        error: TransformError,
        /// The rendered message.
        message: String,
        /// The file that failed.
        path: Utf8PathBuf,
        /// The file contents, kept for diagnostic rendering.
        source_text: String,
    },
}

impl ConvertError {
    pub(crate) fn transform(error: TransformError, path: Utf8PathBuf, source_text: String) -> Self {
        Self::Transform {
            message: format!("failed to convert {path}: {error}"),
            error,
            path,
            source_text,
        }
    }
}
