//! Pug template parser for pug-to-jsx.
//!
//! This crate provides the source side of the conversion:
//! - Line lexer using `logos`
//! - Indentation-driven recursive parser with per-line error recovery
//! - AST types for the supported Pug constructs
//! - A loader that reads files and resolves `include`/`extends` paths
//!
//! # Example
//!
//! ```
//! use pug_parser::{parse, SourceNode};
//!
//! let source = "ul\n  each item in items\n    li= item\n";
//!
//! let result = parse(source);
//! assert!(result.errors.is_empty());
//! assert!(matches!(result.document.nodes[0], SourceNode::Tag(_)));
//! ```

mod ast;
mod error;
mod lexer;
mod line_index;
mod loader;
mod parser;

pub use ast::*;
pub use error::{LoadError, ParseError, ParseErrorKind};
pub use lexer::LineToken;
pub use line_index::{LineCol, LineIndex};
pub use loader::{load_file, LoadOptions, LoadedFile};

use camino::Utf8PathBuf;

/// Options for parsing Pug files.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// The file being parsed, used in log output.
    pub filename: Option<Utf8PathBuf>,
}

/// The result of parsing a Pug file.
#[derive(Debug)]
pub struct ParseResult {
    /// The parsed document.
    pub document: Document,
    /// Any errors encountered during parsing.
    pub errors: Vec<ParseError>,
}

/// Parses Pug source into an AST.
///
/// Parsing recovers line by line, so the document is returned alongside any
/// errors encountered.
pub fn parse(source: &str) -> ParseResult {
    parse_with_options(source, ParseOptions::default())
}

/// Parses Pug source with custom options.
pub fn parse_with_options(source: &str, options: ParseOptions) -> ParseResult {
    parser::Parser::new(source, options).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty() {
        let result = parse("");
        assert!(result.errors.is_empty());
        assert!(result.document.nodes.is_empty());
    }

    #[test]
    fn test_parse_blank_lines_only() {
        let result = parse("\n   \n\t\n");
        assert!(result.errors.is_empty());
        assert!(result.document.nodes.is_empty());
    }

    #[test]
    fn test_parse_simple_element() {
        let result = parse("div hello");
        assert!(result.errors.is_empty());
        assert_eq!(result.document.nodes.len(), 1);
    }

    #[test]
    fn test_errors_do_not_stop_parsing() {
        let result = parse("else\np after");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.document.nodes.len(), 1);
    }

    #[test]
    fn test_span_line_col() {
        let source = "div\n  p(class=)";
        let result = parse(source);
        assert_eq!(result.errors.len(), 1);
        let index = LineIndex::new(source);
        assert_eq!(index.line_col(result.errors[0].span.start()).line, 2);
    }
}
