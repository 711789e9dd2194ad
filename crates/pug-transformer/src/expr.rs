//! Sub-parsing of JavaScript embedded in templates.
//!
//! Attribute values, code lines and control-flow headers are raw JavaScript.
//! They are validated with swc and copied to the output with their source
//! spelling; only the binding strength of the top-level expression is kept so
//! the printer knows where parentheses are required.

use swc_common::sync::Lrc;

use pug_parser::Span;
use swc_common::{FileName, SourceFile, SourceMap, Spanned};
use swc_ecma_ast::{Expr, Lit, Stmt};
use swc_ecma_parser::{error::Error, lexer::Lexer, EsSyntax, Parser, StringInput, Syntax};

use crate::error::TransformError;

/// How tightly an expression binds, from loosest to tightest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Precedence {
    /// `a, b`
    Sequence,
    /// Assignments, arrow functions and `yield`.
    Assignment,
    /// `a ? b : c`
    Conditional,
    /// Binary and logical operators.
    Binary,
    /// Prefix and postfix operators, `await`, argument-less `new`.
    Unary,
    /// Member access, calls, literals and everything that needs no parentheses.
    Primary,
}

/// A validated JavaScript expression, kept as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedExpr {
    /// The expression source, trimmed.
    pub source: String,
    /// The binding strength of the outermost operator.
    pub precedence: Precedence,
}

impl EmbeddedExpr {
    /// Returns true if the expression must be parenthesized where an operand
    /// of at least `required` strength is expected.
    pub fn needs_parens(&self, required: Precedence) -> bool {
        self.precedence < required
    }
}

/// One statement of an unbuffered code line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddedStmt {
    /// An expression statement.
    Expr(EmbeddedExpr),
    /// Any other statement, as written.
    Other(String),
}

/// Parses `source` as a single expression.
///
/// Input left over after the expression is an error.
pub fn parse_expression(source: &str, span: Span) -> Result<EmbeddedExpr, TransformError> {
    let (fm, mut parser) = new_parser(source);

    let expr = parser
        .parse_expr()
        .map_err(|err| syntax_error(source, &err, span))?;
    if let Some(err) = parser.take_errors().first() {
        return Err(syntax_error(source, err, span));
    }

    let (start, end) = local_range(&fm, expr.span());
    if !source[end..].trim().is_empty() {
        return Err(TransformError::EmbeddedExpressionSyntax {
            snippet: source.to_string(),
            message: format!("unexpected `{}` after expression", source[end..].trim()),
            span,
        });
    }

    Ok(EmbeddedExpr {
        source: source[start..end].to_string(),
        precedence: precedence_of(&expr),
    })
}

/// Parses `source` as a list of statements.
pub fn parse_statements(source: &str, span: Span) -> Result<Vec<EmbeddedStmt>, TransformError> {
    let (fm, mut parser) = new_parser(source);

    let script = parser
        .parse_script()
        .map_err(|err| syntax_error(source, &err, span))?;
    if let Some(err) = parser.take_errors().first() {
        return Err(syntax_error(source, err, span));
    }

    let statements = script
        .body
        .iter()
        .filter(|stmt| !matches!(stmt, Stmt::Empty(_)))
        .map(|stmt| match stmt {
            Stmt::Expr(expr_stmt) => {
                let (start, end) = local_range(&fm, expr_stmt.expr.span());
                EmbeddedStmt::Expr(EmbeddedExpr {
                    source: source[start..end].to_string(),
                    precedence: precedence_of(&expr_stmt.expr),
                })
            }
            other => {
                let (start, end) = local_range(&fm, other.span());
                EmbeddedStmt::Other(source[start..end].to_string())
            }
        })
        .collect();

    Ok(statements)
}

fn new_parser(source: &str) -> (Lrc<SourceFile>, Parser<Lexer<'_>>) {
    let cm: Lrc<SourceMap> = Default::default();
    let fm = cm.new_source_file(
        FileName::Custom("pug-embedded".into()).into(),
        source.to_string(),
    );
    let syntax = Syntax::Es(EsSyntax {
        jsx: true,
        ..Default::default()
    });
    // Offsets line up with `fm`, which holds an identical copy.
    let input = StringInput::new(source, fm.start_pos, fm.end_pos);
    (fm, Parser::new(syntax, input, None))
}

fn local_range(fm: &SourceFile, span: swc_common::Span) -> (usize, usize) {
    let start = (span.lo.0 - fm.start_pos.0) as usize;
    let end = (span.hi.0 - fm.start_pos.0) as usize;
    (start, end)
}

fn syntax_error(source: &str, err: &Error, span: Span) -> TransformError {
    TransformError::EmbeddedExpressionSyntax {
        snippet: source.to_string(),
        message: err.kind().msg().into_owned(),
        span,
    }
}

fn precedence_of(expr: &Expr) -> Precedence {
    match expr {
        Expr::Seq(_) => Precedence::Sequence,
        Expr::Arrow(_) | Expr::Yield(_) | Expr::Assign(_) => Precedence::Assignment,
        Expr::Cond(_) => Precedence::Conditional,
        Expr::Bin(_) => Precedence::Binary,
        Expr::Unary(_) | Expr::Update(_) | Expr::Await(_) => Precedence::Unary,
        Expr::New(new) if new.args.is_none() => Precedence::Unary,
        // `1.map` is not a member expression.
        Expr::Lit(Lit::Num(_)) => Precedence::Unary,
        _ => Precedence::Primary,
    }
}
