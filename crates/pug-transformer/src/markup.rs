//! The target tree: JSX markup, expressions and statements.
//!
//! The walker produces [`TargetNode`]s; the program assembler turns them into a
//! [`Program`] which the code generator prints.

use smol_str::SmolStr;

use crate::expr::EmbeddedExpr;

/// A translated node, before it is placed in markup or statement position.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetNode {
    /// Markup text.
    Text(String),
    /// A JSX element.
    Element(Element),
    /// A JSX fragment.
    Fragment(Fragment),
    /// An expression already wrapped for markup position (`{expr}`).
    ExpressionContainer(Expr),
    /// A bare expression: buffered code, an expression statement, or a
    /// conditional.
    Expression(Expr),
    /// A statement that cannot appear in markup.
    Statement(Stmt),
    /// An import binding.
    Import(Import),
    /// An empty slot that contributes nothing.
    Placeholder,
}

impl TargetNode {
    /// Returns the node kind name used in debug logs.
    pub fn kind(&self) -> &'static str {
        match self {
            TargetNode::Text(_) => "MarkupText",
            TargetNode::Element(_) => "Element",
            TargetNode::Fragment(_) => "Fragment",
            TargetNode::ExpressionContainer(_) => "ExpressionContainer",
            TargetNode::Expression(Expr::Conditional { .. }) => "ConditionalExpr",
            TargetNode::Expression(_) => "Expression",
            TargetNode::Statement(Stmt::Const { .. }) => "VariableBinding",
            TargetNode::Statement(Stmt::Switch { .. }) => "SwitchStatement",
            TargetNode::Statement(_) => "Statement",
            TargetNode::Import(_) => "Import",
            TargetNode::Placeholder => "Placeholder",
        }
    }
}

/// A valid child of an element or fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkupChild {
    /// Text content.
    Text(String),
    /// A nested element.
    Element(Element),
    /// A nested fragment.
    Fragment(Fragment),
    /// `{expr}`
    ExpressionContainer(Expr),
}

impl MarkupChild {
    /// Returns true for text that is empty or whitespace.
    pub fn is_blank_text(&self) -> bool {
        matches!(self, MarkupChild::Text(text) if text.trim().is_empty())
    }
}

/// A JSX element.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// The tag or component name.
    pub name: SmolStr,
    /// Attributes and spreads in source order.
    pub attributes: Vec<JsxAttribute>,
    /// Child nodes.
    pub children: Vec<MarkupChild>,
    /// `true` to print `<name />` when there are no children.
    pub self_closing: bool,
}

impl Element {
    /// Creates a childless self-closing element.
    pub fn self_closing(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            self_closing: true,
        }
    }
}

/// A JSX fragment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    /// Child nodes.
    pub children: Vec<MarkupChild>,
}

impl Fragment {
    /// Creates a fragment.
    pub fn new(children: Vec<MarkupChild>) -> Self {
        Self { children }
    }
}

/// Markup usable as an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Markup {
    /// `<name ...>`
    Element(Element),
    /// `<>...</>`
    Fragment(Fragment),
}

/// A JSX attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum JsxAttribute {
    /// `name` or `name={value}`.
    Attribute {
        /// The attribute name.
        name: SmolStr,
        /// The value; `None` for a presence-only flag.
        value: Option<Expr>,
    },
    /// `{...expr}`
    Spread(Expr),
}

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// JavaScript copied from the template.
    Embedded(EmbeddedExpr),
    /// `null`
    Null,
    /// A string literal.
    Str(String),
    /// An identifier.
    Ident(SmolStr),
    /// An object literal with string keys, in insertion order.
    Object(Vec<(String, Expr)>),
    /// `test ? consequent : alternate`
    Conditional {
        /// The test.
        test: Box<Expr>,
        /// The value when the test holds.
        consequent: Box<Expr>,
        /// The value otherwise.
        alternate: Box<Expr>,
    },
    /// `callee(args)`
    Call {
        /// The called expression.
        callee: Box<Expr>,
        /// Arguments.
        args: Vec<Expr>,
    },
    /// `object.property`
    Member {
        /// The object.
        object: Box<Expr>,
        /// The property name.
        property: SmolStr,
    },
    /// `(params) => body`
    Arrow {
        /// Parameters.
        params: Vec<Param>,
        /// The body.
        body: ArrowBody,
    },
    /// Markup in expression position.
    Markup(Box<Markup>),
}

impl Expr {
    /// Wraps markup children in a fragment expression.
    pub fn fragment(children: Vec<MarkupChild>) -> Self {
        Expr::Markup(Box::new(Markup::Fragment(Fragment::new(children))))
    }

    /// Builds an immediately-invoked arrow function with a block body.
    pub fn iife(body: Vec<Stmt>) -> Self {
        Expr::Call {
            callee: Box::new(Expr::Arrow {
                params: Vec::new(),
                body: ArrowBody::Block(body),
            }),
            args: Vec::new(),
        }
    }
}

/// The body of an arrow function.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrowBody {
    /// A concise expression body.
    Expr(Box<Expr>),
    /// A block body.
    Block(Vec<Stmt>),
}

/// A function parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// A plain binding.
    Ident(SmolStr),
    /// `{ key: Binding, ... }`
    Destructured(Vec<(SmolStr, SmolStr)>),
}

/// A statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// A statement copied from the template.
    Raw(String),
    /// An expression statement.
    Expr(Expr),
    /// `const name = init;`
    Const {
        /// The binding name.
        name: SmolStr,
        /// The initializer.
        init: Expr,
    },
    /// `switch (subject) { cases }`
    Switch {
        /// The switched expression.
        subject: Expr,
        /// The cases in source order.
        cases: Vec<SwitchCase>,
    },
    /// `return value;`
    Return(Expr),
}

/// One `case` (or `default` when `test` is `None`).
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    /// The match expression.
    pub test: Option<Expr>,
    /// The case body.
    pub body: Vec<Stmt>,
}

/// `import { name } from "path";`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// The imported and local binding name.
    pub name: SmolStr,
    /// The module path.
    pub path: String,
}

/// The exported component function.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    /// The exported binding name.
    pub name: SmolStr,
    /// Parameters (slot props for layouts).
    pub params: Vec<Param>,
    /// Leading statements followed by one `return`.
    pub body: Vec<Stmt>,
}

/// One generated module.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Hoisted imports.
    pub imports: Vec<Import>,
    /// The exported component.
    pub component: Component,
}
