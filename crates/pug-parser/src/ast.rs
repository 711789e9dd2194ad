//! AST types for Pug templates.
//!
//! This module defines the source tree produced by the parser. Every node that
//! owns children stores them inline, so a consumer can walk the tree post-order.

use camino::Utf8PathBuf;
use smol_str::SmolStr;
use text_size::TextRange;

use crate::lexer::split_top_level;

/// A byte range in the template source.
pub type Span = TextRange;

/// A parsed Pug file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    /// The top-level nodes in source order.
    pub nodes: Vec<SourceNode>,
    /// The span of the entire document.
    pub span: Span,
}

impl Document {
    /// Returns the first top-level `extends` node, if any.
    pub fn extends(&self) -> Option<&Extends> {
        self.nodes.iter().find_map(|node| match node {
            SourceNode::Extends(ext) => Some(ext),
            _ => None,
        })
    }

    /// Returns the top-level named blocks in source order.
    pub fn named_blocks(&self) -> impl Iterator<Item = &NamedBlock> {
        self.nodes.iter().filter_map(|node| match node {
            SourceNode::NamedBlock(block) => Some(block),
            _ => None,
        })
    }
}

/// A node in the source tree.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceNode {
    /// Plain text content.
    Text(Text),
    /// Buffered (`= expr`) or unbuffered (`- stmt`) code.
    Code(Code),
    /// An anonymous group of nodes.
    Block(Block),
    /// A `block name` declaration.
    NamedBlock(NamedBlock),
    /// A `//` or `//-` comment.
    Comment(Comment),
    /// A `doctype` line.
    Doctype(Doctype),
    /// A `case` statement with its `when` branches.
    Case(Case),
    /// An `if`/`unless` chain.
    Conditional(Conditional),
    /// An `each`/`for` loop.
    Each(Each),
    /// A `while` loop.
    While(While),
    /// A mixin definition or call.
    Mixin(Mixin),
    /// A bare `block` inside a mixin body.
    MixinBlock(MixinBlock),
    /// An element.
    Tag(Tag),
    /// An element whose name is an expression (`#{expr}`).
    InterpolatedTag(InterpolatedTag),
    /// An `include` of another Pug file.
    Include(Include),
    /// An `include` of a non-Pug file.
    RawInclude(RawInclude),
    /// An `extends` declaration.
    Extends(Extends),
    /// A `:filter` block or filtered include.
    Filter(Filter),
}

impl SourceNode {
    /// Returns the span of this node.
    pub fn span(&self) -> Span {
        match self {
            SourceNode::Text(n) => n.span,
            SourceNode::Code(n) => n.span,
            SourceNode::Block(n) => n.span,
            SourceNode::NamedBlock(n) => n.span,
            SourceNode::Comment(n) => n.span,
            SourceNode::Doctype(n) => n.span,
            SourceNode::Case(n) => n.span,
            SourceNode::Conditional(n) => n.span,
            SourceNode::Each(n) => n.span,
            SourceNode::While(n) => n.span,
            SourceNode::Mixin(n) => n.span,
            SourceNode::MixinBlock(n) => n.span,
            SourceNode::Tag(n) => n.span,
            SourceNode::InterpolatedTag(n) => n.span,
            SourceNode::Include(n) => n.span,
            SourceNode::RawInclude(n) => n.span,
            SourceNode::Extends(n) => n.span,
            SourceNode::Filter(n) => n.span,
        }
    }

    /// Returns the node kind name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            SourceNode::Text(_) => "Text",
            SourceNode::Code(_) => "Code",
            SourceNode::Block(_) => "Block",
            SourceNode::NamedBlock(_) => "NamedBlock",
            SourceNode::Comment(_) => "Comment",
            SourceNode::Doctype(_) => "Doctype",
            SourceNode::Case(_) => "Case",
            SourceNode::Conditional(_) => "Conditional",
            SourceNode::Each(_) => "Each",
            SourceNode::While(_) => "While",
            SourceNode::Mixin(_) => "Mixin",
            SourceNode::MixinBlock(_) => "MixinBlock",
            SourceNode::Tag(_) => "Tag",
            SourceNode::InterpolatedTag(_) => "InterpolatedTag",
            SourceNode::Include(_) => "Include",
            SourceNode::RawInclude(_) => "RawInclude",
            SourceNode::Extends(_) => "Extends",
            SourceNode::Filter(_) => "Filter",
        }
    }

    /// Returns the child list this node owns, if it owns one.
    ///
    /// Used by the parser to attach an indented block to the node on the
    /// preceding line.
    pub(crate) fn children_mut(&mut self) -> Option<&mut Vec<SourceNode>> {
        match self {
            SourceNode::Tag(n) => Some(&mut n.children),
            SourceNode::Block(n) => Some(&mut n.nodes),
            SourceNode::NamedBlock(n) => Some(&mut n.nodes),
            SourceNode::Conditional(n) => Some(&mut n.consequent),
            SourceNode::Each(n) => Some(&mut n.body),
            SourceNode::While(n) => Some(&mut n.body),
            SourceNode::Mixin(n) => Some(&mut n.block),
            SourceNode::Code(n) => Some(&mut n.block),
            _ => None,
        }
    }
}

/// Text content.
#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    /// The text, without the leading `|` or tag separator.
    pub value: String,
    /// The span of the text.
    pub span: Span,
}

impl Text {
    /// Returns true if the text contains nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        self.value.chars().all(char::is_whitespace)
    }
}

/// Embedded code.
#[derive(Debug, Clone, PartialEq)]
pub struct Code {
    /// The raw JavaScript source.
    pub value: String,
    /// `true` for `=`/`!=`/`#{}` (an expression whose value is rendered).
    pub buffer: bool,
    /// `false` for the unescaped forms `!=` and `!{}`.
    pub escape: bool,
    /// Indented nodes following an unbuffered code line.
    pub block: Vec<SourceNode>,
    /// The span of the code.
    pub span: Span,
}

/// An anonymous block of nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// The nodes in the block.
    pub nodes: Vec<SourceNode>,
    /// The span of the block.
    pub span: Span,
}

/// How a named block combines with the block it overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockMode {
    /// `block name`
    #[default]
    Replace,
    /// `block append name` or `append name`
    Append,
    /// `block prepend name` or `prepend name`
    Prepend,
}

/// A named block.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedBlock {
    /// The block name.
    pub name: SmolStr,
    /// The combination mode.
    pub mode: BlockMode,
    /// The default or overriding content.
    pub nodes: Vec<SourceNode>,
    /// The span of the block.
    pub span: Span,
}

/// A comment.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    /// The comment body, including indented continuation lines.
    pub value: String,
    /// `false` for `//-` comments, which Pug never renders.
    pub buffer: bool,
    /// The span of the comment.
    pub span: Span,
}

/// A doctype declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Doctype {
    /// The doctype value (`html`, `xml`, ...), possibly empty.
    pub value: String,
    /// The span of the declaration.
    pub span: Span,
}

/// A `case` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Case {
    /// The subject expression.
    pub expr: String,
    /// The branches, in source order.
    pub whens: Vec<When>,
    /// The span of the statement.
    pub span: Span,
}

/// The match of a `when` branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WhenMatch {
    /// `when expr`
    Expr(String),
    /// `default`
    Default,
}

/// A `when` or `default` branch.
#[derive(Debug, Clone, PartialEq)]
pub struct When {
    /// What this branch matches.
    pub matcher: WhenMatch,
    /// The branch body; `None` for a bare `when` that falls through.
    pub block: Option<Vec<SourceNode>>,
    /// The span of the branch.
    pub span: Span,
}

/// An `if` or `unless` chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    /// The test expression (`unless x` is stored as `!(x)`).
    pub test: String,
    /// The nodes rendered when the test holds.
    pub consequent: Vec<SourceNode>,
    /// The `else` or `else if` branch.
    pub alternate: Option<Alternate>,
    /// The span of the `if` line.
    pub span: Span,
}

impl Conditional {
    /// Attaches an `else`/`else if` branch to the end of the chain.
    ///
    /// Fails, handing the branch back, when the chain already ends in `else`.
    pub(crate) fn attach_alternate(&mut self, alternate: Alternate) -> Result<(), Alternate> {
        match self.alternate {
            Some(Alternate::ElseIf(ref mut next)) => next.attach_alternate(alternate),
            Some(Alternate::Else(_)) => Err(alternate),
            None => {
                self.alternate = Some(alternate);
                Ok(())
            }
        }
    }
}

/// The alternate branch of a conditional.
#[derive(Debug, Clone, PartialEq)]
pub enum Alternate {
    /// `else`
    Else(Block),
    /// `else if`
    ElseIf(Box<Conditional>),
}

/// An `each` loop.
#[derive(Debug, Clone, PartialEq)]
pub struct Each {
    /// The iterated collection expression.
    pub collection: String,
    /// The binding for each item.
    pub item: SmolStr,
    /// The optional binding for the index or key.
    pub key: Option<SmolStr>,
    /// The loop body.
    pub body: Vec<SourceNode>,
    /// The span of the loop header.
    pub span: Span,
}

/// A `while` loop.
#[derive(Debug, Clone, PartialEq)]
pub struct While {
    /// The loop condition.
    pub test: String,
    /// The loop body.
    pub body: Vec<SourceNode>,
    /// The span of the loop header.
    pub span: Span,
}

/// A mixin definition (`mixin name(args)`) or call (`+name(args)`).
#[derive(Debug, Clone, PartialEq)]
pub struct Mixin {
    /// The mixin name.
    pub name: SmolStr,
    /// `true` for `+name(...)`.
    pub call: bool,
    /// The raw argument list, without parentheses.
    pub args: Option<String>,
    /// Attributes passed to a call.
    pub attrs: Vec<Attr>,
    /// `&attributes(...)` spreads passed to a call.
    pub attribute_blocks: Vec<AttributeBlock>,
    /// The definition body, or the block passed to a call.
    pub block: Vec<SourceNode>,
    /// The span of the mixin line.
    pub span: Span,
}

impl Mixin {
    /// Returns the declared parameter names of a definition.
    pub fn params(&self) -> Vec<String> {
        self.args
            .as_deref()
            .map(|args| {
                split_top_level(args, ',')
                    .into_iter()
                    .map(str::trim)
                    .filter(|arg| !arg.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// A bare `block` inside a mixin.
#[derive(Debug, Clone, PartialEq)]
pub struct MixinBlock {
    /// The span of the statement.
    pub span: Span,
}

/// An attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    /// A presence flag (`input(disabled)`).
    Boolean(bool),
    /// Raw JavaScript source (`'literal'`, `user.name`, `{ a: 1 }`).
    Expr(String),
}

/// An attribute on a tag or mixin call.
#[derive(Debug, Clone, PartialEq)]
pub struct Attr {
    /// The attribute name.
    pub name: SmolStr,
    /// The attribute value.
    pub value: AttrValue,
    /// `false` for `name!=value`.
    pub must_escape: bool,
    /// The span of the attribute.
    pub span: Span,
}

/// An `&attributes(expr)` spread.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeBlock {
    /// The spread expression.
    pub value: String,
    /// The span of the spread.
    pub span: Span,
}

/// An element.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    /// The tag name.
    pub name: SmolStr,
    /// Attributes in source order, including `.class` and `#id` shorthands.
    pub attrs: Vec<Attr>,
    /// `&attributes(...)` spreads.
    pub attribute_blocks: Vec<AttributeBlock>,
    /// Child nodes.
    pub children: Vec<SourceNode>,
    /// `true` for `tag/`.
    pub self_closing: bool,
    /// The span of the tag line.
    pub span: Span,
}

/// An element whose name comes from an expression.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolatedTag {
    /// The name expression.
    pub expr: String,
    /// The span of the tag.
    pub span: Span,
}

/// A reference to another file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReference {
    /// The path as written in the template.
    pub path: String,
    /// The path on disk, filled in by the loader.
    pub resolved: Option<Utf8PathBuf>,
}

impl FileReference {
    /// Creates an unresolved reference.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            resolved: None,
        }
    }
}

/// An `include` of a Pug file.
#[derive(Debug, Clone, PartialEq)]
pub struct Include {
    /// The included file.
    pub file: FileReference,
    /// The 1-based column of the `include` keyword.
    pub column: u32,
    /// The span of the statement.
    pub span: Span,
}

/// An `include` of a file that is not Pug.
#[derive(Debug, Clone, PartialEq)]
pub struct RawInclude {
    /// The included file.
    pub file: FileReference,
    /// The span of the statement.
    pub span: Span,
}

/// An `extends` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Extends {
    /// The parent layout.
    pub file: FileReference,
    /// The span of the statement.
    pub span: Span,
}

/// A filter (`:markdown`) or filtered include (`include:markdown file.md`).
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// The filter name.
    pub name: SmolStr,
    /// The filtered text, or the included path for a filtered include.
    pub body: String,
    /// The span of the filter line.
    pub span: Span,
}
