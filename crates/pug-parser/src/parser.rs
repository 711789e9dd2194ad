//! Indentation-driven recursive parser for Pug.

use camino::Utf8Path;
use smol_str::SmolStr;
use text_size::{TextRange, TextSize};

use crate::ast::*;
use crate::error::{ParseError, ParseErrorKind};
use crate::lexer::{find_closing, leading_token, split_lines, Line, LineToken};
use crate::{ParseOptions, ParseResult};

/// How the indented block under a line is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Body {
    /// Nested nodes, parsed recursively.
    Nodes,
    /// Raw text lines with interpolation (`tag.`).
    TextBlock,
    /// `when`/`default` branches.
    Case,
    /// Raw lines appended verbatim (comments, code blocks, filters).
    Raw,
    /// The node cannot own an indented block.
    Leaf,
}

/// A node whose line has been read but whose indented block has not.
#[derive(Debug)]
struct Pending {
    node: SourceNode,
    body: Body,
    /// The node after `tag:`; it receives the indented block instead.
    expansion: Option<Box<Pending>>,
}

impl Pending {
    fn new(node: SourceNode, body: Body) -> Self {
        Self {
            node,
            body,
            expansion: None,
        }
    }
}

/// The result of reading one line head.
#[derive(Debug)]
enum Head {
    Node(Pending),
    Else { test: Option<String>, span: Span },
    When { keyword: &'static str, span: Span },
    Text { nodes: Vec<SourceNode>, piped: bool },
    Skip,
}

fn size(n: usize) -> TextSize {
    TextSize::try_from(n).unwrap_or_default()
}

fn range(start: usize, end: usize) -> Span {
    TextRange::new(size(start), size(end.max(start)))
}

/// Returns the byte offset of the end of the physical line containing `offset`.
fn line_end(source: &str, offset: usize) -> usize {
    let end = source[offset..]
        .find('\n')
        .map_or(source.len(), |i| offset + i);
    if source[..end].ends_with('\r') {
        end - 1
    } else {
        end
    }
}

/// Returns the length of a leading class/id/block name.
fn name_len(text: &str) -> usize {
    match text.chars().next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '-' => text
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
            .unwrap_or(text.len()),
        _ => 0,
    }
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

fn append_line(value: &mut String, raw: &str) {
    if value.is_empty() {
        value.push_str(raw);
    } else {
        value.push('\n');
        value.push_str(raw);
    }
}

/// Finds a block expansion `:` at the top level of `text`.
///
/// Colons inside brackets, strings, or a pending ternary do not count.
fn find_expansion(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut ternary = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, ch) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }

        match ch {
            '\'' | '"' | '`' => quote = Some(ch),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            '?' if depth == 0 => ternary += 1,
            ':' if depth == 0 && ternary > 0 => ternary -= 1,
            ':' if depth == 0 => {
                let next = text[i + 1..].chars().next();
                if next.map_or(true, char::is_whitespace) {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}

fn is_operator(c: char) -> bool {
    matches!(
        c,
        '+' | '-' | '*' | '/' | '%' | '&' | '|' | '^' | '<' | '>' | '=' | '?' | ':' | '.' | '!'
    )
}

/// Finds where an attribute value starting at `start` ends.
///
/// Values end at a top-level comma, or at whitespace unless an operator on
/// either side continues the expression.
fn scan_attr_value(text: &str, start: usize) -> usize {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        let i = start + offset;

        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }

        match ch {
            '\'' | '"' | '`' => quote = Some(ch),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => return i,
            c if c.is_whitespace() && depth == 0 => {
                let before = text[start..i].trim_end();
                let after = text[i..].trim_start();
                let continues = before.ends_with(is_operator)
                    || (after.starts_with(|c: char| is_operator(c) && c != '!')
                        && !after.starts_with("!="));
                if after.is_empty() || !continues {
                    return i;
                }
            }
            _ => {}
        }
    }

    text.len()
}

/// The Pug parser.
pub struct Parser<'src> {
    /// The source being parsed.
    source: &'src str,
    /// Physical lines of the source.
    lines: Vec<Line<'src>>,
    /// Index of the next unread line.
    pos: usize,
    /// Parse errors collected during parsing.
    errors: Vec<ParseError>,
    /// Parser options.
    options: ParseOptions,
}

impl<'src> Parser<'src> {
    /// Creates a new parser.
    pub fn new(source: &'src str, options: ParseOptions) -> Self {
        Self {
            source,
            lines: split_lines(source),
            pos: 0,
            errors: Vec::new(),
            options,
        }
    }

    /// Parses the source into a document.
    pub fn parse(mut self) -> ParseResult {
        let nodes = self.parse_block(None);

        log::debug!(
            "parsed {}: {} top-level nodes, {} errors",
            self.options
                .filename
                .as_ref()
                .map_or("<input>", |path| path.as_str()),
            nodes.len(),
            self.errors.len()
        );

        ParseResult {
            document: Document {
                nodes,
                span: TextRange::up_to(TextSize::of(self.source)),
            },
            errors: self.errors,
        }
    }

    // === Line helpers ===

    fn skip_blank(&mut self) {
        while self.lines.get(self.pos).is_some_and(|line| line.is_blank()) {
            self.pos += 1;
        }
    }

    /// Returns the next non-blank line if it is nested under `parent`.
    fn peek_nested(&mut self, parent: Option<usize>) -> Option<Line<'src>> {
        self.skip_blank();
        let line = *self.lines.get(self.pos)?;
        match parent {
            Some(indent) if line.indent <= indent => None,
            _ => Some(line),
        }
    }

    /// Skips every line nested under `indent`.
    fn skip_children(&mut self, indent: usize) {
        while let Some(line) = self.lines.get(self.pos) {
            if line.is_blank() || line.indent > indent {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    /// Reports nested lines under a node that cannot own them.
    fn reject_children(&mut self, indent: usize, kind: &str) {
        if let Some(line) = self.peek_nested(Some(indent)) {
            self.error(
                ParseErrorKind::UnexpectedChildren {
                    node: kind.to_string(),
                },
                line.span(),
            );
            self.skip_children(indent);
        }
    }

    /// Takes the lines nested under `indent` as raw text, with the common
    /// indentation removed.
    fn take_raw(&mut self, indent: usize) -> Option<(String, TextSize)> {
        let first = self.pos;
        let mut last = first;
        let mut cursor = first;

        while let Some(line) = self.lines.get(cursor) {
            if !line.is_blank() && line.indent <= indent {
                break;
            }
            cursor += 1;
            if !line.is_blank() {
                last = cursor;
            }
        }

        self.pos = last;
        let body = &self.lines[first..last];
        let common = body
            .iter()
            .filter(|line| !line.is_blank())
            .map(|line| line.indent)
            .min()?;

        let text = body
            .iter()
            .map(|line| {
                if line.is_blank() {
                    String::new()
                } else {
                    format!("{}{}", " ".repeat(line.indent - common), line.text)
                }
            })
            .collect::<Vec<_>>()
            .join("\n");

        Some((text, body[0].start))
    }

    /// Returns the 1-based source column of `offset`, which differs from the
    /// line's indentation for content after `tag:` or `when x:`.
    fn column_at(&self, offset: TextSize) -> u32 {
        let offset = usize::from(offset);
        let line_start = self.source[..offset].rfind('\n').map_or(0, |i| i + 1);
        self.source[line_start..offset].chars().count() as u32 + 1
    }

    fn error(&mut self, kind: ParseErrorKind, span: Span) {
        self.errors.push(ParseError::new(kind, span));
    }

    /// Finds the `)` closing the `(` at `open`, extending `end` when the group
    /// continues onto later lines.
    fn group(&mut self, open: usize, end: &mut usize) -> Option<usize> {
        let source = self.source;
        match find_closing(&source[open..], 0) {
            Some(relative) => {
                let close = open + relative;
                if close >= *end {
                    while self
                        .lines
                        .get(self.pos)
                        .is_some_and(|line| usize::from(line.start) <= close)
                    {
                        self.pos += 1;
                    }
                    *end = line_end(source, close);
                }
                Some(close)
            }
            None => {
                self.error(
                    ParseErrorKind::UnclosedDelimiter { delimiter: '(' },
                    range(open, *end),
                );
                None
            }
        }
    }

    // === Blocks ===

    /// Parses sibling lines nested under `parent` (or the whole document).
    fn parse_block(&mut self, parent: Option<usize>) -> Vec<SourceNode> {
        let mut nodes = Vec::new();
        let mut indent = None;
        let mut previous_piped = false;

        while let Some(line) = self.peek_nested(parent) {
            let expected = *indent.get_or_insert(line.indent);
            if line.indent != expected {
                self.error(
                    ParseErrorKind::InconsistentIndentation {
                        expected,
                        found: line.indent,
                    },
                    line.span(),
                );
            }
            self.pos += 1;

            let mut piped_line = false;
            match self.parse_head(line) {
                Head::Node(pending) => {
                    let node = self.close(pending, line.indent);
                    nodes.push(node);
                }
                Head::Text { nodes: text, piped } => {
                    if piped && previous_piped {
                        nodes.push(SourceNode::Text(Text {
                            value: "\n".to_string(),
                            span: TextRange::empty(line.start),
                        }));
                    }
                    nodes.extend(text);
                    piped_line = piped;
                    self.reject_children(line.indent, "Text");
                }
                Head::Else { test, span } => self.attach_else(&mut nodes, test, span, line.indent),
                Head::When { keyword, span } => {
                    self.error(
                        ParseErrorKind::OrphanWhen {
                            keyword: keyword.to_string(),
                        },
                        span,
                    );
                    self.skip_children(line.indent);
                }
                Head::Skip => self.skip_children(line.indent),
            }
            previous_piped = piped_line;
        }

        nodes
    }

    /// Reads the indented block of a pending node and finishes it.
    fn close(&mut self, pending: Pending, indent: usize) -> SourceNode {
        let Pending {
            mut node,
            body,
            expansion,
        } = pending;

        if let Some(inner) = expansion {
            let child = self.close(*inner, indent);
            if let Some(children) = node.children_mut() {
                children.push(child);
            }
            return node;
        }

        match body {
            Body::Nodes => {
                let children = self.parse_block(Some(indent));
                if let Some(list) = node.children_mut() {
                    list.extend(children);
                }
            }
            Body::TextBlock => {
                if let Some((raw, start)) = self.take_raw(indent) {
                    let text = self.parse_interpolated(&raw, start);
                    if let Some(list) = node.children_mut() {
                        list.extend(text);
                    }
                }
            }
            Body::Case => {
                let whens = self.parse_case_branches(indent);
                if let SourceNode::Case(case) = &mut node {
                    case.whens.extend(whens);
                }
            }
            Body::Raw => {
                if let Some((raw, _)) = self.take_raw(indent) {
                    match &mut node {
                        SourceNode::Comment(comment) => append_line(&mut comment.value, &raw),
                        SourceNode::Code(code) => append_line(&mut code.value, &raw),
                        SourceNode::Filter(filter) => append_line(&mut filter.body, &raw),
                        _ => {}
                    }
                }
            }
            Body::Leaf => self.reject_children(indent, node.kind()),
        }

        node
    }

    fn attach_else(
        &mut self,
        nodes: &mut [SourceNode],
        test: Option<String>,
        span: Span,
        indent: usize,
    ) {
        let children = self.parse_block(Some(indent));
        let alternate = match test {
            Some(test) => Alternate::ElseIf(Box::new(Conditional {
                test,
                consequent: children,
                alternate: None,
                span,
            })),
            None => Alternate::Else(Block {
                nodes: children,
                span,
            }),
        };

        match nodes.last_mut() {
            Some(SourceNode::Conditional(conditional)) => {
                if conditional.attach_alternate(alternate).is_err() {
                    self.error(ParseErrorKind::OrphanElse, span);
                }
            }
            Some(SourceNode::Each(_)) => self.error(ParseErrorKind::UnsupportedEachElse, span),
            _ => self.error(ParseErrorKind::OrphanElse, span),
        }
    }

    fn parse_case_branches(&mut self, parent: usize) -> Vec<When> {
        let mut whens = Vec::new();

        while let Some(line) = self.peek_nested(Some(parent)) {
            self.pos += 1;

            let (matcher, rest) = match leading_token(line.text) {
                Some((LineToken::When, len)) => {
                    let rest = &line.text[len..];
                    let split = find_expansion(rest).unwrap_or(rest.len());
                    let expr = rest[..split].trim();
                    if expr.is_empty() {
                        self.error(
                            ParseErrorKind::syntax_message("expected an expression after `when`"),
                            line.span(),
                        );
                        self.skip_children(line.indent);
                        continue;
                    }
                    (WhenMatch::Expr(expr.to_string()), &rest[split..])
                }
                Some((LineToken::Default, len)) => (WhenMatch::Default, line.text[len..].trim_start()),
                Some((LineToken::SilentComment | LineToken::Comment, _)) => {
                    self.skip_children(line.indent);
                    continue;
                }
                _ => {
                    self.error(ParseErrorKind::InvalidCaseChild, line.span());
                    self.skip_children(line.indent);
                    continue;
                }
            };

            let block = match rest.strip_prefix(':').map(str::trim_start) {
                Some(inline) if !inline.is_empty() => {
                    let sub = Line {
                        indent: line.indent,
                        text: inline,
                        start: line.start + size(line.text.len() - inline.len()),
                        number: line.number,
                    };
                    match self.parse_head(sub) {
                        Head::Node(pending) => Some(vec![self.close(pending, line.indent)]),
                        Head::Text { nodes, .. } => {
                            self.reject_children(line.indent, "Text");
                            Some(nodes)
                        }
                        _ => {
                            self.error(
                                ParseErrorKind::syntax_message("expected a tag after `:`"),
                                sub.span(),
                            );
                            self.skip_children(line.indent);
                            None
                        }
                    }
                }
                _ if self.peek_nested(Some(line.indent)).is_some() => {
                    Some(self.parse_block(Some(line.indent)))
                }
                _ => None,
            };

            whens.push(When {
                matcher,
                block,
                span: line.span(),
            });
        }

        whens
    }

    // === Line heads ===

    fn parse_head(&mut self, line: Line<'src>) -> Head {
        let Some((token, len)) = leading_token(line.text) else {
            let found = line
                .text
                .chars()
                .next()
                .map(|c| format!("'{c}'"))
                .unwrap_or_default();
            self.error(
                ParseErrorKind::UnexpectedToken {
                    expected: "tag, text or keyword".to_string(),
                    found,
                },
                line.span(),
            );
            return Head::Skip;
        };

        let rest = &line.text[len..];
        let span = line.span();
        let rest_start = line.start + size(len);

        match token {
            LineToken::TagName | LineToken::ClassName | LineToken::IdName => {
                self.parse_tag(line, token, len)
            }
            LineToken::Pipe => {
                let text = rest.strip_prefix(' ').unwrap_or(rest);
                let start = line.start + size(line.text.len() - text.len());
                Head::Text {
                    nodes: self.parse_interpolated(text, start),
                    piped: true,
                }
            }
            LineToken::Html => Head::Text {
                nodes: vec![SourceNode::Text(Text {
                    value: line.text.to_string(),
                    span,
                })],
                piped: false,
            },
            LineToken::Doctype => Head::Node(Pending::new(
                SourceNode::Doctype(Doctype {
                    value: rest.trim().to_string(),
                    span,
                }),
                Body::Leaf,
            )),
            LineToken::Comment | LineToken::SilentComment => Head::Node(Pending::new(
                SourceNode::Comment(Comment {
                    value: rest.to_string(),
                    buffer: token == LineToken::Comment,
                    span,
                }),
                Body::Raw,
            )),
            LineToken::Code => {
                let value = rest.trim();
                let body = if value.is_empty() {
                    Body::Raw
                } else {
                    Body::Nodes
                };
                Head::Node(Pending::new(
                    SourceNode::Code(Code {
                        value: value.to_string(),
                        buffer: false,
                        escape: false,
                        block: Vec::new(),
                        span,
                    }),
                    body,
                ))
            }
            LineToken::BufferedCode | LineToken::UnescapedCode => Head::Node(Pending::new(
                SourceNode::Code(Code {
                    value: rest.trim().to_string(),
                    buffer: true,
                    escape: token == LineToken::BufferedCode,
                    block: Vec::new(),
                    span,
                }),
                Body::Leaf,
            )),
            LineToken::If | LineToken::Unless => {
                let test = rest.trim();
                if test.is_empty() {
                    self.error(
                        ParseErrorKind::syntax_message(format!(
                            "expected a condition after {}",
                            token.name()
                        )),
                        span,
                    );
                    return Head::Skip;
                }
                let test = if token == LineToken::Unless {
                    format!("!({test})")
                } else {
                    test.to_string()
                };
                Head::Node(Pending::new(
                    SourceNode::Conditional(Conditional {
                        test,
                        consequent: Vec::new(),
                        alternate: None,
                        span,
                    }),
                    Body::Nodes,
                ))
            }
            LineToken::Else => self.parse_else(rest, span),
            LineToken::Case => {
                let expr = rest.trim();
                if expr.is_empty() {
                    self.error(
                        ParseErrorKind::syntax_message("expected an expression after 'case'"),
                        span,
                    );
                    return Head::Skip;
                }
                Head::Node(Pending::new(
                    SourceNode::Case(Case {
                        expr: expr.to_string(),
                        whens: Vec::new(),
                        span,
                    }),
                    Body::Case,
                ))
            }
            LineToken::When => Head::When {
                keyword: "when",
                span,
            },
            LineToken::Default => Head::When {
                keyword: "default",
                span,
            },
            LineToken::Each | LineToken::For => match self.parse_each(rest, span) {
                Some(each) => Head::Node(Pending::new(SourceNode::Each(each), Body::Nodes)),
                None => Head::Skip,
            },
            LineToken::While => Head::Node(Pending::new(
                SourceNode::While(While {
                    test: rest.trim().to_string(),
                    body: Vec::new(),
                    span,
                }),
                Body::Nodes,
            )),
            LineToken::Mixin => self.parse_mixin_definition(rest, rest_start, span),
            LineToken::MixinCall => self.parse_mixin_call(line, len),
            LineToken::Include => self.parse_include(line, rest),
            LineToken::Extends => {
                let path = rest.trim();
                if path.is_empty() {
                    self.error(
                        ParseErrorKind::syntax_message("expected a path after 'extends'"),
                        span,
                    );
                    return Head::Skip;
                }
                Head::Node(Pending::new(
                    SourceNode::Extends(Extends {
                        file: FileReference::new(path),
                        span,
                    }),
                    Body::Leaf,
                ))
            }
            LineToken::Block => {
                let rest = rest.trim();
                if rest.is_empty() {
                    return Head::Node(Pending::new(
                        SourceNode::MixinBlock(MixinBlock { span }),
                        Body::Leaf,
                    ));
                }
                let (mode, name) = if let Some(name) = rest.strip_prefix("append ") {
                    (BlockMode::Append, name)
                } else if let Some(name) = rest.strip_prefix("prepend ") {
                    (BlockMode::Prepend, name)
                } else {
                    (BlockMode::Replace, rest)
                };
                self.named_block(mode, name, span)
            }
            LineToken::Append => self.named_block(BlockMode::Append, rest, span),
            LineToken::Prepend => self.named_block(BlockMode::Prepend, rest, span),
            LineToken::Filter => {
                let mut body = rest;
                if body.starts_with('(') {
                    if let Some(close) = find_closing(body, 0) {
                        body = &body[close + 1..];
                    }
                }
                Head::Node(Pending::new(
                    SourceNode::Filter(Filter {
                        name: SmolStr::new(&line.text[1..len]),
                        body: body.trim_start().to_string(),
                        span,
                    }),
                    Body::Raw,
                ))
            }
            LineToken::InterpolatedTag => match find_closing(line.text, 1) {
                Some(close) => {
                    let trailing = line.text[close + 1..].trim();
                    if !trailing.is_empty() {
                        self.error(
                            ParseErrorKind::syntax_message(
                                "interpolated tags cannot carry attributes or inline content",
                            ),
                            line.span_from(close + 1),
                        );
                    }
                    Head::Node(Pending::new(
                        SourceNode::InterpolatedTag(InterpolatedTag {
                            expr: line.text[2..close].trim().to_string(),
                            span,
                        }),
                        Body::Leaf,
                    ))
                }
                None => {
                    self.error(ParseErrorKind::UnclosedDelimiter { delimiter: '{' }, span);
                    Head::Skip
                }
            },
        }
    }

    fn parse_else(&mut self, rest: &str, span: Span) -> Head {
        let rest = rest.trim();
        if rest.is_empty() {
            return Head::Else { test: None, span };
        }

        let condition = |keyword: &str| {
            rest.strip_prefix(keyword)
                .filter(|after| after.starts_with(|c: char| c.is_whitespace() || c == '('))
                .map(str::trim)
                .filter(|test| !test.is_empty())
        };

        if let Some(test) = condition("if") {
            Head::Else {
                test: Some(test.to_string()),
                span,
            }
        } else if let Some(test) = condition("unless") {
            Head::Else {
                test: Some(format!("!({test})")),
                span,
            }
        } else {
            self.error(
                ParseErrorKind::UnexpectedToken {
                    expected: "'if' or end of line".to_string(),
                    found: format!("'{rest}'"),
                },
                span,
            );
            Head::Skip
        }
    }

    fn named_block(&mut self, mode: BlockMode, name: &str, span: Span) -> Head {
        let name = name.trim();
        if name.is_empty() || name_len(name) != name.len() {
            self.error(
                ParseErrorKind::UnexpectedToken {
                    expected: "block name".to_string(),
                    found: format!("'{name}'"),
                },
                span,
            );
            return Head::Skip;
        }

        Head::Node(Pending::new(
            SourceNode::NamedBlock(NamedBlock {
                name: SmolStr::new(name),
                mode,
                nodes: Vec::new(),
                span,
            }),
            Body::Nodes,
        ))
    }

    fn parse_include(&mut self, line: Line<'src>, rest: &str) -> Head {
        let span = line.span();

        if let Some(filtered) = rest.strip_prefix(':') {
            let split = filtered
                .find(char::is_whitespace)
                .unwrap_or(filtered.len());
            return Head::Node(Pending::new(
                SourceNode::Filter(Filter {
                    name: SmolStr::new(&filtered[..split]),
                    body: filtered[split..].trim().to_string(),
                    span,
                }),
                Body::Leaf,
            ));
        }

        let path = rest.trim();
        if path.is_empty() {
            self.error(
                ParseErrorKind::syntax_message("expected a path after 'include'"),
                span,
            );
            return Head::Skip;
        }

        let node = match Utf8Path::new(path).extension() {
            None | Some("pug") => SourceNode::Include(Include {
                file: FileReference::new(path),
                column: self.column_at(line.start),
                span,
            }),
            Some(_) => SourceNode::RawInclude(RawInclude {
                file: FileReference::new(path),
                span,
            }),
        };

        Head::Node(Pending::new(node, Body::Leaf))
    }

    fn parse_each(&mut self, rest: &str, span: Span) -> Option<Each> {
        let header = rest.trim();
        let split = [" in ", " of "]
            .iter()
            .filter_map(|keyword| header.find(keyword))
            .min();

        let Some(split) = split else {
            self.error(
                ParseErrorKind::InvalidEach {
                    message: "expected `in` or `of`".to_string(),
                },
                span,
            );
            return None;
        };

        let bindings: Vec<&str> = header[..split].split(',').map(str::trim).collect();
        let collection = header[split + 4..].trim();

        if let Some(bad) = bindings.iter().find(|binding| !is_identifier(binding)) {
            self.error(
                ParseErrorKind::InvalidEach {
                    message: format!("invalid binding `{bad}`"),
                },
                span,
            );
            return None;
        }
        if bindings.len() > 2 {
            self.error(
                ParseErrorKind::InvalidEach {
                    message: "expected at most two bindings".to_string(),
                },
                span,
            );
            return None;
        }
        if collection.is_empty() {
            self.error(
                ParseErrorKind::InvalidEach {
                    message: "missing collection expression".to_string(),
                },
                span,
            );
            return None;
        }

        Some(Each {
            collection: collection.to_string(),
            item: SmolStr::new(bindings[0]),
            key: bindings.get(1).map(|key| SmolStr::new(key)),
            body: Vec::new(),
            span,
        })
    }

    fn parse_mixin_definition(&mut self, rest: &str, rest_start: TextSize, span: Span) -> Head {
        let trimmed = rest.trim_start();
        let offset = usize::from(rest_start) + rest.len() - trimmed.len();
        let len = trimmed
            .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$' || c == '-'))
            .unwrap_or(trimmed.len());

        if len == 0 {
            self.error(
                ParseErrorKind::InvalidMixin {
                    message: "expected a mixin name".to_string(),
                },
                span,
            );
            return Head::Skip;
        }

        let name = SmolStr::new(&trimmed[..len]);
        let mut after = &trimmed[len..];
        let mut args = None;

        if after.starts_with('(') {
            match find_closing(after, 0) {
                Some(close) => {
                    args = Some(after[1..close].trim().to_string());
                    after = &after[close + 1..];
                }
                None => {
                    self.error(
                        ParseErrorKind::UnclosedDelimiter { delimiter: '(' },
                        range(offset + len, usize::from(span.end())),
                    );
                    return Head::Skip;
                }
            }
        }

        if !after.trim().is_empty() {
            self.error(
                ParseErrorKind::InvalidMixin {
                    message: format!("unexpected `{}` after mixin declaration", after.trim()),
                },
                span,
            );
            return Head::Skip;
        }

        Head::Node(Pending::new(
            SourceNode::Mixin(Mixin {
                name,
                call: false,
                args,
                attrs: Vec::new(),
                attribute_blocks: Vec::new(),
                block: Vec::new(),
                span,
            }),
            Body::Nodes,
        ))
    }

    fn parse_mixin_call(&mut self, line: Line<'src>, len: usize) -> Head {
        let source = self.source;
        let start = usize::from(line.start);
        let mut pos = start + len;
        let mut end = line_end(source, pos);
        let mut mixin = Mixin {
            name: SmolStr::new(&line.text[1..len]),
            call: true,
            args: None,
            attrs: Vec::new(),
            attribute_blocks: Vec::new(),
            block: Vec::new(),
            span: line.span(),
        };

        if source[pos..end].starts_with('(') {
            let Some(close) = self.group(pos, &mut end) else {
                return Head::Skip;
            };
            mixin.args = Some(source[pos + 1..close].trim().to_string());
            pos = close + 1;
        }

        while pos < end {
            if !self.parse_attribute_group(
                &mut pos,
                &mut end,
                &mut mixin.attrs,
                &mut mixin.attribute_blocks,
            ) {
                break;
            }
        }

        let rest = source[pos..end].trim();
        if !rest.is_empty() {
            self.error(
                ParseErrorKind::InvalidMixin {
                    message: format!("unexpected `{rest}` after mixin call"),
                },
                range(pos, end),
            );
        }

        mixin.span = range(start, end);
        Head::Node(Pending::new(SourceNode::Mixin(mixin), Body::Nodes))
    }

    /// Parses one `(attrs)` or `&attributes(expr)` group at `pos`.
    ///
    /// Returns false when there is no group at `pos` or it is unclosed.
    fn parse_attribute_group(
        &mut self,
        pos: &mut usize,
        end: &mut usize,
        attrs: &mut Vec<Attr>,
        blocks: &mut Vec<AttributeBlock>,
    ) -> bool {
        let source = self.source;
        let rest = &source[*pos..*end];

        if rest.starts_with('(') {
            let Some(close) = self.group(*pos, end) else {
                *pos = *end;
                return false;
            };
            attrs.extend(self.parse_attrs(&source[*pos + 1..close], *pos + 1));
            *pos = close + 1;
            return true;
        }

        if rest.starts_with("&attributes(") {
            let open = *pos + "&attributes".len();
            let Some(close) = self.group(open, end) else {
                *pos = *end;
                return false;
            };
            blocks.push(AttributeBlock {
                value: source[open + 1..close].trim().to_string(),
                span: range(*pos, close + 1),
            });
            *pos = close + 1;
            return true;
        }

        false
    }

    fn parse_tag(&mut self, line: Line<'src>, token: LineToken, len: usize) -> Head {
        let source = self.source;
        let start = usize::from(line.start);
        let mut pos = start;
        let mut end = line_end(source, start);

        let name = if token == LineToken::TagName {
            pos += len;
            SmolStr::new(&line.text[..len])
        } else {
            SmolStr::new_static("div")
        };

        let mut tag = Tag {
            name,
            attrs: Vec::new(),
            attribute_blocks: Vec::new(),
            children: Vec::new(),
            self_closing: false,
            span: line.span(),
        };
        let mut classes: Vec<&str> = Vec::new();
        let mut class_attr: Option<usize> = None;
        let mut text_block = false;

        loop {
            let rest = &source[pos..end];

            if let Some(after) = rest.strip_prefix('.') {
                let n = name_len(after);
                if n > 0 {
                    classes.push(&after[..n]);
                    if class_attr.is_none() {
                        class_attr = Some(tag.attrs.len());
                        tag.attrs.push(Attr {
                            name: SmolStr::new_static("class"),
                            value: AttrValue::Expr(String::new()),
                            must_escape: true,
                            span: range(pos, pos + 1 + n),
                        });
                    }
                    pos += 1 + n;
                    continue;
                }
                if after.trim().is_empty() {
                    text_block = true;
                    pos = end;
                }
                break;
            }

            if let Some(after) = rest.strip_prefix('#') {
                let n = name_len(after);
                if n > 0 {
                    tag.attrs.push(Attr {
                        name: SmolStr::new_static("id"),
                        value: AttrValue::Expr(format!("'{}'", &after[..n])),
                        must_escape: true,
                        span: range(pos, pos + 1 + n),
                    });
                    pos += 1 + n;
                    continue;
                }
                break;
            }

            if rest.starts_with('(') || rest.starts_with("&attributes(") {
                if self.parse_attribute_group(
                    &mut pos,
                    &mut end,
                    &mut tag.attrs,
                    &mut tag.attribute_blocks,
                ) {
                    continue;
                }
                break;
            }

            if rest.starts_with('/') {
                tag.self_closing = true;
                pos += 1;
            }
            break;
        }

        if let Some(index) = class_attr {
            tag.attrs[index].value = AttrValue::Expr(format!("'{}'", classes.join(" ")));
        }

        let rest = &source[pos..end];
        let mut body = if text_block { Body::TextBlock } else { Body::Nodes };
        let mut expansion = None;

        if tag.self_closing && !rest.trim().is_empty() {
            self.error(
                ParseErrorKind::syntax_message("self-closing tags cannot have content"),
                range(pos, end),
            );
        } else if let Some(after) = rest.strip_prefix(':') {
            let inline = after.trim_start();
            if (!after.is_empty() && !after.starts_with(char::is_whitespace)) || inline.is_empty() {
                self.error(
                    ParseErrorKind::syntax_message("expected a tag after `:`"),
                    range(pos, end),
                );
            } else {
                let sub = Line {
                    indent: line.indent,
                    text: inline,
                    start: size(end - inline.len()),
                    number: line.number,
                };
                match self.parse_head(sub) {
                    Head::Node(pending) => expansion = Some(Box::new(pending)),
                    Head::Text { nodes, .. } => tag.children.extend(nodes),
                    _ => self.error(
                        ParseErrorKind::syntax_message("expected a tag after `:`"),
                        sub.span(),
                    ),
                }
            }
        } else if let Some(expr) = rest.strip_prefix("!=").or_else(|| rest.strip_prefix('=')) {
            tag.children.push(SourceNode::Code(Code {
                value: expr.trim().to_string(),
                buffer: true,
                escape: !rest.starts_with('!'),
                block: Vec::new(),
                span: range(pos, end),
            }));
        } else if rest.starts_with(' ') || rest.starts_with('\t') {
            let text = &rest[1..];
            if !text.is_empty() {
                let nodes = self.parse_interpolated(text, size(pos + 1));
                tag.children.extend(nodes);
            }
        } else if !rest.is_empty() {
            let found = rest.chars().next().map(|c| format!("'{c}'")).unwrap_or_default();
            self.error(
                ParseErrorKind::UnexpectedToken {
                    expected: "attributes, text or ':'".to_string(),
                    found,
                },
                range(pos, end),
            );
        }

        if tag.self_closing {
            body = Body::Leaf;
        }
        tag.span = range(start, end);

        Head::Node(Pending {
            node: SourceNode::Tag(tag),
            body,
            expansion,
        })
    }

    /// Parses `(name=value, flag, name!=value)` contents.
    fn parse_attrs(&mut self, inner: &str, base: usize) -> Vec<Attr> {
        let mut attrs = Vec::new();
        let mut i = 0;

        loop {
            i += inner[i..]
                .find(|c: char| !(c.is_whitespace() || c == ','))
                .unwrap_or(inner.len() - i);
            if i >= inner.len() {
                break;
            }

            let key_start = i;
            let first = inner[i..].chars().next().unwrap_or(' ');
            let name = if first == '"' || first == '\'' {
                match inner[i + 1..].find(first) {
                    Some(close) => {
                        let name = &inner[i + 1..i + 1 + close];
                        i += close + 2;
                        name
                    }
                    None => {
                        self.error(
                            ParseErrorKind::UnclosedDelimiter { delimiter: first },
                            range(base + i, base + inner.len()),
                        );
                        break;
                    }
                }
            } else {
                let len = inner[i..]
                    .find(|c: char| c.is_whitespace() || c == ',' || c == '=' || c == '!')
                    .unwrap_or(inner.len() - i);
                let name = &inner[i..i + len];
                i += len;
                name
            };

            if name.is_empty() {
                self.error(
                    ParseErrorKind::UnexpectedToken {
                        expected: "attribute name".to_string(),
                        found: format!("'{first}'"),
                    },
                    range(base + i, base + i + first.len_utf8()),
                );
                i += first.len_utf8();
                continue;
            }

            let after_name = i;
            let lookahead = inner[i..].trim_start();
            let skipped = inner.len() - i - lookahead.len();
            let (operator, must_escape) = if lookahead.starts_with("!=") {
                (2, false)
            } else if lookahead.starts_with('=') {
                (1, true)
            } else if lookahead.starts_with('!') {
                self.error(
                    ParseErrorKind::UnexpectedToken {
                        expected: "'!='".to_string(),
                        found: "'!'".to_string(),
                    },
                    range(base + i + skipped, base + i + skipped + 1),
                );
                i += skipped + 1;
                continue;
            } else {
                (0, true)
            };

            let value = if operator == 0 {
                i = after_name;
                AttrValue::Boolean(true)
            } else {
                let value_start = i + skipped + operator;
                let value_start = value_start
                    + (inner.len() - value_start - inner[value_start..].trim_start().len());
                let value_end = scan_attr_value(inner, value_start);
                let raw = inner[value_start..value_end].trim();
                i = value_end;
                if raw.is_empty() {
                    self.error(
                        ParseErrorKind::syntax_message(format!(
                            "missing value for attribute `{name}`"
                        )),
                        range(base + key_start, base + i),
                    );
                    continue;
                }
                AttrValue::Expr(raw.to_string())
            };

            attrs.push(Attr {
                name: SmolStr::new(name),
                value,
                must_escape,
                span: range(base + key_start, base + i),
            });
        }

        attrs
    }

    /// Splits text on `#{expr}` and `!{expr}` interpolations.
    fn parse_interpolated(&mut self, text: &str, start: TextSize) -> Vec<SourceNode> {
        let base = usize::from(start);
        let mut nodes = Vec::new();
        let mut literal = String::new();
        let mut literal_start = 0;
        let mut i = 0;

        let flush = |nodes: &mut Vec<SourceNode>, literal: &mut String, from: usize, to: usize| {
            if !literal.is_empty() {
                nodes.push(SourceNode::Text(Text {
                    value: std::mem::take(literal),
                    span: range(base + from, base + to),
                }));
            }
        };

        while i < text.len() {
            let rest = &text[i..];

            if rest.starts_with("\\#{") || rest.starts_with("\\!{") {
                literal.push_str(&rest[1..3]);
                i += 3;
                continue;
            }

            if rest.starts_with("#{") || rest.starts_with("!{") {
                match find_closing(text, i + 1) {
                    Some(close) => {
                        flush(&mut nodes, &mut literal, literal_start, i);
                        nodes.push(SourceNode::Code(Code {
                            value: text[i + 2..close].trim().to_string(),
                            buffer: true,
                            escape: rest.starts_with('#'),
                            block: Vec::new(),
                            span: range(base + i, base + close + 1),
                        }));
                        i = close + 1;
                        literal_start = i;
                        continue;
                    }
                    None => {
                        self.error(
                            ParseErrorKind::UnclosedDelimiter { delimiter: '{' },
                            range(base + i, base + text.len()),
                        );
                        literal.push_str(rest);
                        i = text.len();
                        break;
                    }
                }
            }

            let Some(ch) = rest.chars().next() else {
                break;
            };
            literal.push(ch);
            i += ch.len_utf8();
        }

        flush(&mut nodes, &mut literal, literal_start, i);

        if nodes.is_empty() {
            nodes.push(SourceNode::Text(Text {
                value: String::new(),
                span: TextRange::empty(start),
            }));
        }

        nodes
    }
}
