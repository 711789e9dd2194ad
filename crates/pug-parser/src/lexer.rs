//! Pug line lexer using logos.
//!
//! Pug is line oriented: the first token of a line decides what the rest of
//! the line means. The lexer splits the source into indented lines and
//! classifies the leading token of each; the parser reads the remainder of a
//! line with the scanning helpers at the bottom of this module.

use logos::Logos;
use text_size::{TextRange, TextSize};

/// One physical line of the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'src> {
    /// Width of the leading indentation, in characters.
    pub indent: usize,
    /// The line content after indentation, without the line terminator.
    pub text: &'src str,
    /// Byte offset of `text` in the source.
    pub start: TextSize,
    /// 1-based line number.
    pub number: u32,
}

impl<'src> Line<'src> {
    /// Returns true if the line has no content.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Returns the span of the line content.
    pub fn span(&self) -> TextRange {
        TextRange::at(self.start, TextSize::of(self.text))
    }

    /// Returns the span of `text[from..]`.
    pub fn span_from(&self, from: usize) -> TextRange {
        let from = TextSize::try_from(from.min(self.text.len())).unwrap_or_default();
        TextRange::new(self.start + from, self.start + TextSize::of(self.text))
    }

    /// Returns the 1-based column of the first content character.
    pub fn column(&self) -> u32 {
        self.indent as u32 + 1
    }
}

/// Splits source text into lines.
pub fn split_lines(source: &str) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut offset = 0usize;

    for (index, raw) in source.split('\n').enumerate() {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        let content = line.trim_start_matches([' ', '\t']);
        let indent_bytes = line.len() - content.len();

        lines.push(Line {
            indent: line[..indent_bytes].chars().count(),
            text: content,
            start: TextSize::try_from(offset + indent_bytes).unwrap_or_default(),
            number: index as u32 + 1,
        });

        offset += raw.len() + 1;
    }

    lines
}

/// Leading token kinds for a Pug line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Logos)]
pub enum LineToken {
    /// `doctype`
    #[token("doctype", priority = 5)]
    Doctype,

    /// `//-`
    #[token("//-", priority = 10)]
    SilentComment,

    /// `//`
    #[token("//", priority = 10)]
    Comment,

    /// `|`
    #[token("|", priority = 10)]
    Pipe,

    /// `-`
    #[token("-", priority = 10)]
    Code,

    /// `=`
    #[token("=", priority = 10)]
    BufferedCode,

    /// `!=`
    #[token("!=", priority = 10)]
    UnescapedCode,

    /// `if`
    #[token("if", priority = 5)]
    If,

    /// `unless`
    #[token("unless", priority = 5)]
    Unless,

    /// `else`
    #[token("else", priority = 5)]
    Else,

    /// `case`
    #[token("case", priority = 5)]
    Case,

    /// `when`
    #[token("when", priority = 5)]
    When,

    /// `default`
    #[token("default", priority = 5)]
    Default,

    /// `each`
    #[token("each", priority = 5)]
    Each,

    /// `for`
    #[token("for", priority = 5)]
    For,

    /// `while`
    #[token("while", priority = 5)]
    While,

    /// `mixin`
    #[token("mixin", priority = 5)]
    Mixin,

    /// `+name`
    #[regex(r"\+[A-Za-z_$][A-Za-z0-9_$-]*", priority = 6)]
    MixinCall,

    /// `include`
    #[token("include", priority = 5)]
    Include,

    /// `extends`
    #[token("extends", priority = 5)]
    Extends,

    /// `block`
    #[token("block", priority = 5)]
    Block,

    /// `append`
    #[token("append", priority = 5)]
    Append,

    /// `prepend`
    #[token("prepend", priority = 5)]
    Prepend,

    /// `:name`
    #[regex(r":[A-Za-z_][A-Za-z0-9_-]*", priority = 6)]
    Filter,

    /// `#{`
    #[token("#{", priority = 10)]
    InterpolatedTag,

    /// A tag name.
    #[regex(r"[A-Za-z][A-Za-z0-9_-]*", priority = 4)]
    TagName,

    /// `.class` shorthand starting an implicit `div`.
    #[regex(r"\.[A-Za-z_-][A-Za-z0-9_-]*", priority = 6)]
    ClassName,

    /// `#id` shorthand starting an implicit `div`.
    #[regex(r"#[A-Za-z_-][A-Za-z0-9_-]*", priority = 6)]
    IdName,

    /// `<`, a line of literal HTML.
    #[token("<", priority = 10)]
    Html,
}

impl LineToken {
    /// Returns true for word keywords that must be followed by a boundary.
    fn is_keyword(self) -> bool {
        matches!(
            self,
            LineToken::Doctype
                | LineToken::If
                | LineToken::Unless
                | LineToken::Else
                | LineToken::Case
                | LineToken::When
                | LineToken::Default
                | LineToken::Each
                | LineToken::For
                | LineToken::While
                | LineToken::Mixin
                | LineToken::Include
                | LineToken::Extends
                | LineToken::Block
                | LineToken::Append
                | LineToken::Prepend
        )
    }

    /// Returns a human-readable name for this token kind.
    pub fn name(self) -> &'static str {
        match self {
            LineToken::Doctype => "'doctype'",
            LineToken::SilentComment => "'//-'",
            LineToken::Comment => "'//'",
            LineToken::Pipe => "'|'",
            LineToken::Code => "'-'",
            LineToken::BufferedCode => "'='",
            LineToken::UnescapedCode => "'!='",
            LineToken::If => "'if'",
            LineToken::Unless => "'unless'",
            LineToken::Else => "'else'",
            LineToken::Case => "'case'",
            LineToken::When => "'when'",
            LineToken::Default => "'default'",
            LineToken::Each => "'each'",
            LineToken::For => "'for'",
            LineToken::While => "'while'",
            LineToken::Mixin => "'mixin'",
            LineToken::MixinCall => "mixin call",
            LineToken::Include => "'include'",
            LineToken::Extends => "'extends'",
            LineToken::Block => "'block'",
            LineToken::Append => "'append'",
            LineToken::Prepend => "'prepend'",
            LineToken::Filter => "filter",
            LineToken::InterpolatedTag => "'#{'",
            LineToken::TagName => "tag name",
            LineToken::ClassName => "class name",
            LineToken::IdName => "id",
            LineToken::Html => "'<'",
        }
    }
}

/// Classifies the leading token of a line.
///
/// Returns the token and the byte length it covers. A keyword glued to
/// identifier characters (`iffy`) is reported as a tag name instead, and a
/// keyword used as a tag (`block.`, `case(x)`) falls back the same way when
/// the next character cannot follow the keyword.
pub fn leading_token(text: &str) -> Option<(LineToken, usize)> {
    let mut lexer = LineToken::lexer(text);
    let token = lexer.next()?.ok()?;
    let len = lexer.span().end;

    if token.is_keyword() {
        let next = text[len..].chars().next();
        let boundary = match next {
            None => true,
            Some(c) => {
                c.is_whitespace()
                    || (c == ':' && matches!(token, LineToken::Include | LineToken::Default))
            }
        };
        let parenthesized = next == Some('(')
            && matches!(
                token,
                LineToken::If | LineToken::Unless | LineToken::While | LineToken::Case
            );
        if !boundary && !parenthesized {
            return Some((LineToken::TagName, len));
        }
    }

    Some((token, len))
}

/// Finds the byte index of the delimiter closing the one at `open`.
///
/// Nested brackets and JavaScript string literals are skipped.
pub fn find_closing(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut stack: Vec<u8> = Vec::new();
    let mut quote: Option<u8> = None;
    let mut escaped = false;
    let mut i = open;

    while i < bytes.len() {
        let b = bytes[i];

        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }

        match b {
            b'\'' | b'"' | b'`' => quote = Some(b),
            b'(' => stack.push(b')'),
            b'[' => stack.push(b']'),
            b'{' => stack.push(b'}'),
            b')' | b']' | b'}' => {
                if stack.pop() != Some(b) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }

    None
}

/// Splits `text` on `separator` occurrences outside brackets and strings.
pub fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0usize;

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
            c if c == separator && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }

    parts.push(&text[start..]);
    parts
}
