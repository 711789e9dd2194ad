//! Post-order translation of source nodes into target nodes.

use pug_parser::{Alternate, Code, Conditional, Mixin, NamedBlock, SourceNode, Span, Tag, WhenMatch};
use smol_str::SmolStr;

use crate::attributes::{translate_attribute, translate_spread};
use crate::control_flow::{branch, desugar_case, desugar_conditional, desugar_each};
use crate::diagnostic::{Diagnostic, DiagnosticCode};
use crate::error::TransformError;
use crate::expr::{parse_expression, parse_statements, EmbeddedStmt};
use crate::identifier::identifier_casing;
use crate::linker::{import_for, slot_identifier};
use crate::markup::{
    ArrowBody, Element, Expr, Import, Markup, MarkupChild, Param, Stmt, SwitchCase,
    TargetNode,
};

/// The result of translating one source node.
///
/// `Many` is flattened exactly once into the parent's child list.
#[derive(Debug)]
enum Lowered {
    Nothing,
    One(TargetNode),
    Many(Vec<TargetNode>),
}

/// Translates the nodes of one file.
pub(crate) struct Walker {
    /// Render named blocks as slot components.
    layout: bool,
    /// Imports found below the top level.
    imports: Vec<Import>,
    diagnostics: Vec<Diagnostic>,
    /// Nesting of the child list being walked; 1 is the file's top level.
    depth: usize,
}

impl Walker {
    pub(crate) fn new(layout: bool) -> Self {
        Self {
            layout,
            imports: Vec::new(),
            diagnostics: Vec::new(),
            depth: 0,
        }
    }

    /// Returns the hoisted imports and the collected diagnostics.
    pub(crate) fn finish(self) -> (Vec<Import>, Vec<Diagnostic>) {
        (self.imports, self.diagnostics)
    }

    pub(crate) fn warn(&mut self, code: DiagnosticCode, message: impl Into<String>, span: Span) {
        let diagnostic = Diagnostic::new(code, message, span);
        log::warn!("{}: {}", diagnostic.code, diagnostic.message);
        self.diagnostics.push(diagnostic);
    }

    /// Translates a child list, flattening spliced results.
    pub(crate) fn walk_nodes(
        &mut self,
        nodes: &[SourceNode],
    ) -> Result<Vec<TargetNode>, TransformError> {
        self.depth += 1;
        let targets = self.walk_list(nodes);
        self.depth -= 1;
        targets
    }

    /// Translates the content of a named block in a file that extends.
    pub(crate) fn walk_block_content(
        &mut self,
        nodes: &[SourceNode],
    ) -> Result<Vec<TargetNode>, TransformError> {
        self.depth += 1;
        let targets = self.walk_nodes(nodes);
        self.depth -= 1;
        targets
    }

    fn walk_list(&mut self, nodes: &[SourceNode]) -> Result<Vec<TargetNode>, TransformError> {
        let mut targets = Vec::with_capacity(nodes.len());
        for node in nodes {
            match self.walk_node(node)? {
                Lowered::Nothing => {}
                Lowered::One(target) => targets.push(target),
                Lowered::Many(many) => targets.extend(many),
            }
        }
        Ok(targets)
    }

    fn walk_node(&mut self, node: &SourceNode) -> Result<Lowered, TransformError> {
        let lowered = match node {
            SourceNode::Text(text) => {
                if text.is_blank() {
                    Lowered::One(TargetNode::Placeholder)
                } else {
                    Lowered::One(TargetNode::Text(text.value.clone()))
                }
            }
            SourceNode::Code(code) => self.lower_code(code)?,
            SourceNode::Block(block) => Lowered::Many(self.walk_nodes(&block.nodes)?),
            SourceNode::NamedBlock(block) => self.lower_named_block(block)?,
            SourceNode::Comment(_) => Lowered::One(TargetNode::Placeholder),
            SourceNode::Doctype(_) => Lowered::Nothing,
            SourceNode::Case(case) => {
                let subject = parse_expression(&case.expr, case.span)?;
                let mut cases = Vec::with_capacity(case.whens.len());
                for when in &case.whens {
                    let test = match &when.matcher {
                        WhenMatch::Expr(expr) => Some(Expr::Embedded(parse_expression(expr, when.span)?)),
                        WhenMatch::Default => None,
                    };
                    let body = match &when.block {
                        Some(nodes) => {
                            let targets = self.walk_nodes(nodes)?;
                            self.block_body(targets)?
                        }
                        None => Vec::new(),
                    };
                    cases.push(SwitchCase { test, body });
                }
                Lowered::One(TargetNode::Fragment(desugar_case(subject, cases)))
            }
            SourceNode::Conditional(conditional) => {
                Lowered::One(TargetNode::Expression(self.lower_conditional(conditional)?))
            }
            SourceNode::Each(each) => {
                let collection = parse_expression(&each.collection, each.span)?;
                let targets = self.walk_nodes(&each.body)?;
                let children = self.normalize_children(targets)?;
                Lowered::One(TargetNode::Fragment(desugar_each(
                    collection,
                    each.item.clone(),
                    each.key.clone(),
                    children,
                )))
            }
            SourceNode::Mixin(mixin) if mixin.call => {
                self.warn(
                    DiagnosticCode::UnsupportedMixinCall,
                    format!("mixin call `+{}` is not expanded", mixin.name),
                    mixin.span,
                );
                Lowered::Nothing
            }
            SourceNode::Mixin(mixin) => Lowered::One(self.lower_mixin_definition(mixin)?),
            SourceNode::Tag(tag) => Lowered::One(TargetNode::Element(self.lower_tag(tag)?)),
            SourceNode::InterpolatedTag(tag) => Lowered::One(TargetNode::ExpressionContainer(
                Expr::Embedded(parse_expression(&tag.expr, tag.span)?),
            )),
            SourceNode::Include(include) => {
                if self.depth == 1 && include.column == 1 {
                    Lowered::One(TargetNode::Import(import_for(&include.file)))
                } else {
                    self.warn(
                        DiagnosticCode::UnsupportedIncludePosition,
                        format!(
                            "include of `{}` is only supported at the top level; move it into a mixin",
                            include.file.path
                        ),
                        include.span,
                    );
                    Lowered::Nothing
                }
            }
            SourceNode::RawInclude(include) => {
                self.warn(
                    DiagnosticCode::UnsupportedRawInclude,
                    format!("include of non-pug file `{}` must be converted by hand", include.file.path),
                    include.span,
                );
                Lowered::Nothing
            }
            SourceNode::Extends(extends) => Lowered::One(TargetNode::Import(import_for(&extends.file))),
            SourceNode::While(_) | SourceNode::MixinBlock(_) | SourceNode::Filter(_) => {
                return Err(TransformError::UnsupportedNodeKind {
                    kind: SmolStr::new_static(node.kind()),
                    span: node.span(),
                });
            }
        };

        match &lowered {
            Lowered::Nothing => log::debug!("{} -> nothing", node.kind()),
            Lowered::One(target) => log::debug!("{} -> {}", node.kind(), target.kind()),
            Lowered::Many(many) => log::debug!("{} -> {} nodes", node.kind(), many.len()),
        }
        Ok(lowered)
    }

    fn lower_code(&mut self, code: &Code) -> Result<Lowered, TransformError> {
        if !code.block.is_empty() {
            return Err(TransformError::UnsupportedNodeKind {
                kind: SmolStr::new_static("CodeBlock"),
                span: code.span,
            });
        }
        if code.buffer {
            let expr = parse_expression(&code.value, code.span)?;
            return Ok(Lowered::One(TargetNode::ExpressionContainer(Expr::Embedded(expr))));
        }

        let statements = parse_statements(&code.value, code.span)?
            .into_iter()
            .map(|statement| {
                TargetNode::Statement(match statement {
                    EmbeddedStmt::Expr(expr) => Stmt::Expr(Expr::Embedded(expr)),
                    EmbeddedStmt::Other(source) => Stmt::Raw(source),
                })
            })
            .collect();
        Ok(Lowered::Many(statements))
    }

    fn lower_conditional(&mut self, conditional: &Conditional) -> Result<Expr, TransformError> {
        let test = parse_expression(&conditional.test, conditional.span)?;
        let targets = self.walk_nodes(&conditional.consequent)?;
        let consequent = self.normalize_children(targets)?;

        let alternate = match &conditional.alternate {
            None => None,
            Some(Alternate::Else(block)) => {
                let targets = self.walk_nodes(&block.nodes)?;
                Some(branch(self.normalize_children(targets)?))
            }
            Some(Alternate::ElseIf(next)) => Some(self.lower_conditional(next)?),
        };

        Ok(desugar_conditional(test, consequent, alternate))
    }

    fn lower_mixin_definition(&mut self, mixin: &Mixin) -> Result<TargetNode, TransformError> {
        let targets = self.walk_nodes(&mixin.block)?;
        let body = self.block_body(targets)?;
        let params = mixin.params().into_iter().map(|p| Param::Ident(p.into())).collect();

        Ok(TargetNode::Statement(Stmt::Const {
            name: binding_name(&mixin.name),
            init: Expr::Arrow {
                params,
                body: ArrowBody::Block(body),
            },
        }))
    }

    fn lower_tag(&mut self, tag: &Tag) -> Result<Element, TransformError> {
        let mut attributes = tag
            .attrs
            .iter()
            .map(translate_attribute)
            .collect::<Result<Vec<_>, _>>()?;
        for block in &tag.attribute_blocks {
            attributes.push(translate_spread(block)?);
        }

        let targets = self.walk_nodes(&tag.children)?;
        Ok(Element {
            name: tag.name.clone(),
            attributes,
            children: self.normalize_children(targets)?,
            self_closing: tag.self_closing,
        })
    }

    fn lower_named_block(&mut self, block: &NamedBlock) -> Result<Lowered, TransformError> {
        if !self.layout {
            return Ok(Lowered::Many(self.walk_nodes(&block.nodes)?));
        }

        let ident = slot_identifier(&block.name);
        let slot = Element::self_closing(ident.clone());
        if block.nodes.is_empty() {
            return Ok(Lowered::One(TargetNode::Element(slot)));
        }

        let targets = self.walk_nodes(&block.nodes)?;
        let fallback = self.normalize_children(targets)?;
        Ok(Lowered::One(TargetNode::ExpressionContainer(Expr::Conditional {
            test: Box::new(Expr::Ident(ident)),
            consequent: Box::new(Expr::Markup(Box::new(Markup::Element(slot)))),
            alternate: Box::new(Expr::fragment(fallback)),
        })))
    }

    /// Turns translated nodes into markup children.
    ///
    /// Expressions become containers and placeholders become a blank text
    /// child. At the first statement the rest of the list moves into an
    /// invoked arrow function that runs the statements and returns the
    /// remaining siblings.
    pub(crate) fn normalize_children(
        &mut self,
        targets: Vec<TargetNode>,
    ) -> Result<Vec<MarkupChild>, TransformError> {
        let mut children = Vec::with_capacity(targets.len());
        let mut targets = targets.into_iter();

        while let Some(target) = targets.next() {
            match target {
                TargetNode::Text(text) => children.push(MarkupChild::Text(text)),
                TargetNode::Element(element) => children.push(MarkupChild::Element(element)),
                TargetNode::Fragment(fragment) => children.push(MarkupChild::Fragment(fragment)),
                TargetNode::ExpressionContainer(expr) | TargetNode::Expression(expr) => {
                    children.push(MarkupChild::ExpressionContainer(expr))
                }
                TargetNode::Placeholder => children.push(MarkupChild::Text(" ".to_string())),
                TargetNode::Import(import) => self.imports.push(import),
                TargetNode::Statement(stmt) => {
                    let mut rest = vec![TargetNode::Statement(stmt)];
                    rest.extend(targets);
                    let body = self.block_body(rest)?;
                    children.push(MarkupChild::ExpressionContainer(Expr::iife(body)));
                    break;
                }
            }
        }

        Ok(children)
    }

    /// Builds a function body: leading statements, then `return` of the
    /// remaining nodes as a fragment (or `null` when nothing renders).
    pub(crate) fn block_body(&mut self, targets: Vec<TargetNode>) -> Result<Vec<Stmt>, TransformError> {
        let mut body = Vec::new();
        let mut targets = targets.into_iter().peekable();

        while let Some(target) = targets.next_if(|t| {
            matches!(t, TargetNode::Statement(_) | TargetNode::Import(_) | TargetNode::Placeholder)
        }) {
            match target {
                TargetNode::Statement(stmt) => body.push(stmt),
                TargetNode::Import(import) => self.imports.push(import),
                _ => {}
            }
        }

        let children = self.normalize_children(targets.collect())?;
        body.push(Stmt::Return(if children.is_empty() {
            Expr::Null
        } else {
            Expr::fragment(children)
        }));
        Ok(body)
    }
}

/// Returns `name` when it is a valid binding, else its IdentifierCasing form.
fn binding_name(name: &str) -> SmolStr {
    let valid = name
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$');
    if valid {
        SmolStr::new(name)
    } else {
        identifier_casing(name).into()
    }
}
