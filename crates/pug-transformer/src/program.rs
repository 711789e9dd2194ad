//! Assembly of a file's translated nodes into one exported component.

use indexmap::IndexMap;
use pug_parser::{BlockMode, Document, SourceNode};
use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use crate::diagnostic::{Diagnostic, DiagnosticCode};
use crate::error::TransformError;
use crate::linker::{slot_identifier, FileContext, FileRole};
use crate::markup::{
    ArrowBody, Component, Element, Expr, Import, JsxAttribute, Markup, MarkupChild, Param,
    Program, Stmt, TargetNode,
};
use crate::walk::Walker;

/// Translates a document and assembles the exported component.
pub(crate) fn assemble(
    context: &FileContext,
    document: &Document,
) -> Result<(Program, Vec<Diagnostic>), TransformError> {
    match context.role() {
        FileRole::SlotFiller { base } => assemble_slot_filler(context, base, document),
        role => assemble_component(context, role == FileRole::Layout, document),
    }
}

fn assemble_component(
    context: &FileContext,
    layout: bool,
    document: &Document,
) -> Result<(Program, Vec<Diagnostic>), TransformError> {
    let mut walker = Walker::new(layout);
    let targets = walker.walk_nodes(&document.nodes)?;

    let mut imports = Vec::new();
    let mut body = Vec::new();
    let mut candidates = Vec::new();
    for target in targets {
        match target {
            TargetNode::Import(import) => imports.push(import),
            TargetNode::Statement(stmt) => body.push(stmt),
            TargetNode::Expression(expr) | TargetNode::ExpressionContainer(expr) => {
                candidates.push(MarkupChild::ExpressionContainer(expr))
            }
            TargetNode::Text(text) => candidates.push(MarkupChild::Text(text)),
            TargetNode::Element(element) => candidates.push(MarkupChild::Element(element)),
            TargetNode::Fragment(fragment) => candidates.push(MarkupChild::Fragment(fragment)),
            TargetNode::Placeholder => {}
        }
    }
    body.push(Stmt::Return(return_value(candidates)));

    let params = if layout {
        vec![Param::Destructured(
            context
                .slots
                .iter()
                .map(|name| (name.clone(), slot_identifier(name)))
                .collect(),
        )]
    } else {
        Vec::new()
    };

    let (nested_imports, diagnostics) = walker.finish();
    imports.extend(nested_imports);
    Ok((program(context, dedup_imports(imports), params, body), diagnostics))
}

fn assemble_slot_filler(
    context: &FileContext,
    base: &str,
    document: &Document,
) -> Result<(Program, Vec<Diagnostic>), TransformError> {
    let mut walker = Walker::new(false);
    let mut imports = Vec::new();
    let mut body = Vec::new();
    let mut blocks: IndexMap<SmolStr, Vec<&SourceNode>> = IndexMap::new();

    for node in &document.nodes {
        if let SourceNode::NamedBlock(block) = node {
            let content = blocks.entry(block.name.clone()).or_default();
            match block.mode {
                BlockMode::Replace => *content = block.nodes.iter().collect(),
                BlockMode::Append => content.extend(&block.nodes),
                BlockMode::Prepend => {
                    content.splice(0..0, &block.nodes);
                }
            }
            continue;
        }

        let mut ignored = false;
        for target in walker.walk_nodes(std::slice::from_ref(node))? {
            match target {
                TargetNode::Import(import) => imports.push(import),
                TargetNode::Statement(stmt) => body.push(stmt),
                TargetNode::Placeholder => {}
                _ => ignored = true,
            }
        }
        if ignored {
            walker.warn(
                DiagnosticCode::IgnoredContentOutsideBlock,
                format!("{} outside a block is ignored in a file that extends", node.kind()),
                node.span(),
            );
        }
    }

    let mut attributes = Vec::with_capacity(blocks.len());
    for (name, nodes) in blocks {
        let mut targets = Vec::new();
        for node in nodes {
            targets.extend(walker.walk_block_content(std::slice::from_ref(node))?);
        }
        let ident = slot_identifier(&name);
        body.push(Stmt::Const {
            name: ident.clone(),
            init: Expr::Arrow {
                params: Vec::new(),
                body: ArrowBody::Block(walker.block_body(targets)?),
            },
        });
        attributes.push(JsxAttribute::Attribute {
            name,
            value: Some(Expr::Ident(ident)),
        });
    }

    let mut base = Element::self_closing(base);
    base.attributes = attributes;
    body.push(Stmt::Return(Expr::Markup(Box::new(Markup::Element(base)))));

    let (nested_imports, diagnostics) = walker.finish();
    imports.extend(nested_imports);
    Ok((program(context, dedup_imports(imports), Vec::new(), body), diagnostics))
}

/// Builds the returned value: `null`, the single element, or a fragment.
fn return_value(mut candidates: Vec<MarkupChild>) -> Expr {
    match candidates.len() {
        0 => Expr::Null,
        1 => match candidates.remove(0) {
            MarkupChild::Element(element) => Expr::Markup(Box::new(Markup::Element(element))),
            MarkupChild::Fragment(fragment) => Expr::Markup(Box::new(Markup::Fragment(fragment))),
            child => Expr::fragment(vec![child]),
        },
        _ => Expr::fragment(candidates),
    }
}

fn dedup_imports(imports: Vec<Import>) -> Vec<Import> {
    let mut seen = FxHashSet::default();
    imports
        .into_iter()
        .filter(|import| seen.insert((import.name.clone(), import.path.clone())))
        .collect()
}

fn program(context: &FileContext, imports: Vec<Import>, params: Vec<Param>, body: Vec<Stmt>) -> Program {
    Program {
        imports,
        component: Component {
            name: context.module_identifier.clone(),
            params,
            body,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8Path;
    use pretty_assertions::assert_eq;

    fn assemble_source(path: &str, source: &str) -> (Program, Vec<Diagnostic>) {
        let result = pug_parser::parse(source);
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        let context = FileContext::for_file(Utf8Path::new(path), &result.document);
        assemble(&context, &result.document).unwrap()
    }

    fn returned(program: &Program) -> &Expr {
        match program.component.body.last() {
            Some(Stmt::Return(expr)) => expr,
            other => panic!("expected a return, got {other:?}"),
        }
    }

    #[test]
    fn test_single_element_is_returned_as_is() {
        let (program, _) = assemble_source("card.pug", "p(title='t') hello\n");
        assert!(matches!(
            returned(&program),
            Expr::Markup(markup) if matches!(markup.as_ref(), Markup::Element(e) if e.name == "p")
        ));
        assert_eq!(program.component.name, "Card");
    }

    #[test]
    fn test_siblings_are_wrapped_in_fragment() {
        let (program, _) = assemble_source("list.pug", "h1 a\n//- note\np b\n");
        let Expr::Markup(markup) = returned(&program) else {
            panic!("expected markup");
        };
        let Markup::Fragment(fragment) = markup.as_ref() else {
            panic!("expected a fragment");
        };
        assert_eq!(fragment.children.len(), 2);
    }

    #[test]
    fn test_empty_file_returns_null() {
        let (program, _) = assemble_source("empty.pug", "doctype html\n");
        assert_eq!(program.component.body, vec![Stmt::Return(Expr::Null)]);
    }

    #[test]
    fn test_partition_keeps_statements_and_hoists_imports() {
        let (program, _) = assemble_source(
            "page.pug",
            "- var title = 'x'\ninclude header\nh1= title\n",
        );
        assert_eq!(
            program.imports,
            vec![Import {
                name: "Header".into(),
                path: "header".to_string(),
            }]
        );
        assert_eq!(program.component.body[0], Stmt::Raw("var title = 'x'".to_string()));
        assert_eq!(program.component.body.len(), 2);
    }

    #[test]
    fn test_top_level_conditional_is_contained() {
        let (program, _) = assemble_source("cond.pug", "if ok\n  p yes\n");
        let Expr::Markup(markup) = returned(&program) else {
            panic!("expected markup");
        };
        assert!(matches!(
            markup.as_ref(),
            Markup::Fragment(f) if matches!(f.children.as_slice(), [MarkupChild::ExpressionContainer(Expr::Conditional { .. })])
        ));
    }

    #[test]
    fn test_layout_params() {
        let (program, _) = assemble_source("base.pug", "div\n  block slot1\n  block slot2\n");
        assert_eq!(
            program.component.params,
            vec![Param::Destructured(vec![
                ("slot1".into(), "Slot1".into()),
                ("slot2".into(), "Slot2".into()),
            ])]
        );
    }

    #[test]
    fn test_slot_filler() {
        let (program, diagnostics) = assemble_source(
            "sub.pug",
            "extends base\nblock slot1\n  p one\np stray\nblock append slot1\n  p two\n",
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, DiagnosticCode::IgnoredContentOutsideBlock);
        assert_eq!(program.imports.len(), 1);

        let Stmt::Const { name, init } = &program.component.body[0] else {
            panic!("expected a slot binding");
        };
        assert_eq!(name, "Slot1");
        let Expr::Arrow { body: ArrowBody::Block(body), .. } = init else {
            panic!("expected an arrow");
        };
        let [Stmt::Return(Expr::Markup(markup))] = body.as_slice() else {
            panic!("expected a return");
        };
        assert!(matches!(markup.as_ref(), Markup::Fragment(f) if f.children.len() == 2));

        let Expr::Markup(markup) = returned(&program) else {
            panic!("expected markup");
        };
        let Markup::Element(base) = markup.as_ref() else {
            panic!("expected the base element");
        };
        assert_eq!(base.name, "Base");
        assert_eq!(
            base.attributes,
            vec![JsxAttribute::Attribute {
                name: "slot1".into(),
                value: Some(Expr::Ident("Slot1".into())),
            }]
        );
    }
}
