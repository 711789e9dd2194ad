//! Pug to JSX component transformation.
//!
//! This crate turns a parsed Pug document into a JSX module exporting one
//! component. It handles:
//! - Translating elements, text and attributes into JSX
//! - Desugaring `if`, `case` and `each` into expressions
//! - Emitting imports for `include` and `extends`
//! - Passing named blocks between layouts and the files that extend them
//!
//! # Example
//!
//! ```
//! use pug_parser::parse;
//! use pug_transformer::{transform, LinkRegistry, TransformOptions};
//!
//! let source = "ul\n  each item in items\n    li= item\n";
//!
//! let parsed = parse(source);
//! let mut registry = LinkRegistry::new();
//! let result = transform(&parsed.document, &mut registry, TransformOptions::default()).unwrap();
//! assert!(result.code.starts_with("export const Template = () => {"));
//! ```

mod attributes;
mod codegen;
mod control_flow;
mod convert;
mod diagnostic;
mod error;
mod expr;
mod identifier;
mod linker;
mod markup;
mod program;
mod walk;

pub use codegen::print_program;
pub use convert::{convert, ConvertOptions, ConvertOutput, FileOutput};
pub use diagnostic::{Diagnostic, DiagnosticCode, Severity};
pub use error::{ConvertError, TransformError};
pub use expr::{EmbeddedExpr, Precedence};
pub use identifier::identifier_casing;
pub use linker::{FileContext, FileRole, LinkRegistry};
pub use markup::{
    ArrowBody, Component, Element, Expr, Fragment, Import, JsxAttribute, Markup, MarkupChild,
    Param, Program, Stmt, SwitchCase, TargetNode,
};

use camino::{Utf8Path, Utf8PathBuf};

/// Options for transformation.
#[derive(Debug, Clone, Default)]
pub struct TransformOptions {
    /// The template path. Names the exported component and keys the registry
    /// entry; without it the component is named `Template` and nothing is
    /// recorded.
    pub filename: Option<Utf8PathBuf>,
}

/// The result of transformation.
#[derive(Debug, Clone)]
pub struct TransformResult {
    /// The target tree.
    pub program: Program,
    /// The generated JSX module.
    pub code: String,
    /// Constructs that were skipped.
    pub warnings: Vec<Diagnostic>,
    /// The file's linking metadata.
    pub context: FileContext,
}

/// Transforms a parsed document into a JSX module.
///
/// Fails on the first construct that has no translation; skipped constructs
/// are reported as warnings instead.
pub fn transform(
    document: &pug_parser::Document,
    registry: &mut LinkRegistry,
    options: TransformOptions,
) -> Result<TransformResult, TransformError> {
    let context = match &options.filename {
        Some(path) => {
            let context = FileContext::for_file(path, document);
            registry.insert(context.clone());
            context
        }
        None => FileContext::scan(Utf8Path::new(""), "Template".into(), document),
    };

    let (program, warnings) = program::assemble(&context, document)?;
    let code = print_program(&program);

    Ok(TransformResult {
        program,
        code,
        warnings,
        context,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn transform_source(source: &str, filename: &str) -> TransformResult {
        let parsed = pug_parser::parse(source);
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        let mut registry = LinkRegistry::new();
        transform(
            &parsed.document,
            &mut registry,
            TransformOptions {
                filename: Some(filename.into()),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_attribute_interpolation() {
        let source = "\
- var btnType = 'info'
- var btnSize = 'lg'
button(type='button' class='btn btn-' + btnType + ' btn-' + btnSize)
button(type='button' class=`btn btn-${btnType} btn-${btnSize}`)
";
        let result = transform_source(source, "attribute-interpolation-2.pug");
        assert_eq!(
            result.code,
            "\
export const AttributeInterpolation2 = () => {
  var btnType = 'info';
  var btnSize = 'lg';
  return <>
    <button type={'button'} className={'btn btn-' + btnType + ' btn-' + btnSize}></button>
    <button type={'button'} className={`btn btn-${btnType} btn-${btnSize}`}></button>
  </>;
};
"
        );
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_single_element() {
        let result = transform_source("a(href='/home') Home\n", "link.pug");
        assert_eq!(
            result.code,
            "export const Link = () => {\n  return <a href={'/home'}>Home</a>;\n};\n"
        );
    }

    #[test]
    fn test_each_with_key() {
        let result = transform_source("ul\n  each item, i in items\n    li= item\n", "list.pug");
        assert_eq!(
            result.code,
            "\
export const List = () => {
  return <ul>
    <>{items.map((item, i) => <>
      <li>{item}</li>
    </>)}</>
  </ul>;
};
"
        );
    }

    #[test]
    fn test_conditional() {
        let result = transform_source("if user\n  p= user.name\nelse\n  p Guest\n", "greeting.pug");
        assert_eq!(
            result.code,
            "\
export const Greeting = () => {
  return <>{user ? <>
    <p>{user.name}</p>
  </> : <>
    <p>Guest</p>
  </>}</>;
};
"
        );
    }

    #[test]
    fn test_statement_ending_in_brace_is_terminated() {
        let source = "- var o = {a: 1}\n- [1, 2].forEach(f)\n- (g || h)()\np= o.a\n";
        let result = transform_source(source, "terminated.pug");
        assert_eq!(
            result.code,
            "\
export const Terminated = () => {
  var o = {a: 1};
  [1, 2].forEach(f);
  (g || h)();
  return <p>{o.a}</p>;
};
"
        );
    }

    #[test]
    fn test_nested_include_is_not_imported() {
        for source in ["div: include header\n", "case x\n  when 1: include header\n"] {
            let parsed = pug_parser::parse(source);
            assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
            let mut registry = LinkRegistry::new();
            let result = transform(&parsed.document, &mut registry, TransformOptions::default()).unwrap();

            assert!(result.program.imports.is_empty(), "{source:?} produced an import");
            assert!(!result.code.contains("import "));
            assert_eq!(result.warnings.len(), 1);
            assert_eq!(result.warnings[0].code, DiagnosticCode::UnsupportedIncludePosition);
        }
    }

    #[test]
    fn test_registry_records_file() {
        let parsed = pug_parser::parse("p hi\n");
        let mut registry = LinkRegistry::new();
        transform(
            &parsed.document,
            &mut registry,
            TransformOptions {
                filename: Some("views/home.pug".into()),
            },
        )
        .unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.get(Utf8Path::new("views/home.pug")).is_some());
    }

    #[test]
    fn test_transform_is_deterministic() {
        let source = "case n\n  when 1\n    p one\n  default\n    p many\n";
        let first = transform_source(source, "count.pug");
        let second = transform_source(source, "count.pug");
        assert_eq!(first.program, second.program);
        assert_eq!(first.code, second.code);
    }
}
