//! JSX code generation.
//!
//! Prints a [`Program`] as an ES module with two-space indentation. Every
//! printing function returns text whose first line starts at the caller's
//! cursor and whose following lines carry their own indentation.

use crate::expr::Precedence;
use crate::markup::{
    ArrowBody, Element, Expr, JsxAttribute, Markup, MarkupChild, Param, Program, Stmt,
};

const INDENT: &str = "  ";

/// Prints a program as JavaScript with JSX.
pub fn print_program(program: &Program) -> String {
    let mut output = String::new();

    for import in &program.imports {
        output.push_str(&format!(
            "import {{ {} }} from {};\n",
            import.name,
            string_literal(&import.path)
        ));
    }
    if !program.imports.is_empty() {
        output.push('\n');
    }

    let component = &program.component;
    output.push_str(&format!(
        "export const {} = ({}) => {{\n",
        component.name,
        print_params(&component.params)
    ));
    for stmt in &component.body {
        output.push_str(INDENT);
        output.push_str(&print_stmt(stmt, 1));
        output.push('\n');
    }
    output.push_str("};\n");

    output
}

fn pad(level: usize) -> String {
    INDENT.repeat(level)
}

fn print_stmt(stmt: &Stmt, level: usize) -> String {
    match stmt {
        Stmt::Raw(source) => {
            let source = source.trim_end();
            if source.ends_with(';') {
                source.to_string()
            } else {
                format!("{source};")
            }
        }
        Stmt::Expr(expr) => format!("{};", print_expr(expr, level, Precedence::Sequence)),
        Stmt::Const { name, init } => {
            format!("const {name} = {};", print_expr(init, level, Precedence::Assignment))
        }
        Stmt::Switch { subject, cases } => {
            let mut output = format!(
                "switch ({}) {{",
                print_expr(subject, level, Precedence::Sequence)
            );
            for case in cases {
                output.push('\n');
                output.push_str(&pad(level + 1));
                match &case.test {
                    Some(test) => output.push_str(&format!(
                        "case {}:",
                        print_expr(test, level + 1, Precedence::Sequence)
                    )),
                    None => output.push_str("default:"),
                }
                for stmt in &case.body {
                    output.push('\n');
                    output.push_str(&pad(level + 2));
                    output.push_str(&print_stmt(stmt, level + 2));
                }
            }
            output.push('\n');
            output.push_str(&pad(level));
            output.push('}');
            output
        }
        Stmt::Return(expr) => format!("return {};", print_expr(expr, level, Precedence::Sequence)),
    }
}

/// Prints an expression, parenthesized when it binds looser than `required`.
fn print_expr(expr: &Expr, level: usize, required: Precedence) -> String {
    let (text, precedence) = match expr {
        Expr::Embedded(embedded) => (embedded.source.clone(), embedded.precedence),
        Expr::Null => ("null".to_string(), Precedence::Primary),
        Expr::Str(value) => (string_literal(value), Precedence::Primary),
        Expr::Ident(name) => (name.to_string(), Precedence::Primary),
        Expr::Object(entries) => (print_object(entries, level), Precedence::Primary),
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => (
            format!(
                "{} ? {} : {}",
                print_expr(test, level, Precedence::Binary),
                print_expr(consequent, level, Precedence::Assignment),
                print_expr(alternate, level, Precedence::Assignment)
            ),
            Precedence::Conditional,
        ),
        Expr::Call { callee, args } => {
            let args = args
                .iter()
                .map(|arg| print_expr(arg, level, Precedence::Assignment))
                .collect::<Vec<_>>()
                .join(", ");
            (
                format!("{}({args})", print_expr(callee, level, Precedence::Primary)),
                Precedence::Primary,
            )
        }
        Expr::Member { object, property } => (
            format!("{}.{property}", print_expr(object, level, Precedence::Primary)),
            Precedence::Primary,
        ),
        Expr::Arrow { params, body } => {
            let body = match body {
                ArrowBody::Expr(expr) if matches!(expr.as_ref(), Expr::Object(_)) => {
                    format!("({})", print_expr(expr, level, Precedence::Assignment))
                }
                ArrowBody::Expr(expr) => print_expr(expr, level, Precedence::Assignment),
                ArrowBody::Block(stmts) => print_block(stmts, level),
            };
            (
                format!("({}) => {body}", print_params(params)),
                Precedence::Assignment,
            )
        }
        Expr::Markup(markup) => (print_markup(markup, level, false), Precedence::Primary),
    };

    if precedence < required {
        format!("({text})")
    } else {
        text
    }
}

fn print_block(stmts: &[Stmt], level: usize) -> String {
    if stmts.is_empty() {
        return "{}".to_string();
    }
    let mut output = String::from("{");
    for stmt in stmts {
        output.push('\n');
        output.push_str(&pad(level + 1));
        output.push_str(&print_stmt(stmt, level + 1));
    }
    output.push('\n');
    output.push_str(&pad(level));
    output.push('}');
    output
}

fn print_params(params: &[Param]) -> String {
    params
        .iter()
        .map(|param| match param {
            Param::Ident(name) => name.to_string(),
            Param::Destructured(bindings) => {
                let bindings = bindings
                    .iter()
                    .map(|(key, binding)| {
                        if key == binding {
                            binding.to_string()
                        } else {
                            format!("{}: {binding}", property_key(key))
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{{ {bindings} }}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_object(entries: &[(String, Expr)], level: usize) -> String {
    if entries.is_empty() {
        return "{}".to_string();
    }
    let entries = entries
        .iter()
        .map(|(key, value)| {
            format!(
                "{}: {}",
                property_key(key),
                print_expr(value, level, Precedence::Assignment)
            )
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{ {entries} }}")
}

fn print_markup(markup: &Markup, level: usize, inline: bool) -> String {
    match markup {
        Markup::Element(element) => print_element(element, level, inline),
        Markup::Fragment(fragment) => {
            print_children("<>".to_string(), "</>", &fragment.children, level, inline)
        }
    }
}

fn print_element(element: &Element, level: usize, inline: bool) -> String {
    let mut open = format!("<{}", element.name);
    for attribute in &element.attributes {
        open.push(' ');
        open.push_str(&print_attribute(attribute, level));
    }

    if element.children.is_empty() {
        if element.self_closing {
            open.push_str(" />");
        } else {
            open.push_str(&format!("></{}>", element.name));
        }
        return open;
    }

    open.push('>');
    print_children(open, &format!("</{}>", element.name), &element.children, level, inline)
}

fn print_attribute(attribute: &JsxAttribute, level: usize) -> String {
    match attribute {
        JsxAttribute::Attribute { name, value: None } => name.to_string(),
        JsxAttribute::Attribute {
            name,
            value: Some(value),
        } => format!("{name}={{{}}}", print_expr(value, level, Precedence::Assignment)),
        JsxAttribute::Spread(expr) => {
            format!("{{...{}}}", print_expr(expr, level, Precedence::Assignment))
        }
    }
}

/// Prints children between an opening and closing tag.
///
/// Children go one per line when there is a nested element and no text.
/// Text keeps the whole subtree on one line so no whitespace is added or lost.
fn print_children(
    mut output: String,
    close: &str,
    children: &[MarkupChild],
    level: usize,
    inline: bool,
) -> String {
    if !inline && is_block_layout(children) {
        for child in children.iter().filter(|child| !child.is_blank_text()) {
            output.push('\n');
            output.push_str(&pad(level + 1));
            output.push_str(&print_child(child, level + 1, false));
        }
        output.push('\n');
        output.push_str(&pad(level));
    } else {
        for child in children {
            output.push_str(&print_child(child, level, true));
        }
    }
    output.push_str(close);
    output
}

fn is_block_layout(children: &[MarkupChild]) -> bool {
    let mut has_markup = false;
    for child in children {
        match child {
            MarkupChild::Text(text) if text.trim().is_empty() => {}
            MarkupChild::Text(_) => return false,
            MarkupChild::Element(_) | MarkupChild::Fragment(_) => has_markup = true,
            MarkupChild::ExpressionContainer(_) => {}
        }
    }
    has_markup
}

fn print_child(child: &MarkupChild, level: usize, inline: bool) -> String {
    match child {
        MarkupChild::Text(text) => {
            if text.contains(['{', '}', '<', '>']) {
                format!("{{{}}}", string_literal(text))
            } else {
                text.clone()
            }
        }
        MarkupChild::Element(element) => print_element(element, level, inline),
        MarkupChild::Fragment(fragment) => {
            print_children("<>".to_string(), "</>", &fragment.children, level, inline)
        }
        MarkupChild::ExpressionContainer(expr) => {
            format!("{{{}}}", print_expr(expr, level, Precedence::Assignment))
        }
    }
}

fn string_literal(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn property_key(key: &str) -> String {
    if is_identifier(key) {
        key.to_string()
    } else {
        string_literal(key)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::EmbeddedExpr;
    use crate::markup::{Component, Fragment, Import, SwitchCase};
    use pretty_assertions::assert_eq;

    fn embedded(source: &str, precedence: Precedence) -> Expr {
        Expr::Embedded(EmbeddedExpr {
            source: source.to_string(),
            precedence,
        })
    }

    fn element(name: &str, children: Vec<MarkupChild>) -> Element {
        Element {
            name: name.into(),
            attributes: Vec::new(),
            children,
            self_closing: false,
        }
    }

    fn program(body: Vec<Stmt>) -> Program {
        Program {
            imports: Vec::new(),
            component: Component {
                name: "View".into(),
                params: Vec::new(),
                body,
            },
        }
    }

    #[test]
    fn test_print_fragment_return() {
        let button = Element {
            name: "button".into(),
            attributes: vec![
                JsxAttribute::Attribute {
                    name: "type".into(),
                    value: Some(embedded("'button'", Precedence::Primary)),
                },
                JsxAttribute::Attribute {
                    name: "disabled".into(),
                    value: None,
                },
            ],
            children: Vec::new(),
            self_closing: false,
        };
        let program = program(vec![
            Stmt::Raw("var size = 'lg'".to_string()),
            Stmt::Return(Expr::fragment(vec![
                MarkupChild::Element(button),
                MarkupChild::Text(" ".to_string()),
                MarkupChild::Element(Element::self_closing("hr")),
            ])),
        ]);

        assert_eq!(
            print_program(&program),
            "export const View = () => {\n  var size = 'lg';\n  return <>\n    <button type={'button'} disabled></button>\n    <hr />\n  </>;\n};\n"
        );
    }

    #[test]
    fn test_print_imports_and_params() {
        let program = Program {
            imports: vec![Import {
                name: "Base".into(),
                path: "layouts/base".to_string(),
            }],
            component: Component {
                name: "Page".into(),
                params: vec![Param::Destructured(vec![
                    ("main-content".into(), "MainContent".into()),
                    ("aside".into(), "aside".into()),
                ])],
                body: vec![Stmt::Return(Expr::Null)],
            },
        };

        assert_eq!(
            print_program(&program),
            "import { Base } from \"layouts/base\";\n\nexport const Page = ({ \"main-content\": MainContent, aside }) => {\n  return null;\n};\n"
        );
    }

    #[test]
    fn test_text_keeps_element_inline() {
        let p = element(
            "p",
            vec![
                MarkupChild::Text("Hello".to_string()),
                MarkupChild::Text(" ".to_string()),
                MarkupChild::Element(element("b", vec![MarkupChild::Text("a < b".to_string())])),
            ],
        );
        assert_eq!(
            print_markup(&Markup::Element(p), 0, false),
            "<p>Hello <b>{\"a < b\"}</b></p>"
        );
    }

    #[test]
    fn test_print_conditional_parens() {
        let expr = Expr::Conditional {
            test: Box::new(embedded("a ? b : c", Precedence::Conditional)),
            consequent: Box::new(Expr::Str("x".to_string())),
            alternate: Box::new(Expr::Null),
        };
        assert_eq!(
            print_expr(&expr, 0, Precedence::Assignment),
            "(a ? b : c) ? \"x\" : null"
        );
        assert_eq!(
            print_child(&MarkupChild::ExpressionContainer(embedded("a, b", Precedence::Sequence)), 0, false),
            "{(a, b)}"
        );
    }

    #[test]
    fn test_print_each_map() {
        let map = Expr::Call {
            callee: Box::new(Expr::Member {
                object: Box::new(embedded("a || b", Precedence::Binary)),
                property: "map".into(),
            }),
            args: vec![Expr::Arrow {
                params: vec![Param::Ident("item".into()), Param::Ident("i".into())],
                body: ArrowBody::Expr(Box::new(Expr::fragment(vec![MarkupChild::Element(
                    element("li", vec![MarkupChild::ExpressionContainer(embedded("item", Precedence::Primary))]),
                )]))),
            }],
        };
        let fragment = Markup::Fragment(Fragment::new(vec![MarkupChild::ExpressionContainer(map)]));
        assert_eq!(
            print_markup(&fragment, 1, false),
            "<>{(a || b).map((item, i) => <>\n    <li>{item}</li>\n  </>)}</>"
        );
    }

    #[test]
    fn test_print_switch_iife() {
        let switch = Stmt::Switch {
            subject: embedded("kind", Precedence::Primary),
            cases: vec![
                SwitchCase {
                    test: Some(embedded("'a'", Precedence::Primary)),
                    body: Vec::new(),
                },
                SwitchCase {
                    test: None,
                    body: vec![Stmt::Return(Expr::Null)],
                },
            ],
        };
        assert_eq!(
            print_expr(&Expr::iife(vec![switch]), 0, Precedence::Assignment),
            "(() => {\n  switch (kind) {\n    case 'a':\n    default:\n      return null;\n  }\n})()"
        );
    }

    #[test]
    fn test_print_style_object() {
        let attribute = JsxAttribute::Attribute {
            name: "style".into(),
            value: Some(Expr::Object(vec![
                ("color".to_string(), Expr::Str("red".to_string())),
                ("font-size".to_string(), Expr::Str("12px".to_string())),
            ])),
        };
        assert_eq!(
            print_attribute(&attribute, 0),
            "style={{ color: \"red\", \"font-size\": \"12px\" }}"
        );
    }
}
