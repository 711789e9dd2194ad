//! Desugaring of `if`, `case` and `each` into JSX expressions.
//!
//! Each function takes children that are already translated and normalized
//! into markup children.

use smol_str::SmolStr;

use crate::expr::EmbeddedExpr;
use crate::markup::{ArrowBody, Expr, Fragment, MarkupChild, Param, Stmt, SwitchCase};

/// Builds the value of one conditional branch.
///
/// An empty branch is `null`; an empty fragment is not a valid ternary arm.
pub fn branch(children: Vec<MarkupChild>) -> Expr {
    if children.is_empty() {
        Expr::Null
    } else {
        Expr::fragment(children)
    }
}

/// `test ? <>consequent</> : alternate`
pub fn desugar_conditional(
    test: EmbeddedExpr,
    consequent: Vec<MarkupChild>,
    alternate: Option<Expr>,
) -> Expr {
    Expr::Conditional {
        test: Box::new(Expr::Embedded(test)),
        consequent: Box::new(branch(consequent)),
        alternate: Box::new(alternate.unwrap_or(Expr::Null)),
    }
}

/// `<>{(() => { switch (subject) { ... } })()}</>`
///
/// Case bodies are expected to end in `return` so no branch falls through
/// unless it is empty.
pub fn desugar_case(subject: EmbeddedExpr, cases: Vec<SwitchCase>) -> Fragment {
    let switch = Stmt::Switch {
        subject: Expr::Embedded(subject),
        cases,
    };
    Fragment::new(vec![MarkupChild::ExpressionContainer(Expr::iife(vec![
        switch,
    ]))])
}

/// `<>{collection.map((item, key) => <>children</>)}</>`
pub fn desugar_each(
    collection: EmbeddedExpr,
    item: SmolStr,
    key: Option<SmolStr>,
    children: Vec<MarkupChild>,
) -> Fragment {
    let mut params = vec![Param::Ident(item)];
    params.extend(key.map(Param::Ident));

    let map = Expr::Call {
        callee: Box::new(Expr::Member {
            object: Box::new(Expr::Embedded(collection)),
            property: SmolStr::new_static("map"),
        }),
        args: vec![Expr::Arrow {
            params,
            body: ArrowBody::Expr(Box::new(Expr::fragment(children))),
        }],
    };
    Fragment::new(vec![MarkupChild::ExpressionContainer(map)])
}
