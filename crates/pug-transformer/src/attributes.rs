//! Attribute name mapping and value classification.

use pug_parser::{Attr, AttrValue, AttributeBlock};
use smol_str::SmolStr;

use crate::error::TransformError;
use crate::expr::parse_expression;
use crate::markup::{Expr, JsxAttribute};

/// Attribute names that differ between HTML and JSX.
static RENAMED_ATTRIBUTES: &[(&str, &str)] = &[("class", "className")];

/// Maps a template attribute name to its JSX name.
pub fn map_attribute_name(name: &str) -> SmolStr {
    RENAMED_ATTRIBUTES
        .iter()
        .find(|(from, _)| *from == name)
        .map(|(_, to)| SmolStr::new_static(*to))
        .unwrap_or_else(|| SmolStr::new(name))
}

/// Translates one attribute.
pub fn translate_attribute(attr: &Attr) -> Result<JsxAttribute, TransformError> {
    Ok(JsxAttribute::Attribute {
        name: map_attribute_name(&attr.name),
        value: classify_attribute_value(attr)?,
    })
}

/// Translates an `&attributes(...)` spread.
pub fn translate_spread(block: &AttributeBlock) -> Result<JsxAttribute, TransformError> {
    Ok(JsxAttribute::Spread(Expr::Embedded(parse_expression(
        &block.value,
        block.span,
    )?)))
}

/// Classifies an attribute value.
///
/// Returns `None` for presence-only flags. A `style` string literal with no
/// `{` becomes an object literal; any other value is parsed as JavaScript.
pub fn classify_attribute_value(attr: &Attr) -> Result<Option<Expr>, TransformError> {
    let raw = match &attr.value {
        AttrValue::Boolean(_) => return Ok(None),
        AttrValue::Expr(raw) => raw,
    };

    if attr.name == "style" && !raw.contains('{') {
        if let Some(declarations) = unquote(raw.trim()) {
            return Ok(Some(style_object(declarations)));
        }
    }

    Ok(Some(Expr::Embedded(parse_expression(raw, attr.span)?)))
}

/// Returns the contents of a single string literal.
fn unquote(raw: &str) -> Option<&str> {
    let quote = raw.chars().next().filter(|c| matches!(c, '\'' | '"' | '`'))?;
    let inner = raw.strip_prefix(quote)?.strip_suffix(quote)?;
    if inner.contains(quote) || (quote == '`' && inner.contains("${")) {
        return None;
    }
    Some(inner)
}

fn style_object(declarations: &str) -> Expr {
    let entries = declarations
        .split(';')
        .filter_map(|declaration| {
            let (key, value) = declaration.split_once(':')?;
            let key = trim_quotes(key.trim());
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), Expr::Str(value.trim().to_string())))
        })
        .collect();
    Expr::Object(entries)
}

fn trim_quotes(key: &str) -> &str {
    key.trim_matches(|c| matches!(c, '\'' | '"'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Precedence;
    use pretty_assertions::assert_eq;
    use text_size::{TextRange, TextSize};

    fn attr(name: &str, value: AttrValue) -> Attr {
        Attr {
            name: name.into(),
            value,
            must_escape: true,
            span: TextRange::new(TextSize::from(0), TextSize::from(4)),
        }
    }

    fn raw(value: &str) -> AttrValue {
        AttrValue::Expr(value.to_string())
    }

    #[test]
    fn test_map_attribute_name() {
        assert_eq!(map_attribute_name("class"), "className");
        assert_eq!(map_attribute_name("href"), "href");
        assert_eq!(map_attribute_name("data-id"), "data-id");
    }

    #[test]
    fn test_boolean_is_presence_only() {
        let translated = translate_attribute(&attr("disabled", AttrValue::Boolean(true))).unwrap();
        assert_eq!(
            translated,
            JsxAttribute::Attribute {
                name: "disabled".into(),
                value: None,
            }
        );
    }

    #[test]
    fn test_value_is_embedded_expression() {
        let translated = translate_attribute(&attr("class", raw("'btn ' + size"))).unwrap();
        assert_eq!(
            translated,
            JsxAttribute::Attribute {
                name: "className".into(),
                value: Some(Expr::Embedded(crate::expr::EmbeddedExpr {
                    source: "'btn ' + size".to_string(),
                    precedence: Precedence::Binary,
                })),
            }
        );
    }

    #[test]
    fn test_style_string_becomes_object() {
        let value = classify_attribute_value(&attr(
            "style",
            raw("'color: red; \"font-size\" : 12px;;background:url(a.png)'"),
        ))
        .unwrap();
        assert_eq!(
            value,
            Some(Expr::Object(vec![
                ("color".to_string(), Expr::Str("red".to_string())),
                ("font-size".to_string(), Expr::Str("12px".to_string())),
                ("background".to_string(), Expr::Str("url(a.png)".to_string())),
            ]))
        );
    }

    #[test]
    fn test_style_object_expression_stays_live() {
        let value = classify_attribute_value(&attr("style", raw("{ color: color }"))).unwrap();
        assert!(matches!(value, Some(Expr::Embedded(_))));

        let value = classify_attribute_value(&attr("style", raw("styles.card"))).unwrap();
        assert!(matches!(value, Some(Expr::Embedded(_))));
    }

    #[test]
    fn test_malformed_value_fails() {
        let err = classify_attribute_value(&attr("href", raw("'/a' +"))).unwrap_err();
        assert!(matches!(err, TransformError::EmbeddedExpressionSyntax { .. }));
    }

    #[test]
    fn test_spread() {
        let block = AttributeBlock {
            value: "attributes".to_string(),
            span: TextRange::new(TextSize::from(0), TextSize::from(10)),
        };
        assert!(matches!(
            translate_spread(&block).unwrap(),
            JsxAttribute::Spread(Expr::Embedded(_))
        ));
    }
}
