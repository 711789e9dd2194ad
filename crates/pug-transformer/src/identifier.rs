//! Identifier derivation for module bindings and slot names.

use camino::Utf8Path;

/// Applies IdentifierCasing: splits on `-` and `_`, capitalizes the first
/// letter of each segment, lowercases the rest, and joins the segments.
///
/// Characters that cannot appear in a JavaScript identifier are dropped, and
/// a leading digit is prefixed with `_`.
pub fn identifier_casing(name: &str) -> String {
    let mut result = String::with_capacity(name.len());

    for segment in name.split(['-', '_']) {
        let mut chars = segment
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '$');
        if let Some(first) = chars.next() {
            result.extend(first.to_uppercase());
            for c in chars {
                result.extend(c.to_lowercase());
            }
        }
    }

    if result.starts_with(|c: char| c.is_ascii_digit()) {
        result.insert(0, '_');
    }
    if result.is_empty() {
        "Component".to_string()
    } else {
        result
    }
}

/// Returns the path of a reference with a trailing `.pug` removed.
pub fn strip_pug_extension(path: &str) -> &str {
    path.strip_suffix(".pug").unwrap_or(path)
}

/// Returns the base name of a reference, without directories or `.pug`.
pub fn base_name(path: &str) -> &str {
    let stripped = strip_pug_extension(path);
    stripped.rsplit('/').next().unwrap_or(stripped)
}

/// Derives the binding name for a file.
pub fn module_identifier(path: &Utf8Path) -> String {
    identifier_casing(base_name(path.as_str()))
}
