use std::fs;

use camino::Utf8PathBuf;
use pug_parser::parse;
use pug_transformer::{transform, LinkRegistry, TransformOptions};

fn main() {
    let path = std::env::args()
        .nth(1)
        .expect("Usage: emit_jsx <file.pug>");
    let source = fs::read_to_string(&path).expect("Failed to read file");
    let parsed = parse(&source);
    for error in &parsed.errors {
        eprintln!("parse error: {error}");
    }

    let mut registry = LinkRegistry::new();
    let result = transform(
        &parsed.document,
        &mut registry,
        TransformOptions {
            filename: Some(Utf8PathBuf::from(path)),
        },
    )
    .expect("Failed to transform");

    for warning in &result.warnings {
        eprintln!("warning: {}", warning.message);
    }
    println!("{}", result.code);
}
