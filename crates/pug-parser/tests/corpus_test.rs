//! Corpus tests that parse all fixture files to ensure no panics,
//! that valid fixtures produce no errors and invalid ones are reported.

use std::fs;
use std::path::PathBuf;

use pug_parser::{parse, ParseErrorKind, SourceNode};

fn get_fixtures_dir() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir)
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("test-fixtures")
}

fn collect_pug_files(dir: &std::path::Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "pug") {
                files.push(path);
            } else if path.is_dir() {
                files.extend(collect_pug_files(&path));
            }
        }
    }
    files.sort();
    files
}

#[test]
fn test_parse_all_valid_fixtures() {
    let files = collect_pug_files(&get_fixtures_dir().join("valid"));
    assert!(!files.is_empty(), "No valid fixtures found");

    for path in &files {
        let source = fs::read_to_string(path).expect("Failed to read file");
        let filename = path.file_name().unwrap().to_string_lossy();

        let result = parse(&source);

        assert!(
            result.errors.is_empty(),
            "Valid fixture {} should have no errors, but got: {:?}",
            filename,
            result.errors
        );
        assert!(
            !result.document.nodes.is_empty(),
            "Valid fixture {} should produce some content",
            filename
        );
    }
}

#[test]
fn test_parse_all_project_fixtures() {
    let files = collect_pug_files(&get_fixtures_dir().join("projects"));
    assert!(!files.is_empty(), "No project fixtures found");

    for path in &files {
        let source = fs::read_to_string(path).expect("Failed to read file");
        let result = parse(&source);
        assert!(
            result.errors.is_empty(),
            "Project fixture {} should have no errors, but got: {:?}",
            path.display(),
            result.errors
        );
    }
}

#[test]
fn test_parse_all_invalid_fixtures() {
    let files = collect_pug_files(&get_fixtures_dir().join("invalid"));
    assert!(!files.is_empty(), "No invalid fixtures found");

    for path in &files {
        let source = fs::read_to_string(path).expect("Failed to read file");
        let filename = path.file_name().unwrap().to_string_lossy();

        let result = parse(&source);

        assert!(
            !result.errors.is_empty(),
            "Invalid fixture {} should report an error",
            filename
        );
    }
}

#[test]
fn test_specific_invalid_fixtures() {
    let fixtures_dir = get_fixtures_dir().join("invalid");

    let cases: &[(&str, fn(&ParseErrorKind) -> bool)] = &[
        ("orphan-else.pug", |kind| matches!(kind, ParseErrorKind::OrphanElse)),
        ("orphan-when.pug", |kind| {
            matches!(kind, ParseErrorKind::OrphanWhen { .. })
        }),
        ("bad-indentation.pug", |kind| {
            matches!(kind, ParseErrorKind::InconsistentIndentation { .. })
        }),
    ];

    for (fixture_name, expected) in cases {
        let source = fs::read_to_string(fixtures_dir.join(fixture_name)).expect("Failed to read file");
        let result = parse(&source);
        assert!(
            result.errors.iter().any(|error| expected(&error.kind)),
            "Fixture {} reported unexpected errors: {:?}",
            fixture_name,
            result.errors
        );
    }
}

#[test]
fn test_edge_cases() {
    let edge_cases = [
        "",
        "   ",
        "\t\t\n",
        "div(",
        "p= ",
        "#{",
        "a(href='",
        "each",
        "case",
        "mixin",
        "+",
        "include",
        "|",
        ".",
        "- ",
        "if",
    ];

    for source in edge_cases {
        let _result = parse(source);
    }
}

#[test]
fn test_stress_deeply_nested() {
    let mut source = String::new();
    for depth in 0..50 {
        source.push_str(&"  ".repeat(depth));
        source.push_str("div\n");
    }
    source.push_str(&"  ".repeat(50));
    source.push_str("p deep\n");

    let result = parse(&source);
    assert!(
        result.errors.is_empty(),
        "Deep nesting should parse: {:?}",
        result.errors
    );
}

#[test]
fn test_stress_many_siblings() {
    let mut source = String::new();
    for i in 0..100 {
        source.push_str(&format!("div(id='{}') content\n", i));
    }

    let result = parse(&source);
    assert!(
        result.errors.is_empty(),
        "Many siblings should parse: {:?}",
        result.errors
    );
    assert_eq!(result.document.nodes.len(), 100, "Should have 100 nodes");
    assert!(result
        .document
        .nodes
        .iter()
        .all(|node| matches!(node, SourceNode::Tag(_))));
}

#[test]
fn test_stress_long_expression() {
    let expr = "a".repeat(1000);
    let source = format!("p= {}\n", expr);

    let result = parse(&source);
    assert!(result.errors.is_empty());
}
