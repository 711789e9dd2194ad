//! Loads templates from disk and resolves `include`/`extends` references.

use camino::{Utf8Path, Utf8PathBuf};

use crate::ast::*;
use crate::error::LoadError;
use crate::{parse_with_options, ParseOptions};

/// Options for loading templates.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Root for absolute references such as `include /partials/nav`.
    /// Defaults to the directory of the loaded file.
    pub basedir: Option<Utf8PathBuf>,
}

/// A template read from disk with every reference resolved.
#[derive(Debug, Clone)]
pub struct LoadedFile {
    /// The path the file was read from.
    pub path: Utf8PathBuf,
    /// The file contents.
    pub source: String,
    /// The parsed document.
    pub document: Document,
}

/// Reads, parses and resolves a template.
pub fn load_file(path: &Utf8Path, options: &LoadOptions) -> Result<LoadedFile, LoadError> {
    let source = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_owned(),
        source,
    })?;

    let result = parse_with_options(
        &source,
        ParseOptions {
            filename: Some(path.to_owned()),
        },
    );
    if !result.errors.is_empty() {
        return Err(LoadError::Parse {
            path: path.to_owned(),
            source_text: source,
            errors: result.errors,
        });
    }

    let mut document = result.document;
    let resolver = Resolver::new(path, options);
    resolver.resolve_all(&mut document.nodes)?;

    log::debug!("loaded {path}");

    Ok(LoadedFile {
        path: path.to_owned(),
        source,
        document,
    })
}

struct Resolver<'a> {
    file: &'a Utf8Path,
    dir: Utf8PathBuf,
    basedir: Utf8PathBuf,
}

impl<'a> Resolver<'a> {
    fn new(file: &'a Utf8Path, options: &LoadOptions) -> Self {
        let dir = file
            .parent()
            .map(Utf8Path::to_path_buf)
            .unwrap_or_default();
        let basedir = options.basedir.clone().unwrap_or_else(|| dir.clone());
        Self { file, dir, basedir }
    }

    /// Computes the on-disk path for a reference.
    fn candidate(&self, reference: &str, pug: bool) -> Utf8PathBuf {
        let mut candidate = match reference.strip_prefix('/') {
            Some(rooted) => self.basedir.join(rooted),
            None => self.dir.join(reference),
        };
        if pug && candidate.extension().is_none() {
            candidate.set_extension("pug");
        }
        candidate
    }

    fn resolve(&self, file: &mut FileReference, span: Span, pug: bool) -> Result<(), LoadError> {
        let candidate = self.candidate(&file.path, pug);
        if !candidate.is_file() {
            return Err(LoadError::UnresolvedReference {
                from: self.file.to_owned(),
                reference: file.path.clone(),
                candidate,
                span,
            });
        }
        file.resolved = Some(candidate);
        Ok(())
    }

    fn resolve_all(&self, nodes: &mut [SourceNode]) -> Result<(), LoadError> {
        for node in nodes {
            match node {
                SourceNode::Include(include) => self.resolve(&mut include.file, include.span, true)?,
                SourceNode::Extends(extends) => self.resolve(&mut extends.file, extends.span, true)?,
                SourceNode::RawInclude(raw) => self.resolve(&mut raw.file, raw.span, false)?,
                SourceNode::Conditional(conditional) => self.resolve_conditional(conditional)?,
                SourceNode::Case(case) => {
                    for when in &mut case.whens {
                        if let Some(block) = &mut when.block {
                            self.resolve_all(block)?;
                        }
                    }
                }
                other => {
                    if let Some(children) = other.children_mut() {
                        self.resolve_all(children)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn resolve_conditional(&self, conditional: &mut Conditional) -> Result<(), LoadError> {
        self.resolve_all(&mut conditional.consequent)?;
        match &mut conditional.alternate {
            Some(Alternate::Else(block)) => self.resolve_all(&mut block.nodes),
            Some(Alternate::ElseIf(next)) => self.resolve_conditional(next),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn utf8(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir")
    }

    #[test]
    fn test_resolves_relative_references() {
        let temp = TempDir::new().unwrap();
        let root = utf8(&temp);
        fs::create_dir_all(root.join("partials")).unwrap();
        fs::write(root.join("layout.pug"), "block content").unwrap();
        fs::write(root.join("partials/nav.pug"), "nav").unwrap();
        fs::write(
            root.join("page.pug"),
            "extends layout\nblock content\n  include partials/nav",
        )
        .unwrap();

        let loaded = load_file(&root.join("page.pug"), &LoadOptions::default()).unwrap();
        let extends = loaded.document.extends().unwrap();
        assert_eq!(extends.file.resolved, Some(root.join("layout.pug")));

        let block = loaded.document.named_blocks().next().unwrap();
        match &block.nodes[0] {
            SourceNode::Include(include) => {
                assert_eq!(include.file.resolved, Some(root.join("partials/nav.pug")));
            }
            other => panic!("expected include, got {}", other.kind()),
        }
    }

    #[test]
    fn test_absolute_references_use_basedir() {
        let temp = TempDir::new().unwrap();
        let root = utf8(&temp);
        fs::create_dir_all(root.join("views")).unwrap();
        fs::write(root.join("header.pug"), "h1 Title").unwrap();
        fs::write(root.join("views/index.pug"), "include /header").unwrap();

        let options = LoadOptions {
            basedir: Some(root.clone()),
        };
        let loaded = load_file(&root.join("views/index.pug"), &options).unwrap();
        match &loaded.document.nodes[0] {
            SourceNode::Include(include) => {
                assert_eq!(include.file.resolved, Some(root.join("header.pug")));
            }
            other => panic!("expected include, got {}", other.kind()),
        }
    }

    #[test]
    fn test_missing_reference_fails() {
        let temp = TempDir::new().unwrap();
        let root = utf8(&temp);
        fs::write(root.join("index.pug"), "if ok\n  include missing").unwrap();

        let error = load_file(&root.join("index.pug"), &LoadOptions::default()).unwrap_err();
        match error {
            LoadError::UnresolvedReference {
                reference,
                candidate,
                ..
            } => {
                assert_eq!(reference, "missing");
                assert_eq!(candidate, root.join("missing.pug"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_errors_are_reported() {
        let temp = TempDir::new().unwrap();
        let root = utf8(&temp);
        fs::write(root.join("bad.pug"), "else\n  p x").unwrap();

        let error = load_file(&root.join("bad.pug"), &LoadOptions::default()).unwrap_err();
        assert!(matches!(error, LoadError::Parse { ref errors, .. } if errors.len() == 1));
    }

    #[test]
    fn test_unreadable_file() {
        let error = load_file(
            Utf8Path::new("/definitely/not/here.pug"),
            &LoadOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(error, LoadError::Io { .. }));
    }
}
