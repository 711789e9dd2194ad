//! Cross-file bookkeeping: module identifiers, imports and slot roles.

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use pug_parser::{Alternate, Document, FileReference, SourceNode};
use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use crate::identifier::{base_name, identifier_casing, module_identifier, strip_pug_extension};
use crate::markup::Import;

/// Per-file linking metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContext {
    /// The template path.
    pub module_path: Utf8PathBuf,
    /// The exported binding name.
    pub module_identifier: SmolStr,
    /// Set when the file declares named blocks and does not extend, making it a
    /// layout that receives slot components.
    pub module_name: Option<SmolStr>,
    /// Set when the file extends a layout and fills its named blocks.
    pub base_module_name: Option<SmolStr>,
    /// Declared block names in source order, without duplicates.
    pub slots: Vec<SmolStr>,
}

/// How a file takes part in block composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRole<'a> {
    /// No composition.
    Standalone,
    /// Declares slots.
    Layout,
    /// Supplies slot content to the named base component.
    SlotFiller {
        /// The base component identifier.
        base: &'a str,
    },
}

impl FileContext {
    /// Scans a document's top-level nodes and declared blocks.
    pub fn scan(module_path: &Utf8Path, module_identifier: SmolStr, document: &Document) -> Self {
        let mut slots = Vec::new();
        collect_block_names(&document.nodes, &mut slots, &mut FxHashSet::default());

        let mut context = Self {
            module_path: module_path.to_owned(),
            module_identifier,
            module_name: None,
            base_module_name: None,
            slots,
        };

        match document.extends() {
            Some(extends) if document.named_blocks().next().is_some() => {
                context.base_module_name = Some(import_for(&extends.file).name);
            }
            Some(_) => {}
            None if !context.slots.is_empty() => {
                context.module_name = Some(context.module_identifier.clone());
            }
            None => {}
        }

        context
    }

    /// Creates the context of a template file.
    pub fn for_file(path: &Utf8Path, document: &Document) -> Self {
        Self::scan(path, module_identifier(path).into(), document)
    }

    /// Returns the composition role recorded for this file.
    pub fn role(&self) -> FileRole<'_> {
        if let Some(base) = &self.base_module_name {
            FileRole::SlotFiller { base: base.as_str() }
        } else if self.module_name.is_some() {
            FileRole::Layout
        } else {
            FileRole::Standalone
        }
    }
}

/// Metadata for every file converted in one batch, keyed by path.
#[derive(Debug, Clone, Default)]
pub struct LinkRegistry {
    files: IndexMap<Utf8PathBuf, FileContext>,
}

impl LinkRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a file's context. A path is recorded once; later inserts are
    /// ignored.
    pub fn insert(&mut self, context: FileContext) {
        self.files
            .entry(context.module_path.clone())
            .or_insert(context);
    }

    /// Returns the context recorded for a path.
    pub fn get(&self, path: &Utf8Path) -> Option<&FileContext> {
        self.files.get(path)
    }

    /// Iterates over recorded files in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &FileContext> {
        self.files.values()
    }

    /// Returns the number of recorded files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns true if no file has been recorded.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Builds the import binding for an `include` or `extends` reference.
pub fn import_for(reference: &FileReference) -> Import {
    Import {
        name: identifier_casing(base_name(&reference.path)).into(),
        path: strip_pug_extension(&reference.path).to_string(),
    }
}

/// Returns the component identifier of a block name.
pub fn slot_identifier(block: &str) -> SmolStr {
    identifier_casing(block).into()
}

fn collect_block_names(
    nodes: &[SourceNode],
    names: &mut Vec<SmolStr>,
    seen: &mut FxHashSet<SmolStr>,
) {
    for node in nodes {
        match node {
            SourceNode::NamedBlock(block) => {
                if seen.insert(block.name.clone()) {
                    names.push(block.name.clone());
                }
                collect_block_names(&block.nodes, names, seen);
            }
            SourceNode::Tag(tag) => collect_block_names(&tag.children, names, seen),
            SourceNode::Block(block) => collect_block_names(&block.nodes, names, seen),
            SourceNode::Each(each) => collect_block_names(&each.body, names, seen),
            SourceNode::Conditional(conditional) => {
                collect_block_names(&conditional.consequent, names, seen);
                let mut alternate = conditional.alternate.as_ref();
                while let Some(branch) = alternate {
                    match branch {
                        Alternate::Else(block) => {
                            collect_block_names(&block.nodes, names, seen);
                            alternate = None;
                        }
                        Alternate::ElseIf(next) => {
                            collect_block_names(&next.consequent, names, seen);
                            alternate = next.alternate.as_ref();
                        }
                    }
                }
            }
            SourceNode::Case(case) => {
                for when in &case.whens {
                    if let Some(block) = &when.block {
                        collect_block_names(block, names, seen);
                    }
                }
            }
            _ => {}
        }
    }
}
