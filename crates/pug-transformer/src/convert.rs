//! Batch conversion of template files.

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use pug_parser::{load_file, LoadOptions};

use crate::diagnostic::Diagnostic;
use crate::error::ConvertError;
use crate::linker::LinkRegistry;
use crate::markup::Program;
use crate::{transform, TransformOptions};

/// Options for a batch conversion.
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// Root for absolute `include`/`extends` paths.
    pub basedir: Option<Utf8PathBuf>,
}

/// The converted form of one file.
#[derive(Debug, Clone)]
pub struct FileOutput {
    /// The generated module.
    pub code: String,
    /// The target tree the code was printed from.
    pub program: Program,
    /// Constructs that were skipped.
    pub warnings: Vec<Diagnostic>,
    /// The template text the warning spans point into.
    pub source: String,
}

/// The result of a batch conversion.
#[derive(Debug)]
pub struct ConvertOutput {
    /// One entry per input path, in input order.
    pub files: IndexMap<Utf8PathBuf, Result<FileOutput, ConvertError>>,
    /// Linking metadata of every file that loaded.
    pub registry: LinkRegistry,
}

impl ConvertOutput {
    /// Returns the number of files that failed.
    pub fn failure_count(&self) -> usize {
        self.files.values().filter(|result| result.is_err()).count()
    }

    /// Returns the number of warnings across converted files.
    pub fn warning_count(&self) -> usize {
        self.files
            .values()
            .filter_map(|result| result.as_ref().ok())
            .map(|output| output.warnings.len())
            .sum()
    }
}

/// Converts files one at a time, in order.
///
/// A failure is recorded for its file and does not stop the batch.
pub fn convert<P: AsRef<Utf8Path>>(paths: &[P], options: &ConvertOptions) -> ConvertOutput {
    let mut registry = LinkRegistry::new();
    let mut files = IndexMap::with_capacity(paths.len());

    for path in paths {
        let path = path.as_ref();
        log::info!("converting {path}");
        let result = convert_file(path, options, &mut registry);
        if let Err(err) = &result {
            log::error!("{err}");
        }
        files.insert(path.to_owned(), result);
    }

    ConvertOutput { files, registry }
}

fn convert_file(
    path: &Utf8Path,
    options: &ConvertOptions,
    registry: &mut LinkRegistry,
) -> Result<FileOutput, ConvertError> {
    let loaded = load_file(
        path,
        &LoadOptions {
            basedir: options.basedir.clone(),
        },
    )?;

    let result = transform(
        &loaded.document,
        registry,
        TransformOptions {
            filename: Some(loaded.path.clone()),
        },
    )
    .map_err(|err| ConvertError::transform(err, loaded.path, loaded.source.clone()))?;

    Ok(FileOutput {
        code: result.code,
        program: result.program,
        warnings: result.warnings,
        source: loaded.source,
    })
}
