//! Configuration loading.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::fs;
use thiserror::Error;

use crate::cli::{Args, OutputFormat};

/// Name of the project file looked up in the working directory.
pub const CONFIG_FILE: &str = "pug-to-jsx.json";

const DEFAULT_EXTENSION: &str = ".jsx";

/// Project configuration from `pug-to-jsx.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectConfig {
    /// Directory for generated modules.
    pub out_dir: Option<Utf8PathBuf>,
    /// Extension of generated modules.
    pub extension: Option<String>,
    /// Glob patterns to ignore.
    pub ignore: Vec<String>,
    /// Root for absolute `include /path` references.
    pub basedir: Option<Utf8PathBuf>,
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The project file exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The project file is not valid JSON for this schema.
    #[error("invalid {path}: {source}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ProjectConfig {
    /// Loads the project file from a directory. A missing file yields the defaults.
    pub fn load(dir: &Utf8Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config = serde_json::from_str(&content)
            .map_err(|source| ConfigError::Parse { path: path.clone(), source })?;

        log::debug!("loaded {path}");
        Ok(config)
    }
}

/// Effective settings for a run: CLI flags over project file values.
#[derive(Debug, Clone)]
pub struct Settings {
    /// The working directory relative paths resolve against.
    pub workspace: Utf8PathBuf,
    /// Files or directories to convert.
    pub paths: Vec<Utf8PathBuf>,
    /// Directory for generated modules.
    pub out_dir: Option<Utf8PathBuf>,
    /// Extension of generated modules, with its leading dot.
    pub extension: String,
    /// Glob patterns to ignore.
    pub ignore: Vec<String>,
    /// Root for absolute `include /path` references.
    pub basedir: Option<Utf8PathBuf>,
    /// Print modules instead of writing them.
    pub stdout: bool,
    /// Report format.
    pub output: OutputFormat,
    /// Exit with error on warnings.
    pub fail_on_warnings: bool,
    /// Re-run on changes.
    pub watch: bool,
}

impl Settings {
    /// Merges CLI arguments with the project file.
    pub fn resolve(args: Args, config: ProjectConfig, workspace: &Utf8Path) -> Self {
        let absolute = |path: Utf8PathBuf| -> Utf8PathBuf {
            if path.is_relative() {
                workspace.join(path).components().collect()
            } else {
                path
            }
        };

        let extension = args
            .extension
            .or(config.extension)
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
        let extension = if extension.starts_with('.') {
            extension
        } else {
            format!(".{extension}")
        };

        let mut ignore = config.ignore;
        ignore.extend(args.ignore);

        Self {
            workspace: workspace.to_owned(),
            paths: args.paths.into_iter().map(absolute).collect(),
            out_dir: args.out_dir.or(config.out_dir).map(absolute),
            extension,
            ignore,
            basedir: args.basedir.or(config.basedir).map(absolute),
            stdout: args.stdout,
            output: args.output,
            fail_on_warnings: args.fail_on_warnings,
            watch: args.watch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn utf8(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
    }

    #[test]
    fn test_missing_file_is_default() {
        let temp = TempDir::new().unwrap();
        let config = ProjectConfig::load(&utf8(&temp)).unwrap();
        assert_eq!(config, ProjectConfig::default());
    }

    #[test]
    fn test_load_camel_case_fields() {
        let temp = TempDir::new().unwrap();
        let root = utf8(&temp);
        fs::write(
            root.join(CONFIG_FILE),
            r#"{ "outDir": "build", "extension": "tsx", "ignore": ["**/drafts/**"] }"#,
        )
        .unwrap();

        let config = ProjectConfig::load(&root).unwrap();
        assert_eq!(
            config,
            ProjectConfig {
                out_dir: Some("build".into()),
                extension: Some("tsx".to_string()),
                ignore: vec!["**/drafts/**".to_string()],
                basedir: None,
            }
        );
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let root = utf8(&temp);
        fs::write(root.join(CONFIG_FILE), "{ outDir: ").unwrap();

        let err = ProjectConfig::load(&root).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_cli_overrides_project_file() {
        let args = Args::parse_from(["pug-to-jsx", "views", "--out-dir", "/tmp/out", "--ignore", "*.old.pug"]);
        let config = ProjectConfig {
            out_dir: Some("build".into()),
            extension: Some("tsx".to_string()),
            ignore: vec!["**/drafts/**".to_string()],
            basedir: Some("views".into()),
        };

        let settings = Settings::resolve(args, config, Utf8Path::new("/work"));
        assert_eq!(settings.paths, vec![Utf8PathBuf::from("/work/views")]);
        assert_eq!(settings.out_dir, Some(Utf8PathBuf::from("/tmp/out")));
        assert_eq!(settings.extension, ".tsx");
        assert_eq!(settings.ignore, vec!["**/drafts/**", "*.old.pug"]);
        assert_eq!(settings.basedir, Some(Utf8PathBuf::from("/work/views")));
    }

    #[test]
    fn test_default_extension() {
        let args = Args::parse_from(["pug-to-jsx"]);
        let settings = Settings::resolve(args, ProjectConfig::default(), Utf8Path::new("/work"));
        assert_eq!(settings.extension, ".jsx");
        assert_eq!(settings.paths[0].as_str(), "/work");
    }
}
