//! Main orchestration logic.

use crate::cli::{Args, OutputFormat};
use crate::config::{ConfigError, ProjectConfig, Settings};
use crate::output::{FileReport, Formatter, RunSummary};
use camino::{Utf8Path, Utf8PathBuf};
use globset::{Glob, GlobSet, GlobSetBuilder};
use indexmap::IndexMap;
use pug_transformer::{convert, ConvertOptions};
use std::fs;
use thiserror::Error;
use walkdir::WalkDir;

const TEMPLATE_EXTENSION: &str = "pug";

/// Orchestration errors.
#[derive(Debug, Error, miette::Diagnostic)]
pub enum OrchestratorError {
    /// The working directory is unavailable.
    #[error("failed to determine the working directory: {0}")]
    #[diagnostic(code(pug_to_jsx::workspace))]
    Workspace(String),

    /// The project file is unreadable.
    #[error(transparent)]
    #[diagnostic(code(pug_to_jsx::config), help("fix or remove pug-to-jsx.json"))]
    Config(#[from] ConfigError),

    /// Invalid glob pattern.
    #[error("invalid glob pattern: {0}")]
    #[diagnostic(code(pug_to_jsx::ignore))]
    InvalidGlob(String),

    /// A generated module could not be written.
    #[error("failed to write {path}: {source}")]
    #[diagnostic(code(pug_to_jsx::write))]
    WriteFailed {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Watch error.
    #[error("watch error: {0}")]
    #[diagnostic(code(pug_to_jsx::watch))]
    WatchFailed(String),
}

/// A template found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    /// The template path.
    pub path: Utf8PathBuf,
    /// The path below the searched directory, mirrored under the output directory.
    pub relative: Utf8PathBuf,
}

/// The results of one conversion pass.
#[derive(Debug, Default)]
pub struct Pass {
    /// One report per template, in discovery order.
    pub reports: Vec<FileReport>,
    /// Totals.
    pub summary: RunSummary,
    /// Generated modules when printing instead of writing.
    pub printed: String,
}

/// Runs the conversion.
pub fn run(args: Args) -> Result<RunSummary, OrchestratorError> {
    let workspace = std::env::current_dir().map_err(|e| OrchestratorError::Workspace(e.to_string()))?;
    let workspace = Utf8PathBuf::from_path_buf(workspace).map_err(|path| {
        OrchestratorError::Workspace(format!("{} is not valid UTF-8", path.display()))
    })?;

    let config = ProjectConfig::load(&workspace)?;
    let settings = Settings::resolve(args, config, &workspace);

    if settings.watch {
        run_watch_mode(&settings)
    } else {
        let pass = run_pass(&settings)?;
        emit(&settings, &pass);
        Ok(pass.summary)
    }
}

/// Discovers, converts and writes every template once.
pub fn run_pass(settings: &Settings) -> Result<Pass, OrchestratorError> {
    let ignore = build_ignore_set(&settings.ignore)?;
    let templates = discover(&settings.paths, &ignore);
    log::info!("found {} templates", templates.len());

    let paths: Vec<&Utf8Path> = templates.iter().map(|t| t.path.as_path()).collect();
    let output = convert(
        &paths,
        &ConvertOptions {
            basedir: settings.basedir.clone(),
        },
    );

    let mut pass = Pass {
        reports: Vec::with_capacity(templates.len()),
        summary: RunSummary {
            file_count: templates.len(),
            failure_count: output.failure_count(),
            warning_count: output.warning_count(),
            fail_on_warnings: settings.fail_on_warnings,
        },
        printed: String::new(),
    };

    for template in &templates {
        let Some(result) = output.files.get(&template.path) else {
            continue;
        };
        let report = match result {
            Ok(file) => {
                let written = if settings.stdout {
                    pass.printed.push_str(&format!("// {}\n{}\n", template.path, file.code));
                    None
                } else {
                    let target = output_path(template, settings);
                    write_module(&target, &file.code)?;
                    Some(target.to_string())
                };
                FileReport::converted(&template.path, written, &file.warnings, &file.source)
            }
            Err(err) => FileReport::failed(&template.path, err),
        };
        pass.reports.push(report);
    }

    Ok(pass)
}

/// Prints a pass. The report goes to stderr when modules occupy stdout.
fn emit(settings: &Settings, pass: &Pass) {
    let report = Formatter::new(settings.output).format(&pass.reports, &pass.summary);
    if settings.stdout {
        print!("{}", pass.printed);
        eprint!("{report}");
    } else if settings.output == OutputFormat::Json {
        println!("{report}");
    } else {
        print!("{report}");
    }
}

/// Builds the ignore set, including the default ignores.
pub fn build_ignore_set(patterns: &[String]) -> Result<GlobSet, OrchestratorError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| OrchestratorError::InvalidGlob(e.to_string()))?;
        builder.add(glob);
    }

    for pattern in ["**/node_modules/**", "node_modules/**"] {
        if let Ok(glob) = Glob::new(pattern) {
            builder.add(glob);
        }
    }

    builder
        .build()
        .map_err(|e| OrchestratorError::InvalidGlob(e.to_string()))
}

/// Expands directories into their `*.pug` files. Explicit files are kept as given.
pub fn discover(paths: &[Utf8PathBuf], ignore: &GlobSet) -> Vec<Template> {
    let mut found: IndexMap<Utf8PathBuf, Utf8PathBuf> = IndexMap::new();

    for root in paths {
        if !root.is_dir() {
            let relative = root
                .file_name()
                .map(Utf8PathBuf::from)
                .unwrap_or_else(|| root.clone());
            found.entry(root.clone()).or_insert(relative);
            continue;
        }

        let files = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| Utf8PathBuf::try_from(e.into_path()).ok())
            .filter(|p| p.extension() == Some(TEMPLATE_EXTENSION));

        for path in files {
            let relative = path.strip_prefix(root).unwrap_or(&path).to_owned();
            if ignore.is_match(relative.as_str()) {
                log::debug!("ignoring {path}");
                continue;
            }
            found.entry(path).or_insert(relative);
        }
    }

    found
        .into_iter()
        .map(|(path, relative)| Template { path, relative })
        .collect()
}

/// Returns where a template's module is written.
pub fn output_path(template: &Template, settings: &Settings) -> Utf8PathBuf {
    let base = match &settings.out_dir {
        Some(dir) => dir.join(&template.relative),
        None => template.path.clone(),
    };
    base.with_extension(settings.extension.trim_start_matches('.'))
}

fn write_module(path: &Utf8Path, code: &str) -> Result<(), OrchestratorError> {
    let write_failed = |source| OrchestratorError::WriteFailed {
        path: path.to_owned(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_failed)?;
    }
    fs::write(path, code).map_err(write_failed)?;
    log::debug!("wrote {path}");
    Ok(())
}

fn is_template(path: &std::path::Path) -> bool {
    path.extension().is_some_and(|ext| ext == TEMPLATE_EXTENSION)
}

/// Runs in watch mode.
fn run_watch_mode(settings: &Settings) -> Result<RunSummary, OrchestratorError> {
    use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
    use std::sync::mpsc;
    use std::time::Duration;

    eprintln!("Starting watch mode...\n");

    let pass = run_pass(settings)?;
    emit(settings, &pass);

    let (tx, rx) = mpsc::channel();
    let mut watcher = RecommendedWatcher::new(
        move |res: Result<notify::Event, notify::Error>| {
            if let Ok(event) = res {
                let _ = tx.send(event);
            }
        },
        Config::default().with_poll_interval(Duration::from_secs(1)),
    )
    .map_err(|e| OrchestratorError::WatchFailed(e.to_string()))?;

    for path in &settings.paths {
        let mode = if path.is_dir() {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher
            .watch(path.as_std_path(), mode)
            .map_err(|e| OrchestratorError::WatchFailed(e.to_string()))?;
    }

    eprintln!("Watching for changes... (Ctrl+C to stop)\n");

    while let Ok(event) = rx.recv() {
        if !event.paths.iter().any(|p| is_template(p)) {
            continue;
        }
        // Editors save in bursts.
        while rx.recv_timeout(Duration::from_millis(50)).is_ok() {}

        log::info!("template changed, converting again");
        match run_pass(settings) {
            Ok(pass) => emit(settings, &pass),
            Err(err) => log::error!("{err}"),
        }
    }

    Err(OrchestratorError::WatchFailed(
        "watch channel closed unexpectedly".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn project() -> (TempDir, Utf8PathBuf) {
        let temp = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        for (name, contents) in [
            ("index.pug", "p home\n"),
            ("partials/nav.pug", "nav\n  a(href='/') Home\n"),
            ("drafts/old.pug", "p old\n"),
            ("node_modules/pkg/x.pug", "p vendored\n"),
            ("notes.txt", "not a template\n"),
        ] {
            let path = root.join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }
        (temp, root)
    }

    fn settings(root: &Utf8Path, extra: &[&str]) -> Settings {
        let mut argv = vec!["pug-to-jsx"];
        argv.extend_from_slice(extra);
        Settings::resolve(Args::parse_from(argv), ProjectConfig::default(), root)
    }

    #[test]
    fn test_discover_sorted_and_ignored() {
        let (_temp, root) = project();
        let ignore = build_ignore_set(&["drafts/**".to_string()]).unwrap();

        let templates = discover(&[root.clone()], &ignore);
        let relative: Vec<&str> = templates.iter().map(|t| t.relative.as_str()).collect();
        assert_eq!(relative, vec!["index.pug", "partials/nav.pug"]);
    }

    #[test]
    fn test_discover_keeps_explicit_files_once() {
        let (_temp, root) = project();
        let ignore = build_ignore_set(&[]).unwrap();
        let index = root.join("index.pug");

        let templates = discover(&[index.clone(), root.clone()], &ignore);
        assert_eq!(templates[0], Template { path: index, relative: "index.pug".into() });
        assert_eq!(templates.len(), 3);
    }

    #[test]
    fn test_invalid_glob() {
        let err = build_ignore_set(&["a[".to_string()]).unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidGlob(_)));
    }

    #[test]
    fn test_output_path() {
        let template = Template {
            path: "/work/views/partials/nav.pug".into(),
            relative: "partials/nav.pug".into(),
        };

        let beside = settings(Utf8Path::new("/work"), &[]);
        assert_eq!(output_path(&template, &beside), Utf8PathBuf::from("/work/views/partials/nav.jsx"));

        let mirrored = settings(Utf8Path::new("/work"), &["--out-dir", "build", "--extension", "tsx"]);
        assert_eq!(output_path(&template, &mirrored), Utf8PathBuf::from("/work/build/partials/nav.tsx"));
    }

    #[test]
    fn test_run_pass_writes_modules() {
        let (_temp, root) = project();
        let settings = settings(&root, &["--out-dir", "out", "--ignore", "drafts/**"]);

        let pass = run_pass(&settings).unwrap();
        assert_eq!(pass.summary.file_count, 2);
        assert_eq!(pass.summary.failure_count, 0);
        assert!(pass.printed.is_empty());

        let nav = fs::read_to_string(root.join("out/partials/nav.jsx")).unwrap();
        assert_eq!(
            nav,
            "export const Nav = () => {\n  return <nav>\n    <a href={'/'}>Home</a>\n  </nav>;\n};\n"
        );
        assert!(root.join("out/index.jsx").exists());
    }

    #[test]
    fn test_run_pass_stdout_writes_nothing() {
        let (_temp, root) = project();
        let settings = settings(&root, &["--stdout", "index.pug"]);

        let pass = run_pass(&settings).unwrap();
        assert_eq!(pass.reports.len(), 1);
        assert_eq!(pass.reports[0].output, None);
        assert!(pass.printed.contains("export const Index = () => {"));
        assert!(!root.join("index.jsx").exists());
    }

    #[test]
    fn test_run_pass_reports_failures() {
        let (_temp, root) = project();
        fs::write(root.join("broken.pug"), "p= a +\n").unwrap();
        let settings = settings(&root, &["--ignore", "drafts/**"]);

        let pass = run_pass(&settings).unwrap();
        assert_eq!(pass.summary.failure_count, 1);
        assert!(pass.summary.should_fail());
        let broken = pass.reports.iter().find(|r| r.path.ends_with("broken.pug")).unwrap();
        assert!(broken.error.is_some());
        assert!(!root.join("broken.jsx").exists());
        assert!(root.join("index.jsx").exists());
    }
}
