//! Output formatting.

use std::fmt::Write as _;

use camino::Utf8Path;
use miette::{GraphicalReportHandler, GraphicalTheme, LabeledSpan, NamedSource, SourceCode, SourceSpan};
use pug_parser::{LineCol, LineIndex, LoadError, Span};
use pug_transformer::{ConvertError, Diagnostic, Severity};
use serde::Serialize;
use thiserror::Error;

use crate::cli::OutputFormat;

/// Wide enough that rendered messages never wrap.
const REPORT_WIDTH: usize = 400;

/// A warning with its resolved position.
#[derive(Debug, Serialize)]
pub struct WarningReport {
    /// The diagnostic code.
    pub code: &'static str,
    /// The severity level.
    pub severity: Severity,
    /// The message.
    pub message: String,
    /// 1-indexed line number.
    pub line: u32,
    /// 1-indexed column number.
    pub column: u32,
}

/// The outcome for one template.
#[derive(Debug, Serialize)]
pub struct FileReport {
    /// The template path.
    pub path: String,
    /// Where the module was written, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Skipped constructs.
    pub warnings: Vec<WarningReport>,
    /// The failure message, if conversion failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The failure rendered for a terminal.
    #[serde(skip)]
    pub rendered_error: Option<String>,
}

impl FileReport {
    /// Builds the report for a converted template.
    pub fn converted(path: &Utf8Path, output: Option<String>, warnings: &[Diagnostic], source: &str) -> Self {
        Self {
            path: path.to_string(),
            output,
            warnings: warning_reports(warnings, source),
            error: None,
            rendered_error: None,
        }
    }

    /// Builds the report for a template that failed.
    pub fn failed(path: &Utf8Path, error: &ConvertError) -> Self {
        Self {
            path: path.to_string(),
            output: None,
            warnings: Vec::new(),
            error: Some(error.to_string()),
            rendered_error: Some(render_failure(error)),
        }
    }
}

/// A conversion failure rendered with its source snippet.
#[derive(Debug, Error)]
#[error("{message}")]
struct SourceFailure {
    message: String,
    source_code: NamedSource<String>,
    span: SourceSpan,
    label: String,
}

impl miette::Diagnostic for SourceFailure {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        Some(Box::new("pug_to_jsx::convert"))
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        Some(&self.source_code)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        Some(Box::new(std::iter::once(LabeledSpan::new_with_span(
            Some(self.label.clone()),
            self.span,
        ))))
    }
}

/// Formats run results.
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    /// Creates a new formatter.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the results of one conversion pass.
    pub fn format(&self, reports: &[FileReport], summary: &RunSummary) -> String {
        match self.format {
            OutputFormat::Human => self.format_human(reports, summary),
            OutputFormat::Json => self.format_json(reports, summary),
        }
    }

    fn format_human(&self, reports: &[FileReport], summary: &RunSummary) -> String {
        let mut output = String::new();

        for report in reports {
            for warning in &report.warnings {
                let _ = write!(
                    output,
                    "{}:{}:{}\nWarning: {} ({})\n\n",
                    report.path, warning.line, warning.column, warning.message, warning.code
                );
            }
        }

        for rendered in reports.iter().filter_map(|report| report.rendered_error.as_deref()) {
            output.push_str(rendered);
            output.push('\n');
        }

        output.push_str(&summary.format());
        output.push('\n');
        output
    }

    fn format_json(&self, reports: &[FileReport], summary: &RunSummary) -> String {
        #[derive(Serialize)]
        struct JsonReport<'a> {
            files: &'a [FileReport],
            summary: &'a RunSummary,
        }

        serde_json::to_string_pretty(&JsonReport { files: reports, summary }).unwrap_or_default()
    }
}

/// Resolves warning positions against the template text.
pub fn warning_reports(warnings: &[Diagnostic], source: &str) -> Vec<WarningReport> {
    let line_index = LineIndex::new(source);
    warnings
        .iter()
        .map(|warning| {
            let LineCol { line, column } = line_index.line_col(warning.span.start());
            WarningReport {
                code: warning.code.as_str(),
                severity: warning.severity,
                message: warning.message.clone(),
                line,
                column,
            }
        })
        .collect()
}

/// Renders a failure, with a labelled snippet when the source is at hand.
pub fn render_failure(error: &ConvertError) -> String {
    let failure = match error {
        ConvertError::Transform {
            error: cause,
            message,
            path,
            source_text,
        } => Some(source_failure(message, path, source_text, cause.span(), "here")),
        ConvertError::Load(LoadError::Parse {
            path,
            source_text,
            errors,
        }) => errors.first().map(|first| {
            source_failure(
                &error.to_string(),
                path,
                source_text,
                first.span,
                &first.kind.to_string(),
            )
        }),
        ConvertError::Load(_) => None,
    };

    let Some(failure) = failure else {
        return format!("Error: {error}\n");
    };

    let mut rendered = String::new();
    let handler = GraphicalReportHandler::new_themed(GraphicalTheme::unicode_nocolor()).with_width(REPORT_WIDTH);
    match handler.render_report(&mut rendered, &failure) {
        Ok(()) => rendered,
        Err(_) => format!("Error: {error}\n"),
    }
}

fn source_failure(message: &str, path: &Utf8Path, source: &str, span: Span, label: &str) -> SourceFailure {
    SourceFailure {
        message: message.to_string(),
        source_code: NamedSource::new(path.as_str(), source.to_string()),
        span: SourceSpan::from((usize::from(span.start()), usize::from(span.len()))),
        label: label.to_string(),
    }
}

/// Summary of a conversion pass.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Number of templates found.
    pub file_count: usize,
    /// Number of templates that failed.
    pub failure_count: usize,
    /// Number of warnings.
    pub warning_count: usize,
    /// Whether to fail on warnings.
    #[serde(skip)]
    pub fail_on_warnings: bool,
}

impl RunSummary {
    /// Returns whether the run should exit with an error.
    pub fn should_fail(&self) -> bool {
        self.failure_count > 0 || (self.warning_count > 0 && self.fail_on_warnings)
    }

    /// Formats the summary line.
    pub fn format(&self) -> String {
        let plural = |count: usize, word: &str| {
            if count == 1 {
                format!("{count} {word}")
            } else {
                format!("{count} {word}s")
            }
        };

        format!(
            "====================================\npug-to-jsx converted {} of {}, {} and {}",
            self.file_count.saturating_sub(self.failure_count),
            plural(self.file_count, "file"),
            plural(self.failure_count, "failure"),
            plural(self.warning_count, "warning"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pug_transformer::{DiagnosticCode, TransformError};
    use text_size::{TextRange, TextSize};

    fn span(start: u32, end: u32) -> Span {
        TextRange::new(TextSize::from(start), TextSize::from(end))
    }

    #[test]
    fn test_warning_positions() {
        let source = "div\n  +button('Save')\n";
        let warnings = [Diagnostic::new(
            DiagnosticCode::UnsupportedMixinCall,
            "mixin call `+button` is not expanded",
            span(6, 21),
        )];

        let reports = warning_reports(&warnings, source);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].code, "unsupported-mixin-call");
        assert_eq!((reports[0].line, reports[0].column), (2, 3));
    }

    #[test]
    fn test_render_transform_failure() {
        let error = ConvertError::Transform {
            error: TransformError::UnsupportedNodeKind {
                kind: "Filter".into(),
                span: span(0, 9),
            },
            message: "failed to convert views/a.pug: unsupported pug node type: Filter".to_string(),
            path: "views/a.pug".into(),
            source_text: ":markdown\n  # Title\n".to_string(),
        };

        let rendered = render_failure(&error);
        assert!(rendered.contains("unsupported pug node type: Filter"));
        assert!(rendered.contains("views/a.pug"));
        assert!(rendered.contains(":markdown"));
    }

    #[test]
    fn test_render_io_failure() {
        let error = ConvertError::Load(LoadError::Io {
            path: "missing.pug".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        });
        assert_eq!(render_failure(&error), "Error: failed to read missing.pug: not found\n");
    }

    #[test]
    fn test_format_human_lists_warnings_then_failures() {
        let formatter = Formatter::new(OutputFormat::Human);
        let error = ConvertError::Load(LoadError::Io {
            path: "gone.pug".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        });
        let warnings = [Diagnostic::new(
            DiagnosticCode::UnsupportedRawInclude,
            "include of non-pug file `style.css` must be converted by hand",
            span(0, 17),
        )];
        let reports = [
            FileReport::converted(Utf8Path::new("a.pug"), None, &warnings, "include style.css\n"),
            FileReport::failed(Utf8Path::new("gone.pug"), &error),
        ];
        let summary = RunSummary {
            file_count: 2,
            failure_count: 1,
            warning_count: 1,
            fail_on_warnings: false,
        };

        let output = formatter.format(&reports, &summary);
        let warning_at = output.find("a.pug:1:1\nWarning: include of non-pug file").unwrap();
        let failure_at = output.find("Error: failed to read gone.pug").unwrap();
        assert!(warning_at < failure_at);
        assert!(output.ends_with("converted 1 of 2 files, 1 failure and 1 warning\n"));
    }

    #[test]
    fn test_summary() {
        let summary = RunSummary {
            file_count: 5,
            failure_count: 1,
            warning_count: 3,
            fail_on_warnings: false,
        };

        let output = summary.format();
        assert!(output.contains("converted 4 of 5 files"));
        assert!(output.contains("1 failure"));
        assert!(output.contains("3 warnings"));
        assert!(summary.should_fail());
    }

    #[test]
    fn test_warnings_fail_only_when_asked() {
        let mut summary = RunSummary {
            file_count: 1,
            warning_count: 1,
            ..Default::default()
        };
        assert!(!summary.should_fail());
        summary.fail_on_warnings = true;
        assert!(summary.should_fail());
    }

    #[test]
    fn test_format_json() {
        let formatter = Formatter::new(OutputFormat::Json);
        let reports = [FileReport {
            path: "a.pug".to_string(),
            output: Some("a.jsx".to_string()),
            warnings: Vec::new(),
            error: None,
            rendered_error: None,
        }];
        let summary = RunSummary {
            file_count: 1,
            ..Default::default()
        };

        let output = formatter.format(&reports, &summary);
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["files"][0]["output"], "a.jsx");
        assert_eq!(value["summary"]["fileCount"], 1);
        assert!(value["files"][0].get("error").is_none());
    }
}
