//! Recoverable conditions reported while transforming a file.

use pug_parser::Span;
use serde::Serialize;

/// A diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// The diagnostic code.
    pub code: DiagnosticCode,
    /// The severity level.
    pub severity: Severity,
    /// The diagnostic message.
    pub message: String,
    /// The source location.
    pub span: Span,
}

impl Diagnostic {
    /// Creates a new diagnostic with the code's default severity.
    pub fn new(code: DiagnosticCode, message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: code.default_severity(),
            code,
            message: message.into(),
            span,
        }
    }
}

/// The severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A skipped construct; the rest of the file still converts.
    Warning,
}

/// Diagnostic codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    /// `unsupported-include-position`: `include` below the top level
    UnsupportedIncludePosition,
    /// `unsupported-raw-include`: `include` of a non-Pug file
    UnsupportedRawInclude,
    /// `unsupported-mixin-call`: `+mixin(...)` call sites
    UnsupportedMixinCall,
    /// `ignored-content-outside-block`: markup outside `block` in a file that extends
    IgnoredContentOutsideBlock,
}

impl DiagnosticCode {
    /// Returns the default severity for this code.
    pub fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    /// Returns the code as a kebab-case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::UnsupportedIncludePosition => "unsupported-include-position",
            DiagnosticCode::UnsupportedRawInclude => "unsupported-raw-include",
            DiagnosticCode::UnsupportedMixinCall => "unsupported-mixin-call",
            DiagnosticCode::IgnoredContentOutsideBlock => "ignored-content-outside-block",
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use text_size::TextSize;

    #[test]
    fn test_codes_are_warnings() {
        let diagnostic = Diagnostic::new(
            DiagnosticCode::UnsupportedRawInclude,
            "skipped",
            Span::empty(TextSize::from(0)),
        );
        assert_eq!(diagnostic.severity, Severity::Warning);
        assert_eq!(diagnostic.code.to_string(), "unsupported-raw-include");
    }
}
