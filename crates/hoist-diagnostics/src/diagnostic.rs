//! Diagnostic types for parse errors, relocation notes and internal errors.

use crate::span::{Label, Span};
use serde::{Deserialize, Serialize};

/// Severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Informational note (a closure was or would be relocated)
    Hint,
    /// Recoverable problem in the input
    Warning,
    /// The file could not be transformed
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Hint => "hint",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic codes organized by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    // Parse errors (P001-P099)
    /// Syntax error during parsing
    ParseError,

    // Unsupported input (U001-U099)
    /// Syntax the tree model does not represent (TypeScript, JSX, `using`)
    UnsupportedSyntax,

    // Hoisting notes (H001-H099)
    /// A closure was (or would be) relocated to an outer scope
    ClosureHoisted,

    // Internal errors (I001-I099)
    /// A structural invariant of the pass was violated
    InternalError,
}

impl DiagnosticCode {
    /// Get the code string (e.g., "H001").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ParseError => "P001",
            Self::UnsupportedSyntax => "U001",
            Self::ClosureHoisted => "H001",
            Self::InternalError => "I001",
        }
    }

    pub fn default_severity(&self) -> Severity {
        match self {
            Self::ParseError | Self::UnsupportedSyntax | Self::InternalError => Severity::Error,
            Self::ClosureHoisted => Severity::Hint,
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A diagnostic with its location and related labels.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    /// Short message (single line)
    pub message: String,
    /// Longer explanation (optional)
    pub explanation: Option<String>,
    /// Primary span
    pub span: Span,
    /// Additional labels (related locations)
    pub labels: Vec<Label>,
}

impl Diagnostic {
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(code, Severity::Error, message)
    }

    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(code, Severity::Warning, message)
    }

    /// Create a diagnostic with the code's default severity.
    pub fn new(code: DiagnosticCode, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(code, code.default_severity(), message)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }

    pub fn is_hint(&self) -> bool {
        self.severity == Severity::Hint
    }
}

/// Builder for constructing diagnostics fluently.
pub struct DiagnosticBuilder {
    inner: Diagnostic,
}

impl DiagnosticBuilder {
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            inner: Diagnostic {
                code,
                severity,
                message: message.into(),
                explanation: None,
                span: Span::DUMMY,
                labels: Vec::new(),
            },
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.inner.span = span;
        self
    }

    /// Add a secondary label.
    pub fn with_label(mut self, span: Span, message: impl Into<String>) -> Self {
        self.inner.labels.push(Label::secondary(span, message));
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.inner.explanation = Some(help.into());
        self
    }

    pub fn build(self) -> Diagnostic {
        self.inner
    }
}

/// Collection of diagnostics with summary statistics.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.items.extend(diagnostics);
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_warning()).count()
    }

    pub fn hint_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_hint()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_severities() {
        assert_eq!(DiagnosticCode::ClosureHoisted.default_severity(), Severity::Hint);
        assert_eq!(DiagnosticCode::InternalError.default_severity(), Severity::Error);
    }

    #[test]
    fn test_counts() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::new(DiagnosticCode::ClosureHoisted, "moved").build());
        diags.push(Diagnostic::warning(DiagnosticCode::ParseError, "recovered").build());
        diags.push(Diagnostic::new(DiagnosticCode::ParseError, "bad").build());

        assert_eq!(diags.len(), 3);
        assert_eq!(diags.hint_count(), 1);
        assert_eq!(diags.warning_count(), 1);
        assert_eq!(diags.error_count(), 1);
        assert!(diags.has_errors());
    }
}
