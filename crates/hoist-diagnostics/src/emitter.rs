//! Diagnostic emitters for different output formats.

use crate::diagnostic::{Diagnostic, Diagnostics, Severity};
use crate::source_cache::SourceCache;
use crate::span::LabelStyle;
use std::io::Write;

/// Trait for emitting diagnostics in various formats.
pub trait DiagnosticEmitter {
    fn emit(&mut self, diagnostic: &Diagnostic, cache: &SourceCache) -> std::io::Result<()>;

    fn emit_all(&mut self, diagnostics: &Diagnostics, cache: &SourceCache) -> std::io::Result<()> {
        for diag in diagnostics.iter() {
            self.emit(diag, cache)?;
        }
        Ok(())
    }

    fn emit_summary(&mut self, diagnostics: &Diagnostics) -> std::io::Result<()>;
}

/// Rich terminal output with colors and a source snippet.
pub struct TerminalEmitter<W: Write> {
    writer: W,
    colored: bool,
}

impl<W: Write> TerminalEmitter<W> {
    pub fn new(writer: W, colored: bool) -> Self {
        Self { writer, colored }
    }

    fn paint(&self, code: &'static str) -> &'static str {
        if self.colored {
            code
        } else {
            ""
        }
    }

    fn severity_color(&self, severity: Severity) -> &'static str {
        self.paint(match severity {
            Severity::Error => "\x1b[31m",
            Severity::Warning => "\x1b[33m",
            Severity::Hint => "\x1b[32m",
        })
    }
}

impl<W: Write> DiagnosticEmitter for TerminalEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic, cache: &SourceCache) -> std::io::Result<()> {
        let color = self.severity_color(diagnostic.severity);
        let reset = self.paint("\x1b[0m");
        let bold = self.paint("\x1b[1m");
        let cyan = self.paint("\x1b[36m");

        // hint[H001]: message
        writeln!(
            self.writer,
            "{}{}{}[{}]{}: {}",
            bold,
            color,
            diagnostic.severity.as_str(),
            diagnostic.code.as_str(),
            reset,
            diagnostic.message
        )?;

        if let Some(loc) = cache.location(diagnostic.span) {
            writeln!(self.writer, "  {}-->{} {}", cyan, reset, loc)?;

            if let Some(file) = cache.get_file(diagnostic.span.file_id) {
                let (line_num, start_col) = file.line_column(diagnostic.span.start);
                if let Some(line_text) = file.line_text(line_num) {
                    let line_str = line_num.to_string();
                    let padding = " ".repeat(line_str.len());
                    writeln!(self.writer, "{} {}|{}", padding, cyan, reset)?;
                    writeln!(self.writer, "{}{} |{} {}", cyan, line_str, reset, line_text)?;

                    // Multi-line spans are underlined to the end of their first line
                    let offset = (start_col - 1) as usize;
                    let max_underline = line_text.len().saturating_sub(offset);
                    let underline_len = (diagnostic.span.len() as usize).min(max_underline).max(1);
                    writeln!(
                        self.writer,
                        "{} {}|{} {}{}{}{}",
                        padding,
                        cyan,
                        reset,
                        " ".repeat(offset),
                        color,
                        "^".repeat(underline_len),
                        reset
                    )?;
                }
            }
        }

        for label in &diagnostic.labels {
            if let Some(loc) = cache.location(label.span) {
                let label_color = match label.style {
                    LabelStyle::Primary => color,
                    LabelStyle::Secondary => cyan,
                };
                writeln!(
                    self.writer,
                    "  {}note{}: {} ({})",
                    label_color, reset, label.message, loc
                )?;
            }
        }

        if let Some(ref explanation) = diagnostic.explanation {
            writeln!(self.writer, "  {}= help:{} {}", cyan, reset, explanation)?;
        }

        writeln!(self.writer)?;
        Ok(())
    }

    fn emit_summary(&mut self, diagnostics: &Diagnostics) -> std::io::Result<()> {
        let errors = diagnostics.error_count();
        let hints = diagnostics.hint_count();
        let reset = self.paint("\x1b[0m");

        if errors > 0 {
            let color = self.severity_color(Severity::Error);
            writeln!(
                self.writer,
                "{}{} error{} emitted{}",
                color,
                errors,
                if errors == 1 { "" } else { "s" },
                reset
            )?;
        }
        if hints > 0 {
            let color = self.severity_color(Severity::Hint);
            writeln!(
                self.writer,
                "{}{} closure{} hoisted{}",
                color,
                hints,
                if hints == 1 { "" } else { "s" },
                reset
            )?;
        }
        Ok(())
    }
}

/// JSON lines output for tooling integration.
pub struct JsonEmitter<W: Write> {
    writer: W,
}

impl<W: Write> JsonEmitter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> DiagnosticEmitter for JsonEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic, cache: &SourceCache) -> std::io::Result<()> {
        let loc = cache.location(diagnostic.span);
        let json = serde_json::json!({
            "code": diagnostic.code.as_str(),
            "severity": diagnostic.severity.as_str(),
            "message": diagnostic.message,
            "location": loc.map(|l| serde_json::json!({
                "file": l.file,
                "line": l.line,
                "column": l.column,
            })),
            "span": if diagnostic.span.is_dummy() {
                serde_json::Value::Null
            } else {
                serde_json::json!({
                    "start": diagnostic.span.start,
                    "end": diagnostic.span.end,
                })
            },
            "labels": diagnostic.labels.iter().map(|label| {
                serde_json::json!({
                    "message": label.message,
                    "location": cache.location(label.span).map(|l| l.to_string()),
                })
            }).collect::<Vec<_>>(),
            "help": diagnostic.explanation,
        });

        serde_json::to_writer(&mut self.writer, &json)?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn emit_summary(&mut self, diagnostics: &Diagnostics) -> std::io::Result<()> {
        let summary = serde_json::json!({
            "type": "summary",
            "errors": diagnostics.error_count(),
            "warnings": diagnostics.warning_count(),
            "hoisted": diagnostics.hint_count(),
            "total": diagnostics.len(),
        });
        serde_json::to_writer(&mut self.writer, &summary)?;
        writeln!(self.writer)?;
        Ok(())
    }
}

/// `file:line:col: severity: message [code]`, one per line.
pub struct SimpleEmitter<W: Write> {
    writer: W,
}

impl<W: Write> SimpleEmitter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> DiagnosticEmitter for SimpleEmitter<W> {
    fn emit(&mut self, diagnostic: &Diagnostic, cache: &SourceCache) -> std::io::Result<()> {
        match cache.location(diagnostic.span) {
            Some(loc) => writeln!(
                self.writer,
                "{}: {}: {} [{}]",
                loc,
                diagnostic.severity.as_str(),
                diagnostic.message,
                diagnostic.code.as_str()
            ),
            None => writeln!(
                self.writer,
                "{}: {} [{}]",
                diagnostic.severity.as_str(),
                diagnostic.message,
                diagnostic.code.as_str()
            ),
        }
    }

    fn emit_summary(&mut self, diagnostics: &Diagnostics) -> std::io::Result<()> {
        writeln!(
            self.writer,
            "{} error(s), {} closure(s) hoisted",
            diagnostics.error_count(),
            diagnostics.hint_count()
        )
    }
}
