//! Diagnostic infrastructure for hoist.
//!
//! Parse failures, unsupported syntax, relocation notes and internal
//! invariant violations all flow through the same types:
//! - Source location tracking (file, line, column)
//! - Diagnostic codes with default severities
//! - Terminal, JSON and plain-text emitters
//!
//! # Example
//!
//! ```
//! use hoist_diagnostics::{
//!     Diagnostic, DiagnosticCode, Span, SourceCache, SimpleEmitter, DiagnosticEmitter,
//! };
//!
//! let mut cache = SourceCache::new();
//! let file_id = cache.add_file("app.js", "function f() { return 1; }".to_string());
//!
//! let diag = Diagnostic::new(DiagnosticCode::ClosureHoisted, "closure `f` can be hoisted")
//!     .with_span(Span::new(file_id, 0, 26))
//!     .build();
//!
//! let mut out = Vec::new();
//! SimpleEmitter::new(&mut out).emit(&diag, &cache).unwrap();
//! assert!(String::from_utf8(out).unwrap().starts_with("app.js:1:1: hint"));
//! ```

pub mod diagnostic;
pub mod emitter;
pub mod source_cache;
pub mod span;

pub use diagnostic::{Diagnostic, DiagnosticBuilder, DiagnosticCode, Diagnostics, Severity};
pub use emitter::{DiagnosticEmitter, JsonEmitter, SimpleEmitter, TerminalEmitter};
pub use source_cache::{SourceCache, SourceFile};
pub use span::{FileId, Label, LabelStyle, Location, Span};
