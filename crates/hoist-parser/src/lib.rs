//! JavaScript parser wrapper using SWC
//!
//! Parses source text into an SWC AST, registering the file in a
//! `SourceCache` and converting SWC errors into diagnostics.

use anyhow::Result;
use hoist_diagnostics::{Diagnostic, DiagnosticCode, Diagnostics, FileId, SourceCache, Span};
use hoist_types::SourceType;
use swc_common::{input::StringInput, sync::Lrc, FileName, SourceMap};
use swc_ecma_ast::{EsVersion, Program};
use swc_ecma_parser::{lexer::Lexer, EsSyntax, Parser, Syntax};

// Re-export AST types for consumers that need to inspect the AST
pub use swc_ecma_ast;

// Re-export Spanned trait for getting spans from AST nodes
pub use swc_common::Spanned;

/// Result of parsing a JavaScript file.
#[derive(Debug)]
pub struct ParseResult {
    pub program: Program,
    /// Module or script, as requested or as detected
    pub source_type: SourceType,
    pub file_id: FileId,
    /// SWC byte position of the first character; subtract it from SWC
    /// spans to get offsets into the source text
    pub start_pos: u32,
    /// Recoverable parse errors, as warnings
    pub diagnostics: Diagnostics,
}

/// Parse JavaScript source code with diagnostic support.
///
/// `source_type` selects module or classic-script grammar. `None` lets the
/// parser decide from the presence of `import`/`export` declarations.
pub fn parse_javascript_with_cache(
    source: &str,
    filename: &str,
    source_type: Option<SourceType>,
    cache: &mut SourceCache,
) -> Result<ParseResult> {
    let file_id = cache.add_file(filename, source.to_string());

    // SWC keeps its own source map; our cache is used for rendering
    let source_map: Lrc<SourceMap> = Default::default();
    let source_file = source_map.new_source_file(
        Lrc::new(FileName::Custom(filename.to_string())),
        source.to_string(),
    );
    let start_pos = source_file.start_pos.0;

    let lexer = Lexer::new(
        Syntax::Es(EsSyntax::default()),
        EsVersion::Es2022,
        StringInput::from(&*source_file),
        None,
    );

    let mut parser = Parser::new_from(lexer);
    let mut diagnostics = Diagnostics::new();
    let to_span = |swc_span: swc_common::Span| {
        Span::new(
            file_id,
            swc_span.lo.0.saturating_sub(start_pos),
            swc_span.hi.0.saturating_sub(start_pos),
        )
    };

    let parsed = match source_type {
        Some(SourceType::Module) => parser.parse_module().map(Program::Module),
        Some(SourceType::Script) => parser.parse_script().map(Program::Script),
        None => parser.parse_program(),
    };

    let program = parsed.map_err(|e| {
        let diag = Diagnostic::error(DiagnosticCode::ParseError, e.kind().msg().to_string())
            .with_span(to_span(e.span()))
            .build();
        diagnostics.push(diag);
        anyhow::anyhow!("Parse error in {}: {}", filename, e.kind().msg())
    })?;

    for error in parser.take_errors() {
        log::warn!("{}: recovered from parse error: {}", filename, error.kind().msg());
        diagnostics.push(
            Diagnostic::warning(DiagnosticCode::ParseError, error.kind().msg().to_string())
                .with_span(to_span(error.span()))
                .build(),
        );
    }

    let source_type = match &program {
        Program::Module(_) => SourceType::Module,
        Program::Script(_) => SourceType::Script,
    };

    Ok(ParseResult {
        program,
        source_type,
        file_id,
        start_pos,
        diagnostics,
    })
}

/// Parse JavaScript source code with a throwaway source cache.
pub fn parse_javascript(
    source: &str,
    filename: &str,
    source_type: Option<SourceType>,
) -> Result<ParseResult> {
    let mut cache = SourceCache::new();
    parse_javascript_with_cache(source, filename, source_type, &mut cache)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_module() {
        let source = r#"
            export function outer() {
                function inner() { return 1; }
                return inner();
            }
        "#;

        let result = parse_javascript(source, "test.js", Some(SourceType::Module)).unwrap();
        assert_eq!(result.source_type, SourceType::Module);
        match result.program {
            Program::Module(module) => assert_eq!(module.body.len(), 1),
            Program::Script(_) => panic!("expected a module"),
        }
    }

    #[test]
    fn test_parse_script() {
        let source = "var x = 1; function f() { return x; }";
        let result = parse_javascript(source, "test.js", Some(SourceType::Script)).unwrap();
        match result.program {
            Program::Script(script) => assert_eq!(script.body.len(), 2),
            Program::Module(_) => panic!("expected a script"),
        }
    }

    #[test]
    fn test_auto_detects_script() {
        let result = parse_javascript("var x = 1;", "test.js", None).unwrap();
        assert_eq!(result.source_type, SourceType::Script);
    }

    #[test]
    fn test_auto_detects_module() {
        let result = parse_javascript("export const x = 1;", "test.js", None).unwrap();
        assert_eq!(result.source_type, SourceType::Module);
    }

    #[test]
    fn test_parse_with_cache() {
        let mut cache = SourceCache::new();
        let result =
            parse_javascript_with_cache("let x = 42;", "test.js", None, &mut cache).unwrap();

        assert!(result.diagnostics.is_empty());
        assert!(cache.get_file(result.file_id).is_some());
    }

    #[test]
    fn test_parse_error() {
        let mut cache = SourceCache::new();
        let result = parse_javascript_with_cache("let x = ;", "test.js", None, &mut cache);
        assert!(result.is_err());
    }
}
