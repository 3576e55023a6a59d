//! Parse, lower, hoist and print one file

use anyhow::Result;
use hoist_diagnostics::{Diagnostic, DiagnosticCode, Diagnostics, SourceCache};
use hoist_hir::{lower_program, print_program};
use hoist_transform::{hoist_closures, HoistReport};
use hoist_types::SourceType;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::TransformConfig;

/// A successfully transformed file
#[derive(Debug)]
pub struct Transformed {
    pub output: String,
    pub report: HoistReport,
    pub source_type: SourceType,
}

/// Run the whole pipeline on `source`.
///
/// Problems are pushed to `diagnostics` as errors and `None` is returned;
/// the caller decides whether to keep going with other files.
pub fn transform_source(
    source: &str,
    filename: &str,
    source_type: Option<SourceType>,
    cache: &mut SourceCache,
    diagnostics: &mut Diagnostics,
) -> Option<Transformed> {
    let parsed = match hoist_parser::parse_javascript_with_cache(source, filename, source_type, cache) {
        Ok(parsed) => parsed,
        Err(e) => {
            log::debug!("{}", e);
            diagnostics.push(Diagnostic::error(DiagnosticCode::ParseError, e.to_string()).build());
            return None;
        }
    };
    diagnostics.extend(parsed.diagnostics);

    let mut program = match lower_program(&parsed.program, source, parsed.start_pos, parsed.file_id) {
        Ok(program) => program,
        Err(e) => {
            diagnostics.push(
                Diagnostic::error(DiagnosticCode::UnsupportedSyntax, format!("{}: {}", filename, e)).build(),
            );
            return None;
        }
    };

    let report = match hoist_closures(&mut program) {
        Ok(report) => report,
        Err(e) => {
            diagnostics.push(
                Diagnostic::error(DiagnosticCode::InternalError, format!("{}: {}", filename, e))
                    .with_help("the file was left unchanged")
                    .build(),
            );
            return None;
        }
    };

    log::info!("{}: {} closure(s) hoisted", filename, report.len());
    Some(Transformed {
        output: print_program(&program),
        report,
        source_type: parsed.source_type,
    })
}

/// One hint per relocated closure, pointing at its original position.
pub fn hoist_hints(report: &HoistReport) -> Diagnostics {
    let mut hints = Diagnostics::new();
    for hoisted in &report.hoisted {
        let message = match &hoisted.original_name {
            Some(name) => format!("function `{}` can be hoisted as `{}`", name, hoisted.generated_name),
            None => format!("{} can be hoisted as `{}`", hoisted.case.as_str(), hoisted.generated_name),
        };
        hints.push(
            Diagnostic::new(DiagnosticCode::ClosureHoisted, message)
                .with_span(hoisted.span)
                .build(),
        );
    }
    hints
}

/// Files to process for `input`: the file itself, or every matching file under a directory.
pub fn collect_files(input: &Path, config: &TransformConfig) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.exists() {
        anyhow::bail!("{} does not exist", input.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(input)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path
            .components()
            .any(|c| config.exclude.iter().any(|ex| c.as_os_str() == ex.as_str()))
        {
            continue;
        }
        let matches_extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| config.extensions.iter().any(|e| e == ext));
        if path.is_file() && matches_extension {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str, source_type: Option<SourceType>) -> (Option<Transformed>, Diagnostics) {
        let mut cache = SourceCache::new();
        let mut diagnostics = Diagnostics::new();
        let result = transform_source(source, "test.js", source_type, &mut cache, &mut diagnostics);
        (result, diagnostics)
    }

    #[test]
    fn test_transform_source() {
        let (result, diagnostics) = run(
            "function outer() { return () => 1; }",
            Some(SourceType::Module),
        );
        let result = result.unwrap();

        assert!(diagnostics.is_empty());
        assert_eq!(result.report.len(), 1);
        assert!(result.output.starts_with("function _ref() {"));
    }

    #[test]
    fn test_parse_error_is_reported() {
        let (result, diagnostics) = run("function (", Some(SourceType::Module));
        assert!(result.is_none());
        assert_eq!(diagnostics.error_count(), 1);
    }

    #[test]
    fn test_auto_source_type() {
        let (result, _) = run("function outer() { return () => 1; }", None);
        let result = result.unwrap();
        assert_eq!(result.source_type, SourceType::Script);
        assert!(result.report.is_empty());
    }

    #[test]
    fn test_hints_name_the_closure() {
        let (result, _) = run(
            "function outer() { function inner() {} return inner; }",
            Some(SourceType::Module),
        );
        let hints = hoist_hints(&result.unwrap().report);

        assert_eq!(hints.hint_count(), 1);
        let hint = hints.iter().next().unwrap();
        assert_eq!(hint.code, DiagnosticCode::ClosureHoisted);
        assert!(hint.message.contains("`inner`"));
        assert!(hint.message.contains("`_inner`"));
    }

    #[test]
    fn test_collect_single_file_ignores_extension_filter() {
        let config = TransformConfig::default();
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml");
        assert_eq!(collect_files(&path, &config).unwrap(), vec![path]);
    }

    #[test]
    fn test_collect_missing_input_fails() {
        let config = TransformConfig::default();
        assert!(collect_files(Path::new("does/not/exist"), &config).is_err());
    }
}
