//! Closure hoisting pass
//!
//! Visits every function in post-order, so nested closures are resolved
//! (and any relocation they cause is visible in the scope model) before the
//! functions that contain them are considered.

use crate::attach::attachment_point;
use crate::eligibility::{ClosureCandidate, Verdict};
use crate::error::HoistError;
use crate::rewrite::relocate;
use crate::risk::RiskTable;
use hoist_hir::Program;

pub use crate::rewrite::{HoistCase, HoistedClosure};

/// Closures relocated by one run, in the order they were moved
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HoistReport {
    pub hoisted: Vec<HoistedClosure>,
}

impl HoistReport {
    pub fn len(&self) -> usize {
        self.hoisted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hoisted.is_empty()
    }
}

/// Hoist every eligible closure in `program`, in place.
///
/// Skipped closures are left untouched. An error means the tree and scope
/// model disagree; the program must not be emitted in that case.
pub fn hoist_closures(program: &mut Program) -> Result<HoistReport, HoistError> {
    let risks = RiskTable::build(&program.tree, program.root);
    let mut report = HoistReport::default();

    for function in program.tree.functions_post_order(program.root) {
        let Some(candidate) = ClosureCandidate::analyze(program, &risks, function) else {
            continue;
        };
        if let Verdict::Skip(reason) = candidate.verdict {
            log::trace!("closure {} skipped: {}", function, reason);
            continue;
        }
        let Some(destination) = candidate.destination else {
            log::trace!(
                "closure {} stays in place ({} free bindings)",
                function,
                candidate.free_bindings.len()
            );
            continue;
        };

        let hoisted = attachment_point(program, destination, function)
            .and_then(|anchor| relocate(program, &candidate, destination, anchor))
            .map_err(|e| {
                log::error!("closure hoisting aborted: {}", e);
                e
            })?;

        log::debug!(
            "hoisted {} `{}` as `{}` into scope {}",
            hoisted.case.as_str(),
            hoisted.original_name.as_deref().unwrap_or("<anonymous>"),
            hoisted.generated_name,
            destination
        );
        report.hoisted.push(hoisted);
    }

    log::debug!("{} closure(s) hoisted", report.len());
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{closure, lower, lower_as};
    use hoist_hir::print_program;
    use hoist_types::SourceType;

    fn transform(source: &str) -> (String, HoistReport) {
        let mut program = lower(source);
        let report = hoist_closures(&mut program).unwrap();
        (print_program(&program), report)
    }

    #[test]
    fn test_inner_declaration_relocates() {
        let (output, report) = transform("function outer() { function inner() { return 1; } return inner(); }");

        assert_eq!(report.len(), 1);
        assert_eq!(report.hoisted[0].generated_name, "_inner");
        assert_eq!(
            output,
            "function _inner() {\n  return 1;\n}\nfunction outer() {\n  return _inner();\n}\n"
        );
    }

    #[test]
    fn test_parameter_capture_stays() {
        let source = "function outer(x) {\n  return function () {\n    return x;\n  };\n}\n";
        let (output, report) = transform(source);

        assert!(report.is_empty());
        assert_eq!(output, source);
    }

    #[test]
    fn test_arrow_using_this_in_method_stays() {
        let source = "class A {\n  get() {\n    return () => this.value;\n  }\n}\n";
        let (output, report) = transform(source);

        assert!(report.is_empty());
        assert_eq!(output, source);
    }

    #[test]
    fn test_eval_closure_stays() {
        let (output, report) =
            transform("function outer() { function inner() { return eval('1+1'); } return inner(); }");

        assert!(report.is_empty());
        assert!(output.contains("function inner()"));
        assert!(output.contains("return inner();"));
    }

    #[test]
    fn test_two_closures_get_distinct_names() {
        let (output, report) = transform(
            "function outer() { const a = () => 1; const b = function () { return 2; }; return a() + b(); }",
        );

        let names: Vec<_> = report.hoisted.iter().map(|h| h.generated_name.as_str()).collect();
        assert_eq!(names, vec!["_ref", "_ref2"]);
        assert_eq!(report.hoisted[0].destination, report.hoisted[1].destination);
        assert_eq!(
            output,
            "function _ref() {\n  return 1;\n}\nfunction _ref2() {\n  return 2;\n}\nfunction outer() {\n  const a = _ref;\n  const b = _ref2;\n  return a() + b();\n}\n"
        );
    }

    #[test]
    fn test_nested_arrows_move_together() {
        let (output, report) = transform(
            "function outer() {\n  return (a) => (b) => a + b;\n}\n",
        );

        // The inner arrow needs `a`, so it stays; the outer one moves with it
        assert_eq!(report.len(), 1);
        assert_eq!(
            output,
            "function _ref(a) {\n  return (b) => a + b;\n}\nfunction outer() {\n  return _ref;\n}\n"
        );
    }

    #[test]
    fn test_inner_relocation_pins_container() {
        let (_, report) = transform(
            "function a(x) { function b() { function c() { return x; } return c; } return b; }",
        );

        // c moves up to a; b then references _c, which lives in a, so b stays
        assert_eq!(report.len(), 1);
        assert_eq!(report.hoisted[0].original_name.as_deref(), Some("c"));
    }

    #[test]
    fn test_monotonic_ceiling() {
        let mut program = lower(
            "function a(x) { function b(y) { function c() { return () => x + y; } return c; } return b; }",
        );
        let report = hoist_closures(&mut program).unwrap();

        for hoisted in &report.hoisted {
            let scope = program.tree.node(hoisted.function).scope.unwrap();
            let inside: Vec<_> = program.tree.descendants(hoisted.function);
            for binding in program.scopes.visible_bindings(hoisted.destination) {
                let b = program.scopes.binding(binding);
                if b.sites().any(|site| inside.contains(&site)) {
                    assert!(program.scopes.is_ancestor_or_self(b.scope, hoisted.destination));
                }
            }
            assert_eq!(program.scopes.parent(scope), Some(hoisted.destination));
        }
    }

    #[test]
    fn test_script_root_is_excluded() {
        let mut program = lower_as(
            "function outer() { function inner() { return 1; } return inner(); }",
            SourceType::Script,
        );
        let report = hoist_closures(&mut program).unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn test_script_hoists_below_root() {
        let mut program = lower_as(
            "function a() { function b() { return function () { return 1; }; } return b; }",
            SourceType::Script,
        );
        let report = hoist_closures(&mut program).unwrap();

        assert_eq!(report.len(), 1);
        let a_scope = program.tree.node(closure(&program, "a")).scope.unwrap();
        assert_eq!(report.hoisted[0].destination, a_scope);
        assert_eq!(
            print_program(&program),
            "function a() {\n  function _ref() {\n    return 1;\n  }\n  function b() {\n    return _ref;\n  }\n  return b;\n}\n"
        );
    }

    #[test]
    fn test_sloppy_block_function_stays() {
        let mut program = lower_as(
            "function a() { function b(x) { if (x) { function c() { return 1; } } return c; } return b; }",
            SourceType::Script,
        );
        let report = hoist_closures(&mut program).unwrap();
        let output = print_program(&program);

        assert!(report.is_empty());
        assert!(output.contains("function c() {"));
        assert!(output.contains("return c;"));
        assert!(!output.contains("_c"));
    }

    #[test]
    fn test_sloppy_block_function_pins_users_outside_block() {
        let mut program = lower_as(
            "function a() { function b(x) { if (x) { function c() { return 1; } } return () => c; } return b; }",
            SourceType::Script,
        );
        let report = hoist_closures(&mut program).unwrap();
        let output = print_program(&program);

        assert!(report.is_empty());
        assert!(output.contains("return () => c;"));
    }

    #[test]
    fn test_block_function_in_module_relocates() {
        let (output, report) =
            transform("function outer(ok) { if (ok) { function inner() { return 1; } inner(); } }");

        assert_eq!(report.len(), 1);
        assert!(output.starts_with("function _inner() {"));
        assert!(output.contains("_inner();"));
    }

    #[test]
    fn test_strict_closure_stays_in_strict_code() {
        let mut program = lower_as(
            "function a() { function b() { 'use strict'; return function () { return this; }; } return b; }",
            SourceType::Script,
        );
        let report = hoist_closures(&mut program).unwrap();
        let output = print_program(&program);

        assert!(report.is_empty());
        assert!(output.contains("'use strict';\n    return function () {"));
    }

    #[test]
    fn test_strict_function_hosts_its_closures() {
        let mut program = lower_as(
            "function a() { 'use strict'; function b() { return function () { return 1; }; } return b; }",
            SourceType::Script,
        );
        let report = hoist_closures(&mut program).unwrap();

        assert_eq!(report.len(), 1);
        assert_eq!(
            print_program(&program),
            "function a() {\n  'use strict';\n  function _ref() {\n    return 1;\n  }\n  function b() {\n    return _ref;\n  }\n  return b;\n}\n"
        );
    }

    #[test]
    fn test_ordering_preserved() {
        let (output, _) = transform(
            "function outer() {\n  setup();\n  if (ready) {\n    run(() => 1);\n  }\n  teardown();\n}\nfunction other() {}\n",
        );

        let ref_pos = output.find("function _ref").unwrap();
        let outer_pos = output.find("function outer").unwrap();
        let other_pos = output.find("function other").unwrap();
        assert!(ref_pos < outer_pos);
        assert!(outer_pos < other_pos);
        assert!(output.contains("run(_ref);"));
    }

    #[test]
    fn test_idempotent() {
        let mut program = lower(
            "function outer() { function inner() { return 1; } const f = () => 2; return inner() + f(); }",
        );
        let first = hoist_closures(&mut program).unwrap();
        assert_eq!(first.len(), 2);
        let once = print_program(&program);

        let second = hoist_closures(&mut program).unwrap();
        assert!(second.is_empty());
        assert_eq!(print_program(&program), once);

        // Reparsing the output loses the flags but finds nothing more to move
        let (again, report) = transform(&once);
        assert!(report.is_empty());
        assert_eq!(again, once);
    }

    #[test]
    fn test_generated_region_is_left_alone() {
        let mut program = lower("function outer() { function inner() {} return inner; }");
        let outer = closure(&program, "outer");
        program.tree.node_mut(outer).flags.generated = true;

        let report = hoist_closures(&mut program).unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn test_methods_stay() {
        let source = "function make() {\n  return {\n    m() {\n      return 1;\n    }\n  };\n}\n";
        let (output, report) = transform(source);

        assert!(report.is_empty());
        assert_eq!(output, source);
    }

    #[test]
    fn test_parameter_default_closure() {
        let (output, report) =
            transform("function outer() { function mid(cb = () => 1) { return cb(); } return mid; }");

        let names: Vec<_> = report.hoisted.iter().map(|h| h.generated_name.as_str()).collect();
        assert_eq!(names, vec!["_ref", "_mid"]);
        assert!(output.contains("function _mid(cb = _ref) {"));
        assert!(output.contains("return _mid;"));
    }

    #[test]
    fn test_shorthand_property_keeps_key() {
        let (output, _) = transform(
            "function outer() { function inner() {} return { inner }; }",
        );
        assert!(output.contains("inner: _inner"));
    }
}
