//! Closure hoisting for hoist
//!
//! Finds function literals that do not depend on per-activation state and
//! moves each one to the outermost scope where it still sees the same
//! bindings, replacing the original occurrence with a reference:
//! - Risk marking (`this`-like captures, `eval` and `with`)
//! - Eligibility classification
//! - Destination scope resolution and attachment point lookup
//! - The tree rewrite itself

pub mod attach;
pub mod eligibility;
pub mod error;
pub mod pass;
pub mod resolve;
pub mod rewrite;
pub mod risk;

#[cfg(test)]
mod test_util;

// Re-export the pass entry point
pub use eligibility::{ClosureCandidate, SkipReason, Verdict};
pub use error::HoistError;
pub use pass::{hoist_closures, HoistCase, HoistReport, HoistedClosure};
pub use risk::{RiskMarks, RiskTable};
