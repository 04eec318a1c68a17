//! This crate provides control flow graph construction and live
//! variables analysis for the `LiveWorks` project.
//!
//! The analysis of a method goes through three steps: the method body
//! is partitioned into basic blocks ([`controlflow::Cfg::build`]), a
//! backward worklist solver computes live sets up to fixpoint
//! ([`dataflow::backward`]), and the result is published as an
//! immutable [`liveness::LiveMap`] keyed by statement identity.

pub mod controlflow;
pub mod dataflow;
pub mod errors;
pub mod liveness;
pub mod registers;
pub mod stats;

pub use dataflow::{Options, WorklistOrder};

use crate::errors::AnalysisResult;
use crate::liveness::{LiveMap, Liveness};
use lw_ast::{Method, Program};

/// Computes the result map of a single method.
///
/// # Errors
///
/// See [`Liveness::compute`].
pub fn analyze_method(method: &Method, options: &Options) -> AnalysisResult<LiveMap> {
    Liveness::compute(method, options).map(Liveness::into_result_map)
}

/// Computes liveness of every method of a program, and merges results
/// into a single map. Analysis stops at the first failing method.
///
/// # Errors
///
/// See [`Liveness::compute`].
pub fn analyze_program(program: &Program, options: &Options) -> AnalysisResult<LiveMap> {
    let mut map = LiveMap::default();
    for (class, method) in program.iter_methods() {
        log::debug!("analyzing {}", method.descriptor(class));
        map.extend(analyze_method(method, options)?)?;
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lw_ast::parse;

    #[test]
    fn whole_program() {
        let program = parse(
            "class A { int f(int a) { b = a; return b; } } \
             class B extends A { int g() { return c; } void h() { } }",
        )
        .unwrap();
        let map = analyze_program(&program, &Options::default()).unwrap();
        assert_eq!(map.len(), 3);
        let stmts: Vec<_> = program
            .iter_methods()
            .flat_map(|(_, method)| method.statements())
            .collect();
        assert!(map.is_live(stmts[0].id, "a"));
        assert!(map.is_live(stmts[1].id, "b"));
        assert!(map.is_live(stmts[2].id, "c"));
        assert!(!map.is_live(stmts[2].id, "a"));
    }

    #[test]
    fn failing_method_aborts() {
        let program = parse("class A { int f() { return 1; } void g() { break; } }").unwrap();
        assert!(analyze_program(&program, &Options::default()).is_err());
    }
}
