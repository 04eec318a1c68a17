//! # `LiveWorks`
//!
//! `liveworks` is the main crate of the `LiveWorks` project, a live
//! variables analysis toolset for a small Java-like language. The
//! project is subdivided into multiple crates, `liveworks` acts as entry
//! point by reexporting important structs and functions from those
//! sub-crates. Most of the reexport are done within the
//! `liveworks::prelude` namespace.
//!
//! ## Library basics
//!
//! Programs are parsed with [`lw_ast::parse`], then each method can be
//! analyzed on its own:
//!
//! ```rust
//! use liveworks::prelude::*;
//!
//! let program = parse("class A { int f(int n) { x = n + 1; return x; } }")?;
//! let method = &program.classes[0].methods[0];
//! let liveness = Liveness::compute(method, &Options::default())?;
//! let first = &method.body[0];
//! assert!(liveness.result_map().is_live(first.id, "n"));
//! # Ok::<(), LwError>(())
//! ```
//!
//! ## Sub-crates
//!
//!  - [`lw_ast`] contains the syntax tree definitions, the parser and
//!    the pretty printer,
//!  - [`lw_analysis`] contains control flow graphs construction and the
//!    dataflow analysis algorithms.

mod errors;

pub mod cli;
pub mod lw_cfg;
pub mod lw_deadstores;
pub mod lw_liveness;
pub mod source;

pub use lw_analysis as analysis;
pub use lw_ast as ast;

/// Reexport module of commonly used structures and functions from
/// `LiveWorks` project sub-crates:
///
/// ```rust
/// use liveworks::prelude::*;
/// ```
pub mod prelude {
    pub use crate::errors::{LwError, LwResult};

    pub use lw_analysis::controlflow::{self, Cfg};
    pub use lw_analysis::liveness::{LiveMap, Liveness};
    pub use lw_analysis::{Options, WorklistOrder};

    pub use lw_ast::{parse, Class, Method, NodeId, Program, Stmt};

    use clap::ArgMatches;

    pub fn init_logger(args: &ArgMatches) {
        let env = env_logger::Env::new()
            .filter_or("LW_LOG", "info")
            .write_style("LW_LOG_STYLE");

        let mut builder = env_logger::Builder::from_env(env);
        if args.get_flag("verbose") {
            builder.filter_level(log::LevelFilter::Trace);
        } else if args.get_flag("debug") {
            builder.filter_level(log::LevelFilter::Debug);
        }
        if args.get_flag("ecslog") {
            builder.format(ecs_logger::format);
        }
        builder.init();
    }
}

#[cfg(test)]
mod tests {
    use crate::cli;
    use crate::prelude::init_logger;

    #[test]
    fn debug_flag_raises_log_level() {
        let args = cli::liveness()
            .try_get_matches_from(["lw-liveness", "--debug"])
            .unwrap();
        init_logger(&args);
        assert_eq!(log::max_level(), log::LevelFilter::Debug);
    }
}
