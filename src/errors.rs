//! Global error handling.
//!
//! Each sub-crate of the project defines its own type error.
//! Their types can be unified, for example in a main function,
//! when winding results at the top-level.
//!
//! ```rust
//! use liveworks::prelude::*;
//!
//! fn main() -> LwResult<()> { // can return a LwError
//!    let _program = parse("class A { }")?; // can return an AstError
//!    Ok(())
//! }
//! ```

use lw_analysis::errors::AnalysisError;
use lw_ast::errors::AstError;
use std::io;
use thiserror::Error;

/// An alias for result that can be a [`LwError`].
pub type LwResult<T> = Result<T, LwError>;

/// The main error type for error winding at the top-level.
/// It mainly consists of transparent wrapper over error types that
/// are defined in dependencies.
#[derive(Debug, Error)]
pub enum LwError {
    /// Custom error for reporting bad command line arguments usage.
    #[error("bad arguments: {0}")]
    BadArguments(String),

    /// Error that can be returned from [I/O operations](std::io).
    #[error(transparent)]
    IO(#[from] io::Error),

    /// Error that can be returned from regex compilation.
    #[error(transparent)]
    Regex(#[from] regex::Error),

    /// Error that can be returned from JSON serialization.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Error that can be returned from [`lw_analysis`] functions.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    /// Error that can be returned from [`lw_ast`] parsing functions.
    #[error(transparent)]
    Ast(#[from] AstError),

    /// Some methods of the input program could not be analyzed.
    #[error("{failed} method(s) out of {total} could not be analyzed")]
    FailedMethods { failed: usize, total: usize },
}
