//! Analysis errors definition.

use lw_ast::Loc;
use thiserror::Error;

pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Broken graph or dataflow invariant. Never expected on graphs
    /// built by [`crate::controlflow::Cfg::build`].
    #[error("internal error: {0}")]
    Internal(String),

    #[error("{loc}: unsupported construct: {construct}")]
    UnsupportedConstruct { construct: String, loc: Loc },
}
