//! Front-end errors definitions.

use crate::Loc;
use thiserror::Error;

/// An alias for result that can be a [`AstError`].
pub type AstResult<T> = Result<T, AstError>;

/// The front-end error type.
#[derive(Debug, Error)]
pub enum AstError {
    /// Input text contains a character that starts no token.
    #[error("{loc}: unexpected character {found:?}")]
    Lexing { loc: Loc, found: char },

    /// Token stream does not match the grammar.
    #[error("{loc}: expected {expected}, found {found}")]
    Parsing {
        loc: Loc,
        expected: String,
        found: String,
    },

    /// Integer literal does not fit.
    #[error("{loc}: integer literal out of range: {literal}")]
    IntOverflow { loc: Loc, literal: String },

    /// Statements or expressions are nested too deeply.
    #[error("{loc}: nesting deeper than {limit} levels")]
    TooDeep { loc: Loc, limit: usize },
}
