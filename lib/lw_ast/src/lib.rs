//! This crate provides the abstract syntax tree of the small Java-like
//! language analyzed by the `LiveWorks` project, along with its lexer,
//! parser and pretty printer.
//!
//! Every statement node carries a [`NodeId`] that is stable for the
//! lifetime of the parsed [`Program`] and can be used as a map key by
//! analyses, and a [`Loc`] pointing back into the source text.

pub mod ast;
pub mod errors;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod usedef;

pub use ast::*;
pub use printer::{PrettyPrinter, StmtHeader};

use crate::errors::AstResult;
use serde::Serialize;
use std::fmt;

/// Stable identity of a statement node, assigned in program order at
/// parsing time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A line/column position in source text (both 1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Loc {
    pub line: u32,
    pub col: u32,
}

impl Loc {
    #[must_use]
    pub const fn start() -> Self {
        Self { line: 1, col: 1 }
    }
}

impl Default for Loc {
    fn default() -> Self {
        Self::start()
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// Source parsing function, takes program text and returns a freshly
/// built [`Program`].
///
/// # Errors
///
/// Returns an [`errors::AstError`] on lexing or syntax errors.
pub fn parse(src: &str) -> AstResult<Program> {
    let tokens = lexer::tokenize(src)?;
    log::trace!("{} tokens", tokens.len());
    parser::Parser::new(tokens).program()
}
