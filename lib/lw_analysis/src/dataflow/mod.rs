//! Dataflow analysis framework.

use lw_ast::NodeId;
use petgraph::graph::NodeIndex;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

mod backward;

pub use backward::{backward, backward_with, AbstractBackwardState};

/// Initial ordering of blocks in the worklist. The fixpoint does not
/// depend on it, only the number of iterations needed to reach it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorklistOrder {
    /// Postorder from the entry block, successors are visited before
    /// their predecessors (the best order for backward problems).
    #[default]
    PostOrder,
    ReversePostOrder,
    /// Block creation order.
    Fifo,
}

impl WorklistOrder {
    pub const NAMES: &'static [&'static str] = &["postorder", "rpo", "fifo"];
}

impl FromStr for WorklistOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "postorder" => Ok(Self::PostOrder),
            "rpo" => Ok(Self::ReversePostOrder),
            "fifo" => Ok(Self::Fifo),
            _ => Err(format!(
                "unknown worklist order `{s}` (expected one of: {})",
                Self::NAMES.join(", ")
            )),
        }
    }
}

impl fmt::Display for WorklistOrder {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::PostOrder => write!(f, "postorder"),
            Self::ReversePostOrder => write!(f, "rpo"),
            Self::Fifo => write!(f, "fifo"),
        }
    }
}

/// Analysis options.
#[derive(Debug, Clone)]
pub struct Options {
    pub order: WorklistOrder,
    /// Check control flow graph well-formedness before solving.
    pub check_invariants: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            order: WorklistOrder::default(),
            check_invariants: true,
        }
    }
}

impl Options {
    #[must_use]
    pub fn with_order(mut self, order: WorklistOrder) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub fn with_invariants_check(mut self, check: bool) -> Self {
        self.check_invariants = check;
        self
    }
}

/// Dataflow analysis result object.
///
/// Contains entries and exits abstract states for every block of the
/// analyzed method, and for every statement it holds, after reaching
/// fixpoint.
#[derive(Debug, Clone)]
pub struct Dataflow<S> {
    pub block_entries: BTreeMap<NodeIndex, S>,
    pub block_exits: BTreeMap<NodeIndex, S>,
    pub entries: BTreeMap<NodeId, S>,
    pub exits: BTreeMap<NodeId, S>,
    /// Number of block evaluations done by the solver.
    pub iterations: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_names() {
        for name in WorklistOrder::NAMES {
            let order: WorklistOrder = name.parse().unwrap();
            assert_eq!(&order.to_string(), name);
        }
        assert!("dfs".parse::<WorklistOrder>().is_err());
    }

    #[test]
    fn default_options() {
        let options = Options::default();
        assert_eq!(options.order, WorklistOrder::PostOrder);
        assert!(options.check_invariants);
        let options = options
            .with_order(WorklistOrder::Fifo)
            .with_invariants_check(false);
        assert_eq!(options.order, WorklistOrder::Fifo);
        assert!(!options.check_invariants);
    }
}
