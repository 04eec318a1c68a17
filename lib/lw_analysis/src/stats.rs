//! Simple metrics on control flow graphs and analysis runs.

use crate::controlflow::Cfg;
use crate::liveness::Liveness;
use petgraph::visit::{depth_first_search, DfsEvent};
use serde::Serialize;
use std::fmt;
use std::ops::AddAssign;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CfgStats {
    pub blocks: usize,
    pub edges: usize,
    pub statements: usize,
    pub dead_blocks: usize,
    /// Edges closing a loop.
    pub back_edges: usize,
    /// Block evaluations done by the solver.
    pub visits: usize,
}

impl CfgStats {
    #[must_use]
    pub fn of_cfg(cfg: &Cfg) -> Self {
        let mut stats = Self {
            blocks: cfg.nb_blocks(),
            edges: cfg.nb_edges(),
            statements: cfg.nb_statements(),
            ..Self::default()
        };
        stats.dead_blocks = cfg
            .iter_blocks()
            .filter(|(_, block)| block.is_dead())
            .count();
        // blocks are created in program order, so starting from every
        // block in index order also walks dead loops from their header
        depth_first_search(&cfg.inner, cfg.inner.node_indices(), |event| {
            if let DfsEvent::BackEdge(_, _) = event {
                stats.back_edges += 1;
            }
        });
        stats
    }

    #[must_use]
    pub fn of_liveness(liveness: &Liveness) -> Self {
        Self {
            visits: liveness.iterations(),
            ..Self::of_cfg(liveness.cfg())
        }
    }
}

impl AddAssign for CfgStats {
    fn add_assign(&mut self, other: Self) {
        self.blocks += other.blocks;
        self.edges += other.edges;
        self.statements += other.statements;
        self.dead_blocks += other.dead_blocks;
        self.back_edges += other.back_edges;
        self.visits += other.visits;
    }
}

impl fmt::Display for CfgStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "blocks:      {}", self.blocks)?;
        writeln!(f, "edges:       {}", self.edges)?;
        writeln!(f, "statements:  {}", self.statements)?;
        writeln!(f, "dead blocks: {}", self.dead_blocks)?;
        writeln!(f, "back edges:  {}", self.back_edges)?;
        write!(f, "visits:      {}", self.visits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataflow::Options;
    use lw_ast::parse;

    #[test]
    fn loops_and_dead_code() {
        let program = parse(
            "class T { int m() { while (a) { while (b) {} if (c) continue; d = 1; } return d; while (e) { f = 1; } } }",
        )
        .unwrap();
        let method = &program.classes[0].methods[0];
        let liveness = Liveness::compute(method, &Options::default()).unwrap();
        let stats = CfgStats::of_liveness(&liveness);
        assert_eq!(stats.back_edges, 3);
        assert_eq!(stats.dead_blocks, 2);
        assert_eq!(stats.statements, 8);
        assert_eq!(stats.visits, liveness.iterations());

        let mut total = CfgStats::default();
        total += stats;
        total += stats;
        assert_eq!(total.blocks, 2 * stats.blocks);
    }
}
