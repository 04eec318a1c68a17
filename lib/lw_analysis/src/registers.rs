//! Register assignment on top of liveness results.
//!
//! Variables of a method are nodes of an interference graph. Two
//! variables interfere when both are live before the same statement or
//! at the entry of the same block, or when one is written while the
//! other is live after the write. Registers are then assigned by greedy
//! coloring of that graph, in variable numbering order.

use crate::liveness::{LiveVars, Liveness};
use fixedbitset::FixedBitSet;
use petgraph::graphmap::UnGraphMap;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Where a variable is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Register(usize),
    Spilled,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Register(n) => write!(f, "r{n}"),
            Self::Spilled => write!(f, "spilled"),
        }
    }
}

/// Interference graph of the variables of a method, as numbered by
/// its [`crate::liveness::VarTable`].
#[derive(Debug)]
pub struct Interference<'a> {
    names: Vec<&'a str>,
    graph: UnGraphMap<usize, ()>,
}

impl<'a> Interference<'a> {
    #[must_use]
    pub fn of_liveness(liveness: &Liveness<'a>) -> Self {
        let vars = liveness.vars();
        let names: Vec<&'a str> = (0..vars.len()).filter_map(|i| vars.name(i)).collect();
        let mut graph = UnGraphMap::with_capacity(names.len(), 0);
        for var in 0..names.len() {
            graph.add_node(var);
        }

        let flow = liveness.dataflow();
        for state in flow.entries.values().chain(flow.block_entries.values()) {
            Self::add_clique(&mut graph, state);
        }
        for stmt in liveness.method().statements() {
            let Some(after) = flow.exits.get(&stmt.id) else {
                continue;
            };
            for def in stmt.defs().into_iter().filter_map(|name| vars.index_of(name)) {
                for var in after.iter().filter(|var| *var != def) {
                    graph.add_edge(def, var, ());
                }
            }
        }

        log::debug!(
            "interference graph of {}: {} variables, {} edges",
            liveness.method().name,
            graph.node_count(),
            graph.edge_count()
        );
        Self { names, graph }
    }

    fn add_clique(graph: &mut UnGraphMap<usize, ()>, state: &LiveVars) {
        let live: Vec<usize> = state.iter().collect();
        for (i, a) in live.iter().enumerate() {
            for b in &live[i + 1..] {
                graph.add_edge(*a, *b, ());
            }
        }
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| *n == name)
    }

    #[inline]
    #[must_use]
    pub fn nb_vars(&self) -> usize {
        self.names.len()
    }

    #[inline]
    #[must_use]
    pub fn nb_edges(&self) -> usize {
        self.graph.edge_count()
    }

    #[must_use]
    pub fn interferes(&self, a: &str, b: &str) -> bool {
        match (self.index_of(a), self.index_of(b)) {
            (Some(a), Some(b)) => self.graph.contains_edge(a, b),
            _ => false,
        }
    }

    #[must_use]
    pub fn neighbors(&self, name: &str) -> BTreeSet<&'a str> {
        self.index_of(name)
            .map(|var| {
                self.graph
                    .neighbors(var)
                    .filter_map(|n| self.names.get(n).copied())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Greedy coloring with `k` registers. Each variable gets the
    /// lowest register not used by an already colored neighbor, or is
    /// spilled if there is none.
    #[must_use]
    pub fn assign(&self, k: usize) -> Assignment {
        let mut colors: Vec<Option<usize>> = vec![None; self.names.len()];
        for var in 0..self.names.len() {
            let mut taken = FixedBitSet::with_capacity(k);
            for n in self.graph.neighbors(var) {
                if let Some(color) = colors[n] {
                    taken.insert(color);
                }
            }
            colors[var] = (0..k).find(|color| !taken.contains(*color));
        }

        Assignment(
            self.names
                .iter()
                .zip(colors)
                .map(|(name, color)| {
                    let loc = color.map_or(Location::Spilled, Location::Register);
                    ((*name).to_string(), loc)
                })
                .collect(),
        )
    }
}

/// Location of every variable of a method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Assignment(BTreeMap<String, Location>);

impl Assignment {
    #[must_use]
    pub fn get(&self, var: &str) -> Option<Location> {
        self.0.get(var).copied()
    }

    #[must_use]
    pub fn nb_spilled(&self) -> usize {
        self.0
            .values()
            .filter(|loc| **loc == Location::Spilled)
            .count()
    }

    /// Number of distinct registers in use.
    #[must_use]
    pub fn nb_registers(&self) -> usize {
        self.0
            .values()
            .filter_map(|loc| match loc {
                Location::Register(n) => Some(*n),
                Location::Spilled => None,
            })
            .collect::<BTreeSet<_>>()
            .len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Location)> {
        self.0.iter().map(|(name, loc)| (name.as_str(), *loc))
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, (name, loc)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}: {loc}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataflow::Options;
    use lw_ast::{parse, Program};

    fn program(body: &str) -> Program {
        parse(&format!("class T {{ int m(int n) {{ {body} }} }}")).unwrap()
    }

    fn liveness(program: &Program) -> Liveness {
        Liveness::compute(&program.classes[0].methods[0], &Options::default()).unwrap()
    }

    #[test]
    fn straight_line() {
        let p = program("a = 1; b = a + 1; c = b + a; return c;");
        let l = liveness(&p);
        let graph = Interference::of_liveness(&l);
        assert_eq!(graph.nb_vars(), 4);
        assert_eq!(graph.nb_edges(), 1);
        assert!(graph.interferes("a", "b"));
        assert!(!graph.interferes("b", "c"));
        assert!(graph.neighbors("n").is_empty());

        let regs = graph.assign(2);
        assert_eq!(regs.get("n"), Some(Location::Register(0)));
        assert_eq!(regs.get("a"), Some(Location::Register(0)));
        assert_eq!(regs.get("b"), Some(Location::Register(1)));
        assert_eq!(regs.get("c"), Some(Location::Register(0)));
        assert_eq!(regs.nb_registers(), 2);
        assert_eq!(regs.to_string(), "a: r0, b: r1, c: r0, n: r0");

        let regs = graph.assign(1);
        assert_eq!(regs.get("b"), Some(Location::Spilled));
        assert_eq!(regs.nb_spilled(), 1);
    }

    #[test]
    fn unread_definition_interferes() {
        let p = program("y = 2; x = 1; return y;");
        let graph = Interference::of_liveness(&liveness(&p));
        assert!(graph.interferes("x", "y"));
        assert_eq!(graph.neighbors("y").into_iter().collect::<Vec<_>>(), ["x"]);
    }

    #[test]
    fn loop_variables() {
        let p = program("i = 0; s = 0; while (i < n) { s = s + i; i = i + 1; } return s;");
        let graph = Interference::of_liveness(&liveness(&p));
        assert!(graph.interferes("i", "n"));
        assert!(graph.interferes("i", "s"));
        assert!(graph.interferes("n", "s"));

        let regs = graph.assign(3);
        assert_eq!(regs.nb_spilled(), 0);
        assert_eq!(regs.nb_registers(), 3);

        let regs = graph.assign(2);
        assert_eq!(regs.get("s"), Some(Location::Spilled));
    }

    #[test]
    fn interfering_variables_never_share_a_register() {
        let p = program(
            "i = 0; s = 0; \
             while (i < n) { \
                 if (s > 100) { s = s - 1; continue; } \
                 j = 0; \
                 while (j < i) { t = s + j; s = t; j = j + 1; } \
                 i = i + 1; \
             } \
             return s;",
        );
        let graph = Interference::of_liveness(&liveness(&p));
        for k in 0..5 {
            let regs = graph.assign(k);
            for (a, loc_a) in regs.iter() {
                for (b, loc_b) in regs.iter() {
                    if a != b && graph.interferes(a, b) && loc_a != Location::Spilled {
                        assert_ne!(loc_a, loc_b, "{a} and {b} share {loc_a} with {k} registers");
                    }
                }
            }
        }
    }

    #[test]
    fn no_registers() {
        let p = program("x = n; return x;");
        let regs = Interference::of_liveness(&liveness(&p)).assign(0);
        assert_eq!(regs.nb_spilled(), 2);
        assert_eq!(regs.nb_registers(), 0);
    }
}
