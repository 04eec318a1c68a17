//! Live variables analysis.
//!
//! A variable is live before a statement if some path from that
//! statement reads it before any write. The analysis is a backward
//! dataflow problem over the control flow graph of a method, whose
//! result is published as a [`LiveMap`] keyed by statement identity.

use crate::controlflow::Cfg;
use crate::dataflow::{self, AbstractBackwardState, Dataflow, Options};
use crate::errors::{AnalysisError, AnalysisResult};
use fixedbitset::FixedBitSet;
use lw_ast::{Method, NodeId, Stmt, StmtKind};
use petgraph::graph::NodeIndex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Dense numbering of the variable names of a method.
#[derive(Debug, Default)]
pub struct VarTable<'a> {
    names: Vec<&'a str>,
    index: BTreeMap<&'a str, usize>,
}

impl<'a> VarTable<'a> {
    /// Collects parameters, declared locals and every name read or
    /// written by a statement of the method body.
    #[must_use]
    pub fn new(method: &'a Method) -> Self {
        let mut table = Self::default();
        for decl in method.params.iter().chain(&method.locals) {
            table.add(&decl.name);
        }
        for stmt in method.statements() {
            for name in stmt.uses().into_iter().chain(stmt.defs()) {
                table.add(name);
            }
        }
        table
    }

    fn add(&mut self, name: &'a str) {
        if !self.index.contains_key(name) {
            self.index.insert(name, self.names.len());
            self.names.push(name);
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    #[must_use]
    pub fn name(&self, index: usize) -> Option<&'a str> {
        self.names.get(index).copied()
    }

    fn lookup(&self, name: &str, stmt: &Stmt) -> AnalysisResult<usize> {
        self.index_of(name).ok_or_else(|| {
            AnalysisError::Internal(format!(
                "variable `{name}` of statement {} is not numbered",
                stmt.id
            ))
        })
    }

    /// Translates a state into the set of variable names it holds.
    #[must_use]
    pub fn names_of(&self, state: &LiveVars) -> BTreeSet<&'a str> {
        state.bits.ones().filter_map(|i| self.name(i)).collect()
    }
}

/// The abstract state of the analysis: a set of live variables, as
/// indices into the [`VarTable`] of the method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveVars {
    bits: FixedBitSet,
}

impl fmt::Display for LiveVars {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{")?;
        for (i, var) in self.bits.ones().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "v{var}")?;
        }
        write!(f, "}}")
    }
}

impl LiveVars {
    #[inline]
    #[must_use]
    pub fn contains(&self, var: usize) -> bool {
        self.bits.contains(var)
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.count_ones(..) == 0
    }

    /// Iterates over live variable indices, in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits.ones()
    }
}

impl<'a> AbstractBackwardState<'a> for LiveVars {
    type Context<'c> = VarTable<'c>;
    type Error = AnalysisError;

    fn init(_cfg: &Cfg<'a>, ctx: &VarTable<'a>) -> AnalysisResult<Self> {
        Ok(Self {
            bits: FixedBitSet::with_capacity(ctx.len()),
        })
    }

    fn meet(&mut self, other: &Self, _ctx: &VarTable<'a>) -> AnalysisResult<()> {
        self.bits.union_with(&other.bits);
        Ok(())
    }

    // IN(s) = USE(s) u (OUT(s) - DEF(s)), definitions are removed first
    // so that a variable both read and written stays live.
    fn transfer_stmt(&mut self, stmt: &'a Stmt, ctx: &VarTable<'a>) -> AnalysisResult<()> {
        for name in stmt.defs() {
            self.bits.set(ctx.lookup(name, stmt)?, false);
        }
        for name in stmt.uses() {
            self.bits.insert(ctx.lookup(name, stmt)?);
        }
        Ok(())
    }

    fn includes(&self, other: &Self) -> bool {
        other.bits.is_subset(&self.bits)
    }
}

/// The published result of the analysis: for every statement, the set
/// of variables live immediately before it.
///
/// A map is never modified once returned to the caller; computing
/// liveness again builds a new one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LiveMap(BTreeMap<NodeId, BTreeSet<String>>);

impl LiveMap {
    fn from_states(states: &BTreeMap<NodeId, LiveVars>, vars: &VarTable) -> Self {
        Self(
            states
                .iter()
                .map(|(id, state)| {
                    let names = vars.names_of(state).into_iter().map(String::from).collect();
                    (*id, names)
                })
                .collect(),
        )
    }

    #[must_use]
    pub fn get(&self, stmt: NodeId) -> Option<&BTreeSet<String>> {
        self.0.get(&stmt)
    }

    #[must_use]
    pub fn is_live(&self, stmt: NodeId, var: &str) -> bool {
        self.get(stmt).map_or(false, |vars| vars.contains(var))
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates in statement identity order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &BTreeSet<String>)> {
        self.0.iter().map(|(id, vars)| (*id, vars))
    }

    // Statement identities are unique program-wide, so maps of distinct
    // methods never overlap.
    pub(crate) fn extend(&mut self, other: Self) -> AnalysisResult<()> {
        for (id, vars) in other.0 {
            if self.0.insert(id, vars).is_some() {
                return Err(AnalysisError::Internal(format!(
                    "statement {id} is analyzed twice"
                )));
            }
        }
        Ok(())
    }
}

/// An assignment whose target is not live after the statement.
#[derive(Debug, Clone, Copy)]
pub struct DeadStore<'a> {
    pub stmt: &'a Stmt,
    pub var: &'a str,
    /// The assignment itself is never executed.
    pub unreachable: bool,
}

/// Liveness of a single method.
#[derive(Debug)]
pub struct Liveness<'a> {
    method: &'a Method,
    cfg: Cfg<'a>,
    vars: VarTable<'a>,
    flow: Dataflow<LiveVars>,
    map: LiveMap,
}

fn fmt_names(names: &BTreeSet<&str>) -> String {
    format!("{{{}}}", names.iter().copied().collect::<Vec<_>>().join(", "))
}

impl<'a> Liveness<'a> {
    /// Builds the control flow graph of the method and runs the solver
    /// up to fixpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the method body contains unsupported
    /// constructs, or an internal error on broken invariants.
    pub fn compute(method: &'a Method, options: &Options) -> AnalysisResult<Self> {
        Self::solve(method, options, None)
    }

    fn solve(
        method: &'a Method,
        options: &Options,
        seed: Option<&Dataflow<LiveVars>>,
    ) -> AnalysisResult<Self> {
        let cfg = Cfg::build(method)?;
        let vars = VarTable::new(method);
        log::debug!("{} variables in {}", vars.len(), method.name);
        let flow: Dataflow<LiveVars> = dataflow::backward_with(&cfg, &vars, options, seed)?;
        let map = LiveMap::from_states(&flow.entries, &vars);
        Ok(Self {
            method,
            cfg,
            vars,
            flow,
            map,
        })
    }

    /// Runs the analysis again, starting from the current fixpoint.
    /// The returned object is independent from `self`, and its result
    /// map is expected to be equal to the current one.
    ///
    /// # Errors
    ///
    /// See [`Liveness::compute`].
    pub fn recompute(&self, options: &Options) -> AnalysisResult<Self> {
        Self::solve(self.method, options, Some(&self.flow))
    }

    #[inline]
    #[must_use]
    pub fn method(&self) -> &'a Method {
        self.method
    }

    #[inline]
    #[must_use]
    pub fn cfg(&self) -> &Cfg<'a> {
        &self.cfg
    }

    #[inline]
    #[must_use]
    pub fn vars(&self) -> &VarTable<'a> {
        &self.vars
    }

    #[inline]
    #[must_use]
    pub fn dataflow(&self) -> &Dataflow<LiveVars> {
        &self.flow
    }

    #[inline]
    #[must_use]
    pub fn result_map(&self) -> &LiveMap {
        &self.map
    }

    #[must_use]
    pub fn into_result_map(self) -> LiveMap {
        self.map
    }

    #[inline]
    #[must_use]
    pub fn iterations(&self) -> usize {
        self.flow.iterations
    }

    #[must_use]
    pub fn live_in(&self, block: NodeIndex) -> BTreeSet<&'a str> {
        self.flow
            .block_entries
            .get(&block)
            .map(|state| self.vars.names_of(state))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn live_out(&self, block: NodeIndex) -> BTreeSet<&'a str> {
        self.flow
            .block_exits
            .get(&block)
            .map(|state| self.vars.names_of(state))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn live_before(&self, stmt: NodeId) -> Option<BTreeSet<&'a str>> {
        self.flow
            .entries
            .get(&stmt)
            .map(|state| self.vars.names_of(state))
    }

    #[must_use]
    pub fn live_after(&self, stmt: NodeId) -> Option<BTreeSet<&'a str>> {
        self.flow
            .exits
            .get(&stmt)
            .map(|state| self.vars.names_of(state))
    }

    /// Lists assignments whose value is never read, in program order.
    #[must_use]
    pub fn dead_stores(&self) -> Vec<DeadStore<'a>> {
        let mut stores = Vec::new();
        for (id, block) in self.cfg.iter_blocks() {
            for stmt in block.statements() {
                if let StmtKind::Assign { target, .. } = &stmt.kind {
                    let live = self
                        .vars
                        .index_of(target)
                        .zip(self.flow.exits.get(&stmt.id))
                        .map_or(false, |(var, state)| state.contains(var));
                    if !live {
                        stores.push(DeadStore {
                            stmt,
                            var: target.as_str(),
                            unreachable: self.cfg.block(id).is_dead(),
                        });
                    }
                }
            }
        }
        stores.sort_by_key(|store| store.stmt.id);
        stores
    }

    /// Dot rendering of the control flow graph, each block labelled
    /// with its live-in and live-out sets.
    #[must_use]
    pub fn to_dot(&self) -> String {
        self.cfg.to_dot_with(|id| {
            Some(format!(
                "IN: {}\nOUT: {}",
                fmt_names(&self.live_in(id)),
                fmt_names(&self.live_out(id))
            ))
        })
    }
}

impl<'a> fmt::Display for Liveness<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (id, block) in self.cfg.iter_blocks() {
            write!(f, "block {}", id.index())?;
            if block.is_dead() {
                write!(f, " (dead)")?;
            }
            writeln!(f)?;
            writeln!(f, "  IN:  {}", fmt_names(&self.live_in(id)))?;
            for line in block.to_string().lines() {
                writeln!(f, "  {line}")?;
            }
            writeln!(f, "  OUT: {}", fmt_names(&self.live_out(id)))?;
        }
        Ok(())
    }
}
