use crate::controlflow::Cfg;
use crate::dataflow::{Dataflow, Options, WorklistOrder};
use crate::errors::{AnalysisError, AnalysisResult};
use fixedbitset::FixedBitSet;
use lw_ast::{Stmt, StmtHeader};
use petgraph::graph::NodeIndex;
use petgraph::visit::DfsPostOrder;
use petgraph::Direction;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

/// The abstract state that is carried along the control flow graph
/// during backward dataflow analysis.
///
/// States must form a join semi-lattice of finite height, and the
/// transfer function must be monotone, for the analysis to terminate.
pub trait AbstractBackwardState<'a>: Eq + Sized {
    type Context<'c>;
    type Error;

    /// The bottom state, used as the initial value of every block and
    /// as the exit state of blocks without successors.
    ///
    /// # Errors
    ///
    /// This method should return a `Self::Error` if given graph does
    /// not allow a proper state initialization.
    fn init(cfg: &Cfg<'a>, ctx: &Self::Context<'a>) -> Result<Self, Self::Error>;

    /// The state join operation function.
    ///
    /// # Errors
    ///
    /// This method should return a `Self::Error` if given states
    /// cannot be met properly with respect to the context.
    fn meet(&mut self, other: &Self, ctx: &Self::Context<'a>) -> Result<(), Self::Error>;

    /// The statement transfer function, turning the state after the
    /// statement into the state before it.
    ///
    /// # Errors
    ///
    /// This method should return a `Self::Error` if given statement
    /// cannot be passed with the current state with respect to the
    /// context.
    fn transfer_stmt(&mut self, stmt: &'a Stmt, ctx: &Self::Context<'a>)
        -> Result<(), Self::Error>;

    /// Lattice order: returns `true` if `other` is below or equal to
    /// `self`.
    fn includes(&self, other: &Self) -> bool;
}

/// Performs a backward dataflow analysis.
///
/// The analysis parameters are given by the `AbstractBackwardState`
/// trait methods passed as a type parameter.
///
/// # Errors
///
/// This function may generate errors resulting of an underlying
/// abstract state error (at initialization, meet or transfer
/// operation), or an [`AnalysisError::Internal`] if the graph is
/// malformed, or if a block entry or exit state decreases between two
/// visits.
pub fn backward<'a, S>(
    cfg: &Cfg<'a>,
    context: &S::Context<'a>,
    options: &Options,
) -> AnalysisResult<Dataflow<S>>
where
    S: AbstractBackwardState<'a> + Clone + fmt::Display,
    S::Error: Into<AnalysisError>,
{
    backward_with(cfg, context, options, None)
}

fn initial_worklist(cfg: &Cfg, order: WorklistOrder) -> VecDeque<NodeIndex> {
    let cfgraph = &cfg.inner;
    if order == WorklistOrder::Fifo {
        return cfgraph.node_indices().collect();
    }

    let mut ids = Vec::with_capacity(cfgraph.node_count());
    let mut postorder = DfsPostOrder::new(cfgraph, cfg.entry_index());
    while let Some(id) = postorder.next(cfgraph) {
        ids.push(id);
    }
    // unreachable blocks are not visited from the entry block
    for id in cfgraph.node_indices() {
        if !postorder.discovered.contains(id.index()) {
            ids.push(id);
        }
    }
    if order == WorklistOrder::ReversePostOrder {
        ids.reverse();
    }
    ids.into()
}

fn log_state<S: fmt::Display>(title: &str, state: &S) {
    log::debug!("    -- {title}:");
    for line in format!("{state}").split('\n') {
        log::debug!("      {line}");
    }
}

/// Same as [`backward`], with block states initialized from a
/// previous result instead of the bottom state. Starting from a
/// fixpoint, the solver terminates after a single pass without any
/// state change.
///
/// # Errors
///
/// See [`backward`].
pub fn backward_with<'a, S>(
    cfg: &Cfg<'a>,
    context: &S::Context<'a>,
    options: &Options,
    seed: Option<&Dataflow<S>>,
) -> AnalysisResult<Dataflow<S>>
where
    S: AbstractBackwardState<'a> + Clone + fmt::Display,
    S::Error: Into<AnalysisError>,
{
    if options.check_invariants {
        cfg.check_invariants()?;
    }

    let cfgraph = &cfg.inner;
    let bottom = S::init(cfg, context).map_err(S::Error::into)?;

    let seeded = |states: Option<&BTreeMap<NodeIndex, S>>, id: NodeIndex| {
        states
            .and_then(|states| states.get(&id))
            .cloned()
            .unwrap_or_else(|| bottom.clone())
    };
    let mut block_entries: Vec<S> = cfgraph
        .node_indices()
        .map(|id| seeded(seed.map(|s| &s.block_entries), id))
        .collect();
    let mut block_exits: Vec<S> = cfgraph
        .node_indices()
        .map(|id| seeded(seed.map(|s| &s.block_exits), id))
        .collect();

    let mut entries = BTreeMap::new();
    let mut exits = BTreeMap::new();
    let mut iterations = 0;

    if cfg.nb_statements() == 0 {
        log::debug!("no statement, nothing to solve");
        return Ok(Dataflow {
            block_entries: cfgraph.node_indices().zip(block_entries).collect(),
            block_exits: cfgraph.node_indices().zip(block_exits).collect(),
            entries,
            exits,
            iterations,
        });
    }

    let mut worklist = initial_worklist(cfg, options.order);
    let mut queued = FixedBitSet::with_capacity(cfgraph.node_count());
    worklist.iter().for_each(|id| queued.insert(id.index()));

    while let Some(id) = worklist.pop_front() {
        queued.set(id.index(), false);
        iterations += 1;
        let block = &cfgraph[id];
        log::debug!("    ---- block {} ({} statements)", id.index(), block.len());

        // exit = meet of successors entries, bottom without successors
        let mut exit = bottom.clone();
        for succ in cfgraph.neighbors_directed(id, Direction::Outgoing) {
            exit.meet(&block_entries[succ.index()], context)
                .map_err(S::Error::into)?;
        }
        log_state("EXIT STATE", &exit);

        let old_exit = &block_exits[id.index()];
        if !exit.includes(old_exit) {
            return Err(AnalysisError::Internal(format!(
                "exit state of block {} decreased from {old_exit} to {exit}",
                id.index()
            )));
        }

        let mut entry = exit.clone();
        for stmt in block.rev_statements() {
            entry.transfer_stmt(stmt, context).map_err(S::Error::into)?;
        }
        log_state("ENTRY STATE", &entry);
        log::debug!("");

        let old_entry = &block_entries[id.index()];
        if !entry.includes(old_entry) {
            return Err(AnalysisError::Internal(format!(
                "entry state of block {} decreased from {old_entry} to {entry}",
                id.index()
            )));
        }

        block_exits[id.index()] = exit;
        if &entry != old_entry {
            // predecessors have to be treated again
            for pred in cfgraph.neighbors_directed(id, Direction::Incoming) {
                if !queued.put(pred.index()) {
                    worklist.push_back(pred);
                }
            }
            block_entries[id.index()] = entry;
        }
    }

    log::debug!("fixpoint reached after {iterations} iterations");

    // statement level states, recomputed from the block exits
    for id in cfgraph.node_indices() {
        let mut state = block_exits[id.index()].clone();
        for stmt in cfgraph[id].rev_statements() {
            exits.insert(stmt.id, state.clone());
            log::trace!("transfer_stmt( {} )", StmtHeader(stmt));
            log::trace!("    after: {state}");
            state.transfer_stmt(stmt, context).map_err(S::Error::into)?;
            log::trace!("    before: {state}");
            entries.insert(stmt.id, state.clone());
        }
        if state != block_entries[id.index()] {
            return Err(AnalysisError::Internal(format!(
                "statement states of block {} do not match its entry state",
                id.index()
            )));
        }
    }

    Ok(Dataflow {
        block_entries: cfgraph.node_indices().zip(block_entries).collect(),
        block_exits: cfgraph.node_indices().zip(block_exits).collect(),
        entries,
        exits,
        iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lw_ast::parse;
    use std::cell::Cell;

    // A state whose transfer function depends on the number of calls,
    // thus not monotone.
    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Erratic(u32);

    impl fmt::Display for Erratic {
        fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    impl<'a> AbstractBackwardState<'a> for Erratic {
        type Context<'c> = Cell<u32>;
        type Error = AnalysisError;

        fn init(_cfg: &Cfg<'a>, _ctx: &Cell<u32>) -> AnalysisResult<Self> {
            Ok(Self(0))
        }

        fn meet(&mut self, other: &Self, _ctx: &Cell<u32>) -> AnalysisResult<()> {
            self.0 = self.0.max(other.0);
            Ok(())
        }

        fn transfer_stmt(&mut self, _stmt: &'a Stmt, ctx: &Cell<u32>) -> AnalysisResult<()> {
            self.0 = if ctx.get() == 0 { 5 } else { 1 };
            ctx.set(ctx.get() + 1);
            Ok(())
        }

        fn includes(&self, other: &Self) -> bool {
            self.0 >= other.0
        }
    }

    #[test]
    fn shrinking_state_is_rejected() {
        let program = parse("class T { void m() { while (c) { x = 1; } } }").unwrap();
        let cfg = Cfg::build(&program.classes[0].methods[0]).unwrap();
        let options = Options::default().with_order(WorklistOrder::Fifo);
        let res: AnalysisResult<Dataflow<Erratic>> = backward(&cfg, &Cell::new(0), &options);
        match res {
            Err(AnalysisError::Internal(msg)) => assert!(msg.contains("decreased")),
            res => panic!("unexpected result: {res:?}"),
        }
    }

    #[test]
    fn stale_seed_is_rejected() {
        let program = parse("class T { void m() { x = 1; } }").unwrap();
        let cfg = Cfg::build(&program.classes[0].methods[0]).unwrap();
        let seed = Dataflow {
            block_entries: BTreeMap::new(),
            block_exits: [(cfg.exit_index(), Erratic(7))].into_iter().collect(),
            entries: BTreeMap::new(),
            exits: BTreeMap::new(),
            iterations: 0,
        };
        let res = backward_with(&cfg, &Cell::new(1), &Options::default(), Some(&seed));
        match res {
            Err(AnalysisError::Internal(msg)) => {
                assert!(msg.starts_with("exit state of block"));
                assert!(msg.ends_with("decreased from 7 to 0"));
            }
            res => panic!("unexpected result: {res:?}"),
        }
    }

    #[test]
    fn postorder_visits_successors_first() {
        let program = parse("class T { int m() { x = 1; if (x < 2) y = 3; return y; } }").unwrap();
        let cfg = Cfg::build(&program.classes[0].methods[0]).unwrap();
        let worklist = initial_worklist(&cfg, WorklistOrder::PostOrder);
        assert_eq!(worklist.len(), cfg.nb_blocks());
        assert_eq!(worklist.front(), Some(&cfg.exit_index()));
        assert_eq!(worklist.back(), Some(&cfg.entry_index()));

        let rpo = initial_worklist(&cfg, WorklistOrder::ReversePostOrder);
        assert_eq!(rpo.front(), Some(&cfg.entry_index()));
    }
}
