//! Control flow graph representation.

use crate::errors::{AnalysisError, AnalysisResult};
use fixedbitset::FixedBitSet;
use lw_ast::{Method, Stmt, StmtHeader, StmtKind};
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef, NodeRef};
use petgraph::Direction;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BlockKind {
    Entry,
    Exit,
    Basic,
    /// Synthetic block merging several loop body exits into a single
    /// back edge.
    Latch,
}

#[derive(Debug)]
pub struct Block<'a> {
    kind: BlockKind,
    stmts: Vec<&'a Stmt>,
    dead: bool,
}

impl<'a> fmt::Display for Block<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            BlockKind::Entry => return write!(f, "<ENTRY>"),
            BlockKind::Exit => return write!(f, "<EXIT>"),
            BlockKind::Latch => return write!(f, "<LATCH>"),
            BlockKind::Basic => (),
        }
        for stmt in &self.stmts {
            writeln!(f, "{:>5}: {}", stmt.id.to_string(), StmtHeader(stmt))?;
        }
        Ok(())
    }
}

impl<'a> Block<'a> {
    fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            stmts: Vec::new(),
            dead: false,
        }
    }

    #[inline]
    pub fn statements(&self) -> impl Iterator<Item = &'a Stmt> + '_ {
        self.stmts.iter().copied()
    }

    #[inline]
    pub fn rev_statements(&self) -> impl Iterator<Item = &'a Stmt> + '_ {
        self.stmts.iter().rev().copied()
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.stmts.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }

    /// Returns `true` if no path from the entry block leads to this
    /// block (code following a `return`, `break` or `continue`).
    #[inline]
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.dead
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Sequence,
    IfTrue,
    IfFalse,
    Back,
    Return,
    Break,
    Continue,
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Sequence => write!(f, "<seq>"),
            Self::IfTrue => write!(f, "<true>"),
            Self::IfFalse => write!(f, "<false>"),
            Self::Back => write!(f, "<back>"),
            Self::Return => write!(f, "<ret>"),
            Self::Break => write!(f, "<break>"),
            Self::Continue => write!(f, "<continue>"),
        }
    }
}

#[derive(Debug)]
pub struct Cfg<'a> {
    pub(crate) inner: DiGraph<Block<'a>, Branch>,
    entry: NodeIndex,
    exit: NodeIndex,
}

impl<'a> Cfg<'a> {
    #[inline]
    #[must_use]
    pub fn entry_index(&self) -> NodeIndex {
        self.entry
    }

    #[inline]
    #[must_use]
    pub fn exit_index(&self) -> NodeIndex {
        self.exit
    }

    #[must_use]
    pub fn nb_blocks(&self) -> usize {
        self.inner.node_count()
    }

    #[must_use]
    pub fn nb_edges(&self) -> usize {
        self.inner.edge_count()
    }

    #[must_use]
    pub fn nb_statements(&self) -> usize {
        self.inner.node_weights().map(Block::len).sum()
    }

    #[must_use]
    pub fn block(&self, id: NodeIndex) -> &Block<'a> {
        &self.inner[id]
    }

    /// Iterates over blocks in creation order, which follows program
    /// order for the first statement of each block.
    pub fn iter_blocks(&self) -> impl Iterator<Item = (NodeIndex, &Block<'a>)> {
        self.inner
            .node_indices()
            .map(move |id| (id, &self.inner[id]))
    }

    /// Returns the block holding the given statement, if any.
    #[must_use]
    pub fn block_of(&self, stmt: lw_ast::NodeId) -> Option<NodeIndex> {
        self.iter_blocks()
            .find(|(_, block)| block.statements().any(|s| s.id == stmt))
            .map(|(id, _)| id)
    }

    #[must_use]
    pub fn successors(&self, id: NodeIndex) -> BTreeSet<NodeIndex> {
        self.inner
            .neighbors_directed(id, Direction::Outgoing)
            .collect()
    }

    #[must_use]
    pub fn predecessors(&self, id: NodeIndex) -> BTreeSet<NodeIndex> {
        self.inner
            .neighbors_directed(id, Direction::Incoming)
            .collect()
    }

    /// Outgoing edges of a block with their branch kind.
    pub fn edges(&self, id: NodeIndex) -> impl Iterator<Item = (NodeIndex, Branch)> + '_ {
        self.inner
            .edges_directed(id, Direction::Outgoing)
            .map(|edge| (edge.target(), *edge.weight()))
    }

    /// Computes the set of blocks reachable from the entry block.
    #[must_use]
    pub fn reachable(&self) -> FixedBitSet {
        let mut dfs = Dfs::new(&self.inner, self.entry);
        while dfs.next(&self.inner).is_some() {}
        dfs.discovered
    }

    /// Checks graph well-formedness. Any error here is a bug in the
    /// builder.
    ///
    /// # Errors
    ///
    /// Returns an [`AnalysisError::Internal`] describing the first
    /// broken invariant.
    pub fn check_invariants(&self) -> AnalysisResult<()> {
        let internal = |msg: String| -> AnalysisResult<()> { Err(AnalysisError::Internal(msg)) };

        if self.entry == self.exit {
            return internal("entry and exit blocks are the same".to_string());
        }
        if !self.predecessors(self.entry).is_empty() {
            return internal("entry block has predecessors".to_string());
        }
        if !self.successors(self.exit).is_empty() {
            return internal("exit block has successors".to_string());
        }

        let reachable = self.reachable();
        for (id, block) in self.iter_blocks() {
            for succ in self.successors(id) {
                if !self.predecessors(succ).contains(&id) {
                    return internal(format!(
                        "block {} is not a predecessor of its successor {}",
                        id.index(),
                        succ.index()
                    ));
                }
            }
            for pred in self.predecessors(id) {
                if !self.successors(pred).contains(&id) {
                    return internal(format!(
                        "block {} is not a successor of its predecessor {}",
                        id.index(),
                        pred.index()
                    ));
                }
            }

            let is_reachable = reachable.contains(id.index());
            if id != self.exit && is_reachable == block.dead {
                return internal(format!(
                    "block {} reachability does not match its dead flag",
                    id.index()
                ));
            }
            if block.kind == BlockKind::Basic && block.is_empty() {
                return internal(format!("basic block {} is empty", id.index()));
            }
            if block.kind != BlockKind::Basic && !block.is_empty() {
                return internal(format!(
                    "synthetic block {} holds statements",
                    id.index()
                ));
            }
            // control statements can only end a block
            if let Some((_, init)) = block.stmts.split_last() {
                if let Some(stmt) = init.iter().find(|s| ends_block(s)) {
                    return internal(format!(
                        "statement {} does not end block {}",
                        stmt.id,
                        id.index()
                    ));
                }
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn to_dot(&self) -> String {
        self.to_dot_with(|_| None)
    }

    /// Dot rendering with an optional extra label for each block.
    #[must_use]
    pub fn to_dot_with<F>(&self, xlabel: F) -> String
    where
        F: Fn(NodeIndex) -> Option<String>,
    {
        let mut res = String::new();
        res.push_str("digraph {\n");
        res.push_str("  nodesep=1;\n");
        write!(
            res,
            "{}",
            Dot::with_attr_getters(
                &self.inner,
                &[Config::GraphContentOnly, Config::EdgeNoLabel],
                &|_, edge| {
                    let color = match edge.weight() {
                        Branch::IfTrue => "green",
                        Branch::IfFalse => "red",
                        Branch::Back | Branch::Continue => "blue",
                        Branch::Return | Branch::Break => "purple",
                        Branch::Sequence => "black",
                    };
                    format!("color={},xlabel=\"{}\"", color, edge.weight())
                },
                &|_, node| {
                    let mut attrs = if node.weight().is_dead() {
                        String::from("shape=box,style=dashed,color=gray")
                    } else {
                        String::from("shape=box,color=black")
                    };
                    if let Some(label) = xlabel(node.id()) {
                        // attr writes into a String cannot fail
                        let _ = write!(attrs, ",xlabel=\"{}\"", label.escape_default());
                    }
                    attrs
                }
            )
        )
        .unwrap_or_default();
        res.push('}');
        res
    }

    /// Partitions the body of a method into basic blocks and wires
    /// control edges between them.
    ///
    /// # Errors
    ///
    /// Returns an [`AnalysisError::UnsupportedConstruct`] when a `break`
    /// or `continue` statement is found outside of any loop.
    pub fn build(method: &'a Method) -> AnalysisResult<Self> {
        let mut builder = Builder::new();
        for stmt in &method.body {
            builder.stmt(stmt)?;
        }
        let cfg = builder.finish();
        log::debug!(
            "cfg of {}: {} blocks, {} edges",
            method.name,
            cfg.nb_blocks(),
            cfg.nb_edges()
        );
        Ok(cfg)
    }
}

fn ends_block(stmt: &Stmt) -> bool {
    matches!(
        stmt.kind,
        StmtKind::If { .. }
            | StmtKind::While { .. }
            | StmtKind::Return(_)
            | StmtKind::Break
            | StmtKind::Continue
    )
}

#[derive(Debug, Default)]
struct LoopFrame {
    breaks: Vec<(NodeIndex, Branch)>,
    continues: Vec<(NodeIndex, Branch)>,
}

// The builder keeps at most one open block receiving sequential
// statements, and a list of pending edges: edges whose source is known
// but whose target is the next block to be created (the branch target
// or join point following the current statement).
struct Builder<'a> {
    graph: DiGraph<Block<'a>, Branch>,
    entry: NodeIndex,
    exit: NodeIndex,
    open: Option<NodeIndex>,
    pending: Vec<(NodeIndex, Branch)>,
    loops: Vec<LoopFrame>,
}

impl<'a> Builder<'a> {
    fn new() -> Self {
        let mut graph = DiGraph::new();
        let entry = graph.add_node(Block::new(BlockKind::Entry));
        let exit = graph.add_node(Block::new(BlockKind::Exit));
        Self {
            graph,
            entry,
            exit,
            open: None,
            pending: vec![(entry, Branch::Sequence)],
            loops: Vec::new(),
        }
    }

    // Creates a block, target of every pending edge. With no pending
    // edge, the block starts unreachable code.
    fn start_block(&mut self, kind: BlockKind) -> NodeIndex {
        let id = self.graph.add_node(Block::new(kind));
        for (src, branch) in self.pending.drain(..) {
            self.graph.add_edge(src, id, branch);
        }
        id
    }

    fn push(&mut self, stmt: &'a Stmt) -> NodeIndex {
        let id = match self.open {
            Some(id) => id,
            None => {
                let id = self.start_block(BlockKind::Basic);
                self.open = Some(id);
                id
            }
        };
        self.graph[id].stmts.push(stmt);
        id
    }

    // Pushes a statement that transfers control, closing its block.
    fn push_last(&mut self, stmt: &'a Stmt) -> NodeIndex {
        let id = self.push(stmt);
        self.open = None;
        id
    }

    fn close(&mut self) {
        if let Some(id) = self.open.take() {
            self.pending.push((id, Branch::Sequence));
        }
    }

    fn fallthrough(&mut self) -> Vec<(NodeIndex, Branch)> {
        self.close();
        std::mem::take(&mut self.pending)
    }

    fn innermost_loop(&mut self, stmt: &Stmt) -> AnalysisResult<&mut LoopFrame> {
        self.loops
            .last_mut()
            .ok_or_else(|| AnalysisError::UnsupportedConstruct {
                construct: format!("`{}` outside of loop", stmt.construct()),
                loc: stmt.loc,
            })
    }

    fn stmt(&mut self, stmt: &'a Stmt) -> AnalysisResult<()> {
        match &stmt.kind {
            StmtKind::Block(stmts) => {
                for s in stmts {
                    self.stmt(s)?;
                }
            }
            StmtKind::Assign { .. }
            | StmtKind::ArrayAssign { .. }
            | StmtKind::Print(_)
            | StmtKind::Call(_) => {
                self.push(stmt);
            }
            StmtKind::If {
                then_branch,
                else_branch,
                ..
            } => {
                let test = self.push_last(stmt);

                self.pending.push((test, Branch::IfTrue));
                self.stmt(then_branch)?;
                let mut join = self.fallthrough();

                self.pending.push((test, Branch::IfFalse));
                if let Some(else_branch) = else_branch {
                    self.stmt(else_branch)?;
                }
                join.extend(self.fallthrough());

                self.pending = join;
            }
            StmtKind::While { body, .. } => {
                self.close();
                let header = self.start_block(BlockKind::Basic);
                self.graph[header].stmts.push(stmt);

                self.pending.push((header, Branch::IfTrue));
                self.loops.push(LoopFrame::default());
                self.stmt(body)?;
                let frame = self.loops.pop().unwrap_or_default();

                let mut latch = self.fallthrough();
                latch.extend(frame.continues);
                match latch.as_slice() {
                    [] => (),
                    [(src, branch)] => {
                        let branch = if *branch == Branch::Sequence {
                            Branch::Back
                        } else {
                            *branch
                        };
                        self.graph.add_edge(*src, header, branch);
                    }
                    _ => {
                        self.pending = latch;
                        let id = self.start_block(BlockKind::Latch);
                        self.graph.add_edge(id, header, Branch::Back);
                    }
                }

                self.pending.push((header, Branch::IfFalse));
                self.pending.extend(frame.breaks);
            }
            StmtKind::Return(_) => {
                let id = self.push_last(stmt);
                self.graph.add_edge(id, self.exit, Branch::Return);
            }
            StmtKind::Break => {
                self.innermost_loop(stmt)?;
                let id = self.push_last(stmt);
                self.innermost_loop(stmt)?.breaks.push((id, Branch::Break));
            }
            StmtKind::Continue => {
                self.innermost_loop(stmt)?;
                let id = self.push_last(stmt);
                self.innermost_loop(stmt)?
                    .continues
                    .push((id, Branch::Continue));
            }
        }
        Ok(())
    }

    fn finish(mut self) -> Cfg<'a> {
        for (src, branch) in self.fallthrough() {
            self.graph.add_edge(src, self.exit, branch);
        }

        let mut dfs = Dfs::new(&self.graph, self.entry);
        while dfs.next(&self.graph).is_some() {}
        for id in self.graph.node_indices() {
            if id != self.exit && !dfs.discovered.contains(id.index()) {
                log::debug!("block {} is dead code", id.index());
                self.graph[id].dead = true;
            }
        }

        Cfg {
            inner: self.graph,
            entry: self.entry,
            exit: self.exit,
        }
    }
}
