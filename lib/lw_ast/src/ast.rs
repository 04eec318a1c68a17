//! Syntax tree data structures.

use crate::{Loc, NodeId};

/// A whole parsed source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub classes: Vec<Class>,
}

impl Program {
    /// Iterates over every method of every class, in source order.
    pub fn iter_methods(&self) -> impl Iterator<Item = (&Class, &Method)> {
        self.classes
            .iter()
            .flat_map(|class| class.methods.iter().map(move |method| (class, method)))
    }

    #[must_use]
    pub fn nb_methods(&self) -> usize {
        self.classes.iter().map(|class| class.methods.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Class {
    pub name: String,
    pub parent: Option<String>,
    pub fields: Vec<VarDecl>,
    pub methods: Vec<Method>,
    pub loc: Loc,
}

/// A method, the analyzable unit of the project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    pub name: String,
    pub is_static: bool,
    pub ret: Type,
    pub params: Vec<VarDecl>,
    pub locals: Vec<VarDecl>,
    pub body: Vec<Stmt>,
    pub loc: Loc,
}

impl Method {
    /// Returns `Class.method` form of the method name.
    #[must_use]
    pub fn descriptor(&self, class: &Class) -> String {
        format!("{}.{}", class.name, self.name)
    }

    /// Collects every statement node of the body in pre-order,
    /// including nested blocks.
    #[must_use]
    pub fn statements(&self) -> Vec<&Stmt> {
        let mut stmts = Vec::new();
        for stmt in &self.body {
            stmt.walk(&mut |s| stmts.push(s));
        }
        stmts
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarDecl {
    pub typ: Type,
    pub name: String,
    pub loc: Loc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Int,
    IntArray,
    Boolean,
    Void,
    StringArray,
    Class(String),
}

/// A statement node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stmt {
    pub id: NodeId,
    pub loc: Loc,
    pub kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StmtKind {
    Block(Vec<Stmt>),
    Assign {
        target: String,
        value: Expr,
    },
    ArrayAssign {
        target: String,
        index: Expr,
        value: Expr,
    },
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    Print(Expr),
    /// Expression statement; the parser only accepts method calls here.
    Call(Expr),
    Return(Option<Expr>),
    Break,
    Continue,
}

impl Stmt {
    /// Visits this statement and all nested statements in pre-order.
    pub fn walk<'a, F: FnMut(&'a Stmt)>(&'a self, f: &mut F) {
        f(self);
        match &self.kind {
            StmtKind::Block(stmts) => stmts.iter().for_each(|s| s.walk(f)),
            StmtKind::If {
                then_branch,
                else_branch,
                ..
            } => {
                then_branch.walk(f);
                if let Some(else_branch) = else_branch {
                    else_branch.walk(f);
                }
            }
            StmtKind::While { body, .. } => body.walk(f),
            _ => (),
        }
    }

    /// Block statements are pure grouping and never appear in a
    /// control flow graph.
    #[inline]
    #[must_use]
    pub fn is_block(&self) -> bool {
        matches!(self.kind, StmtKind::Block(_))
    }

    /// Returns the keyword or short name of the statement construct.
    #[must_use]
    pub fn construct(&self) -> &'static str {
        match self.kind {
            StmtKind::Block(_) => "block",
            StmtKind::Assign { .. } => "assignment",
            StmtKind::ArrayAssign { .. } => "array assignment",
            StmtKind::If { .. } => "if",
            StmtKind::While { .. } => "while",
            StmtKind::Print(_) => "print",
            StmtKind::Call(_) => "call",
            StmtKind::Return(_) => "return",
            StmtKind::Break => "break",
            StmtKind::Continue => "continue",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Int(i64),
    Bool(bool),
    Var(String),
    This,
    Unary(UnOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Index(Box<Expr>, Box<Expr>),
    Length(Box<Expr>),
    Call {
        receiver: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },
    NewArray(Box<Expr>),
    NewObject(String),
}
