//! Variables read (USE) and written (DEF) by statements.
//!
//! Only local names are considered; array element writes do not define
//! the array variable, and a statement reading and writing the same
//! variable (`x = x + 1`) has it in both sets.

use crate::ast::{Expr, Stmt, StmtKind};
use std::collections::BTreeSet;

impl Expr {
    /// Adds every variable read by this expression into `vars`.
    pub fn collect_vars<'a>(&'a self, vars: &mut BTreeSet<&'a str>) {
        match self {
            Self::Int(_) | Self::Bool(_) | Self::This | Self::NewObject(_) => (),
            Self::Var(name) => {
                vars.insert(name.as_str());
            }
            Self::Unary(_, e) | Self::Length(e) | Self::NewArray(e) => e.collect_vars(vars),
            Self::Binary(_, e1, e2) | Self::Index(e1, e2) => {
                e1.collect_vars(vars);
                e2.collect_vars(vars);
            }
            Self::Call { receiver, args, .. } => {
                receiver.collect_vars(vars);
                args.iter().for_each(|arg| arg.collect_vars(vars));
            }
        }
    }

    #[must_use]
    pub fn vars(&self) -> BTreeSet<&str> {
        let mut vars = BTreeSet::new();
        self.collect_vars(&mut vars);
        vars
    }
}

impl Stmt {
    /// Variables read by the statement. For `if` and `while` nodes only
    /// the condition is considered, branches are separate statements.
    #[must_use]
    pub fn uses(&self) -> BTreeSet<&str> {
        let mut vars = BTreeSet::new();
        match &self.kind {
            StmtKind::Block(_) | StmtKind::Break | StmtKind::Continue | StmtKind::Return(None) => {}
            StmtKind::Assign { value, .. } => value.collect_vars(&mut vars),
            StmtKind::ArrayAssign {
                target,
                index,
                value,
            } => {
                vars.insert(target.as_str());
                index.collect_vars(&mut vars);
                value.collect_vars(&mut vars);
            }
            StmtKind::If { cond, .. } | StmtKind::While { cond, .. } => cond.collect_vars(&mut vars),
            StmtKind::Print(e) | StmtKind::Call(e) | StmtKind::Return(Some(e)) => {
                e.collect_vars(&mut vars);
            }
        }
        vars
    }

    /// Variables written by the statement.
    #[must_use]
    pub fn defs(&self) -> BTreeSet<&str> {
        match &self.kind {
            StmtKind::Assign { target, .. } => std::iter::once(target.as_str()).collect(),
            _ => BTreeSet::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::parse;
    use std::collections::BTreeSet;

    fn body_stmts(body: &str) -> Vec<crate::Stmt> {
        let src = format!("class T {{ int m() {{ {body} }} }}");
        let program = parse(&src).unwrap();
        program.classes[0].methods[0].body.clone()
    }

    fn set<'a>(names: &[&'a str]) -> BTreeSet<&'a str> {
        names.iter().copied().collect()
    }

    #[test]
    fn assignment_uses_and_defs() {
        let stmts = body_stmts("y = x + 1;");
        assert_eq!(stmts[0].uses(), set(&["x"]));
        assert_eq!(stmts[0].defs(), set(&["y"]));
    }

    #[test]
    fn self_update_is_use_and_def() {
        let stmts = body_stmts("x = x + 1;");
        assert_eq!(stmts[0].uses(), set(&["x"]));
        assert_eq!(stmts[0].defs(), set(&["x"]));
    }

    #[test]
    fn array_store_reads_array() {
        let stmts = body_stmts("a[i] = v * 2;");
        assert_eq!(stmts[0].uses(), set(&["a", "i", "v"]));
        assert!(stmts[0].defs().is_empty());
    }

    #[test]
    fn conditions_only() {
        let stmts = body_stmts("while (i < n) { s = s + i; }");
        assert_eq!(stmts[0].uses(), set(&["i", "n"]));
        assert!(stmts[0].defs().is_empty());
    }

    #[test]
    fn calls_read_receiver_and_arguments() {
        let stmts = body_stmts("obj.run(a, new int[n], this.size(), b.length);");
        assert_eq!(stmts[0].uses(), set(&["a", "b", "n", "obj"]));
    }

    #[test]
    fn object_creation_reads_nothing() {
        let stmts = body_stmts("o = new Foo();");
        assert!(stmts[0].uses().is_empty());
        assert_eq!(stmts[0].defs(), set(&["o"]));
    }
}
